use std::fmt::{self, Display};

use crate::{
    error::Result,
    symbol::{ImmediateOrReg, Label, Register},
};

use super::{Exec, Instruction, OperandError, Operands};

/// Copy a register or literal into `dest`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Move {
    pub label: Option<Label>,
    pub dest: Register,
    pub src: ImmediateOrReg,
}

impl Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mov {} {}", self.dest, self.src)
    }
}

impl Instruction for Move {
    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn opcode(&self) -> &'static str {
        "mov"
    }

    fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
        let val = exec.value(self.src)?;
        exec.machine.set_register(self.dest, val)?;
        exec.machine.advance()
    }
}

/// Read memory at `addr` into `dest`. A register address is used indirectly.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Load {
    pub label: Option<Label>,
    pub dest: Register,
    pub addr: ImmediateOrReg,
}

impl Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load {} {}", self.dest, self.addr)
    }
}

impl Instruction for Load {
    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn opcode(&self) -> &'static str {
        "load"
    }

    fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
        let addr = exec.value(self.addr)?;
        let val = exec.machine.memory(addr)?;
        exec.machine.set_register(self.dest, val)?;
        exec.machine.advance()
    }
}

/// Write `src` to memory at `addr`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Store {
    pub label: Option<Label>,
    pub src: Register,
    pub addr: ImmediateOrReg,
}

impl Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store {} {}", self.src, self.addr)
    }
}

impl Instruction for Store {
    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn opcode(&self) -> &'static str {
        "store"
    }

    fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
        let val = exec.machine.register(self.src)?;
        let addr = exec.value(self.addr)?;
        exec.machine.set_memory(addr, val);
        exec.machine.advance()
    }
}

pub(super) fn build_mov(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    let dest = ops.reg()?;
    let src = ops.value()?;
    Ok(Box::new(Move { label, dest, src }))
}

pub(super) fn build_load(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    let dest = ops.reg()?;
    let addr = ops.value()?;
    Ok(Box::new(Load { label, dest, addr }))
}

pub(super) fn build_store(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    let src = ops.reg()?;
    let addr = ops.value()?;
    Ok(Box::new(Store { label, src, addr }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        env::Config,
        error::Fault,
        ins::test_util::{exec, machine},
        labels::LabelTable,
        machine::Machine,
    };

    #[test]
    fn mov_copies_literal_and_register() {
        let labels = LabelTable::new();
        let mut m = machine(3);

        let ins = Move {
            label: None,
            dest: Register(3),
            src: ImmediateOrReg::Imm(-42),
        };
        assert_eq!(exec(&ins, &mut m, &labels).0, Ok(()));

        let ins = Move {
            label: None,
            dest: Register(4),
            src: ImmediateOrReg::Reg(Register(3)),
        };
        assert_eq!(exec(&ins, &mut m, &labels).0, Ok(()));
        assert_eq!(m.register(Register(3)), Ok(-42));
        assert_eq!(m.register(Register(4)), Ok(-42));
        assert_eq!(m.pc(), 2);
    }

    #[test]
    fn store_then_load_through_register_address() {
        let labels = LabelTable::new();
        let mut m = machine(3);
        m.set_register(Register(0), 77).unwrap();
        m.set_register(Register(1), 1000).unwrap();

        let store = Store {
            label: None,
            src: Register(0),
            addr: ImmediateOrReg::Reg(Register(1)),
        };
        let load = Load {
            label: None,
            dest: Register(2),
            addr: ImmediateOrReg::Imm(1000),
        };
        assert_eq!(exec(&store, &mut m, &labels).0, Ok(()));
        assert_eq!(exec(&load, &mut m, &labels).0, Ok(()));
        assert_eq!(m.register(Register(2)), Ok(77));
        assert_eq!(m.memory(1000), Ok(77));
    }

    #[test]
    fn strict_load_of_unwritten_cell_faults() {
        let labels = LabelTable::new();
        let mut m = Machine::new(&Config {
            strict_memory: true,
            ..Config::default()
        });
        m.bind_program(1);

        let load = Load {
            label: None,
            dest: Register(0),
            addr: ImmediateOrReg::Imm(5),
        };
        assert_eq!(
            exec(&load, &mut m, &labels).0,
            Err(Fault::InvalidAddress(5))
        );
        assert_eq!(m.pc(), 0);
    }

    #[test]
    fn invalid_register_faults() {
        let labels = LabelTable::new();
        let mut m = machine(1);
        let ins = Move {
            label: None,
            dest: Register(200),
            src: ImmediateOrReg::Imm(1),
        };
        assert_eq!(
            exec(&ins, &mut m, &labels).0,
            Err(Fault::InvalidRegister { id: 200, count: 32 })
        );
    }
}
