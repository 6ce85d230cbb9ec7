use std::fmt::{self, Display};

use crate::{
    error::Result,
    symbol::{Label, Register},
};

use super::{Exec, Instruction, OperandError, Operands};

/// Unconditional jump. The program counter is not incremented.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Jump {
    pub label: Option<Label>,
    pub target: Label,
}

impl Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jmp {}", self.target)
    }
}

impl Instruction for Jump {
    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn opcode(&self) -> &'static str {
        "jmp"
    }

    fn target(&self) -> Option<&Label> {
        Some(&self.target)
    }

    fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
        exec.jump(&self.target)
    }
}

/// Condition tested against a register by a [`Branch`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cond {
    /// == 0
    Zero,
    /// != 0
    NotZero,
    /// < 0
    Negative,
}

impl Cond {
    pub fn holds(self, val: i64) -> bool {
        match self {
            Cond::Zero => val == 0,
            Cond::NotZero => val != 0,
            Cond::Negative => val < 0,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Cond::Zero => "jz",
            Cond::NotZero => "jnz",
            Cond::Negative => "jn",
        }
    }
}

/// Jump to `target` if `cond` holds for `src`, otherwise fall through.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Branch {
    pub label: Option<Label>,
    pub cond: Cond,
    pub src: Register,
    pub target: Label,
}

impl Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.cond.mnemonic(), self.src, self.target)
    }
}

impl Instruction for Branch {
    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn opcode(&self) -> &'static str {
        self.cond.mnemonic()
    }

    fn target(&self) -> Option<&Label> {
        Some(&self.target)
    }

    fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
        let val = exec.machine.register(self.src)?;
        if self.cond.holds(val) {
            exec.jump(&self.target)
        } else {
            exec.machine.advance()
        }
    }
}

pub(super) fn build_jmp(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    let target = ops.label()?;
    Ok(Box::new(Jump { label, target }))
}

fn build(
    cond: Cond,
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    let src = ops.reg()?;
    let target = ops.label()?;
    Ok(Box::new(Branch {
        label,
        cond,
        src,
        target,
    }))
}

pub(super) fn build_jz(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    build(Cond::Zero, label, ops)
}

pub(super) fn build_jnz(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    build(Cond::NotZero, label, ops)
}

pub(super) fn build_jn(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    build(Cond::Negative, label, ops)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        error::Fault,
        ins::test_util::{exec, machine},
        labels::LabelTable,
    };

    fn table() -> LabelTable {
        let mut labels = LabelTable::new();
        labels.insert("top".into(), 1).unwrap();
        labels.insert("end".into(), 5).unwrap();
        labels
    }

    #[test]
    fn jump_sets_pc_without_increment() {
        let labels = table();
        let mut m = machine(5);
        m.set_pc(3).unwrap();

        let ins = Jump {
            label: None,
            target: "top".into(),
        };
        assert_eq!(exec(&ins, &mut m, &labels).0, Ok(()));
        assert_eq!(m.pc(), 1);

        // One past the end terminates the run normally
        let ins = Jump {
            label: None,
            target: "end".into(),
        };
        assert_eq!(exec(&ins, &mut m, &labels).0, Ok(()));
        assert_eq!(m.pc(), 5);
    }

    #[test]
    fn jump_to_unknown_label_faults() {
        let labels = table();
        let mut m = machine(5);
        let ins = Jump {
            label: None,
            target: "elsewhere".into(),
        };
        assert_eq!(
            exec(&ins, &mut m, &labels).0,
            Err(Fault::UnknownLabel("elsewhere".into()))
        );
        assert_eq!(m.pc(), 0);
    }

    #[test]
    fn jump_past_program_faults() {
        let labels = table();
        let mut m = machine(3);
        let ins = Jump {
            label: None,
            target: "end".into(),
        };
        assert_eq!(
            exec(&ins, &mut m, &labels).0,
            Err(Fault::InvalidJumpTarget { target: 5, len: 3 })
        );
    }

    #[test]
    fn branch_conditions() {
        #[rustfmt::skip]
        let cases = [
            // (cond, value, taken)
            (Cond::Zero, 0, true),
            (Cond::Zero, 3, false),
            (Cond::NotZero, 0, false),
            (Cond::NotZero, -3, true),
            (Cond::Negative, -1, true),
            (Cond::Negative, 0, false),
            (Cond::Negative, 1, false),
        ];

        let labels = table();
        for (cond, val, taken) in cases {
            let mut m = machine(5);
            m.set_pc(2).unwrap();
            m.set_register(Register(7), val).unwrap();

            let ins = Branch {
                label: None,
                cond,
                src: Register(7),
                target: "top".into(),
            };
            assert_eq!(exec(&ins, &mut m, &labels).0, Ok(()));
            let expected = if taken { 1 } else { 3 };
            assert_eq!(m.pc(), expected, "{} with {val}", cond.mnemonic());
        }
    }

    #[test]
    fn untaken_branch_does_not_resolve_label() {
        let labels = LabelTable::new();
        let mut m = machine(2);
        let ins = Branch {
            label: None,
            cond: Cond::NotZero,
            src: Register(0),
            target: "missing".into(),
        };
        assert_eq!(exec(&ins, &mut m, &labels).0, Ok(()));
        assert_eq!(m.pc(), 1);
    }
}
