use std::fmt::{self, Display};

use crate::{
    error::Result,
    symbol::{ImmediateOrReg, Label},
};

use super::{Exec, Instruction, OperandError, Operands};

/// Print a register or literal as one line of program output.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Out {
    pub label: Option<Label>,
    pub src: ImmediateOrReg,
}

impl Display for Out {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "out {}", self.src)
    }
}

impl Instruction for Out {
    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn opcode(&self) -> &'static str {
        "out"
    }

    fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
        let val = exec.value(self.src)?;
        exec.emit(val)?;
        exec.machine.advance()
    }
}

/// Stop the machine.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Halt {
    pub label: Option<Label>,
}

impl Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("halt")
    }
}

impl Instruction for Halt {
    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn opcode(&self) -> &'static str {
        "halt"
    }

    fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
        exec.machine.halt();
        Ok(())
    }
}

pub(super) fn build_out(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    let src = ops.value()?;
    Ok(Box::new(Out { label, src }))
}

pub(super) fn build_halt(
    label: Option<Label>,
    _ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    Ok(Box::new(Halt { label }))
}
