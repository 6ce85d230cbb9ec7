use std::fmt::{self, Display};

use crate::{
    error::{Fault, Result},
    symbol::{ImmediateOrReg, Label, Register},
};

use super::{Exec, Instruction, OperandError, Operands};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
        }
    }

    /// Overflow and division by zero are faults, never wrapped.
    pub fn apply(self, lhs: i64, rhs: i64) -> Result<i64> {
        let res = match self {
            ArithOp::Add => lhs.checked_add(rhs),
            ArithOp::Sub => lhs.checked_sub(rhs),
            ArithOp::Mul => lhs.checked_mul(rhs),
            ArithOp::Div => {
                if rhs == 0 {
                    return Err(Fault::ArithmeticFault("division by zero"));
                }
                lhs.checked_div(rhs)
            }
        };
        res.ok_or(Fault::ArithmeticFault("integer overflow"))
    }
}

/// `dest = src <op> rhs`
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Arithmetic {
    pub label: Option<Label>,
    pub op: ArithOp,
    pub dest: Register,
    pub src: Register,
    pub rhs: ImmediateOrReg,
}

impl Display for Arithmetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.op.mnemonic(),
            self.dest,
            self.src,
            self.rhs
        )
    }
}

impl Instruction for Arithmetic {
    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn opcode(&self) -> &'static str {
        self.op.mnemonic()
    }

    fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
        let lhs = exec.machine.register(self.src)?;
        let rhs = exec.value(self.rhs)?;
        let res = self.op.apply(lhs, rhs)?;
        exec.machine.set_register(self.dest, res)?;
        exec.machine.advance()
    }
}

// Accepts `dest src rhs`, or `dest rhs` which operates in place
fn build(
    op: ArithOp,
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    let dest = ops.reg()?;
    let src = if ops.remaining() > 1 { ops.reg()? } else { dest };
    let rhs = ops.value()?;
    Ok(Box::new(Arithmetic {
        label,
        op,
        dest,
        src,
        rhs,
    }))
}

pub(super) fn build_add(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    build(ArithOp::Add, label, ops)
}

pub(super) fn build_sub(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    build(ArithOp::Sub, label, ops)
}

pub(super) fn build_mul(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    build(ArithOp::Mul, label, ops)
}

pub(super) fn build_div(
    label: Option<Label>,
    ops: &mut Operands,
) -> std::result::Result<Box<dyn Instruction>, OperandError> {
    build(ArithOp::Div, label, ops)
}
