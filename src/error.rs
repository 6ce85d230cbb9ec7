use std::num::ParseIntError;

use miette::{miette, Diagnostic, LabeledSpan, Report, Severity};
use thiserror::Error;

use crate::{
    machine::Machine,
    symbol::{Label, Register, Span},
};

/// Unrecoverable condition raised while loading or running a program.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum Fault {
    #[error("register r{id} does not exist (machine has {count} registers)")]
    #[diagnostic(
        code(runtime::invalid_register),
        help("increase the register count with `--registers`")
    )]
    InvalidRegister { id: usize, count: usize },

    #[error("memory address {0} was read before being written")]
    #[diagnostic(
        code(runtime::invalid_address),
        help("strict memory is enabled; store to the address before loading it")
    )]
    InvalidAddress(i64),

    #[error("jump target {target} is outside the program (length {len})")]
    #[diagnostic(code(runtime::invalid_jump_target))]
    InvalidJumpTarget { target: usize, len: usize },

    #[error("label `{0}` is not defined")]
    #[diagnostic(
        code(runtime::unknown_label),
        help("define the label as a prefix on an instruction, like `done: halt`")
    )]
    UnknownLabel(Label),

    #[error("label `{label}` defined at instruction {first} is defined again at instruction {second}")]
    #[diagnostic(
        code(load::duplicate_label),
        help("prefix labels are only allowed once per program")
    )]
    DuplicateLabel {
        label: Label,
        first: usize,
        second: usize,
    },

    #[error("arithmetic fault: {0}")]
    #[diagnostic(code(runtime::arithmetic))]
    ArithmeticFault(&'static str),

    #[error("step limit of {0} exceeded")]
    #[diagnostic(
        code(runtime::step_limit),
        help("the program may loop forever; raise the limit with `--step-limit`")
    )]
    StepLimitExceeded(u64),

    #[error("{count} registers requested, at most {max} are supported")]
    #[diagnostic(code(config::too_many_registers))]
    TooManyRegisters { count: usize, max: usize },

    #[error("label `{0}` was resolved by an instruction that declares no jump target")]
    #[diagnostic(
        code(runtime::label_access),
        help("instructions that jump must report their label through `Instruction::target`")
    )]
    LabelAccess(Label),

    #[error("failed to write program output: {0}")]
    #[diagnostic(code(runtime::output))]
    Output(String),
}

pub type Result<T, E = Fault> = std::result::Result<T, E>;

/// A fault together with the machine as it was left when the fault occurred.
#[derive(Debug, Error)]
#[error("{fault}")]
pub struct RuntimeFault {
    pub fault: Fault,
    pub machine: Machine,
}

// Lexer errors

pub fn lex_invalid_lit(span: Span, src: &str, e: ParseIntError) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::bad_lit",
        help = "literals are signed 64-bit decimal or 0x-prefixed hex values",
        labels = vec![LabeledSpan::at(span, "incorrect literal")],
        "Encountered an invalid literal: {e}",
    )
    .with_source_code(src.to_string())
}

pub fn lex_bad_register(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::bad_register",
        help = format!("register ids range from r0 to r{}", Register::MAX_ID),
        labels = vec![LabeledSpan::at(span, "register id too large")],
        "Encountered an invalid register",
    )
    .with_source_code(src.to_string())
}

pub fn lex_unknown(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::unknown",
        help = "operands are registers like r1, integers like -4 or label names",
        labels = vec![LabeledSpan::at(span, "unknown token")],
        "Encountered an unknown token",
    )
    .with_source_code(src.to_string())
}

// Parser errors

pub fn parse_unknown_opcode(span: Span, src: &str, known: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unknown_opcode",
        help = format!("available opcodes are: {known}"),
        labels = vec![LabeledSpan::at(span, "unknown opcode")],
        "Unknown opcode",
    )
    .with_source_code(src.to_string())
}

pub fn parse_unexpected(span: Span, src: &str, expected: &str, found: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::unexpected_token",
        help = "check the operands for this instruction",
        labels = vec![LabeledSpan::at(span, "unexpected token")],
        "Expected {expected}, found {found}",
    )
    .with_source_code(src.to_string())
}

pub fn parse_missing_operand(span: Span, src: &str, opcode: &str, expected: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::missing_operand",
        help = format!("`{opcode}` expects {expected} here"),
        labels = vec![LabeledSpan::at(span, "statement ends here")],
        "Missing operand",
    )
    .with_source_code(src.to_string())
}

pub fn parse_extra_operand(span: Span, src: &str, opcode: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::extra_operand",
        help = format!("remove the trailing operands of `{opcode}`"),
        labels = vec![LabeledSpan::at(span, "unexpected operand")],
        "Too many operands",
    )
    .with_source_code(src.to_string())
}

pub fn parse_lonely_label(span: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::lonely_label",
        help = "put the label on the same line as the instruction it names",
        labels = vec![LabeledSpan::at(span, "label without instruction")],
        "Expected an instruction after label",
    )
    .with_source_code(src.to_string())
}

pub fn parse_duplicate_label(first: Span, second: Span, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "parse::duplicate_label",
        help = "prefix labels are only allowed once per program",
        labels = vec![
            LabeledSpan::at(first, "first defined here"),
            LabeledSpan::at(second, "duplicate label"),
        ],
        "Duplicate prefix label"
    )
    .with_source_code(src.to_string())
}
