// Parsing
mod lexer;
mod parser;
pub use parser::AsmParser;

// Running
pub mod ins;
mod labels;
pub use labels::{LabelBridge, LabelTable};
mod machine;
pub use machine::{Machine, Status, DEFAULT_REGISTERS};
mod program;
pub use program::Program;
mod runtime;
pub use runtime::{run, step, StepResult};

mod error;
pub use error::{Fault, RuntimeFault};
mod symbol;
pub use symbol::{ImmediateOrReg, Label, Register, Span};

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;

/// Assemble `src` with the standard opcode set.
pub fn assemble(src: &str) -> miette::Result<Program> {
    let opcodes = ins::OpcodeTable::standard();
    AsmParser::new(src, &opcodes)?.parse()
}
