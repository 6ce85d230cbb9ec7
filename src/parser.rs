use std::{iter::Peekable, vec::IntoIter};

use log::debug;
use miette::{Report, Result};

use crate::{
    error::{self, Fault},
    ins::{Instruction, Operand, OperandError, OperandKind, OpcodeTable, Operands},
    lexer::{tokenize, Token, TokenKind},
    program::Program,
    symbol::{Label, Span},
};

/// Transforms SML source into a [`Program`].
pub struct AsmParser<'a> {
    /// Reference to the source file
    src: &'a str,
    /// Tokens without whitespace and comments
    toks: Peekable<IntoIter<Token>>,
    opcodes: &'a OpcodeTable,
}

impl<'a> AsmParser<'a> {
    pub fn new(src: &'a str, opcodes: &'a OpcodeTable) -> Result<Self> {
        let toks: Vec<Token> = tokenize(src)?
            .into_iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Whitespace | TokenKind::Comment))
            .collect();
        Ok(AsmParser {
            src,
            toks: toks.into_iter().peekable(),
            opcodes,
        })
    }

    /// Parse every statement and build the label table.
    pub fn parse(mut self) -> Result<Program> {
        let mut ins: Vec<Box<dyn Instruction>> = Vec::new();
        // Span of the prefix label of each instruction, for duplicate label reports
        let mut label_spans: Vec<Option<Span>> = Vec::new();

        while let Some((stmt, label_span)) = self.parse_stmt()? {
            ins.push(stmt);
            label_spans.push(label_span);
        }

        debug!("assembled {} instructions", ins.len());
        Program::new(ins).map_err(|fault| match fault {
            Fault::DuplicateLabel { first, second, .. } => {
                let span_of = |idx: usize| label_spans[idx].unwrap_or_else(Span::dummy);
                error::parse_duplicate_label(span_of(first), span_of(second), self.src)
            }
            other => Report::new(other),
        })
    }

    /// Next non-empty statement, or `None` at end of file.
    fn parse_stmt(&mut self) -> Result<Option<(Box<dyn Instruction>, Option<Span>)>> {
        // Skip blank lines
        while self.toks.next_if(|tok| tok.kind == TokenKind::Newline).is_some() {}

        let Some(first) = self.toks.next() else {
            return Ok(None);
        };

        let (label, label_span, opcode) = match first.kind {
            TokenKind::Eof => return Ok(None),
            TokenKind::LabelDef => {
                let label = Label::new(self.text(first.span));
                let Some(opcode) = self.toks.next() else {
                    return Err(error::parse_lonely_label(first.span, self.src));
                };
                match opcode.kind {
                    TokenKind::Ident => (Some(label), Some(first.span), opcode),
                    TokenKind::Newline | TokenKind::Eof => {
                        return Err(error::parse_lonely_label(first.span, self.src))
                    }
                    other => {
                        return Err(error::parse_unexpected(
                            opcode.span,
                            self.src,
                            "an opcode",
                            &other.to_string(),
                        ))
                    }
                }
            }
            TokenKind::Ident => (None, None, first),
            other => {
                return Err(error::parse_unexpected(
                    first.span,
                    self.src,
                    "an opcode or label definition",
                    &other.to_string(),
                ))
            }
        };

        let name = self.text(opcode.span);
        let Some(builder) = self.opcodes.get(name) else {
            let known = self.opcodes.mnemonics().collect::<Vec<_>>().join(", ");
            return Err(error::parse_unknown_opcode(opcode.span, self.src, &known));
        };

        let mut last_span = opcode.span;
        let mut operands = Vec::new();
        while let Some(tok) = self
            .toks
            .next_if(|tok| !matches!(tok.kind, TokenKind::Newline | TokenKind::Eof))
        {
            let kind = match tok.kind {
                TokenKind::Reg(reg) => OperandKind::Reg(reg),
                TokenKind::Lit(val) => OperandKind::Imm(val),
                TokenKind::Ident => OperandKind::Label(Label::new(self.text(tok.span))),
                other => {
                    return Err(error::parse_unexpected(
                        tok.span,
                        self.src,
                        "an operand",
                        &other.to_string(),
                    ))
                }
            };
            last_span = tok.span;
            operands.push(Operand {
                kind,
                span: tok.span,
            });
        }

        let mut operands = Operands::new(operands);
        let stmt = builder(label, &mut operands).map_err(|e| match e {
            OperandError::Missing { expected } => {
                error::parse_missing_operand(last_span, self.src, name, expected)
            }
            OperandError::Unexpected {
                expected,
                found,
                span,
            } => error::parse_unexpected(span, self.src, expected, found),
        })?;
        if let Some(extra) = operands.leftover() {
            return Err(error::parse_extra_operand(extra.span, self.src, name));
        }

        Ok(Some((stmt, label_span)))
    }

    fn text(&self, span: Span) -> &'a str {
        &self.src[span.offs()..span.end()]
    }
}
