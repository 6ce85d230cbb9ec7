use std::fmt::{self, Display};

use miette::Result;

use crate::{
    error,
    lexer::cursor::Cursor,
    symbol::{Register, Span, SrcOffset},
};

pub mod cursor;

/// Token with its location in the source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// `name:` at the start of a statement
    LabelDef,
    /// Opcode or label reference
    Ident,
    Reg(Register),
    Lit(i64),
    Comment,
    /// Spaces, tabs and commas
    Whitespace,
    Newline,
    Eof,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::LabelDef => "label definition",
            TokenKind::Ident => "identifier",
            TokenKind::Reg(_) => "register",
            TokenKind::Lit(_) => "integer literal",
            TokenKind::Comment => "comment",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Newline => "end of line",
            TokenKind::Eof => "end of file",
        };
        f.write_str(name)
    }
}

/// Test if a character separates operands.
pub(crate) fn is_whitespace(c: char) -> bool {
    // Commas are optional separators
    matches!(c, ' ' | '\t' | '\r' | ',')
}

/// Test if a character may start an identifier.
pub(crate) fn is_id_start(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_' | '.')
}

/// Test if a character is considered an identifier character.
pub(crate) fn is_id(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '.')
}

/// Splits SML source into tokens, ending with a single `Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Token>> {
    let mut cur = Cursor::new(src);
    let mut toks = Vec::new();
    loop {
        let tok = cur.advance_token(src)?;
        toks.push(tok);
        if tok.kind == TokenKind::Eof {
            return Ok(toks);
        }
    }
}

impl Cursor<'_> {
    pub fn advance_token(&mut self, src: &str) -> Result<Token> {
        let start = self.abs_pos();
        self.reset_pos_within_token();
        let first_char = match self.bump() {
            Some(c) => c,
            None => return Ok(Token::new(TokenKind::Eof, Span::new(SrcOffset(start), 0))),
        };
        let kind = match first_char {
            ';' => {
                self.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            '/' if self.first() == '/' => {
                self.take_while(|c| c != '\n');
                TokenKind::Comment
            }
            '\n' => TokenKind::Newline,
            c if is_whitespace(c) => {
                self.take_while(is_whitespace);
                TokenKind::Whitespace
            }
            // Decimal literal, `#` prefix is accepted for LC3 habits
            '#' | '-' | '+' | '0'..='9' => {
                if first_char == '#' && matches!(self.first(), '-' | '+') {
                    self.bump();
                }
                if first_char == '0' && matches!(self.first(), 'x' | 'X') {
                    self.bump();
                }
                self.take_while(|c| c.is_ascii_alphanumeric());
                let span = self.span_from(start);
                let text = self.get_range(start..self.abs_pos());
                let val = parse_lit(text).map_err(|e| error::lex_invalid_lit(span, src, e))?;
                TokenKind::Lit(val)
            }
            c if is_id_start(c) => {
                self.take_while(is_id);
                let text = self.get_range(start..self.abs_pos());
                if self.first() == ':' {
                    let tok = Token::new(TokenKind::LabelDef, self.span_from(start));
                    // Colon is not part of the label span
                    self.bump();
                    return Ok(tok);
                }
                match text.parse::<Register>() {
                    Ok(reg) => TokenKind::Reg(reg),
                    Err(_) if Register::is_register_name(text) => {
                        return Err(error::lex_bad_register(self.span_from(start), src));
                    }
                    Err(_) => TokenKind::Ident,
                }
            }
            _ => {
                self.take_while(|c| !is_whitespace(c) && c != '\n');
                return Err(error::lex_unknown(self.span_from(start), src));
            }
        };
        Ok(Token::new(kind, self.span_from(start)))
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(SrcOffset(start), self.pos_within_token() as usize)
    }
}

/// Decimal, optionally signed or `#` prefixed, or `0x` hexadecimal.
fn parse_lit(text: &str) -> std::result::Result<i64, std::num::ParseIntError> {
    let text = text.strip_prefix('#').unwrap_or(text);
    // Sign stays attached to the digits so that i64::MIN parses
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.strip_prefix('+').unwrap_or(text)),
    };
    match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(&format!("{sign}{hex}"), 16),
        None => format!("{sign}{digits}").parse(),
    }
}
