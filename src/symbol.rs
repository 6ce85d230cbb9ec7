use std::{
    fmt::{self, Display},
    ops::Range,
    str::FromStr,
};

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use miette::SourceSpan;

/// Insertion-ordered map using the fast non-cryptographic hasher.
pub type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn dummy() -> Self {
        Span {
            offs: SrcOffset(0),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    pub fn end(&self) -> usize {
        self.offs.0 + self.len
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

impl From<Span> for Range<usize> {
    fn from(value: Span) -> Self {
        value.offs()..value.end()
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct SrcOffset(pub usize);

/// Register identifier. Whether it exists is only known to the machine it is used on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Register(pub u16);

impl Register {
    /// Highest register id that can be written in source.
    pub const MAX_ID: usize = u16::MAX as usize;

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Shaped like a register (`r` followed by digits), whether or not the id fits.
    pub fn is_register_name(s: &str) -> bool {
        s.strip_prefix(['r', 'R'])
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    }
}

impl FromStr for Register {
    type Err = ();

    /// Accepts `r<N>` or `R<N>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Register::is_register_name(s) {
            return Err(());
        }
        s[1..].parse().map(Register).map_err(|_| ())
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Name by which other instructions may jump to a position in the program.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Label(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label(value.to_string())
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Either a register or an immediate literal, as accepted by most source operands.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImmediateOrReg {
    Reg(Register),
    Imm(i64),
}

impl Display for ImmediateOrReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImmediateOrReg::Reg(reg) => write!(f, "{reg}"),
            ImmediateOrReg::Imm(val) => write!(f, "{val}"),
        }
    }
}
