use std::{
    fmt::{Debug, Display},
    io::Write,
};

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::{
    error::{Fault, Result},
    labels::LabelBridge,
    machine::Machine,
    symbol::{FxMap, ImmediateOrReg, Label, Register, Span},
};

mod arith;
mod branch;
mod data;
mod system;

pub use arith::{ArithOp, Arithmetic};
pub use branch::{Branch, Cond, Jump};
pub use data::{Load, Move, Store};
pub use system::{Halt, Out};

/// A single executable SML statement.
///
/// Implementations own their operands and never hold mutable state; everything an
/// instruction changes lives in the [`Exec`] it is handed.
pub trait Instruction: Debug + Display {
    /// Prefix label naming this instruction, if any.
    fn label(&self) -> Option<&Label>;

    /// Canonical mnemonic, always lowercase.
    fn opcode(&self) -> &'static str;

    /// Label this instruction may jump to.
    fn target(&self) -> Option<&Label> {
        None
    }

    /// Perform one step against the machine. Returning an error faults the run.
    fn execute(&self, exec: &mut Exec<'_>) -> Result<()>;
}

/// Everything an instruction may touch during a single `execute` call.
///
/// Label resolution is only handed to instructions whose [`Instruction::target`]
/// is `Some`; see [`Exec::for_instruction`].
pub struct Exec<'a> {
    pub machine: &'a mut Machine,
    labels: Option<LabelBridge<'a>>,
    output: &'a mut dyn Write,
}

impl<'a> Exec<'a> {
    pub fn new(
        machine: &'a mut Machine,
        labels: Option<LabelBridge<'a>>,
        output: &'a mut dyn Write,
    ) -> Self {
        Exec {
            machine,
            labels,
            output,
        }
    }

    /// Context for executing `ins`, with the bridge only if it declares a jump target.
    pub fn for_instruction(
        ins: &dyn Instruction,
        machine: &'a mut Machine,
        labels: LabelBridge<'a>,
        output: &'a mut dyn Write,
    ) -> Self {
        let labels = ins.target().map(|_| labels);
        Exec::new(machine, labels, output)
    }

    /// Read a register, or pass an immediate through.
    pub fn value(&self, operand: ImmediateOrReg) -> Result<i64> {
        match operand {
            ImmediateOrReg::Reg(reg) => self.machine.register(reg),
            ImmediateOrReg::Imm(val) => Ok(val),
        }
    }

    /// Continue at the instruction named `label`.
    pub fn jump(&mut self, label: &Label) -> Result<()> {
        let Some(labels) = &self.labels else {
            return Err(Fault::LabelAccess(label.clone()));
        };
        let target = labels.resolve(label)?;
        self.machine.set_pc(target)
    }

    /// Write a value as one line to the program output.
    pub fn emit(&mut self, val: i64) -> Result<()> {
        writeln!(self.output, "{val}")
            .and_then(|_| self.output.flush())
            .map_err(|e| Fault::Output(e.to_string()))
    }
}

/// An operand as written in source.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum OperandKind {
    Reg(Register),
    Imm(i64),
    Label(Label),
}

impl OperandKind {
    pub fn describe(&self) -> &'static str {
        match self {
            OperandKind::Reg(_) => "register",
            OperandKind::Imm(_) => "integer literal",
            OperandKind::Label(_) => "label",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Operand {
    pub kind: OperandKind,
    pub span: Span,
}

/// Why a builder refused its operands.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum OperandError {
    /// Statement ended before the expected operand
    Missing { expected: &'static str },
    /// Operand present but of the wrong kind
    Unexpected {
        expected: &'static str,
        found: &'static str,
        span: Span,
    },
}

/// Operands of one statement, consumed front to back by a [`Builder`].
#[derive(Debug)]
pub struct Operands {
    ops: std::vec::IntoIter<Operand>,
}

impl Operands {
    pub fn new(ops: Vec<Operand>) -> Self {
        Operands {
            ops: ops.into_iter(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.ops.len()
    }

    fn next(&mut self, expected: &'static str) -> std::result::Result<Operand, OperandError> {
        self.ops.next().ok_or(OperandError::Missing { expected })
    }

    pub fn reg(&mut self) -> std::result::Result<Register, OperandError> {
        let op = self.next("a register")?;
        match op.kind {
            OperandKind::Reg(reg) => Ok(reg),
            other => Err(OperandError::Unexpected {
                expected: "a register",
                found: other.describe(),
                span: op.span,
            }),
        }
    }

    pub fn value(&mut self) -> std::result::Result<ImmediateOrReg, OperandError> {
        let op = self.next("a register or integer literal")?;
        match op.kind {
            OperandKind::Reg(reg) => Ok(ImmediateOrReg::Reg(reg)),
            OperandKind::Imm(val) => Ok(ImmediateOrReg::Imm(val)),
            other => Err(OperandError::Unexpected {
                expected: "a register or integer literal",
                found: other.describe(),
                span: op.span,
            }),
        }
    }

    pub fn label(&mut self) -> std::result::Result<Label, OperandError> {
        let op = self.next("a label")?;
        match op.kind {
            OperandKind::Label(label) => Ok(label),
            other => Err(OperandError::Unexpected {
                expected: "a label",
                found: other.describe(),
                span: op.span,
            }),
        }
    }

    /// First operand that was not consumed.
    pub fn leftover(mut self) -> Option<Operand> {
        self.ops.next()
    }
}

/// Constructs an instruction from its prefix label and operands.
pub type Builder =
    fn(Option<Label>, &mut Operands) -> std::result::Result<Box<dyn Instruction>, OperandError>;

/// Mnemonic -> builder. New opcodes are added here without touching the machine or runtime.
#[derive(Clone)]
pub struct OpcodeTable {
    map: FxMap<String, Builder>,
}

impl OpcodeTable {
    pub fn empty() -> Self {
        OpcodeTable {
            map: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Arithmetic, data movement, jumps, output and halt.
    pub fn standard() -> Self {
        let mut table = OpcodeTable::empty();
        table.register("add", arith::build_add);
        table.register("sub", arith::build_sub);
        table.register("mul", arith::build_mul);
        table.register("div", arith::build_div);
        table.register("mov", data::build_mov);
        table.register("lin", data::build_mov);
        table.register("load", data::build_load);
        table.register("store", data::build_store);
        table.register("jmp", branch::build_jmp);
        table.register("jz", branch::build_jz);
        table.register("jnz", branch::build_jnz);
        table.register("bnz", branch::build_jnz);
        table.register("jn", branch::build_jn);
        table.register("out", system::build_out);
        table.register("halt", system::build_halt);
        table
    }

    /// Add an opcode, replacing any previous builder for the same mnemonic.
    pub fn register(&mut self, mnemonic: &str, builder: Builder) {
        self.map.insert(mnemonic.to_ascii_lowercase(), builder);
    }

    /// Case-insensitive lookup.
    pub fn get(&self, mnemonic: &str) -> Option<Builder> {
        self.map.get(&mnemonic.to_ascii_lowercase()).copied()
    }

    pub fn mnemonics(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

impl Debug for OpcodeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.mnemonics()).finish()
    }
}

impl Default for OpcodeTable {
    fn default() -> Self {
        OpcodeTable::standard()
    }
}


#[cfg(test)]
mod test {
    use super::{
        test_util::{exec, machine, operands},
        *,
    };
    use crate::labels::LabelTable;

    #[test]
    fn lookup_is_case_insensitive() {
        let table = OpcodeTable::standard();
        assert!(table.get("ADD").is_some());
        assert!(table.get("Halt").is_some());
        assert!(table.get("frobnicate").is_none());
    }

    #[test]
    fn aliases_build_canonical_instructions() {
        let table = OpcodeTable::standard();
        let lin = table.get("lin").unwrap();
        let ins = lin(
            None,
            &mut operands(vec![OperandKind::Reg(Register(1)), OperandKind::Imm(6)]),
        )
        .unwrap();
        assert_eq!(ins.opcode(), "mov");
        assert_eq!(ins.to_string(), "mov r1 6");

        let bnz = table.get("bnz").unwrap();
        let ins = bnz(
            Some("f3".into()),
            &mut operands(vec![
                OperandKind::Reg(Register(2)),
                OperandKind::Label("f0".into()),
            ]),
        )
        .unwrap();
        assert_eq!(ins.opcode(), "jnz");
        assert_eq!(ins.label(), Some(&Label::from("f3")));
        assert_eq!(ins.target(), Some(&Label::from("f0")));
    }

    #[derive(Debug)]
    struct Nop {
        label: Option<Label>,
    }

    impl Display for Nop {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("nop")
        }
    }

    impl Instruction for Nop {
        fn label(&self) -> Option<&Label> {
            self.label.as_ref()
        }

        fn opcode(&self) -> &'static str {
            "nop"
        }

        fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
            exec.machine.advance()
        }
    }

    fn build_nop(
        label: Option<Label>,
        _: &mut Operands,
    ) -> std::result::Result<Box<dyn Instruction>, OperandError> {
        Ok(Box::new(Nop { label }))
    }

    /// Jumps to a fixed label, optionally without reporting it as its target.
    #[derive(Debug)]
    struct Goto {
        dest: Label,
        declared: bool,
    }

    impl Display for Goto {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "goto {}", self.dest)
        }
    }

    impl Instruction for Goto {
        fn label(&self) -> Option<&Label> {
            None
        }

        fn opcode(&self) -> &'static str {
            "goto"
        }

        fn target(&self) -> Option<&Label> {
            self.declared.then_some(&self.dest)
        }

        fn execute(&self, exec: &mut Exec<'_>) -> Result<()> {
            exec.jump(&self.dest)
        }
    }

    #[test]
    fn only_declared_jumps_resolve_labels() {
        let mut labels = LabelTable::new();
        labels.insert("there".into(), 2).unwrap();

        let mut m = machine(3);
        let declared = Goto {
            dest: "there".into(),
            declared: true,
        };
        assert_eq!(exec(&declared, &mut m, &labels).0, Ok(()));
        assert_eq!(m.pc(), 2);

        let mut m = machine(3);
        let undeclared = Goto {
            dest: "there".into(),
            declared: false,
        };
        assert_eq!(
            exec(&undeclared, &mut m, &labels).0,
            Err(Fault::LabelAccess("there".into()))
        );
        assert_eq!(m.pc(), 0);
    }

    #[test]
    fn custom_opcodes_can_be_registered() {
        let mut table = OpcodeTable::standard();
        table.register("NOP", build_nop);
        let nop = table.get("nop").unwrap()(None, &mut operands(vec![])).unwrap();
        assert_eq!(nop.opcode(), "nop");
        assert_eq!(table.mnemonics().last(), Some("nop"));
    }

    #[test]
    fn operand_kind_mismatch_is_reported() {
        let mut ops = operands(vec![OperandKind::Label("x".into())]);
        assert_eq!(
            ops.reg(),
            Err(OperandError::Unexpected {
                expected: "a register",
                found: "label",
                span: Span::dummy(),
            })
        );
        assert_eq!(
            ops.value(),
            Err(OperandError::Missing {
                expected: "a register or integer literal"
            })
        );
    }
}
