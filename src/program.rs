use std::fmt::{self, Display};

use crate::{
    error::Result,
    ins::Instruction,
    labels::{LabelBridge, LabelTable},
    symbol::Label,
};

/// Ordered instruction sequence with the label table built from it.
#[derive(Debug)]
pub struct Program {
    ins: Vec<Box<dyn Instruction>>,
    labels: LabelTable,
}

impl Program {
    /// Record every prefix label. Fails on the second definition of a label.
    pub fn new(ins: Vec<Box<dyn Instruction>>) -> Result<Self> {
        let mut labels = LabelTable::new();
        for (idx, stmt) in ins.iter().enumerate() {
            if let Some(label) = stmt.label() {
                labels.insert(label.clone(), idx)?;
            }
        }
        Ok(Program { ins, labels })
    }

    pub fn get(&self, idx: usize) -> Option<&dyn Instruction> {
        match self.ins.get(idx) {
            Some(stmt) => Some(stmt.as_ref()),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.ins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn Instruction + 'static)> {
        self.ins.iter().map(Box::as_ref)
    }

    pub fn labels(&self) -> LabelBridge<'_> {
        LabelBridge::new(&self.labels)
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Jump targets that no instruction defines, with the index of the referencing instruction.
    pub fn unresolved(&self) -> Vec<(usize, &Label)> {
        let bridge = self.labels();
        self.iter()
            .enumerate()
            .filter_map(|(idx, stmt)| stmt.target().map(|target| (idx, target)))
            .filter(|(_, target)| bridge.resolve(target).is_err())
            .collect()
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.len().saturating_sub(1).to_string().len();
        for (idx, stmt) in self.iter().enumerate() {
            let label = stmt
                .label()
                .map(|label| format!("{label}:"))
                .unwrap_or_default();
            writeln!(f, "{idx:>width$}  {label:<8} {stmt}")?;
        }
        Ok(())
    }
}
