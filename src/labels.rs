use fxhash::FxBuildHasher;
use indexmap::{map::Entry, IndexMap};

use crate::{
    error::{Fault, Result},
    symbol::{FxMap, Label},
};

/// Label name -> instruction index, built once while loading a program.
///
/// Reading the table is only possible through a [`LabelBridge`].
#[derive(Clone, Default, Debug)]
pub struct LabelTable {
    map: FxMap<Label, usize>,
}

impl LabelTable {
    pub fn new() -> Self {
        LabelTable {
            map: IndexMap::with_hasher(FxBuildHasher::default()),
        }
    }

    /// Record `label` as naming the instruction at `index`.
    pub fn insert(&mut self, label: Label, index: usize) -> Result<()> {
        match self.map.entry(label) {
            Entry::Occupied(entry) => Err(Fault::DuplicateLabel {
                label: entry.key().clone(),
                first: *entry.get(),
                second: index,
            }),
            Entry::Vacant(entry) => {
                entry.insert(index);
                Ok(())
            }
        }
    }

    fn lookup(&self, label: &Label) -> Result<usize> {
        self.map
            .get(label)
            .copied()
            .ok_or_else(|| Fault::UnknownLabel(label.clone()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Read-only view of a [`LabelTable`] handed to instructions during a run.
#[derive(Clone, Copy, Debug)]
pub struct LabelBridge<'a> {
    table: &'a LabelTable,
}

impl<'a> LabelBridge<'a> {
    pub fn new(table: &'a LabelTable) -> Self {
        LabelBridge { table }
    }

    /// Index of the instruction named `label`.
    pub fn resolve(&self, label: &Label) -> Result<usize> {
        self.table.lookup(label)
    }
}
