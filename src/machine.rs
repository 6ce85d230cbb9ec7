use std::fmt::{self, Display};

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::{
    env::Config,
    error::{Fault, Result},
    symbol::{FxMap, Register},
};

/// Default amount of general purpose registers.
pub const DEFAULT_REGISTERS: usize = 32;

/// One register per id that source can name.
pub const MAX_REGISTERS: usize = Register::MAX_ID + 1;

/// Where the machine is in its lifecycle. `Halted` and `Faulted` are terminal.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Status {
    Running,
    Halted,
    Faulted(Fault),
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Running => f.write_str("running"),
            Status::Halted => f.write_str("halted"),
            Status::Faulted(fault) => write!(f, "faulted: {fault}"),
        }
    }
}

/// Represents complete program state during runtime.
#[derive(Clone, Debug)]
pub struct Machine {
    /// General purpose registers, all zero at start
    reg: Vec<i64>,
    /// Sparse memory, cells are created on first write
    mem: FxMap<i64, i64>,
    /// Index of the next instruction to execute
    pc: usize,
    /// Length of the program being run, `pc == program_len` is natural termination
    program_len: usize,
    status: Status,
    /// Instructions executed so far
    steps: u64,
    /// Fail reads from cells that were never written instead of returning zero
    strict_memory: bool,
}

impl Machine {
    /// Register counts above [`MAX_REGISTERS`] are clamped, see [`Config::validate`].
    pub fn new(config: &Config) -> Self {
        Machine {
            reg: vec![0; config.registers.min(MAX_REGISTERS)],
            mem: IndexMap::with_hasher(FxBuildHasher::default()),
            pc: 0,
            program_len: 0,
            status: Status::Running,
            steps: 0,
            strict_memory: config.strict_memory,
        }
    }

    /// Prepare the machine to run a program of `len` instructions.
    pub(crate) fn bind_program(&mut self, len: usize) {
        self.program_len = len;
    }

    pub(crate) fn count_step(&mut self) {
        self.steps += 1;
    }

    /// Amount of instructions executed on this machine.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn register(&self, reg: Register) -> Result<i64> {
        self.reg
            .get(reg.index())
            .copied()
            .ok_or(Fault::InvalidRegister {
                id: reg.index(),
                count: self.reg.len(),
            })
    }

    pub fn set_register(&mut self, reg: Register, val: i64) -> Result<()> {
        let count = self.reg.len();
        let slot = self.reg.get_mut(reg.index()).ok_or(Fault::InvalidRegister {
            id: reg.index(),
            count,
        })?;
        *slot = val;
        Ok(())
    }

    pub fn registers(&self) -> &[i64] {
        &self.reg
    }

    pub fn memory(&self, addr: i64) -> Result<i64> {
        match self.mem.get(&addr) {
            Some(val) => Ok(*val),
            None if self.strict_memory => Err(Fault::InvalidAddress(addr)),
            None => Ok(0),
        }
    }

    pub fn set_memory(&mut self, addr: i64, val: i64) {
        self.mem.insert(addr, val);
    }

    /// Written memory cells in the order they were first written.
    pub fn memory_cells(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.mem.iter().map(|(addr, val)| (*addr, *val))
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Move to `target`. One past the last instruction is allowed and ends the run.
    pub fn set_pc(&mut self, target: usize) -> Result<()> {
        if target > self.program_len {
            return Err(Fault::InvalidJumpTarget {
                target,
                len: self.program_len,
            });
        }
        self.pc = target;
        Ok(())
    }

    /// Continue with the next instruction in sequence.
    pub fn advance(&mut self) -> Result<()> {
        self.set_pc(self.pc + 1)
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn halt(&mut self) {
        if self.is_running() {
            self.status = Status::Halted;
        }
    }

    pub fn fault(&mut self, reason: Fault) {
        if self.is_running() {
            self.status = Status::Faulted(reason);
        }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new(&Config::default())
    }
}
