use std::io::Write;

use log::{debug, trace, warn};

use crate::{
    error::{Fault, RuntimeFault},
    ins::Exec,
    machine::{Machine, Status},
    program::Program,
};

/// What a single fetch-execute cycle did.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum StepResult {
    /// An instruction ran and the machine is still running
    Executed,
    /// The machine is halted, either just now or before this step
    Halted,
    /// Execution ran past the last instruction
    Finished,
    /// The machine is faulted, either just now or before this step
    Faulted(Fault),
}

/// Fetch the instruction at the program counter and execute it.
///
/// Once the machine is halted or faulted this does nothing and reports the terminal state.
pub fn step(program: &Program, machine: &mut Machine, output: &mut dyn Write) -> StepResult {
    match machine.status() {
        Status::Running => {}
        Status::Halted => return StepResult::Halted,
        Status::Faulted(fault) => return StepResult::Faulted(fault.clone()),
    }
    machine.bind_program(program.len());

    let pc = machine.pc();
    let Some(stmt) = program.get(pc) else {
        if pc == program.len() {
            machine.halt();
            return StepResult::Finished;
        }
        let fault = Fault::InvalidJumpTarget {
            target: pc,
            len: program.len(),
        };
        machine.fault(fault.clone());
        return StepResult::Faulted(fault);
    };

    trace!("{pc:>4}: {stmt}");
    let res = {
        let mut exec = Exec::for_instruction(stmt, machine, program.labels(), output);
        stmt.execute(&mut exec)
    };
    machine.count_step();

    match res {
        Err(fault) => {
            debug!("instruction {pc} ({}) faulted: {fault}", stmt.opcode());
            machine.fault(fault.clone());
            StepResult::Faulted(fault)
        }
        Ok(()) if !machine.is_running() => StepResult::Halted,
        Ok(()) if machine.pc() == program.len() => {
            machine.halt();
            StepResult::Finished
        }
        Ok(()) => StepResult::Executed,
    }
}

/// Run `program` on `machine` until it halts, runs off the end or faults.
///
/// With a `step_limit`, executing more than that many instructions faults with
/// [`Fault::StepLimitExceeded`].
pub fn run(
    program: &Program,
    mut machine: Machine,
    output: &mut dyn Write,
    step_limit: Option<u64>,
) -> Result<Machine, RuntimeFault> {
    debug!(
        "running {} instructions with {} labels",
        program.len(),
        program.label_count()
    );

    loop {
        if let Some(limit) = step_limit {
            if machine.is_running() && machine.steps() >= limit {
                warn!("stopping at pc {} after {limit} steps", machine.pc());
                let fault = Fault::StepLimitExceeded(limit);
                machine.fault(fault.clone());
                return Err(RuntimeFault { fault, machine });
            }
        }

        match step(program, &mut machine, output) {
            StepResult::Executed => continue,
            StepResult::Halted | StepResult::Finished => break,
            StepResult::Faulted(fault) => return Err(RuntimeFault { fault, machine }),
        }
    }

    debug!(
        "{} after {} steps at pc {}",
        machine.status(),
        machine.steps(),
        machine.pc()
    );
    Ok(machine)
}
