use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::warn;
use miette::{IntoDiagnostic, Report, Result};

use sml::env::Config;
use sml::{Machine, Program, RuntimeFault};

/// sml assembles and interprets programs written in the Simple Machine Language.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.sml` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a `.sml` file and print its output to the terminal
    Run {
        /// `.sml` file to run
        name: PathBuf,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Check a `.sml` file without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Print the assembled instructions of a `.sml` file
    List {
        /// File to list
        name: PathBuf,
    },
}

#[derive(clap::Args, Default)]
struct RunOpts {
    /// Amount of registers the machine has [env: SML_REGISTERS] [default: 32]
    #[arg(long)]
    registers: Option<usize>,
    /// Fault when reading memory that was never written [env: SML_STRICT_MEMORY=1]
    #[arg(long)]
    strict_memory: bool,
    /// Fault after executing this many instructions [env: SML_STEP_LIMIT]
    #[arg(long)]
    step_limit: Option<u64>,
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
}

impl RunOpts {
    /// Flags take precedence over the environment.
    fn config(&self) -> Result<Config> {
        let mut config = Config::from_env();
        if let Some(registers) = self.registers {
            config.registers = registers;
        }
        if self.strict_memory {
            config.strict_memory = true;
        }
        if self.step_limit.is_some() {
            config.step_limit = self.step_limit;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    env_logger::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(sml::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    match args.command {
        Some(Command::Run { name, opts }) => run(&name, &opts),
        Some(Command::Check { name }) => {
            file_message(Green, "Checking", &name);
            let program = assemble(&name)?;
            let unresolved = program.unresolved();
            for (idx, label) in &unresolved {
                let msg = format!("instruction {idx} jumps to undefined label `{label}`");
                warn!("{msg}");
                message(Red, "Warning", &msg);
            }
            if unresolved.is_empty() {
                message(Green, "Success", "no errors found!");
            }
            Ok(())
        }
        Some(Command::List { name }) => {
            let program = assemble(&name)?;
            print!("{program}");
            Ok(())
        }
        None => match args.path {
            Some(path) => run(&path, &RunOpts::default()),
            None => {
                println!("\n~ sml v{VERSION} ~");
                println!("{SHORT_INFO}");
                Ok(())
            }
        },
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &Path, opts: &RunOpts) -> Result<()> {
    let config = opts.config()?;
    if !opts.minimal {
        file_message(MsgColor::Green, "Assembling", name);
    }
    let program = assemble(name)?;

    if !opts.minimal {
        message(
            MsgColor::Green,
            "Running",
            &format!("{} instructions", program.len()),
        );
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let res = sml::run(&program, Machine::new(&config), &mut out, config.step_limit);
    drop(out);

    match res {
        Ok(machine) => {
            if !opts.minimal {
                message(
                    MsgColor::Cyan,
                    "Halted",
                    &format!("after {} steps", machine.steps()),
                );
                print_state(&machine);
            }
            Ok(())
        }
        Err(RuntimeFault { fault, machine }) => {
            if !opts.minimal {
                message(
                    MsgColor::Red,
                    "Faulted",
                    &format!("after {} steps", machine.steps()),
                );
                print_state(&machine);
            }
            Err(describe_fault(fault, &machine, &program))
        }
    }
}

/// Return assembled program of source file for further processing
fn assemble(name: &Path) -> Result<Program> {
    let contents = fs::read_to_string(name).into_diagnostic()?;
    sml::assemble(&contents)
}

fn describe_fault(fault: sml::Fault, machine: &Machine, program: &Program) -> Report {
    let pc = machine.pc();
    let report = Report::new(fault);
    match program.get(pc) {
        Some(stmt) => report.wrap_err(format!("Run faulted at instruction {pc} `{stmt}`")),
        None => report.wrap_err(format!("Run faulted at instruction {pc}")),
    }
}

/// Print registers and memory cells holding non-zero values.
fn print_state(machine: &Machine) {
    println!("\n------ Registers ------");
    for (i, reg) in machine.registers().iter().enumerate() {
        if *reg != 0 {
            println!("r{i:<5}{reg:.>17}");
        }
    }
    let cells: Vec<_> = machine.memory_cells().filter(|(_, val)| *val != 0).collect();
    if !cells.is_empty() {
        println!("------- Memory --------");
        for (addr, val) in cells {
            println!("{addr:<6}{val:.>16}");
        }
    }
    println!("-----------------------");
}

const SHORT_INFO: &str = r"
Welcome to sml, an assembler and interpreter for the Simple Machine Language.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
