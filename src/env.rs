use std::{ffi::OsStr, str::FromStr};

use log::warn;

use crate::{
    error::{Fault, Result},
    machine::{DEFAULT_REGISTERS, MAX_REGISTERS},
};

/// Settings for a single run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Config {
    /// Amount of registers the machine is built with
    pub registers: usize,
    /// Reading memory that was never written is a fault instead of zero
    pub strict_memory: bool,
    /// Maximum amount of executed instructions, unlimited if `None`
    pub step_limit: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            registers: DEFAULT_REGISTERS,
            strict_memory: false,
            step_limit: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `SML_REGISTERS`, `SML_STRICT_MEMORY` and `SML_STEP_LIMIT`.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        if let Some(registers) = var_parse::<usize>("SML_REGISTERS") {
            if registers <= MAX_REGISTERS {
                config.registers = registers;
            } else {
                warn!("ignoring SML_REGISTERS={registers}: at most {MAX_REGISTERS} are supported");
            }
        }
        if var_is("SML_STRICT_MEMORY", "1") {
            config.strict_memory = true;
        }
        if let Some(limit) = var_parse("SML_STEP_LIMIT") {
            config.step_limit = Some(limit);
        }
        config
    }

    /// Reject settings a machine cannot be built with.
    pub fn validate(&self) -> Result<()> {
        if self.registers > MAX_REGISTERS {
            return Err(Fault::TooManyRegisters {
                count: self.registers,
                max: MAX_REGISTERS,
            });
        }
        Ok(())
    }
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

fn var_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(val) => Some(val),
        Err(_) => {
            warn!("ignoring {name}={raw:?}: not a valid number");
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.registers, 32);
        assert!(!config.strict_memory);
        assert_eq!(config.step_limit, None);
    }

    #[test]
    fn register_count_is_bounded() {
        let mut config = Config {
            registers: MAX_REGISTERS,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        config.registers += 1;
        assert_eq!(
            config.validate(),
            Err(Fault::TooManyRegisters {
                count: MAX_REGISTERS + 1,
                max: MAX_REGISTERS,
            })
        );
    }

    #[test]
    fn unset_variable_does_not_parse() {
        assert_eq!(var_parse::<u64>("SML_TEST_SURELY_UNSET_VARIABLE"), None);
        assert!(!var_is("SML_TEST_SURELY_UNSET_VARIABLE", "1"));
    }
}
