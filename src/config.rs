use std::fs::read_to_string;
use std::io::ErrorKind;
use std::num::NonZeroU32;
use std::path::Path;

use log::LevelFilter;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::poll::DEFAULT_BUDGET;

pub const CONFIG_FILE: &str = "/etc/fc/config.toml";
pub const MAX_POLL_BUDGET: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> LevelFilter {
        match level {
            Level::Error => LevelFilter::Error,
            Level::Warn => LevelFilter::Warn,
            Level::Info => LevelFilter::Info,
            Level::Debug => LevelFilter::Debug,
            Level::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Controller {
    pub poll_budget: NonZeroU32, // reads per wait, not a duration
}

impl Default for Controller {
    fn default() -> Self {
        Controller {
            poll_budget: DEFAULT_BUDGET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Log {
    pub level: Level,
}

impl Default for Log {
    fn default() -> Self {
        Log { level: Level::Info }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub controller: Controller,
    pub log: Log,
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let toml_str = match read_to_string(path) {
            Ok(toml_str) => toml_str,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&toml_str).map_err(|err| match err {
            ParseError::Toml(source) => Error::Config {
                path: path.to_path_buf(),
                source,
            },
            ParseError::Invalid(err) => err,
        })
    }

    fn parse(toml_str: &str) -> std::result::Result<Config, ParseError> {
        let config: Config = toml::from_str(toml_str).map_err(ParseError::Toml)?;
        let budget = config.controller.poll_budget.get();
        if budget > MAX_POLL_BUDGET {
            return Err(ParseError::Invalid(Error::BudgetOutOfRange {
                value: budget,
                max: MAX_POLL_BUDGET,
            }));
        }
        Ok(config)
    }
}

#[derive(Debug)]
enum ParseError {
    Toml(toml::de::Error),
    Invalid(Error),
}
