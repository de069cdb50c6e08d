use thiserror::Error;

use crate::command::FanSetting;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Set(FanSetting),
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("No arguments supplied (-h for usage)")]
    Missing,
    #[error("Invalid arguments!")]
    Invalid(String),
}

/// Parses the arguments following the program name. Only the first one is
/// looked at.
pub fn parse<I, S>(args: I) -> Result<Action, UsageError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let first = args.into_iter().next().ok_or(UsageError::Missing)?;
    match first.as_ref() {
        "-m" | "-M" => Ok(Action::Set(FanSetting::Max)),
        "-n" | "-N" => Ok(Action::Set(FanSetting::Normal)),
        "-h" => Ok(Action::Help),
        other => Err(UsageError::Invalid(other.to_string())),
    }
}

pub fn usage(progname: &str) -> String {
    format!(
        "Usage: {progname} [options]\n\
         Options:\n \
         -m\tSet fan to max setting\n \
         -n\tSet fan to normal setting\n \
         -h\tPrint this help message\n"
    )
}
