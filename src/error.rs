use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

use crate::ec::Session;
use crate::port::PortRange;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// `ioperm` refused the range, usually for lack of privilege.
    #[error("unable to get access to ports {range}: {source}")]
    Permission {
        range: PortRange,
        #[source]
        source: Errno,
    },

    #[error("raw port I/O is not supported on this platform")]
    Unsupported,

    #[error("port {port:#x} was accessed before its range was acquired")]
    PortNotGranted { port: u16 },

    #[error(
        "timeout waiting for mask {mask:#04x} to read {expected:#04x} on port {port:#x} \
         (last value {last:#04x})"
    )]
    Timeout {
        port: u16,
        mask: u8,
        expected: u8,
        last: u8,
    },

    #[error("cannot {op} while the EC session is {state:?}")]
    InvalidState { op: &'static str, state: Session },

    #[error("failed to read {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("poll_budget must be between 1 and {max}, got {value}")]
    BudgetOutOfRange { value: u32, max: u32 },
}

impl Error {
    /// True for the errors that mean raw port access could not be obtained.
    /// No EC interaction happens after one of these.
    pub fn is_permission(&self) -> bool {
        matches!(self, Error::Permission { .. } | Error::Unsupported)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
