//! Fan control for embedded controllers that speak the 0x6C/0x68 mailbox
//! protocol.
//!
//! The EC is claimed, handed a single "take over fan control" command with a
//! fan setting, and released again. All hardware access goes through
//! [`port::PortDevice`] so the handshake can run against a simulated EC.

pub mod cli;
pub mod command;
pub mod config;
pub mod ec;
pub mod error;
pub mod poll;
pub mod port;

#[cfg(test)]
pub(crate) mod sim;

pub use command::{Command, FanSetting};
pub use ec::{set_fan, Controller, Session};
pub use error::{Error, Result};
pub use port::{HardwarePorts, PortDevice};
