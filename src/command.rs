//! Command and data bytes understood by the EC, and the status bits it
//! reports on the control port.

use std::fmt;

/// EC is in the middle of an internal operation.
pub const BUSY: u8 = 0x80;
/// EC has not consumed the last byte written to it.
pub const INPUT_BUFFER_FULL: u8 = 0x02;

/// Command bytes, written to the control port.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TakeOverFanControl = 0x59,
    ClearBusy = 0xFF,
}

impl From<Command> for u8 {
    fn from(command: Command) -> u8 {
        command as u8
    }
}

/// Data bytes for [`Command::TakeOverFanControl`], written to the data port.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanSetting {
    Max = 0x77,
    Normal = 0x76,
}

impl From<FanSetting> for u8 {
    fn from(setting: FanSetting) -> u8 {
        setting as u8
    }
}

impl fmt::Display for FanSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanSetting::Max => f.write_str("max"),
            FanSetting::Normal => f.write_str("normal"),
        }
    }
}
