//! A scripted EC for tests. Control port reads play back `status` and then
//! repeat `idle` forever; every access is recorded in order.

use std::collections::VecDeque;

use nix::errno::Errno;

use crate::error::{Error, Result};
use crate::port::{PortDevice, PortGrant, PortRange, CONTROL_PORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Acquire(PortRange),
    Read(u16),
    Write(u16, u8),
}

pub struct SimulatedEc {
    status: VecDeque<u8>,
    idle: u8,
    data: u8,
    deny: Option<PortRange>,
    granted: Vec<PortRange>,
    pub log: Vec<Access>,
}

impl SimulatedEc {
    /// Always reports BUSY=0 and IBF=0.
    pub fn responsive() -> Self {
        Self::stuck(0x00)
    }

    /// Every control port read returns `status`.
    pub fn stuck(status: u8) -> Self {
        Self::with_status(Vec::new(), status)
    }

    pub fn with_status(script: impl IntoIterator<Item = u8>, idle: u8) -> Self {
        SimulatedEc {
            status: script.into_iter().collect(),
            idle,
            data: 0x00,
            deny: None,
            granted: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn deny(mut self, range: PortRange) -> Self {
        self.deny = Some(range);
        self
    }

    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.log
            .iter()
            .filter_map(|access| match *access {
                Access::Write(port, value) => Some((port, value)),
                _ => None,
            })
            .collect()
    }

    pub fn reads_of(&self, port: u16) -> usize {
        self.log
            .iter()
            .filter(|access| **access == Access::Read(port))
            .count()
    }

    pub fn port_accesses(&self) -> usize {
        self.log
            .iter()
            .filter(|access| !matches!(access, Access::Acquire(_)))
            .count()
    }

    fn check(&self, port: u16) -> Result<()> {
        if self.granted.iter().any(|range| range.contains(port)) {
            Ok(())
        } else {
            Err(Error::PortNotGranted { port })
        }
    }
}

impl PortDevice for SimulatedEc {
    fn acquire(&mut self, range: PortRange) -> Result<PortGrant> {
        self.log.push(Access::Acquire(range));
        if self.deny == Some(range) {
            return Err(Error::Permission {
                range,
                source: Errno::EPERM,
            });
        }
        self.granted.push(range);
        Ok(PortGrant::new(range))
    }

    fn read(&mut self, port: u16) -> Result<u8> {
        self.check(port)?;
        self.log.push(Access::Read(port));
        if port == CONTROL_PORT {
            Ok(self.status.pop_front().unwrap_or(self.idle))
        } else {
            Ok(self.data)
        }
    }

    fn write(&mut self, port: u16, value: u8) -> Result<()> {
        self.check(port)?;
        self.log.push(Access::Write(port, value));
        Ok(())
    }
}
