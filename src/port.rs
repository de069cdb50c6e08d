//! Raw I/O port access.
//!
//! [`PortDevice`] is the only way the rest of the crate touches hardware.
//! [`HardwarePorts`] backs it with `ioperm(2)` and `in`/`out` instructions;
//! tests substitute a scripted EC.

use std::fmt;
use std::marker::PhantomData;

use log::debug;

use crate::error::{Error, Result};

/// Status register on read, command register on write.
pub const CONTROL_PORT: u16 = 0x6C;
/// Data register.
pub const DATA_PORT: u16 = 0x68;
/// POST diagnostic port. Writing to it costs roughly a microsecond and has no
/// other effect, which makes it the conventional pause after a port read.
pub const PAUSE_PORT: u16 = 0x80;

/// A contiguous run of I/O ports, `len` ports starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub len: u16,
}

impl PortRange {
    pub const CONTROL: PortRange = PortRange::single(CONTROL_PORT);
    pub const DATA: PortRange = PortRange::single(DATA_PORT);
    pub const PAUSE: PortRange = PortRange::single(PAUSE_PORT);

    pub const fn single(port: u16) -> Self {
        PortRange {
            start: port,
            len: 1,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && u32::from(port) < u32::from(self.start) + u32::from(self.len)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len == 1 {
            write!(f, "{:#x}", self.start)
        } else {
            write!(
                f,
                "{:#x}-{:#x}",
                self.start,
                u32::from(self.start) + u32::from(self.len) - 1
            )
        }
    }
}

/// Proof that a range was acquired. Permission is held until the process
/// exits, so dropping the grant does not give it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortGrant {
    range: PortRange,
}

impl PortGrant {
    pub fn new(range: PortRange) -> Self {
        PortGrant { range }
    }

    pub fn range(&self) -> PortRange {
        self.range
    }
}

/// Byte-wide access to the I/O port space.
pub trait PortDevice {
    /// Request permission for raw access to `range`. Must succeed before any
    /// read or write inside the range.
    fn acquire(&mut self, range: PortRange) -> Result<PortGrant>;

    /// Read one byte. Implementations pause briefly after the read so the
    /// port is never sampled faster than the EC can update it.
    fn read(&mut self, port: u16) -> Result<u8>;

    fn write(&mut self, port: u16, value: u8) -> Result<()>;
}

impl<D: PortDevice + ?Sized> PortDevice for &mut D {
    fn acquire(&mut self, range: PortRange) -> Result<PortGrant> {
        (**self).acquire(range)
    }

    fn read(&mut self, port: u16) -> Result<u8> {
        (**self).read(port)
    }

    fn write(&mut self, port: u16, value: u8) -> Result<()> {
        (**self).write(port, value)
    }
}

/// The machine's real I/O ports.
pub struct HardwarePorts {
    granted: Vec<PortRange>,
    // ioperm grants are per thread
    non_send: PhantomData<*const ()>,
}

impl HardwarePorts {
    /// Acquires the pause port used for paced reads. The EC ranges are left
    /// for the caller to acquire.
    pub fn new() -> Result<Self> {
        let mut ports = HardwarePorts {
            granted: Vec::new(),
            non_send: PhantomData,
        };
        ports.acquire(PortRange::PAUSE)?;
        Ok(ports)
    }

    fn check(&self, port: u16) -> Result<()> {
        if self.granted.iter().any(|range| range.contains(port)) {
            Ok(())
        } else {
            Err(Error::PortNotGranted { port })
        }
    }
}

impl PortDevice for HardwarePorts {
    fn acquire(&mut self, range: PortRange) -> Result<PortGrant> {
        raw::ioperm(range)?;
        debug!("acquired ports {}", range);
        self.granted.push(range);
        Ok(PortGrant::new(range))
    }

    fn read(&mut self, port: u16) -> Result<u8> {
        self.check(port)?;
        self.check(PAUSE_PORT)?;
        // SAFETY: both ports are inside ranges granted by ioperm.
        let value = unsafe { raw::inb(port) };
        unsafe { raw::outb(PAUSE_PORT, value) };
        Ok(value)
    }

    fn write(&mut self, port: u16, value: u8) -> Result<()> {
        self.check(port)?;
        // SAFETY: the port is inside a range granted by ioperm.
        unsafe { raw::outb(port, value) };
        Ok(())
    }
}

#[cfg(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64")))]
mod raw {
    use std::arch::asm;

    use nix::errno::Errno;
    use nix::libc;

    use super::PortRange;
    use crate::error::{Error, Result};

    pub fn ioperm(range: PortRange) -> Result<()> {
        let ret = unsafe {
            libc::ioperm(
                libc::c_ulong::from(range.start),
                libc::c_ulong::from(range.len),
                1,
            )
        };
        Errno::result(ret)
            .map(drop)
            .map_err(|source| Error::Permission { range, source })
    }

    pub unsafe fn inb(port: u16) -> u8 {
        let value: u8;
        asm!(
            "in al, dx",
            in("dx") port,
            out("al") value,
            options(nomem, nostack, preserves_flags),
        );
        value
    }

    pub unsafe fn outb(port: u16, value: u8) {
        asm!(
            "out dx, al",
            in("dx") port,
            in("al") value,
            options(nomem, nostack, preserves_flags),
        );
    }
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86", target_arch = "x86_64"))))]
mod raw {
    use super::PortRange;
    use crate::error::{Error, Result};

    pub fn ioperm(_range: PortRange) -> Result<()> {
        Err(Error::Unsupported)
    }

    // Unreachable: no range is ever granted here, so `check` fails first.
    pub unsafe fn inb(_port: u16) -> u8 {
        unreachable!("raw port I/O is not supported on this platform")
    }

    pub unsafe fn outb(_port: u16, _value: u8) {
        unreachable!("raw port I/O is not supported on this platform")
    }
}
