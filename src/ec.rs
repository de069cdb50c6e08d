//! The EC mailbox handshake.
//!
//! The EC is a two-register mailbox. BUSY on the control port means no new
//! transaction may start; IBF means the previous byte has not been consumed
//! and nothing may be written yet. A transaction is:
//!
//! 1. [`Controller::intro`]: acquire the ports, wait for BUSY to clear.
//! 2. [`Controller::send_command`]: command byte to the control port, data
//!    byte to the data port, each after IBF clears.
//! 3. [`Controller::outro`]: wait for IBF, write [`Command::ClearBusy`].
//!
//! Nothing is read back. Success means every byte was accepted before its
//! poll ran out.

use std::num::NonZeroU32;

use log::{debug, error, info};

use crate::command::{Command, FanSetting, BUSY, INPUT_BUFFER_FULL};
use crate::error::{Error, Result};
use crate::poll::{wait_until_clear, DEFAULT_BUDGET};
use crate::port::{PortDevice, PortGrant, PortRange, CONTROL_PORT, DATA_PORT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Uninitialized,
    Claimed,
    CommandSent,
    Released,
    Failed,
}

pub struct Controller<D: PortDevice> {
    device: D,
    budget: NonZeroU32,
    session: Session,
    grants: Vec<PortGrant>,
}

impl<D: PortDevice> Controller<D> {
    pub fn new(device: D) -> Self {
        Self::with_budget(device, DEFAULT_BUDGET)
    }

    pub fn with_budget(device: D, budget: NonZeroU32) -> Self {
        Controller {
            device,
            budget,
            session: Session::Uninitialized,
            grants: Vec::new(),
        }
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Both EC ranges have been granted, so the outro writes are possible.
    fn ports_held(&self) -> bool {
        [PortRange::CONTROL, PortRange::DATA]
            .iter()
            .all(|range| self.grants.iter().any(|grant| grant.range() == *range))
    }

    fn fail(&mut self, err: Error) -> Error {
        self.session = Session::Failed;
        err
    }

    /// Claims the EC. On failure the session is `Failed` and nothing has
    /// been written.
    pub fn intro(&mut self) -> Result<()> {
        if self.session != Session::Uninitialized {
            return Err(Error::InvalidState {
                op: "run the intro sequence",
                state: self.session,
            });
        }

        for range in [PortRange::CONTROL, PortRange::DATA] {
            match self.device.acquire(range) {
                Ok(grant) => self.grants.push(grant),
                Err(err) => return Err(self.fail(err)),
            }
        }

        debug!("waiting for EC to leave busy state");
        if let Err(err) = wait_until_clear(&mut self.device, CONTROL_PORT, BUSY, self.budget) {
            return Err(self.fail(err));
        }
        // drain any stale output byte
        if let Err(err) = self.device.read(DATA_PORT) {
            return Err(self.fail(err));
        }

        self.session = Session::Claimed;
        Ok(())
    }

    /// Delivers `command` followed by its `data` byte.
    pub fn send_command(&mut self, command: Command, data: u8) -> Result<()> {
        if self.session != Session::Claimed {
            return Err(Error::InvalidState {
                op: "send a command",
                state: self.session,
            });
        }

        debug!("sending command {:#04x} with data {:#04x}", u8::from(command), data);
        match self.deliver(command, data) {
            Ok(()) => {
                self.session = Session::CommandSent;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn deliver(&mut self, command: Command, data: u8) -> Result<()> {
        wait_until_clear(&mut self.device, CONTROL_PORT, INPUT_BUFFER_FULL, self.budget)?;
        self.device.write(CONTROL_PORT, command.into())?;
        wait_until_clear(&mut self.device, CONTROL_PORT, INPUT_BUFFER_FULL, self.budget)?;
        self.device.write(DATA_PORT, data)
    }

    /// Releases the EC. Runs once per session, after a successful or failed
    /// command alike; the session ends up `Released` even if the release
    /// itself times out.
    pub fn outro(&mut self) -> Result<()> {
        let releasable = match self.session {
            Session::Claimed | Session::CommandSent => true,
            Session::Failed => self.ports_held(),
            Session::Uninitialized | Session::Released => false,
        };
        if !releasable {
            return Err(Error::InvalidState {
                op: "run the outro sequence",
                state: self.session,
            });
        }

        self.session = Session::Released;
        debug!("releasing EC");
        self.device.read(DATA_PORT)?;
        wait_until_clear(&mut self.device, CONTROL_PORT, INPUT_BUFFER_FULL, self.budget)?;
        self.device.write(CONTROL_PORT, Command::ClearBusy.into())
    }
}

/// Runs a whole transaction that hands `setting` to the EC.
///
/// The outro runs on every path that got past port acquisition, whether the
/// intro or the command failed. The first error wins; a cleanup failure after
/// an earlier error is only logged.
pub fn set_fan<D: PortDevice>(device: D, setting: FanSetting, budget: NonZeroU32) -> Result<()> {
    let mut ec = Controller::with_budget(device, budget);

    if let Err(err) = ec.intro() {
        if err.is_permission() {
            return Err(err);
        }
        error!("Unable to perform intro sequence: {}. Cleaning up", err);
        if let Err(cleanup) = ec.outro() {
            error!("Outro sequence failed: {}", cleanup);
        }
        return Err(err);
    }

    let sent = ec.send_command(Command::TakeOverFanControl, setting.into());
    if let Err(err) = &sent {
        error!("Unable to send fan command: {}. Cleaning up", err);
    }
    let released = ec.outro();

    match (sent, released) {
        (Ok(()), Ok(())) => {
            info!("fan set to {}", setting);
            Ok(())
        }
        (Err(err), Ok(())) => Err(err),
        (Ok(()), Err(err)) => Err(err),
        (Err(err), Err(cleanup)) => {
            error!("Outro sequence failed: {}", cleanup);
            Err(err)
        }
    }
}
