//! Bounded busy-wait on a status port.
//!
//! There is no timer here: the wait is bounded by a number of reads, and each
//! read through a [`PortDevice`] is paced by the device itself. With the
//! hardware pause of about a microsecond per read the default budget comes to
//! roughly 10-20ms.

use std::num::NonZeroU32;

use log::trace;

use crate::error::{Error, Result};
use crate::port::PortDevice;

pub const DEFAULT_BUDGET: NonZeroU32 = match NonZeroU32::new(10_000) {
    Some(budget) => budget,
    None => unreachable!(),
};

/// Reads `port` until `value & mask == expected`, at most `budget` times.
///
/// Returns as soon as a read matches, so a condition that already holds costs
/// exactly one read. After `budget` non-matching reads the error carries the
/// last value seen.
pub fn wait_for<D: PortDevice + ?Sized>(
    device: &mut D,
    port: u16,
    mask: u8,
    expected: u8,
    budget: NonZeroU32,
) -> Result<()> {
    debug_assert_eq!(expected & !mask, 0, "expected value lies outside the mask");

    let mut last = 0;
    for attempt in 1..=budget.get() {
        last = device.read(port)?;
        if last & mask == expected {
            trace!(
                "port {:#x} mask {:#04x} settled after {} read(s)",
                port,
                mask,
                attempt
            );
            return Ok(());
        }
    }
    Err(Error::Timeout {
        port,
        mask,
        expected,
        last,
    })
}

/// Waits for every bit in `mask` to read back as zero. This is the only
/// expectation the EC handshake uses.
pub fn wait_until_clear<D: PortDevice + ?Sized>(
    device: &mut D,
    port: u16,
    mask: u8,
    budget: NonZeroU32,
) -> Result<()> {
    wait_for(device, port, mask, 0, budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{BUSY, INPUT_BUFFER_FULL};
    use crate::port::{PortRange, CONTROL_PORT};
    use crate::sim::SimulatedEc;

    fn budget(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn claimed(sim: SimulatedEc) -> SimulatedEc {
        let mut sim = sim;
        sim.acquire(PortRange::CONTROL).unwrap();
        sim
    }

    #[test]
    fn condition_already_holds() {
        let mut sim = claimed(SimulatedEc::responsive());
        wait_until_clear(&mut sim, CONTROL_PORT, BUSY, DEFAULT_BUDGET).unwrap();
        assert_eq!(sim.reads_of(CONTROL_PORT), 1);
    }

    #[test]
    fn settles_on_first_matching_read() {
        let mut sim = claimed(SimulatedEc::with_status([BUSY, BUSY, BUSY], 0x00));
        wait_until_clear(&mut sim, CONTROL_PORT, BUSY, DEFAULT_BUDGET).unwrap();
        assert_eq!(sim.reads_of(CONTROL_PORT), 4);
    }

    #[test]
    fn unrelated_bits_are_masked_off() {
        let mut sim = claimed(SimulatedEc::with_status([INPUT_BUFFER_FULL | 0x01], 0x00));
        wait_until_clear(&mut sim, CONTROL_PORT, BUSY, DEFAULT_BUDGET).unwrap();
        assert_eq!(sim.reads_of(CONTROL_PORT), 1);
    }

    #[test]
    fn times_out_after_exactly_budget_reads() {
        let mut sim = claimed(SimulatedEc::stuck(BUSY | 0x01));
        let err = wait_until_clear(&mut sim, CONTROL_PORT, BUSY, budget(25)).unwrap_err();
        assert_eq!(sim.reads_of(CONTROL_PORT), 25);
        match err {
            Error::Timeout {
                port,
                mask,
                expected,
                last,
            } => {
                assert_eq!(port, CONTROL_PORT);
                assert_eq!(mask, BUSY);
                assert_eq!(expected, 0);
                assert_eq!(last, BUSY | 0x01);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn default_budget_is_ten_thousand_reads() {
        let mut sim = claimed(SimulatedEc::stuck(INPUT_BUFFER_FULL));
        let err = wait_until_clear(&mut sim, CONTROL_PORT, INPUT_BUFFER_FULL, DEFAULT_BUDGET)
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(sim.reads_of(CONTROL_PORT), 10_000);
    }

    #[test]
    fn match_on_last_allowed_read_succeeds() {
        let mut sim = claimed(SimulatedEc::with_status([BUSY; 4], 0x00));
        wait_until_clear(&mut sim, CONTROL_PORT, BUSY, budget(5)).unwrap();
        assert_eq!(sim.reads_of(CONTROL_PORT), 5);
    }

    #[test]
    fn waits_for_nonzero_expectation() {
        let mut sim = claimed(SimulatedEc::with_status([0x00, 0x00], 0x81));
        wait_for(&mut sim, CONTROL_PORT, 0x01, 0x01, budget(10)).unwrap();
        assert_eq!(sim.reads_of(CONTROL_PORT), 3);
    }

    #[test]
    fn read_errors_propagate() {
        let mut sim = SimulatedEc::responsive();
        let err = wait_until_clear(&mut sim, CONTROL_PORT, BUSY, budget(3)).unwrap_err();
        assert!(matches!(err, Error::PortNotGranted { port: CONTROL_PORT }));
        assert_eq!(sim.port_accesses(), 0);
    }
}
