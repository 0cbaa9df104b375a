//! Helicity window timing
//!
//! In the line sync modes the window period is fixed by the mode and the
//! stable time is whatever remains after the settle time. In free clock mode
//! both times come from the lookup tables and the frequency follows from
//! their sum.

use crate::bus::BusPort;
use crate::device::HelicityGenerator;
use crate::error::Result;
use heli_chip::tables::{TSETTLE_USEC, TSTABLE_USEC};
use heli_chip::{ClockMode, RegisterField};

const USEC_PER_SEC: f64 = 1_000_000.0;

/// Derived helicity window timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    /// Clock mode the timing was derived for
    pub mode: ClockMode,
    /// Settle time (µs)
    pub settle_usec: f64,
    /// Stable time (µs)
    pub stable_usec: f64,
    /// Helicity window frequency (Hz)
    pub frequency_hz: f64,
}

impl Timing {
    /// Timing from raw clock, tsettle and tstable register values
    ///
    /// An index past the end of its table (possible only with a widened
    /// register mask) is clamped to the last entry and logged.
    pub fn from_registers(clock: u8, tsettle: u8, tstable: u8) -> Self {
        let mode = ClockMode::from_bits(clock);
        let settle_usec = lookup(&TSETTLE_USEC, RegisterField::TSettle, tsettle);

        let (stable_usec, frequency_hz) = match mode.entry().fixed_hz {
            Some(hz) => (USEC_PER_SEC / hz - settle_usec, hz),
            None => {
                let stable = lookup(&TSTABLE_USEC, RegisterField::TStable, tstable);
                (stable, USEC_PER_SEC / (settle_usec + stable))
            }
        };

        Self {
            mode,
            settle_usec,
            stable_usec,
            frequency_hz,
        }
    }
}

/// Table entry for `index`, clamped to the last entry
fn lookup(table: &[f64], field: RegisterField, index: u8) -> f64 {
    let last = table.len() - 1;
    let i = usize::from(index);
    if i > last {
        tracing::warn!("{field} index {index} has no table entry, using index {last}");
    }
    table[i.min(last)]
}

impl<B: BusPort> HelicityGenerator<B> {
    /// Read clock, tsettle and tstable under one lock and derive the timing
    ///
    /// # Errors
    ///
    /// - [`HeliError::NotInitialized`](crate::HeliError::NotInitialized) before `init`
    /// - Bus error from the port
    pub fn timing(&self) -> Result<Timing> {
        let s = self.session()?;
        let clock = s.read(RegisterField::Clock)?;
        let tsettle = s.read(RegisterField::TSettle)?;
        let tstable = s.read(RegisterField::TStable)?;
        Ok(Timing::from_registers(clock, tsettle, tstable))
    }

    /// Helicity window frequency (Hz)
    ///
    /// # Errors
    ///
    /// Same as [`Self::timing`].
    pub fn frequency(&self) -> Result<f64> {
        Ok(self.timing()?.frequency_hz)
    }

    /// Settle time (µs)
    ///
    /// # Errors
    ///
    /// Same as [`Self::timing`].
    pub fn tsettle_usec(&self) -> Result<f64> {
        Ok(self.timing()?.settle_usec)
    }

    /// Stable time (µs), derived from the mode in the line sync modes
    ///
    /// # Errors
    ///
    /// Same as [`Self::timing`].
    pub fn tstable_usec(&self) -> Result<f64> {
        Ok(self.timing()?.stable_usec)
    }
}
