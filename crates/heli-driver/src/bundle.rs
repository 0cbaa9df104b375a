//! Configuration API
//!
//! Bulk and per-field access to the five configuration registers. Every
//! value is checked against both its index range and its register width
//! before the bus is touched; a bulk write either passes validation for all
//! five fields and writes them under one lock, or writes nothing.

use crate::access::check;
use crate::bus::BusPort;
use crate::device::HelicityGenerator;
use crate::error::{HeliError, Result};
use heli_chip::regs::clock;
use heli_chip::{BoardClock, ClockMode, RegisterField, RegisterMap};

/// Raw contents of the five configuration registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Configuration {
    /// Settle time index
    pub tsettle: u8,
    /// Stable time index
    pub tstable: u8,
    /// Reporting delay index
    pub delay: u8,
    /// Helicity pattern index
    pub pattern: u8,
    /// Clock register (mode bits and board clock bit)
    pub clock: u8,
}

impl Configuration {
    /// `(field, value)` pairs in write order
    pub const fn fields(&self) -> [(RegisterField, u8); 5] {
        [
            (RegisterField::TSettle, self.tsettle),
            (RegisterField::TStable, self.tstable),
            (RegisterField::Delay, self.delay),
            (RegisterField::Pattern, self.pattern),
            (RegisterField::Clock, self.clock),
        ]
    }

    /// Clock mode encoded in the clock register
    pub const fn mode(&self) -> ClockMode {
        ClockMode::from_bits(self.clock)
    }

    /// Board clock encoded in the clock register
    pub const fn board_clock(&self) -> BoardClock {
        BoardClock::from_bits(self.clock)
    }

    /// Check every field against its index range and register width
    ///
    /// # Errors
    ///
    /// Returns [`HeliError::OutOfRange`] for the first offending field.
    pub fn validate(&self, map: &RegisterMap) -> Result<()> {
        self.fields()
            .into_iter()
            .try_for_each(|(field, value)| check(map, field, value))
    }
}

/// Convert a caller-supplied index, rejecting anything past `max`
fn index(field: RegisterField, value: u32, max: u8) -> Result<u8> {
    match u8::try_from(value) {
        Ok(v) if v <= max => Ok(v),
        _ => {
            tracing::error!("Invalid {field} selection {value} (max {max})");
            Err(HeliError::out_of_range(field, value, max))
        }
    }
}

impl<B: BusPort> HelicityGenerator<B> {
    /// Write all five configuration registers
    ///
    /// # Errors
    ///
    /// - [`HeliError::OutOfRange`] naming the first bad field; nothing is written
    /// - [`HeliError::NotInitialized`] before `init`
    /// - Bus error from the port
    pub fn set_configuration(&self, config: &Configuration) -> Result<()> {
        config.validate(self.register_map())?;

        let session = self.session()?;
        for (field, value) in config.fields() {
            session.write(field, value)?;
        }
        tracing::debug!("Configuration written: {config:?}");
        Ok(())
    }

    /// Read all five configuration registers under one lock
    ///
    /// # Errors
    ///
    /// - [`HeliError::NotInitialized`] before `init`
    /// - Bus error from the port
    pub fn configuration(&self) -> Result<Configuration> {
        let s = self.session()?;
        Ok(Configuration {
            tsettle: s.read(RegisterField::TSettle)?,
            tstable: s.read(RegisterField::TStable)?,
            delay: s.read(RegisterField::Delay)?,
            pattern: s.read(RegisterField::Pattern)?,
            clock: s.read(RegisterField::Clock)?,
        })
    }

    /// Select the clock mode (0–3), keeping the board clock bit
    ///
    /// # Errors
    ///
    /// - [`HeliError::OutOfRange`] if `mode > 3`
    /// - [`HeliError::NotInitialized`] before `init`
    /// - Bus error from the port
    pub fn select_mode(&self, mode: u32) -> Result<()> {
        let mode = index(RegisterField::Clock, mode, clock::MODE_MASK)?;
        self.update_clock(clock::MODE_MASK, mode)
    }

    /// Select the helicity pattern (0–10, limited by the register width)
    ///
    /// # Errors
    ///
    /// - [`HeliError::OutOfRange`] for an undefined or unrepresentable index
    /// - [`HeliError::NotInitialized`] before `init`
    /// - Bus error from the port
    pub fn select_pattern(&self, pattern: u32) -> Result<()> {
        self.select_field(RegisterField::Pattern, pattern)
    }

    /// Select the reporting delay (0–15)
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_pattern`].
    pub fn select_reporting_delay(&self, delay: u32) -> Result<()> {
        self.select_field(RegisterField::Delay, delay)
    }

    /// Select the settle time index (0–31)
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_pattern`].
    pub fn select_tsettle(&self, tsettle: u32) -> Result<()> {
        self.select_field(RegisterField::TSettle, tsettle)
    }

    /// Select the stable time index (0–31)
    ///
    /// # Errors
    ///
    /// Same as [`Self::select_pattern`].
    pub fn select_tstable(&self, tstable: u32) -> Result<()> {
        self.select_field(RegisterField::TStable, tstable)
    }

    /// Select the board clock output (0 = 10 MHz, 1 = 20 MHz), keeping the
    /// mode bits
    ///
    /// # Errors
    ///
    /// - [`HeliError::OutOfRange`] if `board_clock > 1`
    /// - [`HeliError::NotInitialized`] before `init`
    /// - Bus error from the port
    pub fn select_board_clock(&self, board_clock: u32) -> Result<()> {
        let bc = index(RegisterField::Clock, board_clock, 1)?;
        self.update_clock(clock::BOARD_CLOCK, bc << clock::BOARD_CLOCK_SHIFT)
    }

    /// Current clock mode
    ///
    /// # Errors
    ///
    /// - [`HeliError::NotInitialized`] before `init`
    /// - Bus error from the port
    pub fn mode(&self) -> Result<ClockMode> {
        Ok(ClockMode::from_bits(self.read_register(RegisterField::Clock)?))
    }

    /// Current helicity pattern index
    ///
    /// # Errors
    ///
    /// Same as [`Self::mode`].
    pub fn pattern(&self) -> Result<u8> {
        self.read_register(RegisterField::Pattern)
    }

    /// Current reporting delay index
    ///
    /// # Errors
    ///
    /// Same as [`Self::mode`].
    pub fn reporting_delay(&self) -> Result<u8> {
        self.read_register(RegisterField::Delay)
    }

    /// Current board clock output
    ///
    /// # Errors
    ///
    /// Same as [`Self::mode`].
    pub fn board_clock(&self) -> Result<BoardClock> {
        Ok(BoardClock::from_bits(self.read_register(RegisterField::Clock)?))
    }

    fn select_field(&self, field: RegisterField, value: u32) -> Result<()> {
        let v = index(field, value, field.max_index())?;
        check(self.register_map(), field, v)?;
        self.session()?.write(field, v)
    }

    /// Replace the `bits` of the clock register with `value`
    fn update_clock(&self, bits: u8, value: u8) -> Result<()> {
        let s = self.session()?;
        let current = s.read(RegisterField::Clock)?;
        s.write(RegisterField::Clock, (current & !bits) | (value & bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SimulatedBus;
    use crate::config::InitFlags;
    use heli_chip::{regs, FirmwareRevision};

    const A24: u32 = 0x00A0_0000;

    fn board(map: RegisterMap) -> HelicityGenerator<SimulatedBus> {
        let dev = HelicityGenerator::new(SimulatedBus::with_board(A24), map);
        dev.init(A24, InitFlags::NONE).unwrap();
        dev
    }

    #[test]
    fn bundle_round_trip() {
        let dev = board(RegisterMap::default());
        let cfg = Configuration { tsettle: 0x1f, tstable: 3, delay: 0xf, pattern: 10, clock: 0x07 };
        dev.set_configuration(&cfg).unwrap();
        assert_eq!(dev.configuration().unwrap(), cfg);
        assert_eq!(dev.mode().unwrap(), ClockMode::FreeClock);
        assert_eq!(dev.board_clock().unwrap(), BoardClock::Mhz20);
    }

    #[test]
    fn one_bad_field_writes_nothing() {
        let dev = board(RegisterMap::default());
        let before = dev.bus().write_count();
        let cfg = Configuration { tsettle: 1, tstable: 1, delay: 16, pattern: 1, clock: 0 };
        let err = dev.set_configuration(&cfg).unwrap_err();
        assert!(matches!(err, HeliError::OutOfRange { field: RegisterField::Delay, value: 16, .. }));
        assert_eq!(dev.bus().write_count(), before);
    }

    #[test]
    fn pattern_limited_by_index_range_and_width() {
        // 0x0b fits a 4-bit register but names no pattern
        let dev = board(RegisterMap::default());
        assert!(dev.select_pattern(11).is_err());
        dev.select_pattern(10).unwrap();

        let old = board(RegisterMap::for_revision(FirmwareRevision::Rev2022));
        assert!(matches!(
            old.select_pattern(8),
            Err(HeliError::OutOfRange { max: 7, .. })
        ));
        old.select_pattern(7).unwrap();
    }

    #[test]
    fn selector_rejection_leaves_register() {
        let dev = board(RegisterMap::default());
        dev.select_tsettle(4).unwrap();
        assert!(dev.select_tsettle(32).is_err());
        assert!(dev.select_tsettle(u32::MAX).is_err());
        assert!(dev.select_tstable(32).is_err());
        assert!(dev.select_reporting_delay(16).is_err());
        assert!(dev.select_mode(4).is_err());
        assert!(dev.select_board_clock(2).is_err());
        assert_eq!(dev.bus().peek(A24, regs::TSETTLE), Some(4));
        assert_eq!(dev.bus().peek(A24, regs::CLOCK), Some(0));
    }

    #[test]
    fn mode_and_board_clock_preserve_each_other() {
        let dev = board(RegisterMap::default());
        dev.select_board_clock(1).unwrap();
        dev.select_mode(2).unwrap();
        assert_eq!(dev.bus().peek(A24, regs::CLOCK), Some(0b110));

        dev.select_mode(1).unwrap();
        assert_eq!(dev.board_clock().unwrap(), BoardClock::Mhz20);

        dev.select_board_clock(0).unwrap();
        assert_eq!(dev.mode().unwrap(), ClockMode::LineSync120);
        assert_eq!(dev.bus().peek(A24, regs::CLOCK), Some(0b001));
    }

    #[test]
    fn getters_report_selections() {
        let dev = board(RegisterMap::default());
        dev.select_pattern(8).unwrap();
        dev.select_reporting_delay(15).unwrap();
        assert_eq!(dev.pattern().unwrap(), 8);
        assert_eq!(dev.reporting_delay().unwrap(), 15);
    }

    #[test]
    fn clock_byte_past_defined_bits_rejected() {
        let dev = board(RegisterMap::default());
        let cfg = Configuration { clock: 0x08, ..Configuration::default() };
        assert!(dev.set_configuration(&cfg).is_err());
    }
}
