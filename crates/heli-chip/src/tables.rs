//! Lookup tables from register index to physical quantity.
//!
//! Values come from the board's firmware documentation. Settle and stable
//! times are in microseconds; the reporting delay is counted in helicity
//! windows.

use std::fmt;

/// Settle time (µs) for each TSettle index.
pub const TSETTLE_USEC: [f64; 32] = [
    5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, //
    45.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0, 110.0, //
    120.0, 130.0, 140.0, 150.0, 160.0, 170.0, 180.0, 190.0, //
    200.0, 250.0, 300.0, 350.0, 400.0, 450.0, 500.0, 1000.0,
];

/// Stable time (µs) for each TStable index.
///
/// Only consulted in free clock mode; in line sync modes the board derives
/// the stable time from the fixed frequency.
pub const TSTABLE_USEC: [f64; 32] = [
    240.40, 245.40, 250.40, 255.40, 470.85, 475.85, 480.85, 485.85, //
    490.85, 495.85, 500.85, 505.85, 510.85, 515.85, 900.0, 971.65, //
    1000.0, 1001.65, 1318.90, 1348.90, 2000.0, 3000.0, 4066.65, 5000.0, //
    6000.0, 7000.0, 8233.35, 8243.35, 16567.0, 16667.0, 33230.0, 33330.0,
];

/// Reporting delay (helicity windows) for each Delay index.
pub const DELAY_WINDOWS: [u16; 16] = [
    0, 1, 2, 4, 8, 16, 24, 32, //
    40, 48, 64, 72, 96, 112, 128, 256,
];

/// Helicity pattern names for each Pattern index.
pub const PATTERN_NAMES: [&str; 11] = [
    "Pair",
    "Quartet",
    "Octet",
    "Toggle",
    "Hexo-Quad",
    "Octo-Quad",
    "SPARE [Toggle]",
    "SPARE [Toggle]",
    "Thue-Morse-64",
    "16-Quad",
    "32-Pair",
];

/// One row of the clock mode table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockModeEntry {
    /// Mode as encoded in the clock register.
    pub mode: ClockMode,
    /// Line sync frequency, `None` when the board runs from its free clock.
    pub fixed_hz: Option<f64>,
}

/// Clock mode table, indexed by the mode bits of the clock register.
pub const CLOCK_MODES: [ClockModeEntry; 4] = [
    ClockModeEntry { mode: ClockMode::LineSync30, fixed_hz: Some(30.0) },
    ClockModeEntry { mode: ClockMode::LineSync120, fixed_hz: Some(120.0) },
    ClockModeEntry { mode: ClockMode::LineSync240, fixed_hz: Some(240.0) },
    ClockModeEntry { mode: ClockMode::FreeClock, fixed_hz: None },
];

/// Board clock output frequency (MHz) for each BoardClock index.
pub const BOARD_CLOCK_MHZ: [u32; 2] = [10, 20];

/// Clock source of the helicity signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockMode {
    /// 30 Hz line sync.
    LineSync30 = 0,
    /// 120 Hz line sync.
    LineSync120 = 1,
    /// 240 Hz line sync.
    LineSync240 = 2,
    /// Free-running clock; frequency follows settle + stable time.
    FreeClock = 3,
}

impl ClockMode {
    /// Decode the two mode bits of a clock register value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        CLOCK_MODES[(bits & crate::regs::clock::MODE_MASK) as usize].mode
    }

    /// Mode from a selection index (0–3).
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if (index as usize) < CLOCK_MODES.len() {
            Some(CLOCK_MODES[index as usize].mode)
        } else {
            None
        }
    }

    /// Register encoding.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Row of [`CLOCK_MODES`] describing this mode.
    #[must_use]
    pub const fn entry(self) -> ClockModeEntry {
        CLOCK_MODES[self as usize]
    }

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LineSync30 => "30 Hz Line Sync",
            Self::LineSync120 => "120 Hz Line Sync",
            Self::LineSync240 => "240 Hz Line Sync",
            Self::FreeClock => "Free Clock",
        }
    }
}

impl fmt::Display for ClockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Board clock output frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardClock {
    /// 10 MHz output.
    Mhz10 = 0,
    /// 20 MHz output.
    Mhz20 = 1,
}

impl BoardClock {
    /// Decode from a clock register value.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        if bits & crate::regs::clock::BOARD_CLOCK == 0 {
            Self::Mhz10
        } else {
            Self::Mhz20
        }
    }

    /// Board clock from a selection index (0–1).
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Mhz10),
            1 => Some(Self::Mhz20),
            _ => None,
        }
    }

    /// Clock register bits for this selection.
    #[must_use]
    pub const fn bits(self) -> u8 {
        (self as u8) << crate::regs::clock::BOARD_CLOCK_SHIFT
    }

    /// Output frequency in MHz.
    #[must_use]
    pub const fn mhz(self) -> u32 {
        BOARD_CLOCK_MHZ[self as usize]
    }
}

impl fmt::Display for BoardClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MHz", self.mhz())
    }
}

/// Pattern name for `index`, if the index is defined.
#[must_use]
pub fn pattern_name(index: u8) -> Option<&'static str> {
    PATTERN_NAMES.get(usize::from(index)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::{RegisterField, clock};

    #[test]
    fn table_lengths_match_index_ranges() {
        assert_eq!(TSETTLE_USEC.len(), usize::from(RegisterField::TSettle.max_index()) + 1);
        assert_eq!(TSTABLE_USEC.len(), usize::from(RegisterField::TStable.max_index()) + 1);
        assert_eq!(DELAY_WINDOWS.len(), usize::from(RegisterField::Delay.max_index()) + 1);
        assert_eq!(PATTERN_NAMES.len(), usize::from(RegisterField::Pattern.max_index()) + 1);
        assert_eq!(CLOCK_MODES.len(), usize::from(clock::MODE_MASK) + 1);
    }

    #[test]
    fn tables_are_increasing() {
        assert!(TSETTLE_USEC.windows(2).all(|w| w[0] < w[1]));
        assert!(TSTABLE_USEC.windows(2).all(|w| w[0] < w[1]));
        assert!(DELAY_WINDOWS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn only_free_clock_lacks_fixed_frequency() {
        for entry in CLOCK_MODES {
            assert_eq!(entry.fixed_hz.is_none(), entry.mode == ClockMode::FreeClock);
        }
    }

    #[test]
    fn clock_register_decoding() {
        // mode bits and board clock bit are independent
        assert_eq!(ClockMode::from_bits(0b111), ClockMode::FreeClock);
        assert_eq!(BoardClock::from_bits(0b111), BoardClock::Mhz20);
        assert_eq!(ClockMode::from_bits(0b010), ClockMode::LineSync240);
        assert_eq!(BoardClock::from_bits(0b010), BoardClock::Mhz10);
        assert_eq!(BoardClock::Mhz20.bits(), clock::BOARD_CLOCK);
        assert_eq!(ClockMode::from_index(4), None);
    }

    #[test]
    fn pattern_lookup() {
        assert_eq!(pattern_name(0), Some("Pair"));
        assert_eq!(pattern_name(8), Some("Thue-Morse-64"));
        assert_eq!(pattern_name(11), None);
    }
}
