//! Register map for the helicity generator.
//!
//! Eight byte-wide registers inside the 16-byte A24 window:
//!
//! ```text
//! 0x00: month     firmware date (may time out with BERR)
//! 0x01: day       firmware date, presence probe location
//! 0x03: year      firmware date (later firmware only)
//! 0x07: tsettle   settle time index
//! 0x09: tstable   stable time index
//! 0x0b: delay     reporting delay index
//! 0x0d: pattern   helicity pattern index
//! 0x0f: clock     [1:0] clock mode, [2] board clock
//! ```
//!
//! Register widths changed between firmware revisions (the pattern register
//! grew from 3 to 4 bits), so masks live in a [`RegisterMap`] value rather
//! than in constants. A mask never implies how many indices are valid; see
//! [`RegisterField::max_index`].

use std::fmt;

// ── Offsets ──────────────────────────────────────────────────────────────────

/// Firmware month.
pub const MONTH: usize = 0x00;
/// Firmware day.
pub const DAY: usize = 0x01;
/// Firmware year (two digits).
pub const YEAR: usize = 0x03;
/// Settle time index.
pub const TSETTLE: usize = 0x07;
/// Stable time index.
pub const TSTABLE: usize = 0x09;
/// Reporting delay index.
pub const DELAY: usize = 0x0B;
/// Helicity pattern index.
pub const PATTERN: usize = 0x0D;
/// Clock mode and board clock select.
pub const CLOCK: usize = 0x0F;

/// Clock register bit definitions.
pub mod clock {
    /// Clock mode bits (line sync 30/120/240 Hz, free clock).
    pub const MODE_MASK: u8 = 0x03;
    /// Board clock output select (0 = 10 MHz, 1 = 20 MHz).
    pub const BOARD_CLOCK: u8 = 1 << 2;
    /// Shift of the board clock bit.
    pub const BOARD_CLOCK_SHIFT: u8 = 2;
    /// Every bit with a defined meaning.
    pub const DEFINED: u8 = MODE_MASK | BOARD_CLOCK;
}

// ── Fields ───────────────────────────────────────────────────────────────────

/// One named register of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterField {
    /// Settle time index.
    TSettle,
    /// Stable time index.
    TStable,
    /// Reporting delay index.
    Delay,
    /// Helicity pattern index.
    Pattern,
    /// Clock register (mode + board clock).
    Clock,
    /// Firmware month.
    Month,
    /// Firmware day.
    Day,
    /// Firmware year.
    Year,
}

impl RegisterField {
    /// Every field, in register-offset order.
    pub const ALL: [Self; 8] = [
        Self::Month,
        Self::Day,
        Self::Year,
        Self::TSettle,
        Self::TStable,
        Self::Delay,
        Self::Pattern,
        Self::Clock,
    ];

    /// The five fields written together by a configuration bundle.
    pub const BUNDLE: [Self; 5] = [
        Self::TSettle,
        Self::TStable,
        Self::Delay,
        Self::Pattern,
        Self::Clock,
    ];

    /// Byte offset inside the register window.
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Self::Month => MONTH,
            Self::Day => DAY,
            Self::Year => YEAR,
            Self::TSettle => TSETTLE,
            Self::TStable => TSTABLE,
            Self::Delay => DELAY,
            Self::Pattern => PATTERN,
            Self::Clock => CLOCK,
        }
    }

    /// Largest index with a defined meaning, regardless of register width.
    #[must_use]
    pub const fn max_index(self) -> u8 {
        match self {
            Self::TSettle | Self::TStable => 31,
            Self::Delay => 15,
            Self::Pattern => 10,
            Self::Clock => clock::DEFINED,
            Self::Month => 12,
            Self::Day => 31,
            Self::Year => 99,
        }
    }

    /// Register name as printed in status reports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TSettle => "tsettle",
            Self::TStable => "tstable",
            Self::Delay => "delay",
            Self::Pattern => "pattern",
            Self::Clock => "clock",
            Self::Month => "month",
            Self::Day => "day",
            Self::Year => "year",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Month => 0,
            Self::Day => 1,
            Self::Year => 2,
            Self::TSettle => 3,
            Self::TStable => 4,
            Self::Delay => 5,
            Self::Pattern => 6,
            Self::Clock => 7,
        }
    }
}

impl fmt::Display for RegisterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Firmware revisions ───────────────────────────────────────────────────────

/// Firmware revisions with known register widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirmwareRevision {
    /// First release: 3-bit pattern register (patterns 0–7 only).
    Rev2022,
    /// 4-bit pattern register, all eleven patterns reachable.
    #[default]
    Rev2023,
}

impl FirmwareRevision {
    /// Parse `"2022"` / `"2023"` (an optional `rev` prefix is accepted).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.trim_start_matches("rev") {
            "2022" => Some(Self::Rev2022),
            "2023" => Some(Self::Rev2023),
            _ => None,
        }
    }

    /// Register masks in [`RegisterField::ALL`] order.
    const fn masks(self) -> [u8; 8] {
        let pattern = match self {
            Self::Rev2022 => 0x07,
            Self::Rev2023 => 0x0F,
        };
        // month, day, year, tsettle, tstable, delay, pattern, clock
        [0xFF, 0xFF, 0xFF, 0x1F, 0x1F, 0x0F, pattern, 0xFF]
    }
}

// ── Register map ─────────────────────────────────────────────────────────────

/// Bit-width masks for every register of one board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    revision: FirmwareRevision,
    masks: [u8; 8],
}

impl RegisterMap {
    /// Masks for a known firmware revision.
    #[must_use]
    pub const fn for_revision(revision: FirmwareRevision) -> Self {
        Self {
            revision,
            masks: revision.masks(),
        }
    }

    /// Override the mask of one field.
    #[must_use]
    pub fn with_mask(mut self, field: RegisterField, mask: u8) -> Self {
        self.masks[field.slot()] = mask;
        self
    }

    /// Revision the masks were derived from.
    #[must_use]
    pub const fn revision(&self) -> FirmwareRevision {
        self.revision
    }

    /// Bit-width mask of `field`.
    #[must_use]
    pub const fn mask(&self, field: RegisterField) -> u8 {
        self.masks[field.slot()]
    }

    /// Largest value that is both representable and meaningful.
    #[must_use]
    pub const fn writable_max(&self, field: RegisterField) -> u8 {
        let mask = self.mask(field);
        let max = field.max_index();
        if mask < max {
            mask
        } else {
            max
        }
    }

    /// Whether `value` fits the register's bit-width.
    #[must_use]
    pub const fn fits(&self, field: RegisterField, value: u8) -> bool {
        value & !self.mask(field) == 0
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::for_revision(FirmwareRevision::default())
    }
}
