//! Driver configuration
//!
//! Where the board lives on the bus, which firmware revision it runs, and the
//! `init` flags. Defaults match the current firmware; each value can be
//! overridden from the environment:
//!
//! | Variable | Meaning | Example |
//! |----------|---------|---------|
//! | `HELI_A24_ADDRESS` | A24 base address (hex) | `0xa00000` |
//! | `HELI_DEBUG` | enable debug register tracing | `1`, `true` |
//! | `HELI_FIRMWARE_REV` | register widths | `2022`, `2023` |

use heli_chip::window::DEFAULT_A24_ADDRESS;
use heli_chip::{FirmwareRevision, RegisterMap};
use std::ops::BitOr;

/// Flags accepted by [`HelicityGenerator::init`](crate::HelicityGenerator::init)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InitFlags(u16);

impl InitFlags {
    /// No flags
    pub const NONE: Self = Self(0);
    /// Enable debug register tracing
    pub const DEBUG: Self = Self(1 << 0);

    /// Flags from their raw bit representation
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bit representation
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether every flag in `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for InitFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Board placement and initialization settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// A24 base address of the board
    pub bus_address: u32,
    /// Flags passed to `init`
    pub flags: InitFlags,
    /// Firmware revision, selects register widths
    pub revision: FirmwareRevision,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            bus_address: DEFAULT_A24_ADDRESS,
            flags: InitFlags::NONE,
            revision: FirmwareRevision::default(),
        }
    }
}

impl GeneratorConfig {
    /// Defaults overridden by `HELI_*` environment variables
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Register masks for the configured revision
    pub const fn register_map(&self) -> RegisterMap {
        RegisterMap::for_revision(self.revision)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("HELI_A24_ADDRESS") {
            match parse_hex_u32(&raw) {
                Some(addr) => self.bus_address = addr,
                None => tracing::warn!("Ignoring HELI_A24_ADDRESS={raw:?}: not a hex address"),
            }
        }

        if let Some(raw) = lookup("HELI_DEBUG") {
            match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.flags = self.flags | InitFlags::DEBUG,
                "0" | "false" | "no" | "off" => self.flags = InitFlags(self.flags.0 & !InitFlags::DEBUG.0),
                _ => tracing::warn!("Ignoring HELI_DEBUG={raw:?}"),
            }
        }

        if let Some(raw) = lookup("HELI_FIRMWARE_REV") {
            match FirmwareRevision::from_str_loose(&raw) {
                Some(rev) => self.revision = rev,
                None => tracing::warn!("Ignoring HELI_FIRMWARE_REV={raw:?}"),
            }
        }

        self
    }
}

/// Parse a hex number with or without a `0x` prefix
pub fn parse_hex_u32(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).ok()
}
