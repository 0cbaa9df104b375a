//! VME A24 window occupied by the helicity generator.
//!
//! ```text
//! Base       Size   AM     Purpose
//! ────────── ────── ────── ───────────────────────────────────────────
//! 0xA00000   16 B   0x39   Register window (current firmware default)
//! ```
//!
//! Only odd byte lanes carry registers above 0x01; even bytes in
//! `0x02..=0x0E` are unpopulated.

/// Current firmware default A24 base address.
pub const DEFAULT_A24_ADDRESS: u32 = 0x00A0_0000;

/// Size of the register window in bytes.
pub const WINDOW_SIZE: usize = 0x10;

/// VME address modifier for A24 non-privileged data access.
pub const A24_ADDRESS_MODIFIER: u8 = 0x39;

/// Highest address reachable in A24 space.
pub const A24_MAX: u32 = 0x00FF_FFFF;

/// Offset of the byte read to detect a board at `Init` time.
///
/// The month register at offset 0 can time out on some boards, so the probe
/// uses the day register instead.
pub const PROBE_OFFSET: usize = 0x01;

/// Whether `bus_address` is a legal A24 window base.
#[must_use]
pub const fn is_a24(bus_address: u32) -> bool {
    bus_address <= A24_MAX - WINDOW_SIZE as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_address_is_a24() {
        assert!(is_a24(DEFAULT_A24_ADDRESS));
        assert!(!is_a24(0x0100_0000));
    }

    #[test]
    fn probe_offset_inside_window() {
        assert!(PROBE_OFFSET < WINDOW_SIZE);
    }
}
