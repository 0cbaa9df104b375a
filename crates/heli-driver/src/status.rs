//! Status report
//!
//! One snapshot of every register, taken under a single lock, formatted as
//! a fixed-layout text report.

use crate::access::Session;
use crate::bundle::Configuration;
use crate::bus::BusPort;
use crate::device::HelicityGenerator;
use crate::error::Result;
use crate::timing::Timing;
use heli_chip::tables::{pattern_name, DELAY_WINDOWS};
use heli_chip::{BoardClock, RegisterField};
use std::fmt;

const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Firmware build date as stored on the board (BCD digits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareDate {
    /// Month register
    pub month: u8,
    /// Day register
    pub day: u8,
    /// Two-digit year register
    pub year: u8,
}

impl fmt::Display for FirmwareDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}/{:02x}/{:02x}", self.month, self.day, self.year)
    }
}

/// Everything the status report shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    /// A24 address of the board
    pub bus_address: u32,
    /// Configuration registers
    pub config: Configuration,
    /// Derived timing
    pub timing: Timing,
    /// Firmware date, `None` if the board did not answer
    pub firmware_date: Option<FirmwareDate>,
}

impl StatusSnapshot {
    /// Report renderer; `include_raw` adds a dump of every register
    pub const fn report(&self, include_raw: bool) -> StatusReport<'_> {
        StatusReport {
            snap: self,
            include_raw,
        }
    }

    fn raw_registers(&self) -> [(RegisterField, Option<u8>); 8] {
        let date = self.firmware_date;
        let c = self.config;
        [
            (RegisterField::Month, date.map(|d| d.month)),
            (RegisterField::Day, date.map(|d| d.day)),
            (RegisterField::Year, date.map(|d| d.year)),
            (RegisterField::TSettle, Some(c.tsettle)),
            (RegisterField::TStable, Some(c.tstable)),
            (RegisterField::Delay, Some(c.delay)),
            (RegisterField::Pattern, Some(c.pattern)),
            (RegisterField::Clock, Some(c.clock)),
        ]
    }
}

/// Fixed-layout text rendering of a [`StatusSnapshot`]
#[derive(Debug)]
pub struct StatusReport<'a> {
    snap: &'a StatusSnapshot,
    include_raw: bool,
}

impl fmt::Display for StatusReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snap = self.snap;
        writeln!(f)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "STATUS for JLab Helicity Generator")?;

        if self.include_raw {
            writeln!(f)?;
            for (n, (field, value)) in snap.raw_registers().into_iter().enumerate() {
                write!(f, "  {:>10} ({:#04x}) = ", field.name(), field.offset())?;
                match value {
                    Some(v) => write!(f, "{v:#04x}")?,
                    None => f.write_str(" n/a")?,
                }
                f.write_str(if n % 2 == 0 { "\t" } else { "\n" })?;
            }
        }

        let c = snap.config;
        writeln!(f)?;
        writeln!(f, " A24 addr     tsettle   tstable   delay     pattern   clock")?;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            " {:#08x}     {:#04x}      {:#04x}      {:#04x}      {:#04x}      {:#04x}",
            snap.bus_address, c.tsettle, c.tstable, c.delay, c.pattern, c.clock
        )?;
        writeln!(f)?;

        let t = snap.timing;
        writeln!(f, "  Clock mode      : {}", t.mode)?;
        writeln!(f, "  Pattern         : {}", pattern_name(c.pattern).unwrap_or("undefined"))?;
        match DELAY_WINDOWS.get(usize::from(c.delay)) {
            Some(w) => writeln!(f, "  Reporting delay : {w} windows")?,
            None => writeln!(f, "  Reporting delay : undefined")?,
        }
        writeln!(f, "  TSettle         : {:.2} us", t.settle_usec)?;
        writeln!(f, "  TStable         : {:.2} us", t.stable_usec)?;
        writeln!(f, "  Frequency       : {:.4} Hz", t.frequency_hz)?;
        writeln!(f, "  Board clock     : {}", BoardClock::from_bits(c.clock))?;
        match snap.firmware_date {
            Some(d) => writeln!(f, "  Firmware date   : {d}")?,
            None => writeln!(f, "  Firmware date   : unavailable")?,
        }

        writeln!(f)?;
        writeln!(f, "{RULE}")
    }
}

impl<B: BusPort> HelicityGenerator<B> {
    /// Read every register under one lock
    ///
    /// # Errors
    ///
    /// - [`HeliError::NotInitialized`](crate::HeliError::NotInitialized) before `init`
    /// - Bus error on any configuration register; firmware date failures are
    ///   tolerated
    pub fn status(&self) -> Result<StatusSnapshot> {
        let s = self.session()?;
        let config = Configuration {
            tsettle: s.read(RegisterField::TSettle)?,
            tstable: s.read(RegisterField::TStable)?,
            delay: s.read(RegisterField::Delay)?,
            pattern: s.read(RegisterField::Pattern)?,
            clock: s.read(RegisterField::Clock)?,
        };
        let firmware_date = read_date(&s);

        Ok(StatusSnapshot {
            bus_address: s.bus_address(),
            config,
            timing: Timing::from_registers(config.clock, config.tsettle, config.tstable),
            firmware_date,
        })
    }

    /// Human readable status report
    ///
    /// # Errors
    ///
    /// Same as [`Self::status`].
    pub fn format_status(&self, include_raw: bool) -> Result<String> {
        Ok(self.status()?.report(include_raw).to_string())
    }
}

/// Month, day and year, or `None` if any of them cannot be read
fn read_date<B: BusPort>(s: &Session<'_, B>) -> Option<FirmwareDate> {
    let read = |field: RegisterField| {
        s.read(field)
            .map_err(|e| tracing::warn!("Firmware {field} register unavailable: {e}"))
            .ok()
    };
    Some(FirmwareDate {
        month: read(RegisterField::Month)?,
        day: read(RegisterField::Day)?,
        year: read(RegisterField::Year)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SimulatedBus;
    use crate::config::InitFlags;
    use heli_chip::RegisterMap;

    const A24: u32 = 0x00A0_0000;

    fn board() -> HelicityGenerator<SimulatedBus> {
        let dev = HelicityGenerator::new(SimulatedBus::with_board(A24), RegisterMap::default());
        dev.init(A24, InitFlags::NONE).unwrap();
        dev
    }

    #[test]
    fn report_names_mode_and_pattern() {
        let dev = board();
        dev.set_configuration(&Configuration { tsettle: 2, tstable: 4, delay: 3, pattern: 8, clock: 0b101 })
            .unwrap();
        let report = dev.format_status(false).unwrap();
        assert!(report.contains("STATUS for JLab Helicity Generator"));
        assert!(report.contains(" 0xa00000 "));
        assert!(report.contains("120 Hz Line Sync"));
        assert!(report.contains("Thue-Morse-64"));
        assert!(report.contains("4 windows"));
        assert!(report.contains("20 MHz"));
        assert!(report.contains("05/17/23"));
        assert!(!report.contains("tsettle (0x07)"));
    }

    #[test]
    fn raw_dump_on_request() {
        let report = board().format_status(true).unwrap();
        assert!(report.contains("tsettle (0x07) = 0x00"));
        assert!(report.contains("day (0x01) = 0x17"));
    }

    #[test]
    fn month_timeout_degrades_date_only() {
        let dev = board();
        dev.bus().set_month_timeout(true);
        let snap = dev.status().unwrap();
        assert_eq!(snap.firmware_date, None);
        let report = snap.report(true).to_string();
        assert!(report.contains("Firmware date   : unavailable"));
        assert!(report.contains("month (0x00) =  n/a"));
        assert!(report.contains("Pair"));
    }

    #[test]
    fn requires_init() {
        let dev = HelicityGenerator::new(SimulatedBus::with_board(A24), RegisterMap::default());
        assert!(dev.format_status(false).is_err());
    }
}
