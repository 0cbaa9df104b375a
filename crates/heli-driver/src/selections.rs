//! Selection menus
//!
//! Text tables mapping each selector index to what it means. None of these
//! touch the bus.

use heli_chip::tables::{
    BOARD_CLOCK_MHZ, CLOCK_MODES, DELAY_WINDOWS, PATTERN_NAMES, TSETTLE_USEC, TSTABLE_USEC,
};
use std::fmt;
use std::str::FromStr;

/// Clock mode menu
pub fn mode_selections() -> String {
    Selection::Mode.render()
}

/// Helicity pattern menu
pub fn pattern_selections() -> String {
    Selection::Pattern.render()
}

/// Reporting delay menu
pub fn reporting_delay_selections() -> String {
    Selection::Delay.render()
}

/// Settle time menu, two columns
pub fn tsettle_selections() -> String {
    Selection::TSettle.render()
}

/// Stable time menu (free clock mode only)
pub fn tstable_selections() -> String {
    Selection::TStable.render()
}

/// Board clock output menu
pub fn board_clock_selections() -> String {
    Selection::BoardClock.render()
}

/// Text table of one [`Selection`], index to meaning
#[derive(Debug, Clone, Copy)]
pub struct Menu(pub Selection);

impl fmt::Display for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Selection::Mode => {
                writeln!(f, "  Index    Clock Mode")?;
                for entry in CLOCK_MODES {
                    writeln!(f, "     {:2}   {}", entry.mode.bits(), entry.mode)?;
                }
            }
            Selection::Pattern => {
                writeln!(f, "  Index    Helicity Pattern")?;
                for (i, name) in PATTERN_NAMES.iter().enumerate() {
                    writeln!(f, "     {i:2}   {name}")?;
                }
            }
            Selection::Delay => {
                writeln!(f, "  Index    Reporting Delay [windows]")?;
                for (i, windows) in DELAY_WINDOWS.iter().enumerate() {
                    writeln!(f, "     {i:2}   {windows:8}")?;
                }
            }
            Selection::TSettle => {
                let half = TSETTLE_USEC.len() / 2;
                writeln!(f, "  Index    TSettle [usec]     Index    TSettle [usec]")?;
                let pairs = TSETTLE_USEC[..half].iter().zip(&TSETTLE_USEC[half..]);
                for (i, (left, right)) in pairs.enumerate() {
                    let j = i + half;
                    writeln!(f, "     {i:2}   {left:8.0}               {j:2}   {right:8.0}")?;
                }
            }
            Selection::TStable => {
                writeln!(f, "  Index    TStable [usec]")?;
                for (i, usec) in TSTABLE_USEC.iter().enumerate() {
                    writeln!(f, "     {i:2}   {usec:8.2}")?;
                }
            }
            Selection::BoardClock => {
                writeln!(f, "  Index    Board Clock [MHz]")?;
                for (i, mhz) in BOARD_CLOCK_MHZ.iter().enumerate() {
                    writeln!(f, "     {i:2}   {mhz:8}")?;
                }
            }
        }
        Ok(())
    }
}

/// One selection menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Clock mode
    Mode,
    /// Helicity pattern
    Pattern,
    /// Reporting delay
    Delay,
    /// Settle time
    TSettle,
    /// Stable time
    TStable,
    /// Board clock output
    BoardClock,
}

impl Selection {
    /// Every menu, in display order
    pub const ALL: [Self; 6] = [
        Self::Mode,
        Self::Pattern,
        Self::Delay,
        Self::TSettle,
        Self::TStable,
        Self::BoardClock,
    ];

    /// Name accepted by [`Selection::parse_list`]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mode => "mode",
            Self::Pattern => "pattern",
            Self::Delay => "delay",
            Self::TSettle => "tsettle",
            Self::TStable => "tstable",
            Self::BoardClock => "boardclock",
        }
    }

    /// Menu for this selection
    pub const fn menu(self) -> Menu {
        Menu(self)
    }

    /// Menu text
    pub fn render(self) -> String {
        self.menu().to_string()
    }

    /// Parse a comma separated list such as `mode,pattern,tstable`
    ///
    /// Duplicates are dropped and the result is in display order.
    ///
    /// # Errors
    ///
    /// Returns the first name that is not a menu.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, UnknownSelection> {
        let mut wanted = [false; Self::ALL.len()];
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let sel: Self = name.parse()?;
            wanted[sel as usize] = true;
        }
        Ok(Self::ALL
            .into_iter()
            .zip(wanted)
            .filter_map(|(sel, on)| on.then_some(sel))
            .collect())
    }
}

impl FromStr for Selection {
    type Err = UnknownSelection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|sel| sel.name() == lower)
            .ok_or_else(|| UnknownSelection(s.to_string()))
    }
}

/// Name that is not a selection menu
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown selection {0:?} (expected mode, pattern, delay, tsettle, tstable or boardclock)")]
pub struct UnknownSelection(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsettle_menu_has_two_columns() {
        let menu = tsettle_selections();
        let lines: Vec<&str> = menu.lines().collect();
        assert_eq!(lines.len(), 1 + 16);
        assert_eq!(lines[1], "      0          5               16        120");
        assert!(lines[16].ends_with("31       1000"));
    }

    #[test]
    fn menus_list_every_index() {
        assert_eq!(mode_selections().lines().count(), 1 + 4);
        assert!(mode_selections().contains("Free Clock"));
        assert_eq!(pattern_selections().lines().count(), 1 + 11);
        assert!(pattern_selections().contains("     10   32-Pair"));
        assert_eq!(reporting_delay_selections().lines().count(), 1 + 16);
        assert!(tstable_selections().contains("     31   33330.00"));
        assert!(board_clock_selections().contains("      1         20"));
    }

    #[test]
    fn menu_writes_into_any_formatter() {
        use std::fmt::Write as _;
        let mut out = String::new();
        write!(out, "{}", Selection::BoardClock.menu()).unwrap();
        assert_eq!(out, board_clock_selections());
        assert_eq!(out.lines().count(), 1 + 2);
    }

    #[test]
    fn parse_list_orders_and_dedups() {
        assert_eq!(
            Selection::parse_list("tstable, mode,tstable").unwrap(),
            vec![Selection::Mode, Selection::TStable]
        );
        assert_eq!(Selection::parse_list("BoardClock").unwrap(), vec![Selection::BoardClock]);
        assert!(Selection::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn parse_list_rejects_unknown() {
        let err = Selection::parse_list("mode,clock").unwrap_err();
        assert_eq!(err, UnknownSelection("clock".into()));
    }
}
