//! Register-level driver for the JLab helicity generator VME board.
//!
//! The board sits in A24 space and exposes eight byte-wide registers that
//! select the helicity pattern, reporting delay, settle and stable times,
//! clock mode and board clock output. This crate maps the board through a
//! [`BusPort`], validates every value before it reaches the bus, and derives
//! the resulting helicity window timing.
//!
//! # Bus backends
//!
//! ```text
//! Hardware:
//!   MmapBus      - bus window mapped from the VME bridge's device file
//!
//! Development / CI:
//!   SimulatedBus - in-memory register windows, fault injection
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use heli_driver::{Configuration, GeneratorConfig, HelicityGenerator, MmapBus, MmapWindow};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = MmapBus::open("/dev/vme_a24", MmapWindow::A24)?;
//! let heli = HelicityGenerator::open(bus, &GeneratorConfig::from_env())?;
//!
//! heli.with_bus_lock(|h| {
//!     h.set_configuration(&Configuration { tsettle: 2, tstable: 4, delay: 3, pattern: 1, clock: 0 })?;
//!     println!("{}", h.format_status(false)?);
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! # Locking
//!
//! Each handle owns one mutex. Every register operation holds it for its
//! whole duration, and the bundle operations ([`HelicityGenerator::set_configuration`],
//! [`HelicityGenerator::configuration`], [`HelicityGenerator::timing`],
//! [`HelicityGenerator::format_status`]) take it exactly once. The bus-wide
//! lock is coarser and only taken by [`HelicityGenerator::with_bus_lock`].

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod access;
pub mod backends;
mod bundle;
pub mod bus;
mod config;
mod device;
mod error;
pub mod selections;
mod status;
mod timing;

pub use backends::{MmapBus, MmapWindow, SimulatedBus};
pub use bundle::Configuration;
pub use bus::{BusLockGuard, BusPort, LocalAddr};
pub use config::{parse_hex_u32, GeneratorConfig, InitFlags};
pub use device::HelicityGenerator;
pub use error::{HeliError, Result};
pub use selections::{Menu, Selection, UnknownSelection};
pub use status::{FirmwareDate, StatusReport, StatusSnapshot};
pub use timing::Timing;

pub use heli_chip::{BoardClock, ClockMode, FirmwareRevision, RegisterField, RegisterMap};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        BoardClock, BusPort, ClockMode, Configuration, FirmwareRevision, GeneratorConfig,
        HeliError, HelicityGenerator, InitFlags, RegisterField, RegisterMap, Result, Selection,
        Timing,
    };
}
