//! Silicon model for the JLab helicity generator board.
//!
//! This crate has **no dependencies** and **no hardware access**; it is a
//! pure model of the module: register offsets and masks per firmware
//! revision, the A24 bus window, and the lookup tables that turn register
//! indices into physical quantities.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`window`] | A24 window (default base `0xA00000`, 16 bytes, AM `0x39`) |
//! | [`regs`] | Register offsets, clock register bits, [`regs::RegisterMap`] |
//! | [`tables`] | Settle/stable time, clock mode, delay, pattern, board clock |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod regs;
pub mod tables;
pub mod window;

pub use regs::{FirmwareRevision, RegisterField, RegisterMap};
pub use tables::{BoardClock, ClockMode};
