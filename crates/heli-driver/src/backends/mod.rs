//! Bus port implementations
//!
//! Two backends available:
//! - **Mmap**: memory-mapped bus window from a device file (real hardware)
//! - **Simulated**: in-memory register windows (CI, demos, no hardware)

pub mod mmap;
pub mod simulated;

pub use mmap::{MmapBus, MmapWindow};
pub use simulated::SimulatedBus;
