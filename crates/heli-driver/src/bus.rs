//! Bus port abstraction
//!
//! The driver never touches the VME bridge directly. Everything it needs from
//! the bus goes through [`BusPort`]: address translation, a presence probe,
//! single-byte reads and writes, and the bus-wide lock that applications hold
//! around whole configuration transactions.
//!
//! Two implementations ship with the crate:
//! - [`SimulatedBus`](crate::backends::SimulatedBus): in-memory register
//!   windows, for CI and for running the CLI without hardware
//! - [`MmapBus`](crate::backends::MmapBus): a memory-mapped bus window exposed
//!   as a device file

use crate::error::Result;
use std::fmt::{self, Debug};
use std::sync::{Condvar, Mutex, PoisonError};

/// Address in the local (process) address space of a mapped bus window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalAddr(usize);

impl LocalAddr {
    /// Wrap a raw local address
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Raw address value
    pub const fn get(self) -> usize {
        self.0
    }

    /// Address `offset` bytes further into the window
    #[must_use]
    pub const fn add(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

impl fmt::Display for LocalAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Capabilities the driver consumes from the bus transport.
///
/// All methods take `&self`; implementations provide their own interior
/// synchronization. Register-level serialization is the driver's job, so a
/// port only has to make each single-byte access sound.
pub trait BusPort: Debug + Send + Sync {
    /// Translate a bus (A24) address to a local address
    ///
    /// # Errors
    ///
    /// Returns error if the address is not mapped.
    fn translate(&self, bus_address: u32) -> Result<LocalAddr>;

    /// Read one byte, tolerating an absent device
    ///
    /// # Errors
    ///
    /// Returns error if nothing answers at `addr`.
    fn probe(&self, addr: LocalAddr) -> Result<u8>;

    /// Read one byte
    ///
    /// # Errors
    ///
    /// Returns error on a bus fault.
    fn read_byte(&self, addr: LocalAddr) -> Result<u8>;

    /// Write one byte
    ///
    /// # Errors
    ///
    /// Returns error on a bus fault.
    fn write_byte(&self, addr: LocalAddr, value: u8) -> Result<()>;

    /// Take the bus-wide lock, blocking until it is free
    ///
    /// # Errors
    ///
    /// Returns error if the lock cannot be taken.
    fn lock_bus(&self) -> Result<()>;

    /// Release the bus-wide lock
    ///
    /// # Errors
    ///
    /// Returns error if the lock cannot be released.
    fn unlock_bus(&self) -> Result<()>;
}

/// Holds the bus-wide lock until dropped.
#[derive(Debug)]
#[must_use = "the bus lock is released when the guard is dropped"]
pub struct BusLockGuard<'a, B: BusPort + ?Sized> {
    bus: &'a B,
}

impl<'a, B: BusPort + ?Sized> BusLockGuard<'a, B> {
    /// Take the bus lock of `bus`
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot take its lock.
    pub fn acquire(bus: &'a B) -> Result<Self> {
        bus.lock_bus()?;
        tracing::trace!("bus lock acquired");
        Ok(Self { bus })
    }
}

impl<B: BusPort + ?Sized> Drop for BusLockGuard<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.bus.unlock_bus() {
            tracing::error!("Failed to release bus lock: {e}");
        } else {
            tracing::trace!("bus lock released");
        }
    }
}

/// In-process lock with explicit lock/unlock calls.
///
/// `std::sync::Mutex` ties release to a guard's lifetime; the bus port
/// contract needs an unlock that can happen in a different call.
#[derive(Debug, Default)]
pub struct ProcessLock {
    held: Mutex<bool>,
    released: Condvar,
}

impl ProcessLock {
    /// Create an unlocked lock
    pub const fn new() -> Self {
        Self {
            held: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    /// Block until the lock is free, then take it
    pub fn lock(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while *held {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
    }

    /// Release the lock; returns `false` if it was not held
    pub fn unlock(&self) -> bool {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        let was_held = std::mem::replace(&mut *held, false);
        drop(held);
        self.released.notify_one();
        was_held
    }

    /// Whether the lock is currently taken
    pub fn is_locked(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
