//! Memory-mapped bus window
//!
//! Maps a bus window that the VME bridge driver exposes as a device file
//! (or `/dev/mem` at the bridge's physical window) and performs volatile
//! byte accesses into it.
//!
//! - Minimal unsafe (mmap, munmap and the volatile accesses only)
//! - Every access is bounds-checked against the mapping
//! - The bus-wide lock is an in-process lock plus an exclusive `flock` on the
//!   device file, so separate processes sharing the crate serialize too
//!
//! A bus error on real hardware is delivered by the bridge as `SIGBUS`, which
//! cannot be turned into a `Result`; `probe` therefore only checks that the
//! address lies inside the mapping before reading it.

use crate::bus::{BusPort, LocalAddr, ProcessLock};
use crate::error::{HeliError, Result};
use rustix::fs::{flock, FlockOperation};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Placement of a mapped window on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmapWindow {
    /// Bus (A24) address of the first mapped byte
    pub bus_base: u32,
    /// Mapped length in bytes
    pub size: usize,
    /// Offset of the window inside the device file
    pub file_offset: u64,
}

impl MmapWindow {
    /// Full 16 MB A24 space starting at file offset 0
    pub const A24: Self = Self {
        bus_base: 0,
        size: heli_chip::window::A24_MAX as usize + 1,
        file_offset: 0,
    };

    /// Whether the window covers `bus_address`
    pub fn contains(&self, bus_address: u32) -> bool {
        bus_address
            .checked_sub(self.bus_base)
            .is_some_and(|off| (off as usize) < self.size)
    }
}

/// Bus port backed by a memory-mapped device file
#[derive(Debug)]
pub struct MmapBus {
    ptr: NonNull<u8>,
    window: MmapWindow,
    file: File,
    path: PathBuf,
    bus_lock: ProcessLock,
}

// SAFETY: Send - MmapBus owns its mapping exclusively. The mapping is
// process-wide, so moving the owner between threads does not invalidate it.
unsafe impl Send for MmapBus {}

// SAFETY: Sync - every access through &self is a single bounds-checked
// volatile byte read or write; the driver serializes register sequences with
// its own mutex. Concurrent byte accesses are what the hardware sees anyway.
unsafe impl Sync for MmapBus {}

impl MmapBus {
    /// Open `path` and map `window`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The device file cannot be opened
    /// - The window is empty
    /// - mmap fails
    pub fn open(path: impl AsRef<Path>, window: MmapWindow) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(
            "Mapping bus window {}: A24 {:#08x}+{:#x} at file offset {:#x}",
            path.display(),
            window.bus_base,
            window.size,
            window.file_offset
        );

        if window.size == 0 {
            return Err(HeliError::bus_error("Bus window size is 0"));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                tracing::error!("Cannot open {}: {e}", path.display());
                e
            })?;

        // SAFETY: mmap is unsafe but its preconditions hold:
        // - file is open read/write and kept in the struct for the mapping's lifetime
        // - size is non-zero (checked above)
        // - MAP_SHARED so writes reach the device, not a private copy
        // - the result is checked; Drop unmaps exactly this range
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                window.size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                &file,
                window.file_offset,
            )
        }
        .map_err(|e| {
            tracing::error!("mmap of {} failed: {e}", path.display());
            HeliError::bus_error(format!("mmap of {} failed: {e}", path.display()))
        })?;

        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| HeliError::bus_error("mmap returned a null mapping"))?;

        tracing::info!(
            "Mapped {} ({:#x} bytes at {ptr:p}) for A24 {:#08x}",
            path.display(),
            window.size,
            window.bus_base
        );

        Ok(Self {
            ptr,
            window,
            file,
            path: path.to_path_buf(),
            bus_lock: ProcessLock::new(),
        })
    }

    /// Device file backing the mapping
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mapped window
    pub const fn window(&self) -> MmapWindow {
        self.window
    }

    /// Byte pointer for `addr` if it lies inside the mapping
    fn checked_ptr(&self, addr: LocalAddr) -> Result<*mut u8> {
        let base = self.ptr.as_ptr() as usize;
        match addr.get().checked_sub(base) {
            // SAFETY: offset < size, so the result stays inside the mapping
            Some(offset) if offset < self.window.size => Ok(unsafe { self.ptr.as_ptr().add(offset) }),
            _ => Err(HeliError::bus_error(format!(
                "Out of window access at {addr} (mapping {:p}+{:#x})",
                self.ptr, self.window.size
            ))),
        }
    }
}

impl BusPort for MmapBus {
    fn translate(&self, bus_address: u32) -> Result<LocalAddr> {
        if !self.window.contains(bus_address) {
            return Err(HeliError::bus_error(format!(
                "A24 {bus_address:#08x} is outside the mapped window {:#08x}+{:#x}",
                self.window.bus_base, self.window.size
            )));
        }
        let offset = (bus_address - self.window.bus_base) as usize;
        Ok(LocalAddr::new(self.ptr.as_ptr() as usize + offset))
    }

    fn probe(&self, addr: LocalAddr) -> Result<u8> {
        self.read_byte(addr)
    }

    fn read_byte(&self, addr: LocalAddr) -> Result<u8> {
        let p = self.checked_ptr(addr)?;
        // SAFETY: read_volatile necessary for MMIO - hardware can change value.
        // p is inside the live mapping (checked_ptr) and u8 has no alignment needs.
        Ok(unsafe { std::ptr::read_volatile(p) })
    }

    fn write_byte(&self, addr: LocalAddr, value: u8) -> Result<()> {
        let p = self.checked_ptr(addr)?;
        // SAFETY: write_volatile necessary for MMIO - triggers hardware side effects.
        // p is inside the live, writable mapping (checked_ptr).
        unsafe { std::ptr::write_volatile(p, value) };
        Ok(())
    }

    fn lock_bus(&self) -> Result<()> {
        self.bus_lock.lock();
        if let Err(e) = flock(&self.file, FlockOperation::LockExclusive) {
            self.bus_lock.unlock();
            tracing::error!("flock on {} failed: {e}", self.path.display());
            return Err(HeliError::bus_error(format!("Cannot lock bus: {e}")));
        }
        Ok(())
    }

    fn unlock_bus(&self) -> Result<()> {
        let res = flock(&self.file, FlockOperation::Unlock);
        if !self.bus_lock.unlock() {
            return Err(HeliError::bus_error("Bus lock released while not held"));
        }
        res.map_err(|e| HeliError::bus_error(format!("Cannot unlock bus: {e}")))
    }
}

impl Drop for MmapBus {
    fn drop(&mut self) {
        // SAFETY: ptr/size are exactly the range mapped in open(); Drop runs once
        // and no LocalAddr can be dereferenced without going through self.
        if let Err(e) = unsafe { munmap(self.ptr.as_ptr().cast(), self.window.size) } {
            tracing::warn!("munmap of {} failed: {e}", self.path.display());
        }
        tracing::debug!("Unmapped {}", self.path.display());
    }
}
