//! Simulated (in-memory) bus
//!
//! Hosts one or more helicity generator register windows at chosen A24
//! addresses. Accesses outside every window fail the way an empty VME slot
//! does, so `init` against a missing board reports `DeviceNotFound`.
//!
//! Used by the test suites and by `heli --simulate`. Knobs for tests:
//! - month register timeouts (the real board raises BERR on offset 0)
//! - write fault injection
//! - a write counter, to prove that rejected operations never touch the bus

use crate::bus::{BusPort, LocalAddr, ProcessLock};
use crate::error::{HeliError, Result};
use heli_chip::regs;
use heli_chip::window::{is_a24, WINDOW_SIZE};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Local address at which A24 address 0 appears.
pub const SIM_LOCAL_BASE: usize = 0x9000_0000;

/// In-memory bus with helicity generator windows.
#[derive(Debug)]
pub struct SimulatedBus {
    /// Register windows keyed by A24 base address
    modules: Mutex<BTreeMap<u32, [u8; WINDOW_SIZE]>>,
    month_timeout: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    bus_lock: ProcessLock,
}

impl SimulatedBus {
    /// Bus with no boards installed
    pub fn new() -> Self {
        Self {
            modules: Mutex::new(BTreeMap::new()),
            month_timeout: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
            bus_lock: ProcessLock::new(),
        }
    }

    /// Bus with one board at `bus_address`
    pub fn with_board(bus_address: u32) -> Self {
        let bus = Self::new();
        bus.install(bus_address, [0x05, 0x17, 0x00, 0x23, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        bus
    }

    /// Install a board at `bus_address` with the given register contents
    ///
    /// Offsets 0, 1, 3 hold the firmware month, day and year.
    pub fn install(&self, bus_address: u32, contents: [u8; WINDOW_SIZE]) {
        tracing::debug!("Simulated board installed at A24 {bus_address:#08x}");
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bus_address, contents);
    }

    /// Make reads of the month register fail with a bus error
    pub fn set_month_timeout(&self, enabled: bool) {
        self.month_timeout.store(enabled, Ordering::SeqCst);
    }

    /// Make every write fail with a bus error
    pub fn set_fail_writes(&self, enabled: bool) {
        self.fail_writes.store(enabled, Ordering::SeqCst);
    }

    /// Number of successful byte writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw register byte of the board at `bus_address`, bypassing the driver
    pub fn peek(&self, bus_address: u32, offset: usize) -> Option<u8> {
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&bus_address)
            .and_then(|window| window.get(offset).copied())
    }

    /// Whether the bus-wide lock is held
    pub fn is_bus_locked(&self) -> bool {
        self.bus_lock.is_locked()
    }

    /// Run `f` on the window and offset containing `addr`
    fn with_cell<T>(&self, addr: LocalAddr, f: impl FnOnce(&mut u8, usize) -> T) -> Result<T> {
        let bus_address = addr
            .get()
            .checked_sub(SIM_LOCAL_BASE)
            .and_then(|a| u32::try_from(a).ok())
            .ok_or_else(|| HeliError::bus_error(format!("{addr} is outside the simulated bus")))?;

        let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        let (base, window) = modules
            .range_mut(..=bus_address)
            .next_back()
            .ok_or_else(|| HeliError::bus_error(format!("BERR at A24 {bus_address:#08x}")))?;

        let offset = (bus_address - *base) as usize;
        let cell = window
            .get_mut(offset)
            .ok_or_else(|| HeliError::bus_error(format!("BERR at A24 {bus_address:#08x}")))?;
        Ok(f(cell, offset))
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusPort for SimulatedBus {
    fn translate(&self, bus_address: u32) -> Result<LocalAddr> {
        if !is_a24(bus_address) {
            return Err(HeliError::bus_error(format!(
                "{bus_address:#x} is not an A24 address"
            )));
        }
        Ok(LocalAddr::new(SIM_LOCAL_BASE + bus_address as usize))
    }

    fn probe(&self, addr: LocalAddr) -> Result<u8> {
        self.read_byte(addr)
    }

    fn read_byte(&self, addr: LocalAddr) -> Result<u8> {
        let timeout = self.month_timeout.load(Ordering::SeqCst);
        self.with_cell(addr, |cell, offset| {
            if timeout && offset == regs::MONTH {
                Err(HeliError::bus_error(format!("BERR reading month register at {addr}")))
            } else {
                Ok(*cell)
            }
        })?
    }

    fn write_byte(&self, addr: LocalAddr, value: u8) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HeliError::bus_error(format!("Injected write fault at {addr}")));
        }
        self.with_cell(addr, |cell, _| *cell = value)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn lock_bus(&self) -> Result<()> {
        self.bus_lock.lock();
        Ok(())
    }

    fn unlock_bus(&self) -> Result<()> {
        if self.bus_lock.unlock() {
            Ok(())
        } else {
            Err(HeliError::bus_error("Bus lock released while not held"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A24: u32 = 0x00A0_0000;

    #[test]
    fn reads_and_writes_inside_window() {
        let bus = SimulatedBus::with_board(A24);
        let base = bus.translate(A24).unwrap();

        bus.write_byte(base.add(regs::PATTERN), 3).unwrap();
        assert_eq!(bus.read_byte(base.add(regs::PATTERN)).unwrap(), 3);
        assert_eq!(bus.peek(A24, regs::PATTERN), Some(3));
        assert_eq!(bus.write_count(), 1);
    }

    #[test]
    fn empty_slot_raises_berr() {
        let bus = SimulatedBus::with_board(A24);
        let elsewhere = bus.translate(0x00B0_0000).unwrap();
        assert!(bus.probe(elsewhere.add(1)).is_err());

        let past_window = bus.translate(A24).unwrap().add(WINDOW_SIZE);
        assert!(bus.read_byte(past_window).is_err());
    }

    #[test]
    fn month_timeout_only_hits_offset_zero() {
        let bus = SimulatedBus::with_board(A24);
        bus.set_month_timeout(true);
        let base = bus.translate(A24).unwrap();
        assert!(bus.read_byte(base).is_err());
        assert_eq!(bus.read_byte(base.add(regs::DAY)).unwrap(), 0x17);
    }

    #[test]
    fn injected_write_fault() {
        let bus = SimulatedBus::with_board(A24);
        bus.set_fail_writes(true);
        let base = bus.translate(A24).unwrap();
        assert!(bus.write_byte(base.add(regs::DELAY), 1).unwrap_err().is_bus_error());
        assert_eq!(bus.write_count(), 0);
    }

    #[test]
    fn rejects_non_a24_translation() {
        let bus = SimulatedBus::new();
        assert!(bus.translate(0x0100_0000).is_err());
    }
}
