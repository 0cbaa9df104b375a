//! Helicity generator device handle and lifecycle
//!
//! A [`HelicityGenerator`] owns its bus port and the register map of the board
//! it talks to. It starts uninitialized; [`HelicityGenerator::init`] locates
//! the board on the bus and every other register operation fails with
//! [`HeliError::NotInitialized`] until that has succeeded.
//!
//! `init` may be called again at any time. The new mapping replaces the old
//! one (a warning is logged); a failed re-init leaves the previous mapping in
//! place.

use crate::bus::{BusLockGuard, BusPort, LocalAddr};
use crate::config::{GeneratorConfig, InitFlags};
use crate::error::{HeliError, Result};
use heli_chip::window::PROBE_OFFSET;
use heli_chip::RegisterMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Handle to one helicity generator board
#[derive(Debug)]
pub struct HelicityGenerator<B: BusPort> {
    bus: B,
    map: RegisterMap,
    state: Mutex<DeviceState>,
}

/// Mutable state guarded by the device mutex
#[derive(Debug, Default)]
pub(crate) struct DeviceState {
    pub(crate) mapping: Option<Mapping>,
    pub(crate) debug: bool,
}

/// Where an initialized board lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mapping {
    /// Local address of register offset 0
    pub(crate) base: LocalAddr,
    /// A24 address passed to `init`
    pub(crate) bus_address: u32,
    /// Local minus bus address
    pub(crate) address_offset: i64,
}

impl<B: BusPort> HelicityGenerator<B> {
    /// Create an uninitialized handle
    pub fn new(bus: B, map: RegisterMap) -> Self {
        Self {
            bus,
            map,
            state: Mutex::new(DeviceState::default()),
        }
    }

    /// Create a handle and initialize it from `config`
    ///
    /// # Errors
    ///
    /// Returns error if the board cannot be found (see [`Self::init`]).
    pub fn open(bus: B, config: &GeneratorConfig) -> Result<Self> {
        let dev = Self::new(bus, config.register_map());
        dev.init(config.bus_address, config.flags)?;
        Ok(dev)
    }

    /// Locate the board at A24 address `bus_address`
    ///
    /// Translates the address through the bus port, probes the day register
    /// to confirm a board answers, and records the mapping.
    ///
    /// # Errors
    ///
    /// - Bus error if the address cannot be translated
    /// - [`HeliError::DeviceNotFound`] if the probe fails
    pub fn init(&self, bus_address: u32, flags: InitFlags) -> Result<()> {
        let mut state = self.lock_state();

        if state.mapping.is_some() {
            tracing::warn!("Re-initializing helicity generator library");
        }

        let local = self.bus.translate(bus_address).map_err(|e| {
            tracing::error!("Cannot translate A24 address {bus_address:#08x}: {e}");
            e
        })?;

        let rdata = self.bus.probe(local.add(PROBE_OFFSET)).map_err(|e| {
            tracing::error!(
                "No addressable module found at A24 address {bus_address:#08x} ({local}): {e}"
            );
            HeliError::DeviceNotFound {
                bus_address,
                local_address: local.get(),
                reason: e.to_string(),
            }
        })?;

        let debug = flags.contains(InitFlags::DEBUG);
        if debug {
            tracing::debug!(
                "Helicity generator found at {bus_address:#08x} ({local}), rdata = {rdata:#x}"
            );
        }

        #[allow(clippy::cast_possible_wrap)]
        let address_offset = (local.get() as i64).wrapping_sub(i64::from(bus_address));

        state.mapping = Some(Mapping {
            base: local,
            bus_address,
            address_offset,
        });
        state.debug = debug;

        tracing::info!(
            "Initialized helicity generator at A24 {bus_address:#08x} ({local}, {:?} register map)",
            self.map.revision()
        );
        Ok(())
    }

    /// Whether `init` has succeeded
    pub fn is_initialized(&self) -> bool {
        self.lock_state().mapping.is_some()
    }

    /// Enable or disable debug register tracing
    ///
    /// # Errors
    ///
    /// Returns [`HeliError::NotInitialized`] before `init`.
    pub fn set_debug(&self, enable: bool) -> Result<()> {
        let (mut state, _) = self.lock_initialized()?;
        state.debug = enable;
        Ok(())
    }

    /// Current debug flag
    ///
    /// # Errors
    ///
    /// Returns [`HeliError::NotInitialized`] before `init`.
    pub fn debug(&self) -> Result<bool> {
        Ok(self.lock_initialized()?.0.debug)
    }

    /// A24 address the board was initialized at
    ///
    /// # Errors
    ///
    /// Returns [`HeliError::NotInitialized`] before `init`.
    pub fn bus_address(&self) -> Result<u32> {
        Ok(self.lock_initialized()?.1.bus_address)
    }

    /// Difference between the local and the bus address space
    ///
    /// # Errors
    ///
    /// Returns [`HeliError::NotInitialized`] before `init`.
    pub fn address_offset(&self) -> Result<i64> {
        Ok(self.lock_initialized()?.1.address_offset)
    }

    /// Register masks in use
    pub const fn register_map(&self) -> &RegisterMap {
        &self.map
    }

    /// Underlying bus port
    pub const fn bus(&self) -> &B {
        &self.bus
    }

    /// Run `f` while holding the bus-wide lock
    ///
    /// Register operations never take the bus lock themselves; applications
    /// use this around a whole configuration transaction.
    ///
    /// # Errors
    ///
    /// Returns error if the lock cannot be taken, or whatever `f` returns.
    pub fn with_bus_lock<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let _bus = BusLockGuard::acquire(&self.bus)?;
        f(self)
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, DeviceState> {
        // Register contents live in hardware, so a panic mid-operation leaves
        // nothing inconsistent behind the mutex.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the device and return its mapping, failing before `init`
    pub(crate) fn lock_initialized(&self) -> Result<(MutexGuard<'_, DeviceState>, Mapping)> {
        let state = self.lock_state();
        let Some(mapping) = state.mapping else {
            tracing::error!("Helicity generator library is not initialized");
            return Err(HeliError::NotInitialized);
        };
        Ok((state, mapping))
    }
}
