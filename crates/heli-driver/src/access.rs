//! Register access layer
//!
//! The only code that touches the bus port after `init`. A [`Session`] holds
//! the device mutex for its whole lifetime, so an operation that needs
//! several registers opens one session and issues every access through it.
//! Dropping the session releases the mutex on every exit path.

use crate::bus::{BusPort, LocalAddr};
use crate::device::{DeviceState, HelicityGenerator};
use crate::error::{HeliError, Result};
use heli_chip::{RegisterField, RegisterMap};
use std::sync::MutexGuard;

/// Reject `value` unless it is a defined index that fits the register
pub(crate) fn check(map: &RegisterMap, field: RegisterField, value: u8) -> Result<()> {
    if value > field.max_index() || !map.fits(field, value) {
        let max = map.writable_max(field);
        tracing::error!("Invalid {field} value {value} (max {max})");
        return Err(HeliError::out_of_range(field, value, max));
    }
    Ok(())
}

/// Exclusive access to an initialized board's registers
pub(crate) struct Session<'a, B: BusPort> {
    _state: MutexGuard<'a, DeviceState>,
    bus: &'a B,
    map: RegisterMap,
    base: LocalAddr,
    bus_address: u32,
    debug: bool,
}

impl<B: BusPort> Session<'_, B> {
    /// Read `field`, masked to its bit-width
    pub(crate) fn read(&self, field: RegisterField) -> Result<u8> {
        let addr = self.base.add(field.offset());
        let raw = self.bus.read_byte(addr).map_err(|e| {
            tracing::error!("Read of {field} register at {addr} failed: {e}");
            e
        })?;
        let value = raw & self.map.mask(field);
        if self.debug {
            tracing::debug!("read  {field:>8} @ {addr} = {raw:#04x} (masked {value:#04x})");
        } else {
            tracing::trace!("read  {field:>8} @ {addr} = {raw:#04x}");
        }
        Ok(value)
    }

    /// Write `value` to `field`
    ///
    /// `value` must fit the register's bit-width; nothing reaches the bus
    /// otherwise.
    pub(crate) fn write(&self, field: RegisterField, value: u8) -> Result<()> {
        if !self.map.fits(field, value) {
            let mask = self.map.mask(field);
            tracing::error!("Invalid {field} value {value:#x} (register mask {mask:#x})");
            return Err(HeliError::out_of_range(field, value, mask));
        }

        let addr = self.base.add(field.offset());
        self.bus.write_byte(addr, value).map_err(|e| {
            tracing::error!("Write of {value:#04x} to {field} register at {addr} failed: {e}");
            e
        })?;
        if self.debug {
            tracing::debug!("write {field:>8} @ {addr} = {value:#04x}");
        } else {
            tracing::trace!("write {field:>8} @ {addr} = {value:#04x}");
        }
        Ok(())
    }

    /// A24 address of the board
    pub(crate) const fn bus_address(&self) -> u32 {
        self.bus_address
    }
}

impl<B: BusPort> HelicityGenerator<B> {
    /// Open a register session, failing before `init`
    pub(crate) fn session(&self) -> Result<Session<'_, B>> {
        let (state, mapping) = self.lock_initialized()?;
        let debug = state.debug;
        Ok(Session {
            _state: state,
            bus: self.bus(),
            map: *self.register_map(),
            base: mapping.base,
            bus_address: mapping.bus_address,
            debug,
        })
    }

    /// Read one register, masked to its bit-width
    ///
    /// # Errors
    ///
    /// - [`HeliError::NotInitialized`] before `init`
    /// - Bus error from the port
    pub fn read_register(&self, field: RegisterField) -> Result<u8> {
        self.session()?.read(field)
    }

    /// Write one register
    ///
    /// # Errors
    ///
    /// - [`HeliError::NotInitialized`] before `init`
    /// - [`HeliError::OutOfRange`] if `value` is not a defined index or
    ///   exceeds the register mask
    /// - Bus error from the port
    pub fn write_register(&self, field: RegisterField, value: u8) -> Result<()> {
        check(self.register_map(), field, value)?;
        self.session()?.write(field, value)
    }
}
