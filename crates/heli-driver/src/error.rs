//! Error types for helicity generator operations

use heli_chip::RegisterField;
use thiserror::Error;

/// Result type alias for helicity generator operations
pub type Result<T> = std::result::Result<T, HeliError>;

/// Errors that can occur during helicity generator operations
#[derive(Debug, Error)]
pub enum HeliError {
    /// A register operation was attempted before a successful `init`
    #[error("Helicity generator library is not initialized")]
    NotInitialized,

    /// Nothing answered the presence probe
    #[error("No addressable module found at A24 address {bus_address:#08x} (local {local_address:#x}): {reason}")]
    DeviceNotFound {
        /// Requested A24 address
        bus_address: u32,
        /// Translated local address
        local_address: usize,
        /// Probe failure reported by the bus
        reason: String,
    },

    /// A field value outside its valid range
    #[error("Invalid {field} value {value:#x} (max {max:#x})")]
    OutOfRange {
        /// Offending register field
        field: RegisterField,
        /// Rejected value
        value: u32,
        /// Largest accepted value
        max: u32,
    },

    /// Failure reported by the bus port
    #[error("Bus error: {reason}")]
    BusError {
        /// Reason for failure
        reason: String,
    },

    /// I/O error while setting up a bus backend
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl HeliError {
    /// Create a bus error
    pub fn bus_error(reason: impl Into<String>) -> Self {
        Self::BusError {
            reason: reason.into(),
        }
    }

    /// Create an out of range error
    pub fn out_of_range(field: RegisterField, value: impl Into<u32>, max: impl Into<u32>) -> Self {
        Self::OutOfRange {
            field,
            value: value.into(),
            max: max.into(),
        }
    }

    /// Whether the error originated on the bus rather than in validation or state checks
    pub const fn is_bus_error(&self) -> bool {
        matches!(self, Self::BusError { .. } | Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_names_field() {
        let err = HeliError::out_of_range(RegisterField::Pattern, 11u8, 10u8);
        assert_eq!(err.to_string(), "Invalid pattern value 0xb (max 0xa)");
        assert!(!err.is_bus_error());
    }

    #[test]
    fn device_not_found_message() {
        let err = HeliError::DeviceNotFound {
            bus_address: 0xA0_0000,
            local_address: 0x1000,
            reason: "bus timeout".into(),
        };
        assert!(err.to_string().contains("0xa00000"));
    }
}
