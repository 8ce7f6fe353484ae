//! Error types for the registry crate

use crate::value::ValueType;

/// Errors raised by a registry when publishing devices or values
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A value was published for a device the registry has never seen
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// A device with the same id was already published
    #[error("Device already published: {0}")]
    DuplicateDevice(String),

    /// The device description does not declare this property
    #[error("Unknown property {property} on device {device_id}")]
    UnknownProperty {
        device_id: String,
        property: String,
    },
}

/// A value that does not satisfy its property description
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Property {property} is read-only")]
    ReadOnly { property: String },

    #[error("Property {property} expects a value of type {expected}, got {found}")]
    TypeMismatch {
        property: String,
        expected: ValueType,
        found: ValueType,
    },

    #[error("Value {value} is out of range for property {property} ({minimum:?}..={maximum:?})")]
    OutOfRange {
        property: String,
        value: i64,
        minimum: Option<i64>,
        maximum: Option<i64>,
    },

    #[error("Value {value:?} is not one of the allowed values for property {property}")]
    NotInEnum { property: String, value: String },

    #[error("Invalid value for property {property}: {reason}")]
    InvalidFormat { property: String, reason: String },
}

/// Convenience type alias for registry results
pub type Result<T> = std::result::Result<T, RegistryError>;
