//! Error types for eufy-device

use eufy_registry::{RegistryError, ValidationError};

/// Errors reported by a remote device handle
///
/// The handle classifies failures at its boundary: `BrokenPipe` means the
/// transport dropped and a reconnect may fix it, `Io` covers everything else.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Connection broken: {0}")]
    BrokenPipe(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, TransportError::BrokenPipe(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::BrokenPipe => TransportError::BrokenPipe(err.to_string()),
            _ => TransportError::Io(err.to_string()),
        }
    }
}

/// Stage at which device initialization failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    Connect,
    Update,
}

impl std::fmt::Display for InitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitStage::Connect => write!(f, "connect"),
            InitStage::Update => write!(f, "update"),
        }
    }
}

/// Errors raised by a device mirror
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The device could not be brought up; it was not published
    #[error("Failed to initialize device {device_id} during {stage}: {source}")]
    Init {
        device_id: String,
        stage: InitStage,
        #[source]
        source: TransportError,
    },

    /// A written value does not satisfy the property description
    #[error("Invalid write: {0}")]
    Validation(#[from] ValidationError),

    /// The device rejected a write; published state is unchanged
    #[error("Write to {property} failed: {source}")]
    Write {
        property: String,
        #[source]
        source: TransportError,
    },

    #[error("Device has no property named {0}")]
    UnknownProperty(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Errors from the polling scheduler
#[derive(Debug, thiserror::Error)]
pub enum PollingError {
    #[error("Too many polled devices (limit {limit})")]
    TooManyDevices { limit: usize },

    #[error("Polling task for {device_id} failed to stop: {reason}")]
    TaskJoin { device_id: String, reason: String },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Errors raised by the adapter
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Polling error: {0}")]
    Polling(#[from] PollingError),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device already added: {0}")]
    DuplicateDevice(String),
}

/// Result type for device mirror operations
pub type Result<T> = std::result::Result<T, DeviceError>;
