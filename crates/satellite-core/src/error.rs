use thiserror::Error;

use crate::types::DeviceId;

#[derive(Error, Debug)]
pub enum Error {
    // Device lifecycle errors
    #[error("Failed to open device at {path}: {message}")]
    HardwareOpenFailure { path: String, message: String },

    #[error("Device not registered: {0}")]
    UnknownDevice(DeviceId),

    #[error("Failed to start hot-plug monitoring: {0}")]
    MonitorStartFailure(String),

    // Command errors
    #[error("Unsupported operation on {device}: {operation}")]
    UnsupportedOperation { device: String, operation: String },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    // Rendering errors
    #[error("Image transform failed for key {key}: {message}")]
    TransformFailure { key: u8, message: String },

    #[error("Hardware write failed: {0}")]
    HardwareWriteFailure(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new open failure for the device at `path`.
    pub fn open_failure(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HardwareOpenFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(device: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            device: device.into(),
            operation: operation.into(),
        }
    }

    /// Create a new transform failure for `key`.
    pub fn transform(key: u8, message: impl Into<String>) -> Self {
        Self::TransformFailure {
            key,
            message: message.into(),
        }
    }

    /// Create a new unknown device error.
    pub fn unknown_device(id: &DeviceId) -> Self {
        Self::UnknownDevice(id.clone())
    }

    /// Whether the error is local to a single command and leaves the device usable.
    #[must_use]
    pub fn is_command_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedOperation { .. }
                | Self::InvalidCommand(_)
                | Self::InvalidColor(_)
                | Self::UnknownDevice(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
