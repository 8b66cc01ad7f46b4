//! Driver-level errors.
//!
//! Drivers report what went wrong on the wire; the surface crate decides what
//! that means for the device via the `From<HardwareError>` conversion at the
//! bottom of this file.

pub type Result<T> = std::result::Result<T, HardwareError>;

/// Failure reported by a USB/HID driver or the hot-plug watcher.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The handle lost its device (unplugged, radio link gone, channel closed).
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Enumerated but not openable, e.g. claimed by another process.
    #[error("Failed to open {path}: {message}")]
    OpenFailed { path: String, message: String },

    /// The device family has no such primitive.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// HID report exchange failed.
    #[error("HID communication failed: {message}")]
    CommunicationError { message: String },

    /// Rejected before reaching the device (wrong buffer size, out-of-range key).
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// The device refused or dropped a write.
    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Hot-plug watcher failed: {message}")]
    WatcherFailed { message: String },
}

impl HardwareError {
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    pub fn open_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    pub fn watcher_failed(message: impl Into<String>) -> Self {
        Self::WatcherFailed {
            message: message.into(),
        }
    }
}

/// Open failures keep their path, watcher failures become fatal monitor
/// failures and everything else is a write failure on an opened device.
impl From<HardwareError> for satellite_core::Error {
    fn from(error: HardwareError) -> Self {
        match error {
            HardwareError::OpenFailed { path, message } => {
                satellite_core::Error::HardwareOpenFailure { path, message }
            }
            HardwareError::WatcherFailed { message } => {
                satellite_core::Error::MonitorStartFailure(message)
            }
            other => satellite_core::Error::HardwareWriteFailure(other.to_string()),
        }
    }
}
