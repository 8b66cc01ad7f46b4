//! Common types shared across hardware device implementations.
//!
//! This module defines the data exchanged with the device drivers: device
//! listings produced by enumeration, deck geometry, the discrete settings of
//! the Quick Keys panel, input events and hot-plug notifications.

use serde::{Deserialize, Serialize};

/// A device found during enumeration, not yet opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceListing {
    /// Host path used to open the device (e.g. `/dev/hidraw3`).
    pub path: String,

    /// USB product id.
    pub product_id: u16,

    /// Serial number, when the host API exposes one.
    pub serial_number: Option<String>,
}

impl DeviceListing {
    /// Create a new listing without a serial number.
    pub fn new(path: impl Into<String>, product_id: u16) -> Self {
        Self {
            path: path.into(),
            product_id,
            serial_number: None,
        }
    }

    /// Set the serial number.
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }
}

/// Geometry and identity of an opened bitmap deck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckInfo {
    /// Model name (e.g. "Stream Deck XL").
    pub model: String,

    /// Hardware serial number.
    pub serial_number: String,

    /// Total number of keys.
    pub key_count: u8,

    /// Number of key columns.
    pub key_columns: u8,

    /// Native edge length of one key image in pixels.
    pub icon_size: u32,
}

impl DeckInfo {
    /// Create deck info for a grid of `key_count` keys in `key_columns` columns.
    pub fn new(
        model: impl Into<String>,
        serial_number: impl Into<String>,
        key_count: u8,
        key_columns: u8,
        icon_size: u32,
    ) -> Self {
        Self {
            model: model.into(),
            serial_number: serial_number.into(),
            key_count,
            key_columns,
            icon_size,
        }
    }

    /// Number of key rows.
    pub fn key_rows(&self) -> u8 {
        if self.key_columns == 0 {
            return 0;
        }
        self.key_count.div_ceil(self.key_columns)
    }

    /// Pixel size `(width, height)` of a full-panel image.
    pub fn panel_size(&self) -> (u32, u32) {
        (
            u32::from(self.key_columns) * self.icon_size,
            u32::from(self.key_rows()) * self.icon_size,
        )
    }
}

/// Discrete display brightness levels of the Quick Keys panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuickKeysBrightness {
    Off,
    Low,
    Medium,
    Full,
}

impl QuickKeysBrightness {
    /// All levels from darkest to brightest.
    pub const ALL: [QuickKeysBrightness; 4] = [
        QuickKeysBrightness::Off,
        QuickKeysBrightness::Low,
        QuickKeysBrightness::Medium,
        QuickKeysBrightness::Full,
    ];
}

/// Response speed of the Quick Keys wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WheelSpeed {
    Slowest,
    Slower,
    #[default]
    Normal,
    Faster,
    Fastest,
}

/// Orientation of the Quick Keys display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayOrientation {
    #[default]
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

/// Raw input event emitted by a device, in physical key numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SurfaceEvent {
    /// Physical key pressed.
    KeyDown(u8),

    /// Physical key released.
    KeyUp(u8),

    /// Wheel turned one step counter-clockwise.
    WheelLeft,

    /// Wheel turned one step clockwise.
    WheelRight,

    /// Driver-level error.
    Error(String),

    /// Wireless link established.
    Connected,

    /// Wireless link lost.
    Disconnected,
}

/// A USB device as described by a hot-plug notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsbDevice {
    pub vendor_id: u16,
    pub product_id: u16,

    /// Host path; matches [`DeviceListing::path`] for the same device.
    pub path: String,

    pub serial_number: Option<String>,
}

impl UsbDevice {
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            path: path.into(),
            serial_number: None,
        }
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }
}

/// Hot-plug notification from the host USB stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugEvent {
    Attached(UsbDevice),
    Detached(UsbDevice),
}

impl HotplugEvent {
    /// The device the notification is about.
    pub fn device(&self) -> &UsbDevice {
        match self {
            HotplugEvent::Attached(device) | HotplugEvent::Detached(device) => device,
        }
    }
}
