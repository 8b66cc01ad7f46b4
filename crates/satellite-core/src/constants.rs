//! Core constants for the satellite surface client.
//!
//! This module centralizes the fixed numbers the device pipeline relies on:
//! the canonical image format the remote controller sends, the timing of
//! hot-plug rescans and status overlays, and the hard-coded capability
//! layout of each supported hardware family.
//!
//! # Usage
//!
//! ```
//! use satellite_core::constants::*;
//! use std::time::Duration;
//!
//! // Raw key images arrive as 72x72 RGB
//! assert_eq!(source_image_len(), 72 * 72 * 3);
//!
//! let delay = Duration::from_millis(DEFAULT_RESCAN_DELAY_MS);
//! assert_eq!(delay.as_secs(), 1);
//! ```

// ============================================================================
// Image Format
// ============================================================================

/// Edge length in pixels of the key images sent by the remote controller.
///
/// Every bitmap draw command carries a square raw image of this size. Devices
/// whose native key resolution differs need the image resampled first.
pub const SOURCE_ICON_SIZE: u32 = 72;

/// Bytes per pixel of raw RGB key images.
pub const RGB_CHANNELS: usize = 3;

/// Bytes per pixel of raw RGBA panel images (status cards).
pub const RGBA_CHANNELS: usize = 4;

/// Length in bytes of a canonical source key image.
#[must_use]
pub const fn source_image_len() -> usize {
    (SOURCE_ICON_SIZE * SOURCE_ICON_SIZE) as usize * RGB_CHANNELS
}

// ============================================================================
// Timing
// ============================================================================

/// Delay before the second rescan triggered by a hot-plug attach.
///
/// USB enumeration regularly lags the attach notification, so the manager
/// scans once immediately and once more after this delay.
pub const DEFAULT_RESCAN_DELAY_MS: u64 = 1000;

/// How long the hybrid device keeps an overlay visible before clearing it.
pub const STATUS_OVERLAY_DURATION_SECS: u64 = 5;

/// Interval at which the hybrid status overlay is re-asserted.
///
/// Must stay below [`STATUS_OVERLAY_DURATION_SECS`] or the overlay flickers off.
pub const STATUS_REASSERT_INTERVAL_MS: u64 = 3000;

/// Duration of the empty overlay used to clear a status message.
pub const STATUS_CLEAR_DURATION_SECS: u64 = 1;

// ============================================================================
// Status Text
// ============================================================================

/// Status shown before the remote controller has been reached.
pub const STATUS_CONNECTING: &str = "Connecting";

/// Status shown while the remote controller is attached.
pub const STATUS_CONNECTED: &str = "Connected";

/// Status shown after the remote controller went away.
pub const STATUS_DISCONNECTED: &str = "Disconnected";

// ============================================================================
// USB Vendors
// ============================================================================

/// Elgato USB vendor id (Stream Deck family).
pub const ELGATO_VENDOR_ID: u16 = 0x0fd9;

/// Xencelabs USB vendor id (Quick Keys family).
pub const XENCELABS_VENDOR_ID: u16 = 0x28bd;

// ============================================================================
// Quick Keys Layout
// ============================================================================

/// Prefix of synthesized Quick Keys device ids.
pub const QUICK_KEYS_ID_PREFIX: &str = "xencelabs-quick-keys";

/// Zero-padded width of the sequence part of synthesized ids.
pub const AUTO_ID_WIDTH: usize = 3;

/// Product name reported for Quick Keys devices.
pub const QUICK_KEYS_PRODUCT_NAME: &str = "Xencelabs Quick Keys";

/// Logical key count reported for Quick Keys devices.
pub const QUICK_KEYS_TOTAL: u8 = 12;

/// Logical keys per row reported for Quick Keys devices.
pub const QUICK_KEYS_PER_ROW: u8 = 6;

/// Number of physical text slots on a Quick Keys device.
pub const QUICK_KEYS_TEXT_SLOTS: u8 = 8;

/// Maximum characters the Quick Keys can render on one key.
pub const QUICK_KEYS_TEXT_MAX_CHARS: usize = 8;

/// Logical key index bound to the Quick Keys wheel.
pub const WHEEL_KEY_INDEX: u8 = 11;

// ============================================================================
// Channels
// ============================================================================

/// Default capacity of the manager's internal event channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_image_len() {
        assert_eq!(source_image_len(), 15_552);
    }

    #[test]
    fn test_reassert_before_overlay_expires() {
        assert!(STATUS_REASSERT_INTERVAL_MS < STATUS_OVERLAY_DURATION_SECS * 1000);
    }

    #[test]
    fn test_wheel_key_within_layout() {
        assert!(WHEEL_KEY_INDEX < QUICK_KEYS_TOTAL);
    }
}
