//! Hardware device trait definitions.
//!
//! This module defines the contract between the surface pipeline and the
//! per-family USB/HID drivers. Two device families are supported: bitmap
//! decks (Stream Deck) and text/color panels (Xencelabs Quick Keys). A third
//! trait, [`DeviceBus`], covers enumeration, opening and hot-plug watching.
//!
//! All methods take `&self`: drivers are shared between the manager loop and
//! the tasks a wrapper spawns (queue workers, status timers), so they keep
//! their mutable state behind interior locks.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use std::time::Duration;

use satellite_core::Rgb;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{
    DeckInfo, DeviceListing, DisplayOrientation, HotplugEvent, QuickKeysBrightness, SurfaceEvent,
    WheelSpeed,
};

/// Bitmap key deck.
///
/// Every key is an independent raw RGB image at [`DeckInfo::icon_size`].
/// The full panel can also be filled from one RGBA image of
/// [`DeckInfo::panel_size`].
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use [`AnyDeck`](crate::devices::AnyDeck) for concrete
/// dispatch or a generic type parameter.
pub trait DeckDevice: Send + Sync {
    /// Geometry and identity of the opened deck.
    fn info(&self) -> &DeckInfo;

    /// Write a raw RGB image (`icon_size² × 3` bytes) to one key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is out of range, the buffer has the wrong
    /// length, or the write fails.
    async fn fill_key(&self, key: u8, rgb: &[u8]) -> Result<()>;

    /// Write a raw RGBA image covering the whole key grid.
    async fn fill_panel(&self, rgba: &[u8]) -> Result<()>;

    /// Clear every key to black.
    async fn clear_panel(&self) -> Result<()>;

    /// Set the backlight brightness (0-100).
    async fn set_brightness(&self, percent: u8) -> Result<()>;

    /// Take the input event receiver.
    ///
    /// Returns `None` once the receiver has been taken.
    fn take_events(&self) -> Option<mpsc::Receiver<SurfaceEvent>>;

    /// Release the hardware handle.
    async fn close(&self) -> Result<()>;
}

/// Xencelabs Quick Keys text/color panel.
///
/// Eight text slots, one wheel with an RGB ring, an overlay text primitive
/// and a handful of discrete settings. The panel talks to its USB dongle
/// over a radio link, so it reports `Connected`/`Disconnected` events.
pub trait QuickKeysDevice: Send + Sync {
    /// Host path the device was opened from.
    fn path(&self) -> &str;

    /// Whether the radio link is currently up.
    fn is_connected(&self) -> bool;

    async fn set_wheel_speed(&self, speed: WheelSpeed) -> Result<()>;

    async fn set_display_orientation(&self, orientation: DisplayOrientation) -> Result<()>;

    /// Set the sleep timeout in minutes; `0` disables sleeping.
    async fn set_sleep_timeout(&self, minutes: u8) -> Result<()>;

    async fn set_display_brightness(&self, level: QuickKeysBrightness) -> Result<()>;

    /// Set the label of one of the eight text slots.
    async fn set_key_text(&self, slot: u8, text: &str) -> Result<()>;

    async fn set_wheel_color(&self, color: Rgb) -> Result<()>;

    /// Show `text` across the display for `duration`, then fall back to the key labels.
    async fn show_overlay_text(&self, duration: Duration, text: &str) -> Result<()>;

    /// Take the input event receiver.
    fn take_events(&self) -> Option<mpsc::Receiver<SurfaceEvent>>;

    async fn close(&self) -> Result<()>;
}

/// Host USB access for both device families.
pub trait DeviceBus: Send + Sync {
    /// Concrete deck type opened by this bus.
    type Deck: DeckDevice + 'static;

    /// Concrete Quick Keys type opened by this bus.
    type QuickKeys: QuickKeysDevice + 'static;

    /// List connected Stream Decks.
    async fn list_decks(&self) -> Result<Vec<DeviceListing>>;

    /// Open the Stream Deck at `path`.
    async fn open_deck(&self, path: &str) -> Result<Self::Deck>;

    /// List connected Quick Keys dongles.
    async fn list_quick_keys(&self) -> Result<Vec<DeviceListing>>;

    /// Open the Quick Keys at `path`.
    async fn open_quick_keys(&self, path: &str) -> Result<Self::QuickKeys>;

    /// Start hot-plug monitoring for the given vendor ids.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::WatcherFailed`](crate::HardwareError::WatcherFailed)
    /// when the host monitor cannot be started.
    async fn watch(&self, vendor_ids: &[u16]) -> Result<mpsc::Receiver<HotplugEvent>>;

    /// Stop hot-plug monitoring.
    async fn unwatch(&self) -> Result<()>;
}
