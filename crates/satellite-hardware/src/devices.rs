//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits (RPITIT, Edition 2024) are not object-safe, so
//! `Box<dyn DeckDevice>` is not available. These enums provide concrete
//! dispatch instead; the surface crate stores and spawns work on them, which
//! also keeps the returned futures `Send` without extra bounds.
//!
//! # Examples
//!
//! ```
//! use satellite_hardware::devices::AnyDeck;
//! use satellite_hardware::mock::MockDeck;
//! use satellite_hardware::types::DeckInfo;
//!
//! let (deck, _handle) = MockDeck::new(DeckInfo::new("Stream Deck", "AL01", 15, 5, 72));
//! let any_deck = AnyDeck::Mock(deck);
//! ```

use std::time::Duration;

use satellite_core::Rgb;
use tokio::sync::mpsc;

use crate::Result;
use crate::mock::{MockBus, MockDeck, MockQuickKeys};
use crate::traits::{DeckDevice, DeviceBus, QuickKeysDevice};
use crate::types::{
    DeckInfo, DeviceListing, DisplayOrientation, HotplugEvent, QuickKeysBrightness, SurfaceEvent,
    WheelSpeed,
};

/// Enum wrapper for bitmap deck dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDeck {
    /// Mock deck for development and testing.
    Mock(MockDeck),
}

impl DeckDevice for AnyDeck {
    fn info(&self) -> &DeckInfo {
        match self {
            Self::Mock(device) => device.info(),
        }
    }

    async fn fill_key(&self, key: u8, rgb: &[u8]) -> Result<()> {
        match self {
            Self::Mock(device) => device.fill_key(key, rgb).await,
        }
    }

    async fn fill_panel(&self, rgba: &[u8]) -> Result<()> {
        match self {
            Self::Mock(device) => device.fill_panel(rgba).await,
        }
    }

    async fn clear_panel(&self) -> Result<()> {
        match self {
            Self::Mock(device) => device.clear_panel().await,
        }
    }

    async fn set_brightness(&self, percent: u8) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_brightness(percent).await,
        }
    }

    fn take_events(&self) -> Option<mpsc::Receiver<SurfaceEvent>> {
        match self {
            Self::Mock(device) => device.take_events(),
        }
    }

    async fn close(&self) -> Result<()> {
        match self {
            Self::Mock(device) => device.close().await,
        }
    }
}

/// Enum wrapper for Quick Keys dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyQuickKeys {
    /// Mock panel for development and testing.
    Mock(MockQuickKeys),
}

impl QuickKeysDevice for AnyQuickKeys {
    fn path(&self) -> &str {
        match self {
            Self::Mock(device) => device.path(),
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Mock(device) => device.is_connected(),
        }
    }

    async fn set_wheel_speed(&self, speed: WheelSpeed) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_wheel_speed(speed).await,
        }
    }

    async fn set_display_orientation(&self, orientation: DisplayOrientation) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_display_orientation(orientation).await,
        }
    }

    async fn set_sleep_timeout(&self, minutes: u8) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_sleep_timeout(minutes).await,
        }
    }

    async fn set_display_brightness(&self, level: QuickKeysBrightness) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_display_brightness(level).await,
        }
    }

    async fn set_key_text(&self, slot: u8, text: &str) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_key_text(slot, text).await,
        }
    }

    async fn set_wheel_color(&self, color: Rgb) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_wheel_color(color).await,
        }
    }

    async fn show_overlay_text(&self, duration: Duration, text: &str) -> Result<()> {
        match self {
            Self::Mock(device) => device.show_overlay_text(duration, text).await,
        }
    }

    fn take_events(&self) -> Option<mpsc::Receiver<SurfaceEvent>> {
        match self {
            Self::Mock(device) => device.take_events(),
        }
    }

    async fn close(&self) -> Result<()> {
        match self {
            Self::Mock(device) => device.close().await,
        }
    }
}

/// Enum wrapper for USB bus dispatch.
///
/// Opened devices come back wrapped in [`AnyDeck`] / [`AnyQuickKeys`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyBus {
    /// Mock bus for development and testing.
    Mock(MockBus),
}

impl DeviceBus for AnyBus {
    type Deck = AnyDeck;
    type QuickKeys = AnyQuickKeys;

    async fn list_decks(&self) -> Result<Vec<DeviceListing>> {
        match self {
            Self::Mock(bus) => bus.list_decks().await,
        }
    }

    async fn open_deck(&self, path: &str) -> Result<AnyDeck> {
        match self {
            Self::Mock(bus) => bus.open_deck(path).await.map(AnyDeck::Mock),
        }
    }

    async fn list_quick_keys(&self) -> Result<Vec<DeviceListing>> {
        match self {
            Self::Mock(bus) => bus.list_quick_keys().await,
        }
    }

    async fn open_quick_keys(&self, path: &str) -> Result<AnyQuickKeys> {
        match self {
            Self::Mock(bus) => bus.open_quick_keys(path).await.map(AnyQuickKeys::Mock),
        }
    }

    async fn watch(&self, vendor_ids: &[u16]) -> Result<mpsc::Receiver<HotplugEvent>> {
        match self {
            Self::Mock(bus) => bus.watch(vendor_ids).await,
        }
    }

    async fn unwatch(&self) -> Result<()> {
        match self {
            Self::Mock(bus) => bus.unwatch().await,
        }
    }
}
