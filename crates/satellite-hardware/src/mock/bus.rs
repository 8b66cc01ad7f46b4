//! Mock USB bus for testing and development.
//!
//! The bus keeps a table of "plugged in" devices. Tests attach and detach
//! devices through a [`MockBusHandle`]; when a watcher is running the bus
//! emits the matching hot-plug notifications, filtered by vendor id like the
//! host monitor would.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use satellite_core::constants::{ELGATO_VENDOR_ID, XENCELABS_VENDOR_ID};
use tokio::sync::mpsc;
use tracing::debug;

use crate::{
    HardwareError, Result,
    mock::{MockDeck, MockDeckHandle, MockQuickKeys, MockQuickKeysHandle},
    traits::DeviceBus,
    types::{DeckInfo, DeviceListing, HotplugEvent, UsbDevice},
};

/// USB product id reported for mock Stream Decks.
pub const MOCK_DECK_PRODUCT_ID: u16 = 0x006c;

/// USB product id reported for mock Quick Keys dongles.
pub const MOCK_QUICK_KEYS_PRODUCT_ID: u16 = 0x5202;

#[derive(Debug)]
struct Slot<D> {
    usb: UsbDevice,
    device: Option<D>,
}

impl<D> Slot<D> {
    fn listing(&self) -> DeviceListing {
        DeviceListing {
            path: self.usb.path.clone(),
            product_id: self.usb.product_id,
            serial_number: self.usb.serial_number.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct BusState {
    decks: BTreeMap<String, Slot<MockDeck>>,
    quick_keys: BTreeMap<String, Slot<MockQuickKeys>>,
    failing_opens: HashSet<String>,
    fail_watch: bool,
    watcher: Option<(Vec<u16>, mpsc::Sender<HotplugEvent>)>,
    scans: usize,
}

impl BusState {
    fn notify(&self, event: HotplugEvent) {
        if let Some((vendor_ids, tx)) = &self.watcher
            && vendor_ids.contains(&event.device().vendor_id)
            && tx.try_send(event).is_err()
        {
            debug!("Mock hot-plug notification dropped");
        }
    }
}

/// Mock USB bus.
///
/// # Examples
///
/// ```
/// use satellite_hardware::mock::MockBus;
/// use satellite_hardware::traits::DeviceBus;
/// use satellite_hardware::types::DeckInfo;
///
/// #[tokio::main]
/// async fn main() -> satellite_hardware::Result<()> {
///     let (bus, handle) = MockBus::new();
///     let _deck = handle.attach_deck("1-1", DeckInfo::new("Stream Deck", "AL01", 15, 5, 72));
///
///     let listed = bus.list_decks().await?;
///     assert_eq!(listed.len(), 1);
///     assert_eq!(listed[0].serial_number.as_deref(), Some("AL01"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    /// Create an empty bus and its control handle.
    pub fn new() -> (Self, MockBusHandle) {
        let state = Arc::new(Mutex::new(BusState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockBusHandle { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        lock(&self.state)
    }
}

impl DeviceBus for MockBus {
    type Deck = MockDeck;
    type QuickKeys = MockQuickKeys;

    async fn list_decks(&self) -> Result<Vec<DeviceListing>> {
        let mut state = self.state();
        state.scans += 1;
        Ok(state.decks.values().map(Slot::listing).collect())
    }

    async fn open_deck(&self, path: &str) -> Result<MockDeck> {
        let mut state = self.state();
        if state.failing_opens.contains(path) {
            return Err(HardwareError::open_failed(path, "permission denied"));
        }
        state
            .decks
            .get_mut(path)
            .ok_or_else(|| HardwareError::open_failed(path, "no such device"))?
            .device
            .take()
            .ok_or_else(|| HardwareError::open_failed(path, "device busy"))
    }

    async fn list_quick_keys(&self) -> Result<Vec<DeviceListing>> {
        Ok(self.state().quick_keys.values().map(Slot::listing).collect())
    }

    async fn open_quick_keys(&self, path: &str) -> Result<MockQuickKeys> {
        let mut state = self.state();
        if state.failing_opens.contains(path) {
            return Err(HardwareError::open_failed(path, "permission denied"));
        }
        state
            .quick_keys
            .get_mut(path)
            .ok_or_else(|| HardwareError::open_failed(path, "no such device"))?
            .device
            .take()
            .ok_or_else(|| HardwareError::open_failed(path, "device busy"))
    }

    async fn watch(&self, vendor_ids: &[u16]) -> Result<mpsc::Receiver<HotplugEvent>> {
        let mut state = self.state();
        if state.fail_watch {
            return Err(HardwareError::watcher_failed("usb monitor unavailable"));
        }
        let (tx, rx) = mpsc::channel(32);
        state.watcher = Some((vendor_ids.to_vec(), tx));
        Ok(rx)
    }

    async fn unwatch(&self) -> Result<()> {
        self.state().watcher = None;
        Ok(())
    }
}

/// Handle for plugging mock devices into a [`MockBus`].
#[derive(Debug, Clone)]
pub struct MockBusHandle {
    state: Arc<Mutex<BusState>>,
}

impl MockBusHandle {
    /// Plug in a Stream Deck at `path`.
    ///
    /// The listing carries the deck's serial number. Emits `Attached` when
    /// the bus is being watched.
    pub fn attach_deck(&self, path: &str, info: DeckInfo) -> MockDeckHandle {
        let usb = UsbDevice::new(ELGATO_VENDOR_ID, MOCK_DECK_PRODUCT_ID, path)
            .with_serial_number(info.serial_number.clone());
        let (deck, handle) = MockDeck::new(info);

        let mut state = lock(&self.state);
        state.decks.insert(
            path.to_string(),
            Slot {
                usb: usb.clone(),
                device: Some(deck),
            },
        );
        state.notify(HotplugEvent::Attached(usb));
        handle
    }

    /// Plug in a Quick Keys dongle at `path`.
    pub fn attach_quick_keys(&self, path: &str) -> MockQuickKeysHandle {
        let usb = UsbDevice::new(XENCELABS_VENDOR_ID, MOCK_QUICK_KEYS_PRODUCT_ID, path);
        let (keys, handle) = MockQuickKeys::new(path);

        let mut state = lock(&self.state);
        state.quick_keys.insert(
            path.to_string(),
            Slot {
                usb: usb.clone(),
                device: Some(keys),
            },
        );
        state.notify(HotplugEvent::Attached(usb));
        handle
    }

    /// Unplug whatever device sits at `path`. Emits `Detached` when watched.
    ///
    /// Returns `false` if nothing was plugged in there.
    pub fn detach(&self, path: &str) -> bool {
        let mut state = lock(&self.state);
        let usb = match state.decks.remove(path) {
            Some(slot) => slot.usb,
            None => match state.quick_keys.remove(path) {
                Some(slot) => slot.usb,
                None => return false,
            },
        };
        state.notify(HotplugEvent::Detached(usb));
        true
    }

    /// Emit a raw hot-plug notification without touching the device table.
    pub fn notify(&self, event: HotplugEvent) {
        lock(&self.state).notify(event);
    }

    /// Make opening `path` fail (or succeed again).
    pub fn fail_open(&self, path: &str, fail: bool) {
        let mut state = lock(&self.state);
        if fail {
            state.failing_opens.insert(path.to_string());
        } else {
            state.failing_opens.remove(path);
        }
    }

    /// Make [`DeviceBus::watch`] fail.
    pub fn fail_watch(&self, fail: bool) {
        lock(&self.state).fail_watch = fail;
    }

    pub fn is_watching(&self) -> bool {
        lock(&self.state).watcher.is_some()
    }

    /// Number of Stream Deck enumerations performed so far.
    pub fn scan_count(&self) -> usize {
        lock(&self.state).scans
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mini(serial: &str) -> DeckInfo {
        DeckInfo::new("Stream Deck Mini", serial, 6, 3, 80)
    }

    #[tokio::test]
    async fn test_open_takes_device_once() {
        let (bus, handle) = MockBus::new();
        handle.attach_deck("1-1", mini("MINI01"));

        assert!(bus.open_deck("1-1").await.is_ok());
        assert!(matches!(
            bus.open_deck("1-1").await,
            Err(HardwareError::OpenFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_failure_injection() {
        let (bus, handle) = MockBus::new();
        handle.attach_quick_keys("2-1");
        handle.fail_open("2-1", true);

        assert!(bus.open_quick_keys("2-1").await.is_err());

        handle.fail_open("2-1", false);
        assert!(bus.open_quick_keys("2-1").await.is_ok());
    }

    #[tokio::test]
    async fn test_watch_filters_vendor() {
        let (bus, handle) = MockBus::new();
        let mut events = bus.watch(&[ELGATO_VENDOR_ID]).await.unwrap();

        handle.attach_quick_keys("2-1");
        handle.attach_deck("1-1", mini("MINI01"));
        assert!(handle.detach("1-1"));

        let attached = events.recv().await.unwrap();
        assert!(matches!(attached, HotplugEvent::Attached(ref usb) if usb.path == "1-1"));
        let detached = events.recv().await.unwrap();
        assert!(matches!(detached, HotplugEvent::Detached(ref usb) if usb.path == "1-1"));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_watch_failure() {
        let (bus, handle) = MockBus::new();
        handle.fail_watch(true);
        assert!(matches!(
            bus.watch(&[ELGATO_VENDOR_ID]).await,
            Err(HardwareError::WatcherFailed { .. })
        ));
        assert!(!handle.is_watching());
    }

    #[tokio::test]
    async fn test_unwatch_stops_notifications() {
        let (bus, handle) = MockBus::new();
        let mut events = bus.watch(&[ELGATO_VENDOR_ID]).await.unwrap();
        bus.unwatch().await.unwrap();

        handle.attach_deck("1-1", mini("MINI01"));

        assert!(!handle.is_watching());
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_detach_unknown_path() {
        let (_bus, handle) = MockBus::new();
        assert!(!handle.detach("9-9"));
    }

    #[tokio::test]
    async fn test_scan_count() {
        let (bus, handle) = MockBus::new();
        bus.list_decks().await.unwrap();
        bus.list_decks().await.unwrap();
        assert_eq!(handle.scan_count(), 2);
    }
}
