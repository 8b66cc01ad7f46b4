//! Device manager.
//!
//! The `DeviceManager` owns every wrapped device and is the only place the
//! registry changes. It reconciles three event sources on one task:
//!
//! ```text
//! ┌──────────────┐
//! │ RemoteEvent  │──┐
//! └──────────────┘  │     ┌──────────────────┐      ┌───────────────┐
//! ┌──────────────┐  ├────►│  DeviceManager   │─────►│ WrappedDevice │ ×N
//! │ HotplugEvent │──┤     │  (select! loop)  │      └───────┬───────┘
//! └──────────────┘  │     └────────┬─────────┘              │
//! ┌──────────────┐  │              │ announce / withdraw     │ key_down / key_up
//! │ ready change │──┘              ▼                         ▼
//! │ rescan timer │            RemoteClient ◄─────────────────┘
//! └──────────────┘
//! ```
//!
//! Every per-device call is isolated: a failure is logged and the loop moves
//! on. The only fatal error is failing to start the hot-plug watcher, which
//! [`DeviceManager::start`] returns.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use satellite_hardware::{AnyBus, mock::MockBus};
//! use satellite_surface::{DeviceManager, ManagerConfig, remote::RecordingRemote};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> satellite_core::Result<()> {
//!     let (bus, _usb) = MockBus::new();
//!     let remote = Arc::new(RecordingRemote::new("10.0.0.5"));
//!     let (_events_tx, events_rx) = mpsc::channel(100);
//!
//!     let manager = DeviceManager::start(AnyBus::Mock(bus), remote, ManagerConfig::default()).await?;
//!     let handle = manager.spawn(events_rx);
//!
//!     // ... feed remote events through `_events_tx` ...
//!
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use satellite_core::{DeviceId, DeviceState, Error, RemoteEvent, Result};
use satellite_hardware::{AnyBus, DeviceBus, HotplugEvent, UsbDevice};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::card::{BasicCardGenerator, CardGenerator};
use crate::config::ManagerConfig;
use crate::remote::SharedRemote;
use crate::wrappers::{
    BitmapDevice, DeviceNotification, HybridDevice, RemoteContext, Surface, WrappedDevice,
    hybrid::StatusTiming, transition,
};

/// Owner of the device registry and router between hardware and remote.
pub struct DeviceManager {
    bus: AnyBus,
    remote: SharedRemote,
    config: ManagerConfig,
    cards: Arc<dyn CardGenerator>,

    /// Registered devices.
    devices: HashMap<DeviceId, WrappedDevice>,

    /// Host path of each registered device, for removal matching.
    paths: HashMap<String, DeviceId>,

    /// Synthesized Quick Keys ids by host path. Never shrinks.
    auto_ids: HashMap<String, DeviceId>,

    /// Status text currently shown on every device.
    status: String,

    hotplug_rx: Option<mpsc::Receiver<HotplugEvent>>,
    notify_tx: mpsc::Sender<DeviceNotification>,
    notify_rx: mpsc::Receiver<DeviceNotification>,
    rescan_tx: mpsc::Sender<()>,
    rescan_rx: mpsc::Receiver<()>,
    rescan_timer: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceManager")
            .field("devices", &self.device_ids())
            .field("status", &self.status)
            .field("watching", &self.hotplug_rx.is_some())
            .finish_non_exhaustive()
    }
}

impl DeviceManager {
    /// Validate `config` and start hot-plug monitoring.
    ///
    /// No device is opened yet; [`run`](Self::run) scans first thing, or call
    /// [`scan_devices`](Self::scan_devices) directly.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unusable configuration and
    /// [`Error::MonitorStartFailure`] when the watcher cannot be started.
    pub async fn start(bus: AnyBus, remote: SharedRemote, config: ManagerConfig) -> Result<Self> {
        config.validate()?;

        let hotplug_rx = bus
            .watch(&config.watched_vendor_ids)
            .await
            .map_err(|e| Error::MonitorStartFailure(e.to_string()))?;
        info!(
            version = satellite_core::VERSION,
            vendors = ?config.watched_vendor_ids,
            "Hot-plug monitoring started"
        );

        let (notify_tx, notify_rx) = mpsc::channel(config.event_channel_capacity);
        let (rescan_tx, rescan_rx) = mpsc::channel(1);

        Ok(Self {
            bus,
            remote,
            status: config.initial_status.clone(),
            config,
            cards: Arc::new(BasicCardGenerator),
            devices: HashMap::new(),
            paths: HashMap::new(),
            auto_ids: HashMap::new(),
            hotplug_rx: Some(hotplug_rx),
            notify_tx,
            notify_rx,
            rescan_tx,
            rescan_rx,
            rescan_timer: None,
        })
    }

    /// Use `cards` to render status cards on bitmap decks.
    pub fn with_card_generator(mut self, cards: Arc<dyn CardGenerator>) -> Self {
        self.cards = cards;
        self
    }

    /// Ids of all registered devices, sorted.
    pub fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<_> = self.devices.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Look up a registered device.
    pub fn device(&self, device_id: &DeviceId) -> Option<&WrappedDevice> {
        self.devices.get(device_id)
    }

    /// Status text currently shown on devices.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Enumerate both device families and bring up anything not yet registered.
    pub async fn scan_devices(&mut self) {
        let decks = match self.bus.list_decks().await {
            Ok(decks) => decks,
            Err(error) => {
                warn!(error = %error, "Failed to list Stream Decks");
                Vec::new()
            }
        };
        for listing in decks {
            let Some(serial) = listing.serial_number else {
                debug!(path = %listing.path, "Skipping Stream Deck without serial number");
                continue;
            };
            let device_id = DeviceId::new(serial);
            if self.devices.contains_key(&device_id) {
                continue;
            }

            let mut state = DeviceState::Discovered;
            debug!(device_id = %device_id, path = %listing.path, "Opening Stream Deck");
            transition(&device_id, &mut state, DeviceState::Opening);
            match self.bus.open_deck(&listing.path).await {
                Ok(deck) => {
                    transition(&device_id, &mut state, DeviceState::Initializing);
                    let device = BitmapDevice::new(
                        deck,
                        Arc::clone(&self.cards),
                        self.config.source_icon_size,
                    );
                    self.add_device(listing.path, WrappedDevice::Bitmap(device))
                        .await;
                }
                Err(error) => {
                    transition(&device_id, &mut state, DeviceState::Closed);
                    let error = Error::from(error);
                    warn!(device_id = %device_id, error = %error, "Failed to open Stream Deck");
                }
            }
        }

        let quick_keys = match self.bus.list_quick_keys().await {
            Ok(quick_keys) => quick_keys,
            Err(error) => {
                warn!(error = %error, "Failed to list Quick Keys");
                Vec::new()
            }
        };
        for listing in quick_keys {
            let device_id = self.auto_id(&listing.path);
            if self.devices.contains_key(&device_id) {
                continue;
            }

            let mut state = DeviceState::Discovered;
            debug!(device_id = %device_id, path = %listing.path, "Opening Quick Keys");
            transition(&device_id, &mut state, DeviceState::Opening);
            match self.bus.open_quick_keys(&listing.path).await {
                Ok(keys) => {
                    transition(&device_id, &mut state, DeviceState::Initializing);
                    let device =
                        HybridDevice::new(device_id, keys, StatusTiming::from(&self.config));
                    self.add_device(listing.path, WrappedDevice::Hybrid(device))
                        .await;
                }
                Err(error) => {
                    transition(&device_id, &mut state, DeviceState::Closed);
                    let error = Error::from(error);
                    warn!(device_id = %device_id, error = %error, "Failed to open Quick Keys");
                }
            }
        }
    }

    /// Synthesized id for the Quick Keys at `path`, stable for the process lifetime.
    fn auto_id(&mut self, path: &str) -> DeviceId {
        let next = self.auto_ids.len() + 1;
        let prefix = &self.config.quick_keys_id_prefix;
        self.auto_ids
            .entry(path.to_string())
            .or_insert_with(|| DeviceId::synthesized(prefix, next))
            .clone()
    }

    async fn add_device(&mut self, path: String, mut device: WrappedDevice) {
        let device_id = device.device_id().clone();
        let context = RemoteContext::new(Arc::clone(&self.remote))
            .with_notifications(self.notify_tx.clone());

        if let Err(error) = device.initialize(context, &self.status).await {
            warn!(device_id = %device_id, error = %error, "Failed to initialize device");
            if let Err(error) = device.close().await {
                debug!(device_id = %device_id, error = %error, "Close after failed init");
            }
            return;
        }

        if device.is_ready() {
            self.announce(&device);
        }
        info!(
            device_id = %device_id,
            product = %device.product_name(),
            ready = device.is_ready(),
            "Device registered"
        );
        self.paths.insert(path, device_id.clone());
        self.devices.insert(device_id, device);
    }

    fn announce(&self, device: &WrappedDevice) {
        self.remote.announce_device(
            device.device_id(),
            &device.product_name(),
            device.register_props(),
        );
    }

    /// Remove the device matching a detach notification.
    ///
    /// Matches on host path, falling back to the serial number as id. A
    /// device that is not registered is ignored.
    pub async fn remove_device(&mut self, usb: &UsbDevice) {
        let device_id = match self.paths.remove(&usb.path) {
            Some(device_id) => device_id,
            None => match usb.serial_number.clone().map(DeviceId::new) {
                Some(device_id) if self.devices.contains_key(&device_id) => device_id,
                _ => {
                    debug!(path = %usb.path, "Removed device was not registered");
                    return;
                }
            },
        };
        self.paths.retain(|_, id| *id != device_id);

        let Some(mut device) = self.devices.remove(&device_id) else {
            return;
        };
        info!(device_id = %device_id, "Device removed");
        self.remote.withdraw_device(&device_id);
        if let Err(error) = device.close().await {
            debug!(device_id = %device_id, error = %error, "Close of removed device failed");
        }
    }

    /// React to a hot-plug notification.
    pub async fn handle_hotplug(&mut self, event: HotplugEvent) {
        let vendor_id = event.device().vendor_id;
        if !self.config.watched_vendor_ids.contains(&vendor_id) {
            return;
        }
        match event {
            HotplugEvent::Attached(usb) => {
                debug!(path = %usb.path, vendor_id, "USB device attached");
                self.scan_devices().await;
                self.schedule_rescan();
            }
            HotplugEvent::Detached(usb) => {
                debug!(path = %usb.path, vendor_id, "USB device detached");
                self.remove_device(&usb).await;
            }
        }
    }

    /// Arrange one more scan after the configured delay, replacing any pending one.
    fn schedule_rescan(&mut self) {
        if let Some(timer) = self.rescan_timer.take() {
            timer.abort();
        }
        let delay = self.config.rescan_delay;
        let tx = self.rescan_tx.clone();
        self.rescan_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.try_send(()).is_err() {
                trace!("Rescan already pending");
            }
        }));
    }

    /// Route one event from the remote client.
    pub async fn handle_remote_event(&mut self, event: RemoteEvent) {
        let label = event_label(&event);
        if let Err(error) = self.dispatch(event).await {
            if error.is_command_error() {
                warn!(event = label, error = %error, "Remote command rejected");
            } else {
                error!(event = label, error = %error, "Remote command failed");
            }
        }
    }

    async fn dispatch(&mut self, event: RemoteEvent) -> Result<()> {
        match event {
            RemoteEvent::Connected => {
                info!("Remote connected");
                self.status = self.config.connected_status.clone();
                self.show_status_all().await;
                for device in self.devices.values().filter(|d| d.is_ready()) {
                    self.announce(device);
                }
                self.scan_devices().await;
            }
            RemoteEvent::Disconnected => {
                info!("Remote disconnected");
                self.status = self.config.disconnected_status.clone();
                self.show_status_all().await;
            }
            RemoteEvent::HostAddressChanged => {
                self.show_status_all().await;
            }
            RemoteEvent::SetBrightness { device_id, percent } => {
                self.device_mut(&device_id)?.set_brightness(percent).await?;
            }
            RemoteEvent::Blank { device_id } => {
                self.device_mut(&device_id)?.blank().await?;
            }
            RemoteEvent::Draw { device_id, command } => {
                self.device_mut(&device_id)?.draw(command).await?;
            }
            RemoteEvent::DeviceAcknowledged { device_id } => {
                self.device_mut(&device_id)?.device_added().await?;
            }
            other => {
                debug!(event = ?other, "Ignoring remote event");
            }
        }
        Ok(())
    }

    fn device_mut(&mut self, device_id: &DeviceId) -> Result<&mut WrappedDevice> {
        self.devices
            .get_mut(device_id)
            .ok_or_else(|| Error::unknown_device(device_id))
    }

    async fn show_status_all(&mut self) {
        let host = self.remote.host();
        for (device_id, device) in &mut self.devices {
            if let Err(error) = device.show_status(&host, &self.status).await {
                warn!(device_id = %device_id, error = %error, "Failed to show status");
            }
        }
    }

    /// React to a readiness change reported by a device.
    pub async fn handle_notification(&mut self, notification: DeviceNotification) {
        match notification {
            DeviceNotification::ReadyChanged { device_id, ready } => {
                let Some(device) = self.devices.get_mut(&device_id) else {
                    debug!(device_id = %device_id, "Readiness change for unregistered device");
                    return;
                };
                if !device.set_ready(ready) {
                    return;
                }
                info!(device_id = %device_id, ready, "Device link changed");
                if ready {
                    let device = &self.devices[&device_id];
                    self.announce(device);
                } else {
                    self.remote.withdraw_device(&device_id);
                }
            }
        }
    }

    /// Stop monitoring, cancel the pending rescan and close every device.
    ///
    /// Individual close failures are logged and otherwise ignored.
    pub async fn shutdown(&mut self) {
        if let Some(timer) = self.rescan_timer.take() {
            timer.abort();
        }
        if self.hotplug_rx.take().is_some()
            && let Err(error) = self.bus.unwatch().await
        {
            warn!(error = %error, "Failed to stop hot-plug monitoring");
        }

        self.paths.clear();
        let closing = self.devices.drain().map(|(device_id, mut device)| async move {
            if let Err(error) = device.close().await {
                warn!(device_id = %device_id, error = %error, "Failed to close device");
            }
        });
        join_all(closing).await;
        info!("Device manager stopped");
    }

    /// Drive the manager until `cancel` fires or the remote event stream ends.
    ///
    /// Scans once on entry and shuts down on exit; the manager is handed back
    /// for inspection.
    pub async fn run(
        mut self,
        mut remote_events: mpsc::Receiver<RemoteEvent>,
        cancel: CancellationToken,
    ) -> Self {
        self.scan_devices().await;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                event = remote_events.recv() => match event {
                    Some(event) => self.handle_remote_event(event).await,
                    None => {
                        info!("Remote event stream closed");
                        break;
                    }
                },

                event = next_hotplug(&mut self.hotplug_rx) => match event {
                    Some(event) => self.handle_hotplug(event).await,
                    None => {
                        warn!("Hot-plug monitor stopped");
                        self.hotplug_rx = None;
                    }
                },

                Some(notification) = self.notify_rx.recv() => {
                    self.handle_notification(notification).await;
                }

                Some(()) = self.rescan_rx.recv() => {
                    debug!("Delayed rescan");
                    self.rescan_timer = None;
                    self.scan_devices().await;
                }
            }
        }

        self.shutdown().await;
        self
    }

    /// Run the manager on its own task.
    pub fn spawn(self, remote_events: mpsc::Receiver<RemoteEvent>) -> ManagerHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(remote_events, cancel.clone()));
        ManagerHandle { cancel, task }
    }
}

/// Handle to a manager running on its own task.
#[derive(Debug)]
pub struct ManagerHandle {
    cancel: CancellationToken,
    task: JoinHandle<DeviceManager>,
}

impl ManagerHandle {
    /// Token that stops the manager when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the manager and wait for its shutdown to finish.
    ///
    /// Returns the stopped manager, or `None` if its task panicked.
    pub async fn shutdown(self) -> Option<DeviceManager> {
        self.cancel.cancel();
        match self.task.await {
            Ok(manager) => Some(manager),
            Err(error) => {
                error!(error = %error, "Device manager task failed");
                None
            }
        }
    }
}

async fn next_hotplug(rx: &mut Option<mpsc::Receiver<HotplugEvent>>) -> Option<HotplugEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn event_label(event: &RemoteEvent) -> &'static str {
    match event {
        RemoteEvent::Connected => "connected",
        RemoteEvent::Disconnected => "disconnected",
        RemoteEvent::HostAddressChanged => "host-address-changed",
        RemoteEvent::SetBrightness { .. } => "set-brightness",
        RemoteEvent::Blank { .. } => "blank",
        RemoteEvent::Draw { .. } => "draw",
        RemoteEvent::DeviceAcknowledged { .. } => "device-acknowledged",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{RecordingRemote, RemoteCall};
    use satellite_core::constants::{ELGATO_VENDOR_ID, XENCELABS_VENDOR_ID};
    use satellite_hardware::mock::{MockBus, MockBusHandle};
    use satellite_hardware::types::DeckInfo;

    async fn manager() -> (DeviceManager, MockBusHandle, RecordingRemote) {
        let (bus, usb) = MockBus::new();
        let remote = RecordingRemote::new("10.0.0.5");
        let manager = DeviceManager::start(
            AnyBus::Mock(bus),
            Arc::new(remote.clone()),
            ManagerConfig::default(),
        )
        .await
        .unwrap();
        (manager, usb, remote)
    }

    fn original() -> DeckInfo {
        DeckInfo::new("Stream Deck", "AL01", 15, 5, 72)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fails_without_watcher() {
        let (bus, usb) = MockBus::new();
        usb.fail_watch(true);

        let result = DeviceManager::start(
            AnyBus::Mock(bus),
            Arc::new(RecordingRemote::new("h")),
            ManagerConfig::default(),
        )
        .await;

        assert!(matches!(result, Err(Error::MonitorStartFailure(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_rejects_invalid_config() {
        let (bus, _usb) = MockBus::new();
        let config = ManagerConfig {
            event_channel_capacity: 0,
            ..ManagerConfig::default()
        };
        let result =
            DeviceManager::start(AnyBus::Mock(bus), Arc::new(RecordingRemote::new("h")), config)
                .await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_registers_and_announces() {
        let (mut manager, usb, remote) = manager().await;
        usb.attach_deck("1-1", original());
        usb.attach_quick_keys("2-1");

        manager.scan_devices().await;

        let ids: Vec<String> = manager
            .device_ids()
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["AL01", "xencelabs-quick-keys-001"]);
        assert_eq!(remote.announced().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_skips_registered_devices() {
        let (mut manager, usb, remote) = manager().await;
        usb.attach_deck("1-1", original());

        manager.scan_devices().await;
        manager.scan_devices().await;

        assert_eq!(manager.device_ids().len(), 1);
        assert_eq!(remote.announced().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_skips_device() {
        let (mut manager, usb, remote) = manager().await;
        usb.attach_deck("1-1", original());
        usb.fail_open("1-1", true);

        manager.scan_devices().await;
        assert!(manager.device_ids().is_empty());

        usb.fail_open("1-1", false);
        manager.scan_devices().await;
        assert_eq!(manager.device_ids().len(), 1);
        assert_eq!(remote.announced().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescan_already_pending_is_coalesced() {
        let (mut manager, _usb, _remote) = manager().await;
        manager.schedule_rescan();
        tokio::time::sleep(manager.config.rescan_delay * 2).await;
        manager.schedule_rescan();
        tokio::time::sleep(manager.config.rescan_delay * 2).await;

        let timer = manager.rescan_timer.take().unwrap();
        assert!(timer.is_finished());
        timer.await.unwrap();
        assert!(manager.rescan_rx.try_recv().is_ok());
        assert!(manager.rescan_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_failure_closes_handle() {
        let (mut manager, usb, remote) = manager().await;
        let deck = usb.attach_deck("1-1", original());
        deck.fail_writes(true);

        manager.scan_devices().await;

        assert!(manager.device_ids().is_empty());
        assert!(deck.is_closed());
        assert!(remote.announced().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_hybrid_not_announced() {
        let (mut manager, usb, remote) = manager().await;
        // Opened devices start with the link state set here
        let keys = usb.attach_quick_keys("2-1");
        keys.set_connected(false);

        manager.scan_devices().await;

        assert_eq!(manager.device_ids().len(), 1);
        assert!(remote.announced().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_id_stable_per_path() {
        let (mut manager, usb, _remote) = manager().await;
        usb.attach_quick_keys("2-1");
        usb.attach_quick_keys("2-2");
        manager.scan_devices().await;

        usb.detach("2-1");
        manager
            .remove_device(&UsbDevice::new(XENCELABS_VENDOR_ID, 0x5202, "2-1"))
            .await;
        usb.attach_quick_keys("2-1");
        manager.scan_devices().await;

        let ids: Vec<String> = manager
            .device_ids()
            .iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(
            ids,
            vec!["xencelabs-quick-keys-001", "xencelabs-quick-keys-002"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_device_withdraws_and_closes() {
        let (mut manager, usb, remote) = manager().await;
        let deck = usb.attach_deck("1-1", original());
        manager.scan_devices().await;

        manager
            .remove_device(&UsbDevice::new(ELGATO_VENDOR_ID, 0x006c, "1-1"))
            .await;

        assert!(manager.device_ids().is_empty());
        assert_eq!(remote.withdrawn(), vec![DeviceId::new("AL01")]);
        assert!(deck.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_by_serial_fallback() {
        let (mut manager, usb, remote) = manager().await;
        usb.attach_deck("1-1", original());
        manager.scan_devices().await;

        let renamed = UsbDevice::new(ELGATO_VENDOR_ID, 0x006c, "1-1.4").with_serial_number("AL01");
        manager.remove_device(&renamed).await;

        assert!(manager.device_ids().is_empty());
        assert_eq!(remote.withdrawn().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_unknown_device_is_noop() {
        let (mut manager, usb, remote) = manager().await;
        usb.attach_deck("1-1", original());
        manager.scan_devices().await;

        manager
            .remove_device(&UsbDevice::new(ELGATO_VENDOR_ID, 0x006c, "9-9"))
            .await;

        assert_eq!(manager.device_ids().len(), 1);
        assert!(remote.withdrawn().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_device_command_is_contained() {
        let (mut manager, _usb, _remote) = manager().await;
        manager
            .handle_remote_event(RemoteEvent::Blank {
                device_id: DeviceId::new("missing"),
            })
            .await;
        let result = manager
            .dispatch(RemoteEvent::Blank {
                device_id: DeviceId::new("missing"),
            })
            .await;
        assert!(matches!(result, Err(Error::UnknownDevice(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_sets_status_and_reannounces() {
        let (mut manager, usb, remote) = manager().await;
        let keys = usb.attach_quick_keys("2-1");
        manager.scan_devices().await;
        remote.clear();

        manager.handle_remote_event(RemoteEvent::Connected).await;

        assert_eq!(manager.status(), "Connected");
        assert_eq!(keys.overlay_count("Connected"), 1);
        assert_eq!(
            remote.announced(),
            vec![DeviceId::new("xencelabs-quick-keys-001")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_change_announces_and_withdraws() {
        let (mut manager, usb, remote) = manager().await;
        usb.attach_quick_keys("2-1");
        manager.scan_devices().await;
        remote.clear();
        let id = DeviceId::new("xencelabs-quick-keys-001");

        manager
            .handle_notification(DeviceNotification::ReadyChanged {
                device_id: id.clone(),
                ready: false,
            })
            .await;
        manager
            .handle_notification(DeviceNotification::ReadyChanged {
                device_id: id.clone(),
                ready: false,
            })
            .await;
        manager
            .handle_notification(DeviceNotification::ReadyChanged {
                device_id: id.clone(),
                ready: true,
            })
            .await;

        assert_eq!(
            remote.calls(),
            vec![
                RemoteCall::Withdraw(id.clone()),
                RemoteCall::Announce {
                    device_id: id,
                    product_name: "Xencelabs Quick Keys".into(),
                    props: satellite_core::RegisterProps::quick_keys(),
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_everything() {
        let (mut manager, usb, _remote) = manager().await;
        let deck = usb.attach_deck("1-1", original());
        let keys = usb.attach_quick_keys("2-1");
        manager.scan_devices().await;

        manager.shutdown().await;

        assert!(manager.device_ids().is_empty());
        assert!(deck.is_closed());
        assert!(keys.is_closed());
        assert!(!usb.is_watching());
    }
}
