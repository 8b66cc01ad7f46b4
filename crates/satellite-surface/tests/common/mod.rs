//! Common test utilities for integration tests.
//!
//! Builds a mock USB bus, a recording remote and a manager on top of them,
//! plus a few fixtures for the device models the tests plug in.
//!
//! # Timing
//!
//! Tests that only involve Quick Keys can run on a paused clock. Anything that
//! renders a status card or resamples a key image goes through the blocking
//! pool, so those tests run in real time and poll with [`wait_for`].

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use satellite_core::constants::SOURCE_ICON_SIZE;
use satellite_core::RemoteEvent;
use satellite_hardware::mock::{MockBus, MockBusHandle};
use satellite_hardware::{AnyBus, DeckInfo};
use satellite_surface::remote::RecordingRemote;
use satellite_surface::{DeviceManager, ManagerConfig, ManagerHandle};
use tokio::sync::mpsc;

/// Host label the recording remote reports.
pub const TEST_HOST: &str = "10.0.0.5";

/// Serial of the 72 px deck fixture.
pub const ORIGINAL_SERIAL: &str = "AL01";

/// Serial of the 96 px deck fixture.
pub const XL_SERIAL: &str = "XL01";

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Honours `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// 15-key deck with 72 px icons, same size as the source images.
pub fn original_deck() -> DeckInfo {
    DeckInfo::new("Stream Deck", ORIGINAL_SERIAL, 15, 5, 72)
}

/// 32-key deck with 96 px icons, so draws are resampled.
pub fn xl_deck() -> DeckInfo {
    DeckInfo::new("Stream Deck XL", XL_SERIAL, 32, 8, 96)
}

/// Solid source key image at the remote's icon size.
pub fn source_image(value: u8) -> Vec<u8> {
    let side = SOURCE_ICON_SIZE as usize;
    vec![value; side * side * 3]
}

/// Default configuration with a short rescan delay.
pub fn test_config() -> ManagerConfig {
    ManagerConfig {
        rescan_delay: Duration::from_millis(50),
        ..ManagerConfig::default()
    }
}

/// A started manager with its bus and remote.
pub struct Rig {
    pub manager: DeviceManager,
    pub usb: MockBusHandle,
    pub remote: RecordingRemote,
}

pub async fn rig() -> Rig {
    rig_with(test_config()).await
}

pub async fn rig_with(config: ManagerConfig) -> Rig {
    init_tracing();
    let (bus, usb) = MockBus::new();
    let remote = RecordingRemote::new(TEST_HOST);
    let manager = DeviceManager::start(AnyBus::Mock(bus), Arc::new(remote.clone()), config)
        .await
        .expect("manager should start on a healthy bus");
    Rig {
        manager,
        usb,
        remote,
    }
}

/// A manager running on its own task.
pub struct Running {
    pub handle: ManagerHandle,
    pub events: mpsc::Sender<RemoteEvent>,
    pub usb: MockBusHandle,
    pub remote: RecordingRemote,
}

impl Rig {
    pub fn spawn(self) -> Running {
        let (events, events_rx) = mpsc::channel(16);
        Running {
            handle: self.manager.spawn(events_rx),
            events,
            usb: self.usb,
            remote: self.remote,
        }
    }
}

impl Running {
    pub async fn send(&self, event: RemoteEvent) {
        self.events
            .send(event)
            .await
            .expect("manager should be receiving events");
    }
}

/// Poll `condition` until it holds, panicking after two seconds.
pub async fn wait_for(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
