//! Mock Xencelabs Quick Keys implementation for testing and development.
//!
//! The mock records every setting it receives together with the (tokio) time
//! it arrived, so timer-driven behaviour can be asserted under a paused clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use satellite_core::Rgb;
use satellite_core::constants::QUICK_KEYS_TEXT_SLOTS;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::{
    HardwareError, Result,
    traits::QuickKeysDevice,
    types::{DisplayOrientation, QuickKeysBrightness, SurfaceEvent, WheelSpeed},
};

/// A call recorded by a [`MockQuickKeys`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickKeysCall {
    WheelSpeed(WheelSpeed),
    Orientation(DisplayOrientation),
    SleepTimeout(u8),
    Brightness(QuickKeysBrightness),
    KeyText { slot: u8, text: String },
    WheelColor(Rgb),
    Overlay { duration: Duration, text: String },
    Close,
}

#[derive(Debug, Default)]
struct QuickKeysState {
    calls: Vec<(Instant, QuickKeysCall)>,
}

/// Mock Quick Keys panel.
///
/// # Examples
///
/// ```
/// use satellite_hardware::mock::{MockQuickKeys, QuickKeysCall};
/// use satellite_hardware::traits::QuickKeysDevice;
///
/// #[tokio::main]
/// async fn main() -> satellite_hardware::Result<()> {
///     let (keys, handle) = MockQuickKeys::new("/dev/hidraw7");
///
///     keys.set_key_text(0, "MUTE").await?;
///     assert_eq!(
///         handle.calls(),
///         vec![QuickKeysCall::KeyText { slot: 0, text: "MUTE".into() }]
///     );
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockQuickKeys {
    path: String,
    state: Arc<Mutex<QuickKeysState>>,
    connected: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    events_rx: Mutex<Option<mpsc::Receiver<SurfaceEvent>>>,
}

impl MockQuickKeys {
    /// Create a connected mock panel at `path`.
    pub fn new(path: impl Into<String>) -> (Self, MockQuickKeysHandle) {
        let path = path.into();
        let (events_tx, events_rx) = mpsc::channel(32);
        let state = Arc::new(Mutex::new(QuickKeysState::default()));
        let connected = Arc::new(AtomicBool::new(true));
        let fail_writes = Arc::new(AtomicBool::new(false));

        let keys = Self {
            path: path.clone(),
            state: Arc::clone(&state),
            connected: Arc::clone(&connected),
            fail_writes: Arc::clone(&fail_writes),
            events_rx: Mutex::new(Some(events_rx)),
        };

        let handle = MockQuickKeysHandle {
            path,
            state,
            connected,
            fail_writes,
            events_tx,
        };

        (keys, handle)
    }

    fn record(&self, call: QuickKeysCall) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HardwareError::write_failed(format!(
                "{} rejected {:?}",
                self.path, call
            )));
        }
        lock(&self.state).calls.push((Instant::now(), call));
        Ok(())
    }
}

impl QuickKeysDevice for MockQuickKeys {
    fn path(&self) -> &str {
        &self.path
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn set_wheel_speed(&self, speed: WheelSpeed) -> Result<()> {
        self.record(QuickKeysCall::WheelSpeed(speed))
    }

    async fn set_display_orientation(&self, orientation: DisplayOrientation) -> Result<()> {
        self.record(QuickKeysCall::Orientation(orientation))
    }

    async fn set_sleep_timeout(&self, minutes: u8) -> Result<()> {
        self.record(QuickKeysCall::SleepTimeout(minutes))
    }

    async fn set_display_brightness(&self, level: QuickKeysBrightness) -> Result<()> {
        self.record(QuickKeysCall::Brightness(level))
    }

    async fn set_key_text(&self, slot: u8, text: &str) -> Result<()> {
        if slot >= QUICK_KEYS_TEXT_SLOTS {
            return Err(HardwareError::invalid_data(format!(
                "Text slot {} out of range (0-{})",
                slot,
                QUICK_KEYS_TEXT_SLOTS - 1
            )));
        }
        self.record(QuickKeysCall::KeyText {
            slot,
            text: text.to_string(),
        })
    }

    async fn set_wheel_color(&self, color: Rgb) -> Result<()> {
        self.record(QuickKeysCall::WheelColor(color))
    }

    async fn show_overlay_text(&self, duration: Duration, text: &str) -> Result<()> {
        self.record(QuickKeysCall::Overlay {
            duration,
            text: text.to_string(),
        })
    }

    fn take_events(&self) -> Option<mpsc::Receiver<SurfaceEvent>> {
        lock(&self.events_rx).take()
    }

    async fn close(&self) -> Result<()> {
        lock(&self.state)
            .calls
            .push((Instant::now(), QuickKeysCall::Close));
        Ok(())
    }
}

/// Handle for inspecting and driving a [`MockQuickKeys`].
#[derive(Debug, Clone)]
pub struct MockQuickKeysHandle {
    path: String,
    state: Arc<Mutex<QuickKeysState>>,
    connected: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    events_tx: mpsc::Sender<SurfaceEvent>,
}

impl MockQuickKeysHandle {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All calls recorded so far, oldest first.
    pub fn calls(&self) -> Vec<QuickKeysCall> {
        lock(&self.state)
            .calls
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Overlay texts with the time each was shown.
    pub fn overlays(&self) -> Vec<(Instant, Duration, String)> {
        lock(&self.state)
            .calls
            .iter()
            .filter_map(|(at, call)| match call {
                QuickKeysCall::Overlay { duration, text } => Some((*at, *duration, text.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of overlays showing exactly `text`.
    pub fn overlay_count(&self, text: &str) -> usize {
        self.overlays()
            .iter()
            .filter(|(_, _, shown)| shown == text)
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.calls().contains(&QuickKeysCall::Close)
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Inject a raw input event.
    ///
    /// # Errors
    ///
    /// Returns an error if the panel's event receiver has been dropped.
    pub async fn send_event(&self, event: SurfaceEvent) -> Result<()> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("Quick Keys event channel closed"))
    }

    pub async fn press(&self, key: u8) -> Result<()> {
        self.send_event(SurfaceEvent::KeyDown(key)).await
    }

    pub async fn release(&self, key: u8) -> Result<()> {
        self.send_event(SurfaceEvent::KeyUp(key)).await
    }

    /// Drop the radio link and emit `Disconnected`.
    pub async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.send_event(SurfaceEvent::Disconnected).await
    }

    /// Re-establish the radio link and emit `Connected`.
    pub async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        self.send_event(SurfaceEvent::Connected).await
    }

    /// Set the link state without emitting an event, e.g. before opening.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
