//! Mock Stream Deck implementation for testing and development.
//!
//! This module provides a simulated bitmap deck that records every write it
//! receives and lets tests inject key presses and write failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use satellite_core::constants::{RGB_CHANNELS, RGBA_CHANNELS};
use tokio::sync::mpsc;

use crate::{
    HardwareError, Result,
    traits::DeckDevice,
    types::{DeckInfo, SurfaceEvent},
};

/// A write recorded by a [`MockDeck`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckWrite {
    FillKey { key: u8, data: Vec<u8> },
    FillPanel { data: Vec<u8> },
    ClearPanel,
    Brightness(u8),
    Close,
}

#[derive(Debug, Default)]
struct DeckState {
    writes: Vec<DeckWrite>,
}

/// Mock bitmap deck.
///
/// Buffers are validated against the deck geometry the same way the real
/// driver does, so a wrongly sized image surfaces as
/// [`HardwareError::InvalidData`].
///
/// # Examples
///
/// ```
/// use satellite_hardware::mock::{DeckWrite, MockDeck};
/// use satellite_hardware::traits::DeckDevice;
/// use satellite_hardware::types::DeckInfo;
///
/// #[tokio::main]
/// async fn main() -> satellite_hardware::Result<()> {
///     let (deck, handle) = MockDeck::new(DeckInfo::new("Stream Deck Mini", "MINI01", 6, 3, 80));
///
///     deck.set_brightness(40).await?;
///     assert_eq!(handle.writes(), vec![DeckWrite::Brightness(40)]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockDeck {
    info: DeckInfo,
    state: Arc<Mutex<DeckState>>,
    fail_writes: Arc<AtomicBool>,
    events_rx: Mutex<Option<mpsc::Receiver<SurfaceEvent>>>,
}

impl MockDeck {
    /// Create a mock deck with the given geometry.
    ///
    /// Returns the deck and a handle for inspecting writes and injecting input.
    pub fn new(info: DeckInfo) -> (Self, MockDeckHandle) {
        let (events_tx, events_rx) = mpsc::channel(32);
        let state = Arc::new(Mutex::new(DeckState::default()));
        let fail_writes = Arc::new(AtomicBool::new(false));

        let deck = Self {
            info: info.clone(),
            state: Arc::clone(&state),
            fail_writes: Arc::clone(&fail_writes),
            events_rx: Mutex::new(Some(events_rx)),
        };

        let handle = MockDeckHandle {
            info,
            state,
            fail_writes,
            events_tx,
        };

        (deck, handle)
    }

    fn record(&self, write: DeckWrite) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HardwareError::write_failed(format!(
                "{} rejected the write",
                self.info.serial_number
            )));
        }
        lock(&self.state).writes.push(write);
        Ok(())
    }

    fn check_key(&self, key: u8) -> Result<()> {
        if key >= self.info.key_count {
            return Err(HardwareError::invalid_data(format!(
                "Key {} out of range (0-{})",
                key,
                self.info.key_count.saturating_sub(1)
            )));
        }
        Ok(())
    }
}

impl DeckDevice for MockDeck {
    fn info(&self) -> &DeckInfo {
        &self.info
    }

    async fn fill_key(&self, key: u8, rgb: &[u8]) -> Result<()> {
        self.check_key(key)?;
        let size = self.info.icon_size as usize;
        let expected = size * size * RGB_CHANNELS;
        if rgb.len() != expected {
            return Err(HardwareError::invalid_data(format!(
                "Expected {} bytes for key {}, got {}",
                expected,
                key,
                rgb.len()
            )));
        }
        self.record(DeckWrite::FillKey {
            key,
            data: rgb.to_vec(),
        })
    }

    async fn fill_panel(&self, rgba: &[u8]) -> Result<()> {
        let (width, height) = self.info.panel_size();
        let expected = width as usize * height as usize * RGBA_CHANNELS;
        if rgba.len() != expected {
            return Err(HardwareError::invalid_data(format!(
                "Expected {} bytes for panel, got {}",
                expected,
                rgba.len()
            )));
        }
        self.record(DeckWrite::FillPanel {
            data: rgba.to_vec(),
        })
    }

    async fn clear_panel(&self) -> Result<()> {
        self.record(DeckWrite::ClearPanel)
    }

    async fn set_brightness(&self, percent: u8) -> Result<()> {
        self.record(DeckWrite::Brightness(percent.min(100)))
    }

    fn take_events(&self) -> Option<mpsc::Receiver<SurfaceEvent>> {
        lock(&self.events_rx).take()
    }

    async fn close(&self) -> Result<()> {
        lock(&self.state).writes.push(DeckWrite::Close);
        Ok(())
    }
}

/// Handle for inspecting and driving a [`MockDeck`].
#[derive(Debug, Clone)]
pub struct MockDeckHandle {
    info: DeckInfo,
    state: Arc<Mutex<DeckState>>,
    fail_writes: Arc<AtomicBool>,
    events_tx: mpsc::Sender<SurfaceEvent>,
}

impl MockDeckHandle {
    pub fn info(&self) -> &DeckInfo {
        &self.info
    }

    /// All writes recorded so far, oldest first.
    pub fn writes(&self) -> Vec<DeckWrite> {
        lock(&self.state).writes.clone()
    }

    /// Per-key image writes recorded so far.
    pub fn key_fills(&self) -> Vec<(u8, Vec<u8>)> {
        lock(&self.state)
            .writes
            .iter()
            .filter_map(|write| match write {
                DeckWrite::FillKey { key, data } => Some((*key, data.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of full-panel writes recorded so far.
    pub fn panel_fill_count(&self) -> usize {
        lock(&self.state)
            .writes
            .iter()
            .filter(|write| matches!(write, DeckWrite::FillPanel { .. }))
            .count()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).writes.contains(&DeckWrite::Close)
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        lock(&self.state).writes.clear();
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Inject a raw input event.
    ///
    /// # Errors
    ///
    /// Returns an error if the deck's event receiver has been dropped.
    pub async fn send_event(&self, event: SurfaceEvent) -> Result<()> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| HardwareError::disconnected("Deck event channel closed"))
    }

    /// Simulate a key press.
    pub async fn press(&self, key: u8) -> Result<()> {
        self.send_event(SurfaceEvent::KeyDown(key)).await
    }

    /// Simulate a key release.
    pub async fn release(&self, key: u8) -> Result<()> {
        self.send_event(SurfaceEvent::KeyUp(key)).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
