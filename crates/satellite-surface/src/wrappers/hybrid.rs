//! Xencelabs Quick Keys wrapper.
//!
//! The panel renders text natively and has no bitmap support. Its ten
//! physical buttons and the wheel are folded into a 12-key logical layout of
//! two rows of six:
//!
//! ```text
//! logical:   0   1   2   3   4   5        6   7   8   9  10  11
//! physical:  8   0   1   2   3   9        -   4   5   6   7  wheel
//! ```
//!
//! Status messages use the overlay primitive, which expires after a few
//! seconds, so an active status is re-asserted on an interval until
//! something else takes over the display.

use std::sync::Arc;
use std::time::Duration;

use satellite_core::{
    DeviceId, DeviceState, DrawCommand, Error, RegisterProps, Result, Rgb,
    constants::{
        QUICK_KEYS_PRODUCT_NAME, QUICK_KEYS_TEXT_MAX_CHARS, QUICK_KEYS_TEXT_SLOTS, WHEEL_KEY_INDEX,
    },
};
use satellite_hardware::{
    AnyQuickKeys, DisplayOrientation, QuickKeysBrightness, QuickKeysDevice, SurfaceEvent,
    WheelSpeed,
};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::wrappers::{KeyAction, RemoteContext, Surface, spawn_input_forwarder, transition};

/// Map a physical button to its logical key.
///
/// Returns `None` for buttons that are not forwarded.
pub fn physical_to_logical(button: u8) -> Option<u8> {
    match button {
        0..=3 => Some(button + 1),
        4..=7 => Some(button + 3),
        8 => Some(0),
        9 => Some(5),
        _ => None,
    }
}

/// Map a logical key to the text slot that renders it.
pub fn logical_to_text_slot(key: u8) -> Option<u8> {
    match key {
        1..=4 => Some(key - 1),
        7..=10 => Some(key - 3),
        _ => None,
    }
}

/// Pick the hardware level nearest to `percent` among `level_count` evenly
/// spaced levels.
///
/// The result is clamped to `0..level_count`; a device with a single level
/// always selects it.
pub fn brightness_step(percent: u8, level_count: usize) -> usize {
    if level_count <= 1 {
        return 0;
    }
    let per_step = 100.0 / (level_count - 1) as f64;
    let step = (f64::from(percent) / per_step).round() as usize;
    step.min(level_count - 1)
}

/// Truncate key text to what the panel can show.
pub fn truncate_label(text: &str) -> &str {
    match text.char_indices().nth(QUICK_KEYS_TEXT_MAX_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn forward_input(event: &SurfaceEvent) -> Option<KeyAction> {
    match event {
        SurfaceEvent::KeyDown(button) => physical_to_logical(*button).map(KeyAction::Down),
        SurfaceEvent::KeyUp(button) => physical_to_logical(*button).map(KeyAction::Up),
        SurfaceEvent::WheelLeft => Some(KeyAction::Up(WHEEL_KEY_INDEX)),
        SurfaceEvent::WheelRight => Some(KeyAction::Down(WHEEL_KEY_INDEX)),
        _ => None,
    }
}

/// Overlay timings used by the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTiming {
    /// How long one overlay stays visible.
    pub overlay: Duration,
    /// Interval between re-assertions; shorter than `overlay`.
    pub reassert: Duration,
    /// Duration of the empty overlay that clears a status.
    pub clear: Duration,
}

impl From<&ManagerConfig> for StatusTiming {
    fn from(config: &ManagerConfig) -> Self {
        Self {
            overlay: config.status_overlay_duration,
            reassert: config.status_reassert_interval,
            clear: config.status_clear_duration,
        }
    }
}

impl Default for StatusTiming {
    fn default() -> Self {
        Self::from(&ManagerConfig::default())
    }
}

/// Wrapper around an opened Quick Keys panel.
#[derive(Debug)]
pub struct HybridDevice {
    device_id: DeviceId,
    keys: Arc<AnyQuickKeys>,
    timing: StatusTiming,
    status_timer: Option<JoinHandle<()>>,
    input_task: Option<JoinHandle<()>>,
    state: DeviceState,
}

impl HybridDevice {
    pub fn new(device_id: DeviceId, keys: AnyQuickKeys, timing: StatusTiming) -> Self {
        Self {
            device_id,
            keys: Arc::new(keys),
            timing,
            status_timer: None,
            input_task: None,
            state: DeviceState::Initializing,
        }
    }

    /// Whether a status overlay is currently being re-asserted.
    pub fn has_status(&self) -> bool {
        self.status_timer.is_some()
    }

    /// Stop re-asserting the status. Returns whether one was active.
    ///
    /// The timer task is joined so no overlay write from it can land after
    /// this returns.
    async fn stop_status_interval(&mut self) -> bool {
        let Some(timer) = self.status_timer.take() else {
            return false;
        };
        timer.abort();
        if let Err(error) = timer.await
            && !error.is_cancelled()
        {
            warn!(device_id = %self.device_id, error = %error, "Status timer failed");
        }
        true
    }

    async fn clear_status(&mut self) -> Result<()> {
        if self.stop_status_interval().await {
            self.keys.show_overlay_text(self.timing.clear, "").await?;
        }
        Ok(())
    }

    async fn bring_up(&mut self, host: &str, initial_status: &str) -> Result<()> {
        self.keys.set_wheel_speed(WheelSpeed::Normal).await?;
        self.keys
            .set_display_orientation(DisplayOrientation::Rotate0)
            .await?;
        self.keys.set_sleep_timeout(0).await?;
        self.blank().await?;
        self.show_status(host, initial_status).await
    }
}

impl Surface for HybridDevice {
    fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    fn product_name(&self) -> String {
        QUICK_KEYS_PRODUCT_NAME.to_string()
    }

    fn register_props(&self) -> RegisterProps {
        RegisterProps::quick_keys()
    }

    fn state(&self) -> DeviceState {
        self.state
    }

    fn set_ready(&mut self, ready: bool) -> bool {
        let next = if ready {
            DeviceState::Ready
        } else {
            DeviceState::Disconnected
        };
        if self.state == next || !self.state.can_transition_to(next) {
            return false;
        }
        transition(&self.device_id, &mut self.state, next);
        true
    }

    async fn initialize(&mut self, context: RemoteContext, initial_status: &str) -> Result<()> {
        debug!(device_id = %self.device_id, "Registering key events");
        if let Some(events) = self.keys.take_events() {
            self.input_task = Some(spawn_input_forwarder(
                self.device_id.clone(),
                events,
                context.clone(),
                forward_input,
            ));
        }

        if let Err(error) = self.bring_up(&context.host(), initial_status).await {
            self.stop_status_interval().await;
            if let Some(task) = self.input_task.take() {
                task.abort();
            }
            return Err(error);
        }

        let next = if self.keys.is_connected() {
            DeviceState::Ready
        } else {
            DeviceState::Disconnected
        };
        transition(&self.device_id, &mut self.state, next);
        info!(device_id = %self.device_id, ready = self.is_ready(), "Quick Keys initialized");
        Ok(())
    }

    async fn device_added(&mut self) -> Result<()> {
        self.clear_status().await
    }

    async fn set_brightness(&mut self, percent: u8) -> Result<()> {
        let levels = QuickKeysBrightness::ALL;
        let level = levels[brightness_step(percent, levels.len())];
        self.keys.set_display_brightness(level).await?;
        Ok(())
    }

    async fn blank(&mut self) -> Result<()> {
        self.clear_status().await?;
        self.keys.set_wheel_color(Rgb::BLACK).await?;
        for slot in 0..QUICK_KEYS_TEXT_SLOTS {
            self.keys.set_key_text(slot, "").await?;
        }
        Ok(())
    }

    async fn draw(&mut self, command: DrawCommand) -> Result<()> {
        if command.image.is_some() {
            return Err(Error::unsupported(self.device_id.as_str(), "draw image"));
        }
        self.clear_status().await?;

        if let Some(text) = &command.text
            && let Some(slot) = logical_to_text_slot(command.key_index)
        {
            self.keys.set_key_text(slot, truncate_label(text)).await?;
        }
        if let Some(color) = command.color
            && command.key_index == WHEEL_KEY_INDEX
        {
            self.keys.set_wheel_color(color).await?;
        }
        Ok(())
    }

    async fn show_status(&mut self, _host_label: &str, status_text: &str) -> Result<()> {
        self.stop_status_interval().await;

        let keys = Arc::clone(&self.keys);
        let device_id = self.device_id.clone();
        let message = status_text.to_string();
        let StatusTiming {
            overlay, reassert, ..
        } = self.timing;

        self.status_timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + reassert, reassert);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(error) = keys.show_overlay_text(overlay, &message).await {
                    warn!(device_id = %device_id, error = %error, "Overlay failed");
                }
            }
        }));

        self.keys.show_overlay_text(overlay, status_text).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.stop_status_interval().await;
        if let Some(task) = self.input_task.take() {
            task.abort();
        }
        transition(&self.device_id, &mut self.state, DeviceState::Closed);
        self.keys.close().await?;
        Ok(())
    }
}

impl Drop for HybridDevice {
    fn drop(&mut self) {
        if let Some(timer) = self.status_timer.take() {
            timer.abort();
        }
        if let Some(task) = self.input_task.take() {
            task.abort();
        }
    }
}
