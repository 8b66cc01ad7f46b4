//! Device wrappers.
//!
//! Each supported hardware family gets one wrapper that adapts its driver to
//! the [`Surface`] capability interface. The set of families is closed, so
//! the manager stores wrappers as the [`WrappedDevice`] enum rather than as
//! trait objects.
//!
//! ```text
//!                 ┌───────────────┐   draw/brightness/blank/status
//! DeviceManager ──► WrappedDevice ├──────────────────────────────► driver
//!       ▲         └──────┬────────┘
//!       │ ready changes  │ input forwarder task
//!       └────────────────┤
//!                        └──► RemoteClient::key_down / key_up
//! ```

#![allow(async_fn_in_trait)]

pub mod bitmap;
pub mod hybrid;

use satellite_core::{DeviceId, DeviceState, DrawCommand, RegisterProps, Result};
use satellite_hardware::SurfaceEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::remote::SharedRemote;

pub use bitmap::BitmapDevice;
pub use hybrid::HybridDevice;

/// Notification from a wrapper's background tasks to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceNotification {
    /// The physical link of a device went up or down.
    ReadyChanged { device_id: DeviceId, ready: bool },
}

/// What a wrapper needs from its surroundings during initialization.
#[derive(Debug, Clone)]
pub struct RemoteContext {
    remote: SharedRemote,
    notifications: Option<mpsc::Sender<DeviceNotification>>,
}

impl RemoteContext {
    /// Context whose readiness notifications are dropped.
    pub fn new(remote: SharedRemote) -> Self {
        Self {
            remote,
            notifications: None,
        }
    }

    /// Deliver readiness notifications to `tx`.
    pub fn with_notifications(mut self, tx: mpsc::Sender<DeviceNotification>) -> Self {
        self.notifications = Some(tx);
        self
    }

    pub fn remote(&self) -> &SharedRemote {
        &self.remote
    }

    /// Host label of the remote controller.
    pub fn host(&self) -> String {
        self.remote.host()
    }

    async fn notify(&self, notification: DeviceNotification) {
        if let Some(tx) = &self.notifications
            && tx.send(notification).await.is_err()
        {
            debug!("Device notification dropped, manager gone");
        }
    }
}

/// Capability interface implemented by every device wrapper.
///
/// Operations on one wrapper are awaited in order by a single owner; the
/// wrapper's own background work (queue workers, timers, input forwarding)
/// never outlives [`Surface::close`].
pub trait Surface {
    fn device_id(&self) -> &DeviceId;

    fn product_name(&self) -> String;

    fn register_props(&self) -> RegisterProps;

    fn state(&self) -> DeviceState;

    /// Current physical connectivity.
    fn is_ready(&self) -> bool {
        self.state() == DeviceState::Ready
    }

    /// Record a link change reported by the device.
    ///
    /// Returns `true` when readiness actually changed.
    fn set_ready(&mut self, _ready: bool) -> bool {
        false
    }

    /// Bring the hardware up, start forwarding input, blank it and show
    /// `initial_status`.
    ///
    /// On failure no input forwarding stays registered.
    async fn initialize(&mut self, context: RemoteContext, initial_status: &str) -> Result<()>;

    /// The remote side acknowledged the device.
    async fn device_added(&mut self) -> Result<()>;

    /// Set brightness from a 0-100 percentage.
    async fn set_brightness(&mut self, percent: u8) -> Result<()>;

    /// Clear all visible state.
    async fn blank(&mut self) -> Result<()>;

    async fn draw(&mut self, command: DrawCommand) -> Result<()>;

    /// Show a persistent status indication.
    async fn show_status(&mut self, host_label: &str, status_text: &str) -> Result<()>;

    /// Cancel background work and release the hardware handle.
    async fn close(&mut self) -> Result<()>;
}

/// A wrapped device of one of the supported families.
#[derive(Debug)]
pub enum WrappedDevice {
    Bitmap(BitmapDevice),
    Hybrid(HybridDevice),
}

impl Surface for WrappedDevice {
    fn device_id(&self) -> &DeviceId {
        match self {
            Self::Bitmap(device) => device.device_id(),
            Self::Hybrid(device) => device.device_id(),
        }
    }

    fn product_name(&self) -> String {
        match self {
            Self::Bitmap(device) => device.product_name(),
            Self::Hybrid(device) => device.product_name(),
        }
    }

    fn register_props(&self) -> RegisterProps {
        match self {
            Self::Bitmap(device) => device.register_props(),
            Self::Hybrid(device) => device.register_props(),
        }
    }

    fn state(&self) -> DeviceState {
        match self {
            Self::Bitmap(device) => device.state(),
            Self::Hybrid(device) => device.state(),
        }
    }

    fn set_ready(&mut self, ready: bool) -> bool {
        match self {
            Self::Bitmap(device) => device.set_ready(ready),
            Self::Hybrid(device) => device.set_ready(ready),
        }
    }

    async fn initialize(&mut self, context: RemoteContext, initial_status: &str) -> Result<()> {
        match self {
            Self::Bitmap(device) => device.initialize(context, initial_status).await,
            Self::Hybrid(device) => device.initialize(context, initial_status).await,
        }
    }

    async fn device_added(&mut self) -> Result<()> {
        match self {
            Self::Bitmap(device) => device.device_added().await,
            Self::Hybrid(device) => device.device_added().await,
        }
    }

    async fn set_brightness(&mut self, percent: u8) -> Result<()> {
        match self {
            Self::Bitmap(device) => device.set_brightness(percent).await,
            Self::Hybrid(device) => device.set_brightness(percent).await,
        }
    }

    async fn blank(&mut self) -> Result<()> {
        match self {
            Self::Bitmap(device) => device.blank().await,
            Self::Hybrid(device) => device.blank().await,
        }
    }

    async fn draw(&mut self, command: DrawCommand) -> Result<()> {
        match self {
            Self::Bitmap(device) => device.draw(command).await,
            Self::Hybrid(device) => device.draw(command).await,
        }
    }

    async fn show_status(&mut self, host_label: &str, status_text: &str) -> Result<()> {
        match self {
            Self::Bitmap(device) => device.show_status(host_label, status_text).await,
            Self::Hybrid(device) => device.show_status(host_label, status_text).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Bitmap(device) => device.close().await,
            Self::Hybrid(device) => device.close().await,
        }
    }
}

/// Logical key action forwarded to the remote controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down(u8),
    Up(u8),
}

/// Spawn the task that turns raw device events into remote calls.
///
/// `map_key` translates key and wheel events; link changes go to the
/// manager through the context, errors are logged.
pub(crate) fn spawn_input_forwarder(
    device_id: DeviceId,
    mut events: mpsc::Receiver<SurfaceEvent>,
    context: RemoteContext,
    map_key: fn(&SurfaceEvent) -> Option<KeyAction>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SurfaceEvent::Error(message) => {
                    warn!(device_id = %device_id, error = %message, "Device reported an error");
                }
                SurfaceEvent::Connected | SurfaceEvent::Disconnected => {
                    let ready = event == SurfaceEvent::Connected;
                    context
                        .notify(DeviceNotification::ReadyChanged {
                            device_id: device_id.clone(),
                            ready,
                        })
                        .await;
                }
                other => match map_key(&other) {
                    Some(KeyAction::Down(key)) => context.remote.key_down(&device_id, key),
                    Some(KeyAction::Up(key)) => context.remote.key_up(&device_id, key),
                    None => trace!(device_id = %device_id, event = ?other, "Input not forwarded"),
                },
            }
        }
        debug!(device_id = %device_id, "Input stream ended");
    })
}

/// Move `state` to `next`, logging the transition.
pub(crate) fn transition(device_id: &DeviceId, state: &mut DeviceState, next: DeviceState) {
    if *state == next {
        return;
    }
    if state.is_terminal() {
        debug!(device_id = %device_id, to = %next, "Ignoring transition of closed device");
        return;
    }
    if !state.can_transition_to(next) {
        warn!(device_id = %device_id, from = %state, to = %next, "Unexpected lifecycle transition");
    }
    debug!(device_id = %device_id, from = %state, to = %next, "Device state changed");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_moves_state() {
        let id = DeviceId::new("AL01");
        let mut state = DeviceState::Initializing;
        transition(&id, &mut state, DeviceState::Ready);
        assert_eq!(state, DeviceState::Ready);
    }

    #[test]
    fn test_closed_device_stays_closed() {
        let id = DeviceId::new("AL01");
        let mut state = DeviceState::Closed;
        transition(&id, &mut state, DeviceState::Ready);
        assert_eq!(state, DeviceState::Closed);
    }

    #[test]
    fn test_failed_open_closes_candidate() {
        let id = DeviceId::new("AL01");
        let mut state = DeviceState::Discovered;
        transition(&id, &mut state, DeviceState::Opening);
        assert_eq!(state, DeviceState::Opening);
        transition(&id, &mut state, DeviceState::Closed);
        assert_eq!(state, DeviceState::Closed);
    }
}
