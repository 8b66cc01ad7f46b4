//! Outbound half of the remote-controller client.
//!
//! The network client itself (handshake, reconnection, wire format) lives
//! outside this crate. Wrappers and the manager only need to push a handful
//! of notifications at it and read the host it is talking to; calls are
//! fire-and-forget, the client queues them for its own connection task.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use satellite_core::{DeviceId, RegisterProps};

/// Notifications sent to the remote controller.
pub trait RemoteClient: Send + Sync + fmt::Debug {
    /// Register a device and its capabilities.
    fn announce_device(&self, device_id: &DeviceId, product_name: &str, props: RegisterProps);

    /// Unregister a device.
    fn withdraw_device(&self, device_id: &DeviceId);

    /// Forward a logical key press.
    fn key_down(&self, device_id: &DeviceId, key: u8);

    /// Forward a logical key release.
    fn key_up(&self, device_id: &DeviceId, key: u8);

    /// Host label of the controller currently configured.
    fn host(&self) -> String;
}

/// Shared handle to the remote client, as held by wrappers.
pub type SharedRemote = Arc<dyn RemoteClient>;

/// A call received by a [`RecordingRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Announce {
        device_id: DeviceId,
        product_name: String,
        props: RegisterProps,
    },
    Withdraw(DeviceId),
    KeyDown(DeviceId, u8),
    KeyUp(DeviceId, u8),
}

#[derive(Debug, Default)]
struct Recorded {
    host: String,
    calls: Vec<RemoteCall>,
}

/// In-memory [`RemoteClient`] that records every call.
///
/// # Examples
///
/// ```
/// use satellite_core::{DeviceId, RegisterProps};
/// use satellite_surface::remote::{RecordingRemote, RemoteCall, RemoteClient};
///
/// let remote = RecordingRemote::new("10.0.0.5");
/// let id = DeviceId::new("AL01");
/// remote.key_down(&id, 3);
///
/// assert_eq!(remote.calls(), vec![RemoteCall::KeyDown(id, 3)]);
/// assert_eq!(remote.host(), "10.0.0.5");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingRemote {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingRemote {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Recorded {
                host: host.into(),
                calls: Vec::new(),
            })),
        }
    }

    /// Change the reported host label.
    pub fn set_host(&self, host: impl Into<String>) {
        self.lock().host = host.into();
    }

    /// All calls recorded so far, oldest first.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Ids announced so far, in order, including repeats.
    pub fn announced(&self) -> Vec<DeviceId> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Announce { device_id, .. } => Some(device_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids withdrawn so far, in order.
    pub fn withdrawn(&self) -> Vec<DeviceId> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Withdraw(device_id) => Some(device_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Key presses and releases forwarded so far.
    pub fn key_events(&self) -> Vec<RemoteCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, RemoteCall::KeyDown(..) | RemoteCall::KeyUp(..)))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RemoteClient for RecordingRemote {
    fn announce_device(&self, device_id: &DeviceId, product_name: &str, props: RegisterProps) {
        self.lock().calls.push(RemoteCall::Announce {
            device_id: device_id.clone(),
            product_name: product_name.to_string(),
            props,
        });
    }

    fn withdraw_device(&self, device_id: &DeviceId) {
        self.lock()
            .calls
            .push(RemoteCall::Withdraw(device_id.clone()));
    }

    fn key_down(&self, device_id: &DeviceId, key: u8) {
        self.lock()
            .calls
            .push(RemoteCall::KeyDown(device_id.clone(), key));
    }

    fn key_up(&self, device_id: &DeviceId, key: u8) {
        self.lock()
            .calls
            .push(RemoteCall::KeyUp(device_id.clone(), key));
    }

    fn host(&self) -> String {
        self.lock().host.clone()
    }
}
