//! Device manager configuration.

use std::time::Duration;

use satellite_core::{
    Error, Result,
    constants::{
        DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_RESCAN_DELAY_MS, ELGATO_VENDOR_ID,
        QUICK_KEYS_ID_PREFIX, SOURCE_ICON_SIZE, STATUS_CLEAR_DURATION_SECS, STATUS_CONNECTED,
        STATUS_CONNECTING, STATUS_DISCONNECTED, STATUS_OVERLAY_DURATION_SECS,
        STATUS_REASSERT_INTERVAL_MS, XENCELABS_VENDOR_ID,
    },
};
use serde::{Deserialize, Serialize};

/// Configuration for [`DeviceManager`](crate::manager::DeviceManager).
///
/// Durations are (de)serialized as integer milliseconds. Missing fields take
/// their defaults, so an empty JSON object is a valid configuration.
///
/// # Examples
///
/// ```
/// use satellite_surface::ManagerConfig;
/// use std::time::Duration;
///
/// let config = ManagerConfig::default();
/// assert_eq!(config.rescan_delay, Duration::from_secs(1));
/// assert_eq!(config.source_icon_size, 72);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Delay before the follow-up rescan after a hot-plug attach.
    #[serde(with = "millis")]
    pub rescan_delay: Duration,

    /// Edge length of the key images the remote controller sends.
    pub source_icon_size: u32,

    /// How long one hybrid status overlay stays visible.
    #[serde(with = "millis")]
    pub status_overlay_duration: Duration,

    /// Interval at which the hybrid status overlay is re-asserted.
    #[serde(with = "millis")]
    pub status_reassert_interval: Duration,

    /// Duration of the empty overlay used to clear a hybrid status.
    #[serde(with = "millis")]
    pub status_clear_duration: Duration,

    /// USB vendor ids whose hot-plug notifications trigger a rescan.
    pub watched_vendor_ids: Vec<u16>,

    /// Prefix of synthesized Quick Keys device ids.
    pub quick_keys_id_prefix: String,

    /// Status shown before the controller is reached.
    pub initial_status: String,

    pub connected_status: String,

    pub disconnected_status: String,

    /// Capacity of the manager's internal event channel.
    pub event_channel_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            rescan_delay: Duration::from_millis(DEFAULT_RESCAN_DELAY_MS),
            source_icon_size: SOURCE_ICON_SIZE,
            status_overlay_duration: Duration::from_secs(STATUS_OVERLAY_DURATION_SECS),
            status_reassert_interval: Duration::from_millis(STATUS_REASSERT_INTERVAL_MS),
            status_clear_duration: Duration::from_secs(STATUS_CLEAR_DURATION_SECS),
            watched_vendor_ids: vec![ELGATO_VENDOR_ID, XENCELABS_VENDOR_ID],
            quick_keys_id_prefix: QUICK_KEYS_ID_PREFIX.to_string(),
            initial_status: STATUS_CONNECTING.to_string(),
            connected_status: STATUS_CONNECTED.to_string(),
            disconnected_status: STATUS_DISCONNECTED.to_string(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl ManagerConfig {
    /// Check the configuration for values the manager cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.source_icon_size == 0 {
            return Err(Error::Config("source_icon_size must be non-zero".into()));
        }
        if self.status_reassert_interval.is_zero() {
            return Err(Error::Config(
                "status_reassert_interval must be non-zero".into(),
            ));
        }
        if self.status_reassert_interval >= self.status_overlay_duration {
            return Err(Error::Config(format!(
                "status_reassert_interval ({:?}) must be shorter than status_overlay_duration ({:?})",
                self.status_reassert_interval, self.status_overlay_duration
            )));
        }
        if self.quick_keys_id_prefix.is_empty() {
            return Err(Error::Config("quick_keys_id_prefix must not be empty".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::Config(
                "event_channel_capacity must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ManagerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: ManagerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ManagerConfig::default());
    }

    #[test]
    fn test_durations_in_millis() {
        let config: ManagerConfig =
            serde_json::from_str(r#"{"rescan_delay": 250, "status_reassert_interval": 1500}"#)
                .unwrap();
        assert_eq!(config.rescan_delay, Duration::from_millis(250));
        assert_eq!(config.status_reassert_interval, Duration::from_millis(1500));

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["rescan_delay"], 250);
        assert_eq!(json["status_overlay_duration"], 5000);
    }

    #[test]
    fn test_reassert_must_beat_overlay() {
        let config = ManagerConfig {
            status_reassert_interval: Duration::from_secs(5),
            ..ManagerConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ManagerConfig {
            event_channel_capacity: 0,
            ..ManagerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
