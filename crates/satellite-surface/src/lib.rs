//! Surface pipeline for the satellite client.
//!
//! Sits between the USB drivers in `satellite_hardware` and the remote
//! controller connection. It owns the device registry, adapts each hardware
//! family to a common [`Surface`] interface and keeps key image writes
//! ordered and coalesced.
//!
//! # Modules
//!
//! - [`manager`]: hot-plug handling, registry and remote command routing
//! - [`wrappers`]: the [`Surface`] trait and one wrapper per device family
//! - [`write_queue`]: per-key coalescing image write queue
//! - [`generation`]: counter that invalidates stale background work
//! - [`card`]: status card rendering for bitmap decks
//! - [`remote`]: the remote controller client interface
//! - [`config`]: manager timings and status texts
//!
//! # Stale Work
//!
//! Every bitmap wrapper carries a [`Generation`]. Blanking, a new status or
//! an acknowledgement bumps it; background writes capture the value when
//! they start and drop themselves if it moved on:
//!
//! ```
//! use satellite_surface::Generation;
//!
//! let generation = Generation::new();
//! let captured = generation.current();
//! generation.bump();
//! assert!(!generation.is_current(captured));
//! ```
//!
//! # Configuration
//!
//! ```
//! use satellite_surface::ManagerConfig;
//!
//! let config: ManagerConfig = serde_json::from_str(r#"{ "rescan_delay": 250 }"#).unwrap();
//! assert_eq!(config.rescan_delay.as_millis(), 250);
//! assert!(config.validate().is_ok());
//! ```

pub mod card;
pub mod config;
pub mod generation;
pub mod manager;
pub mod remote;
pub mod wrappers;
pub mod write_queue;

pub use card::{BasicCardGenerator, CardGenerator};
pub use config::ManagerConfig;
pub use generation::Generation;
pub use manager::{DeviceManager, ManagerHandle};
pub use remote::{RemoteClient, SharedRemote};
pub use wrappers::{
    BitmapDevice, DeviceNotification, HybridDevice, KeyAction, RemoteContext, Surface,
    WrappedDevice,
};
pub use write_queue::{ImageWriteQueue, KeyImageSink};
