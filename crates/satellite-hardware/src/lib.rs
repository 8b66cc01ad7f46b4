//! Hardware device abstraction layer for the satellite surface client.
//!
//! This crate defines the contract between the surface pipeline and the
//! per-family USB/HID drivers, plus mock implementations that stand in for
//! real hardware during development and testing.
//!
//! # Device Families
//!
//! - [`DeckDevice`]: bitmap key decks (Elgato Stream Deck). Every key takes a
//!   raw RGB image at the deck's native icon size.
//! - [`QuickKeysDevice`]: Xencelabs Quick Keys. Eight text slots, a wheel with
//!   an RGB ring and a timed overlay text primitive, behind a radio link that
//!   can drop and recover.
//! - [`DeviceBus`]: enumeration, opening by path and hot-plug monitoring.
//!
//! ```no_run
//! use satellite_hardware::traits::{DeckDevice, DeviceBus};
//! use satellite_hardware::Result;
//!
//! async fn blank_all<B: DeviceBus>(bus: &B) -> Result<()> {
//!     for listing in bus.list_decks().await? {
//!         let deck = bus.open_deck(&listing.path).await?;
//!         deck.clear_panel().await?;
//!         deck.close().await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] with a [`HardwareError`].
//! The surface crate converts these into `satellite_core::Error` at the
//! wrapper boundary.
//!
//! # Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`, so one opened device
//! can be shared between the manager loop and the tasks a wrapper spawns.

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyBus, AnyDeck, AnyQuickKeys};
pub use error::{HardwareError, Result};
pub use traits::{DeckDevice, DeviceBus, QuickKeysDevice};
pub use types::{
    DeckInfo, DeviceListing, DisplayOrientation, HotplugEvent, QuickKeysBrightness, SurfaceEvent,
    UsbDevice, WheelSpeed,
};
