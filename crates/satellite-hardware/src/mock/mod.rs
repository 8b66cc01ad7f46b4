//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices and a simulated USB bus that can be
//! controlled programmatically without physical hardware.

pub mod bus;
pub mod deck;
pub mod quick_keys;

// Re-export commonly used types
pub use bus::{MockBus, MockBusHandle};
pub use deck::{DeckWrite, MockDeck, MockDeckHandle};
pub use quick_keys::{MockQuickKeys, MockQuickKeysHandle, QuickKeysCall};
