//! Shared vocabulary of the satellite surface client.
//!
//! Device identities, the capability descriptor announced to the remote
//! controller, draw commands, lifecycle states and the remote event set,
//! together with the crate-wide [`Error`] and the timing and size constants
//! the pipeline is tuned with.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
