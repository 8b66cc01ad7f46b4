//! Per-wrapper render generation counter.
//!
//! Asynchronous render work captures the counter when it starts and checks it
//! again right before touching hardware. Any bump in between means a newer
//! command superseded the work and its result must be dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation counter shared between a wrapper and its render tasks.
///
/// Cloning yields another handle to the same counter.
///
/// # Examples
///
/// ```
/// use satellite_surface::Generation;
///
/// let generation = Generation::new();
/// let started = generation.current();
///
/// generation.bump();
/// assert!(!generation.is_current(started));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current value.
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidate all outstanding work and return the new value.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether work started at `generation` is still valid.
    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_strictly_increases() {
        let generation = Generation::new();
        let mut last = generation.current();
        for _ in 0..10 {
            let next = generation.bump();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn test_clones_share_counter() {
        let generation = Generation::new();
        let clone = generation.clone();
        let before = clone.current();

        generation.bump();

        assert!(!clone.is_current(before));
        assert_eq!(clone.current(), generation.current());
    }
}
