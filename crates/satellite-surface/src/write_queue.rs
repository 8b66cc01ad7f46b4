//! Per-key coalescing image pipeline.
//!
//! Resampling a key image is expensive compared to the rate at which the
//! remote controller can redraw a key, so the queue keeps at most one
//! transform in flight per key and remembers only the newest submission that
//! arrived while it was busy. Anything older is dropped without being
//! transformed.
//!
//! ```text
//! submit(3, A) ──► worker(3): transform A ─┐
//! submit(3, B) ──► pending[3] = B          │
//! submit(3, C) ──► pending[3] = C (B gone) │
//!                                          ▼
//!                 pending[3] present → discard A, transform C → write C
//! ```
//!
//! [`ImageWriteQueue::abort`] starts a new epoch: pending work is dropped and
//! workers from the old epoch exit on their next check without writing.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use satellite_core::{Error, Result};
use tracing::{trace, warn};

/// Transform and write stages driven by an [`ImageWriteQueue`].
///
/// Methods return `Send` futures because each key's work runs on its own
/// spawned task.
pub trait KeyImageSink: Send + Sync + 'static {
    /// Turn a source image into the bytes the hardware expects.
    fn transform(&self, key: u8, image: Vec<u8>) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Write a transformed image. `generation` is the value captured at submit time.
    fn write(
        &self,
        key: u8,
        generation: u64,
        image: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Report a transform or write failure for one key.
    fn report(&self, key: u8, error: &Error) {
        warn!(key, error = %error, "Key image update failed");
    }
}

#[derive(Debug)]
struct Job {
    generation: u64,
    image: Vec<u8>,
}

#[derive(Debug, Default)]
struct QueueState {
    epoch: u64,
    busy: HashSet<u8>,
    pending: HashMap<u8, Job>,
}

/// Coalescing transform+write queue, one worker per busy key.
///
/// Must be used from within a Tokio runtime.
#[derive(Debug)]
pub struct ImageWriteQueue<S> {
    sink: Arc<S>,
    state: Arc<Mutex<QueueState>>,
}

impl<S: KeyImageSink> ImageWriteQueue<S> {
    pub fn new(sink: Arc<S>) -> Self {
        Self {
            sink,
            state: Arc::new(Mutex::new(QueueState::default())),
        }
    }

    /// Queue `image` for `key`.
    ///
    /// If the key already has work in flight the submission replaces any
    /// older one still waiting for it.
    pub fn submit(&self, key: u8, generation: u64, image: Vec<u8>) {
        let job = Job { generation, image };

        let mut state = lock(&self.state);
        if state.busy.contains(&key) {
            if let Some(dropped) = state.pending.insert(key, job) {
                trace!(key, generation = dropped.generation, "Superseded queued key image");
            }
            return;
        }
        state.busy.insert(key);
        let epoch = state.epoch;
        drop(state);

        tokio::spawn(run_key(
            Arc::clone(&self.sink),
            Arc::clone(&self.state),
            key,
            epoch,
            job,
        ));
    }

    /// Drop all queued work and abandon in-flight work.
    ///
    /// In-flight transforms run to completion but their results are never written.
    pub fn abort(&self) {
        let mut state = lock(&self.state);
        state.epoch += 1;
        state.pending.clear();
        state.busy.clear();
    }

    /// Whether no key has work in flight in the current epoch.
    pub fn is_idle(&self) -> bool {
        lock(&self.state).busy.is_empty()
    }
}

impl<S> Drop for ImageWriteQueue<S> {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.epoch += 1;
        state.pending.clear();
        state.busy.clear();
    }
}

enum Next {
    Write(Vec<u8>),
    Superseded(Job),
    Failed(Error),
}

async fn run_key<S: KeyImageSink>(
    sink: Arc<S>,
    state: Arc<Mutex<QueueState>>,
    key: u8,
    epoch: u64,
    mut job: Job,
) {
    loop {
        let generation = job.generation;
        let result = sink.transform(key, job.image).await;

        let next = {
            let mut guard = lock(&state);
            if guard.epoch != epoch {
                trace!(key, generation, "Dropped key image from aborted epoch");
                return;
            }
            match guard.pending.remove(&key) {
                Some(newer) => Next::Superseded(newer),
                None => match result {
                    Ok(image) => Next::Write(image),
                    Err(error) => Next::Failed(error),
                },
            }
        };

        match next {
            Next::Superseded(newer) => {
                trace!(key, generation, "Discarded key image superseded during transform");
                job = newer;
                continue;
            }
            Next::Write(image) => {
                if let Err(error) = sink.write(key, generation, image).await {
                    sink.report(key, &error);
                }
            }
            Next::Failed(error) => sink.report(key, &error),
        }

        let mut guard = lock(&state);
        if guard.epoch != epoch {
            return;
        }
        match guard.pending.remove(&key) {
            Some(newer) => job = newer,
            None => {
                guard.busy.remove(&key);
                return;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
