//! No-progress deadlines for codec backends.
//!
//! Backends report liveness through a [`Heartbeat`], typically once per
//! frame. [`run_watched`] runs one backend attempt on a helper thread and
//! gives up on it once a whole interval passes without a beat, so the
//! chain can move on to the next backend. The abandoned attempt keeps its
//! thread until it returns; its result is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use super::error::BackendError;

/// Liveness counter shared between a backend and its watchdog.
#[derive(Debug, Clone, Default)]
pub struct Heartbeat {
    beats: Arc<AtomicU64>,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record progress.
    pub fn beat(&self) {
        self.beats.fetch_add(1, Ordering::Relaxed);
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }
}

/// Run one backend attempt, failing it with [`BackendError::Stalled`] when
/// no beat arrives for `limit`.
///
/// A stall is detected between `limit` and twice `limit` after the last
/// beat. A panic inside `work` is reported as a codec error.
pub(crate) fn run_watched<T, F>(
    backend: &'static str,
    limit: Duration,
    work: F,
) -> Result<T, BackendError>
where
    T: Send + 'static,
    F: FnOnce(&Heartbeat) -> Result<T, BackendError> + Send + 'static,
{
    let heartbeat = Heartbeat::new();
    let beat = heartbeat.clone();
    let (tx, rx) = mpsc::sync_channel(1);

    std::thread::Builder::new()
        .name(format!("gifstamp-{backend}"))
        .spawn(move || {
            // The watchdog may have given up already.
            let _ = tx.send(work(&beat));
        })?;

    let mut seen = heartbeat.beats();
    loop {
        match rx.recv_timeout(limit) {
            Ok(result) => return result,
            Err(RecvTimeoutError::Timeout) => {
                let now = heartbeat.beats();
                if now == seen {
                    tracing::warn!(
                        backend,
                        timeout_ms = limit.as_millis() as u64,
                        beats = now,
                        "backend made no progress, abandoning attempt"
                    );
                    return Err(BackendError::Stalled(limit));
                }
                seen = now;
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(BackendError::Codec(format!("{backend} backend panicked")));
            }
        }
    }
}
