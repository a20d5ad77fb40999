//! Job scheduler
//!
//! Runs watermarking jobs on a bounded worker pool:
//!
//! - A FIFO semaphore caps how many jobs decode, composite and encode at
//!   once. Everything else waits in `Queued`.
//! - Pixel work runs under `spawn_blocking`; frames are composited in
//!   parallel on rayon and collected back in their original order.
//! - Every job publishes its [`JobState`] on a `watch` channel and can be
//!   cancelled through its [`JobHandle`] at any point.
//! - A job's watchdog bounds each codec backend attempt; a stalled backend
//!   hands over to the next one in its chain.

pub mod cancel;
pub mod job;
pub mod state;

pub use cancel::CancelToken;
pub use job::{Job, JobHandle, JobOutput};
pub use state::{FrameProgress, JobState, Stage};

use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, watch, Semaphore};

use crate::codec::{FrameDecoder, FrameEncoder};
use crate::error::PipelineError;
use crate::watermark::compositor::{check_payload, composite_with_backdrop, render_sprite};
use state::ProgressCounter;

/// Called on the rayon thread right before a frame is composited.
#[cfg(test)]
#[derive(Clone)]
struct FrameHook(Arc<dyn Fn() + Send + Sync>);

#[cfg(test)]
impl std::fmt::Debug for FrameHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FrameHook")
    }
}

/// Bounded pool of watermarking workers.
#[derive(Debug)]
pub struct Scheduler {
    decoder: Arc<FrameDecoder>,
    encoder: Arc<FrameEncoder>,
    permits: Arc<Semaphore>,
    workers: usize,
    next_id: AtomicU64,
    #[cfg(test)]
    frame_hook: Option<FrameHook>,
}

impl Scheduler {
    /// Create a scheduler running at most `workers` jobs at once (minimum 1).
    pub fn new(workers: usize, decoder: Arc<FrameDecoder>, encoder: Arc<FrameEncoder>) -> Self {
        let workers = workers.max(1);
        Self {
            decoder,
            encoder,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            next_id: AtomicU64::new(1),
            #[cfg(test)]
            frame_hook: None,
        }
    }

    #[cfg(test)]
    fn with_frame_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.frame_hook = Some(FrameHook(Arc::new(hook)));
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Jobs that could start right now without waiting.
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }

    /// Queue a job and return its handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, job: Job) -> JobHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (state_tx, state_rx) = watch::channel(JobState::Queued);
        let (result_tx, result_rx) = oneshot::channel();
        let frames = Arc::new(ProgressCounter::default());
        let cancel = CancelToken::new();

        tracing::debug!(job_id = id, source_bytes = job.source.len(), "job queued");

        let watchdog = job.watchdog;
        let worker = Worker {
            id,
            job,
            decoder: self.decoder.clone(),
            encoder: self.encoder.clone(),
            state: Arc::new(state_tx),
            frames: frames.clone(),
            cancel: cancel.clone(),
            #[cfg(test)]
            frame_hook: self.frame_hook.clone(),
        };
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let state = worker.state.clone();
            let result = worker.run(permits).await;

            let terminal = match &result {
                Ok(_) => JobState::Done,
                Err(PipelineError::Cancelled) => JobState::Cancelled,
                Err(_) => JobState::Failed,
            };
            state.send_replace(terminal);
            // The handle may have been dropped; nobody is left to tell.
            let _ = result_tx.send(result);
        });

        JobHandle::new(id, state_rx, frames, cancel, watchdog, result_rx)
    }
}

/// Everything one job needs on its worker thread.
struct Worker {
    id: u64,
    job: Job,
    decoder: Arc<FrameDecoder>,
    encoder: Arc<FrameEncoder>,
    state: Arc<watch::Sender<JobState>>,
    frames: Arc<ProgressCounter>,
    cancel: CancelToken,
    #[cfg(test)]
    frame_hook: Option<FrameHook>,
}

impl Worker {
    async fn run(self, permits: Arc<Semaphore>) -> Result<JobOutput, PipelineError> {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!(job_id = self.id, "job cancelled while queued");
                return Err(PipelineError::Cancelled);
            }
            permit = permits.acquire_owned() => {
                permit.map_err(|e| PipelineError::Worker(e.to_string()))?
            }
        };

        let id = self.id;
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            self.process()
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(job_id = id, error = %e, "worker task failed");
                Err(PipelineError::Worker(e.to_string()))
            }
        }
    }

    fn ensure_live(&self) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            tracing::debug!(job_id = self.id, "job cancelled");
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn process(self) -> Result<JobOutput, PipelineError> {
        let started = Instant::now();
        let wm = self.job.descriptor.as_ref();
        check_payload(wm)?;

        self.ensure_live()?;
        self.state.send_replace(JobState::Decoding);
        let doc = match self.job.watchdog {
            Some(limit) => self.decoder.decode_watched(self.job.source.clone(), limit)?,
            None => self.decoder.decode(&self.job.source)?,
        };

        self.ensure_live()?;
        let total = doc.frame_count();
        self.frames.set_total(total);
        self.state
            .send_replace(JobState::Compositing { done: 0, total });

        let sprite = render_sprite(wm, doc.width())?;
        let (screen_w, screen_h) = (doc.width(), doc.height());
        let backdrops = doc.show_through();

        let frames = doc
            .frames()
            .par_iter()
            .zip(backdrops.par_iter())
            .map(|(frame, backdrop)| {
                if self.cancel.is_cancelled() {
                    return None;
                }
                #[cfg(test)]
                if let Some(hook) = &self.frame_hook {
                    (hook.0)();
                }
                let out = composite_with_backdrop(
                    frame,
                    screen_w,
                    screen_h,
                    wm,
                    &sprite,
                    backdrop.as_ref(),
                );
                let done = self.frames.frame_done();
                self.state.send_if_modified(|state| match state {
                    JobState::Compositing { done: current, .. } if *current < done => {
                        *current = done;
                        true
                    }
                    _ => false,
                });
                Some(out)
            })
            .collect::<Option<Vec<_>>>();
        let Some(frames) = frames else {
            tracing::debug!(
                job_id = self.id,
                processed = self.frames.snapshot().processed,
                total,
                "job cancelled during compositing"
            );
            return Err(PipelineError::Cancelled);
        };

        self.ensure_live()?;
        self.state.send_replace(JobState::Encoding);
        let doc = doc
            .with_frames(frames)
            .map_err(|e| PipelineError::Worker(e.to_string()))?;
        let encoded = match self.job.watchdog {
            Some(limit) => self.encoder.encode_watched(Arc::new(doc), limit)?,
            None => self.encoder.encode(&doc)?,
        };

        // A cancel that lands during encoding still wins.
        self.ensure_live()?;

        tracing::info!(
            job_id = self.id,
            frames = total,
            output_bytes = encoded.bytes.len(),
            backend = encoded.backend,
            degraded = encoded.degraded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "job finished"
        );

        Ok(JobOutput {
            bytes: encoded.bytes,
            degraded: encoded.degraded,
            frame_count: total,
            backend: encoded.backend,
        })
    }
}
