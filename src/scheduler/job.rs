//! Jobs and the handles callers use to follow them.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};

use super::cancel::CancelToken;
use super::state::{FrameProgress, JobState, ProgressCounter, Stage};
use crate::error::PipelineError;
use crate::watermark::WatermarkDescriptor;

/// One GIF to watermark.
#[derive(Debug, Clone)]
pub struct Job {
    pub source: Bytes,
    pub descriptor: Arc<WatermarkDescriptor>,
    /// Longest a stage may go without progress; `None` disables the check.
    pub watchdog: Option<Duration>,
}

impl Job {
    pub fn new(source: impl Into<Bytes>, descriptor: Arc<WatermarkDescriptor>) -> Self {
        Self {
            source: source.into(),
            descriptor,
            watchdog: None,
        }
    }

    /// Arm the no-progress watchdog.
    ///
    /// A codec backend that stalls is abandoned and the next backend in its
    /// chain takes over. The job fails with [`PipelineError::Timeout`] only
    /// when the last decode backend stalls, or when compositing stops
    /// advancing.
    pub fn with_watchdog(mut self, limit: Option<Duration>) -> Self {
        self.watchdog = limit;
        self
    }
}

/// Encoded output of a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub bytes: Bytes,
    /// True when only the first frame survived encoding.
    pub degraded: bool,
    /// Frames in the source document.
    pub frame_count: usize,
    /// Encoder backend that produced `bytes`.
    pub backend: &'static str,
}

/// Caller's side of a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    id: u64,
    state: watch::Receiver<JobState>,
    frames: Arc<ProgressCounter>,
    cancel: CancelToken,
    watchdog: Option<Duration>,
    result: oneshot::Receiver<Result<JobOutput, PipelineError>>,
}

impl JobHandle {
    pub(crate) fn new(
        id: u64,
        state: watch::Receiver<JobState>,
        frames: Arc<ProgressCounter>,
        cancel: CancelToken,
        watchdog: Option<Duration>,
        result: oneshot::Receiver<Result<JobOutput, PipelineError>>,
    ) -> Self {
        Self {
            id,
            state,
            frames,
            cancel,
            watchdog,
            result,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receiver for state changes. Compositing progress is monotonic.
    pub fn progress(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    pub fn frame_progress(&self) -> FrameProgress {
        self.frames.snapshot()
    }

    /// Request cancellation. Queued jobs never start; running jobs stop at
    /// the next frame or stage boundary. Either way the job resolves
    /// [`PipelineError::Cancelled`] without bytes.
    pub fn cancel(&self) {
        tracing::debug!(job_id = self.id, "cancel requested");
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the job to finish.
    ///
    /// With a watchdog armed on the job, compositing that reports no frame
    /// for the whole interval cancels the job and this returns
    /// [`PipelineError::Timeout`]. Decoding and encoding are watched inside
    /// their backend chains, and queued jobs are never timed out.
    pub async fn wait(mut self) -> Result<JobOutput, PipelineError> {
        let Some(limit) = self.watchdog else {
            return self.finish().await;
        };

        loop {
            let current = self.state.borrow_and_update().clone();
            if current.is_terminal() {
                return self.finish().await;
            }

            if current.stage() != Some(Stage::Compositing) {
                if self.state.changed().await.is_err() {
                    return self.finish().await;
                }
                continue;
            }

            match tokio::time::timeout(limit, self.state.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => return self.finish().await,
                Err(_) => {
                    tracing::warn!(
                        job_id = self.id,
                        stage = %Stage::Compositing,
                        timeout_ms = limit.as_millis() as u64,
                        "compositing made no progress, cancelling"
                    );
                    self.cancel.cancel();
                    return Err(PipelineError::Timeout {
                        stage: Stage::Compositing,
                        after: limit,
                    });
                }
            }
        }
    }

    async fn finish(self) -> Result<JobOutput, PipelineError> {
        match self.result.await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Worker(
                "job task ended without a result".to_string(),
            )),
        }
    }
}
