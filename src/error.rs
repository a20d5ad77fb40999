// Error types module

use std::time::Duration;
use thiserror::Error;

use crate::codec::{DecodeError, EncodeError};
use crate::scheduler::Stage;
use crate::watermark::CompositorError;

/// Terminal error of a watermarking job.
///
/// Backend-level failures never show up here individually; they are logged
/// and folded into [`DecodeError`] / [`EncodeError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The job was cancelled before it produced output.
    #[error("job cancelled")]
    Cancelled,

    /// No progress was reported for `after` while the job sat in `stage`.
    #[error("timed out after {after:?} while {stage}")]
    Timeout { stage: Stage, after: Duration },

    #[error(transparent)]
    Decode(DecodeError),

    #[error(transparent)]
    Compositor(#[from] CompositorError),

    #[error(transparent)]
    Encode(EncodeError),

    /// The worker task died or the runtime shut down underneath it.
    #[error("worker failure: {0}")]
    Worker(String),
}

impl From<DecodeError> for PipelineError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Stalled { after, .. } => PipelineError::Timeout {
                stage: Stage::Decoding,
                after,
            },
            other => PipelineError::Decode(other),
        }
    }
}

impl From<EncodeError> for PipelineError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Stalled { after, .. } => PipelineError::Timeout {
                stage: Stage::Encoding,
                after,
            },
            other => PipelineError::Encode(other),
        }
    }
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}
