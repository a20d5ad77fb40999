//! Codec error types.
//!
//! Individual backends report [`BackendError`]. The decoder and encoder
//! chains collect those into [`BackendFailure`] records and only surface
//! [`DecodeError`] / [`EncodeError`] once every backend has been tried.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while constructing a [`GifDocument`](super::GifDocument).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("logical screen must be non-empty, got {width}x{height}")]
    EmptyScreen { width: u32, height: u32 },

    #[error("document has no frames")]
    NoFrames,
}

/// Failure of a single decode or encode backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend cannot handle this input (e.g. limits exceeded).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The underlying codec library reported an error.
    #[error("codec error: {0}")]
    Codec(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No progress was reported within the watchdog interval.
    #[error("no progress for {0:?}")]
    Stalled(Duration),
}

impl From<gif::DecodingError> for BackendError {
    fn from(err: gif::DecodingError) -> Self {
        match err {
            gif::DecodingError::Io(e) => BackendError::Io(e),
            other => BackendError::Codec(other.to_string()),
        }
    }
}

impl From<gif::EncodingError> for BackendError {
    fn from(err: gif::EncodingError) -> Self {
        match err {
            gif::EncodingError::Io(e) => BackendError::Io(e),
            other => BackendError::Codec(other.to_string()),
        }
    }
}

impl From<image::ImageError> for BackendError {
    fn from(err: image::ImageError) -> Self {
        BackendError::Codec(err.to_string())
    }
}

/// Record of one backend failing inside a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    pub backend: &'static str,
    pub message: String,
}

impl BackendFailure {
    pub fn new(backend: &'static str, err: &BackendError) -> Self {
        Self {
            backend,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.message)
    }
}

struct FailureList<'a>(&'a [BackendFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

/// Errors surfaced by [`FrameDecoder::decode`](super::FrameDecoder::decode).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input does not start with a `GIF87a` / `GIF89a` signature.
    #[error("input is not a GIF (missing GIF87a/GIF89a signature)")]
    InvalidFormat,

    #[error("all decode backends failed: {}", FailureList(.0))]
    AllBackendsFailed(Vec<BackendFailure>),

    /// The last backend in the chain stalled.
    #[error("decode stalled for {after:?}: {}", FailureList(.failures))]
    Stalled {
        after: Duration,
        failures: Vec<BackendFailure>,
    },
}

/// Errors surfaced by [`FrameEncoder::encode`](super::FrameEncoder::encode).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("all encode backends failed: {}", FailureList(.0))]
    AllBackendsFailed(Vec<BackendFailure>),

    /// The last backend stalled and the static fallback failed as well.
    #[error("encode stalled for {after:?}: {}", FailureList(.failures))]
    Stalled {
        after: Duration,
        failures: Vec<BackendFailure>,
    },
}
