//! Job lifecycle states.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Working stage of a job, used to report where a timeout happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decoding,
    Compositing,
    Encoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decoding => "decoding",
            Stage::Compositing => "compositing",
            Stage::Encoding => "encoding",
        };
        f.write_str(name)
    }
}

/// Where a job is in its lifecycle.
///
/// `Queued -> Decoding -> Compositing -> Encoding -> Done`, with `Failed`
/// and `Cancelled` reachable from every non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Decoding,
    Compositing { done: usize, total: usize },
    Encoding,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Cancelled)
    }

    /// The working stage, if the job is in one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            JobState::Decoding => Some(Stage::Decoding),
            JobState::Compositing { .. } => Some(Stage::Compositing),
            JobState::Encoding => Some(Stage::Encoding),
            _ => None,
        }
    }
}

/// Composited frames out of the document total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FrameProgress {
    pub processed: usize,
    pub total: usize,
}

impl FrameProgress {
    /// Fraction in `[0, 1]`; 0 until the frame count is known.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

/// Frame counters shared between a worker and its handle.
#[derive(Debug, Default)]
pub(crate) struct ProgressCounter {
    processed: AtomicUsize,
    total: AtomicUsize,
}

impl ProgressCounter {
    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Release);
    }

    /// Record one finished frame and return the new processed count.
    pub fn frame_done(&self) -> usize {
        self.processed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn snapshot(&self) -> FrameProgress {
        FrameProgress {
            processed: self.processed.load(Ordering::Acquire),
            total: self.total.load(Ordering::Acquire),
        }
    }
}
