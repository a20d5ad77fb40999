//! Cache entry types
//!
//! - `CachedResult`: the encoded output of one finished job
//! - `CacheEntry`: a result plus the bookkeeping the LRU needs

use super::fingerprint::Fingerprint;
use bytes::Bytes;

/// Encoded output worth keeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResult {
    pub bytes: Bytes,
    pub degraded: bool,
    pub frame_count: usize,
}

impl CachedResult {
    pub fn new(bytes: impl Into<Bytes>, degraded: bool, frame_count: usize) -> Self {
        Self {
            bytes: bytes.into(),
            degraded,
            frame_count,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Stored cache entry.
///
/// `created_at` is a monotonic insertion counter rather than wall-clock
/// time; larger means newer.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub result: CachedResult,
    pub created_at: u64,
}

impl CacheEntry {
    pub fn new(fingerprint: Fingerprint, result: CachedResult, created_at: u64) -> Self {
        Self {
            fingerprint,
            result,
            created_at,
        }
    }
}
