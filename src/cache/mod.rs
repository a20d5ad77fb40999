//! Processing cache
//!
//! Finished outputs are keyed by a [`Fingerprint`] of the source bytes and
//! the watermark descriptor, so running the same watermark over the same
//! file twice skips the whole pipeline.
//!
//! The cache is owned by the pipeline orchestrator. Workers never see it.

pub mod entry;
pub mod fingerprint;
pub mod memory;
pub mod stats;

pub use entry::{CacheEntry, CachedResult};
pub use fingerprint::{canonical_descriptor, content_hash, Fingerprint};
pub use memory::ProcessingCache;
pub use stats::CacheStats;
