//! File-based artifact cache with TTL eviction and history listing
//!
//! Stores synthesized-audio blobs and summary records as individual files
//! under a single cache root, keyed by SHA-256 digests of their logical
//! identity. File modification times are the single source of truth for
//! artifact age: there is no in-memory index that can drift from disk.

mod error;
mod history;
mod store;
mod sweeper;
mod types;

pub use error::{CacheError, Result};
pub use history::HistoryIndex;
pub use store::ArtifactStore;
pub use sweeper::{sweep_once, Sweeper, SweeperHandle};
pub use types::{
    CacheStats, HistoryEntry, SummaryRecord, SweepOutcome, VideoMetadata, VoiceIndex,
    VoiceIndexEntry,
};
