//! Derived history listing and per-video deletion
//!
//! The history is a read-only projection over summary records: no history
//! state is persisted, it is reconstructed from the cache root on every
//! call.

use crate::store::ArtifactStore;
use crate::types::HistoryEntry;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-only view over summary records, plus full per-video removal.
pub struct HistoryIndex {
    store: Arc<ArtifactStore>,
}

impl HistoryIndex {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }

    /// List processed videos, newest first.
    ///
    /// Expired records are filtered out but not deleted here; eviction is
    /// the sweeper's job. Records that fail to parse are skipped.
    pub async fn list(&self) -> Vec<HistoryEntry> {
        let mut result = Vec::new();

        let mut entries = match tokio::fs::read_dir(self.store.cache_dir()).await {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(error = %e, "Failed to enumerate cache root for history");
                }
                return result;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_summary = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_summary.json"));
            if !is_summary {
                continue;
            }

            // Read-time filter only: leave expired files for the sweeper.
            if !self.store.is_fresh_no_evict(&path).await {
                continue;
            }

            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Failed to read summary record");
                    continue;
                }
            };
            let record: crate::types::SummaryRecord = match serde_json::from_slice(&bytes) {
                Ok(record) => record,
                Err(e) => {
                    debug!(path = ?path, error = %e, "Skipping corrupt summary record");
                    continue;
                }
            };

            let has_audio = self
                .store
                .is_fresh_no_evict(&self.store.voice_index_path(&record.video_id))
                .await;

            result.push(HistoryEntry {
                video_id: record.video_id,
                title: record.metadata.title,
                channel: record.metadata.channel,
                duration: record.metadata.duration,
                created_at: record.created_at,
                has_audio,
            });
        }

        result.sort_unstable_by(|a, b| b.created_at.cmp(&a.created_at));
        result
    }

    /// Delete everything cached for a video: its summary record, its
    /// voice-index sidecar, and every audio artifact the sidecar records.
    ///
    /// For caches written before the sidecar existed, candidate audio keys
    /// are also recomputed from `known_voices` for both the plain video id
    /// and its `{videoId}_summary` variant. Returns the number of files
    /// actually removed; removing nothing is success.
    pub async fn delete_video(&self, video_id: &str, known_voices: &[String]) -> u64 {
        let mut candidates: HashSet<PathBuf> = HashSet::new();
        candidates.insert(self.store.summary_path(video_id));

        if let Some(index) = self.store.read_voice_index(video_id).await {
            for entry in &index.entries {
                candidates.insert(self.store.audio_path(&entry.audio_id, &entry.voice));
            }
        }
        for voice in known_voices {
            candidates.insert(self.store.audio_path(video_id, voice));
            candidates.insert(
                self.store
                    .audio_path(&format!("{}_summary", video_id), voice),
            );
        }

        // The sidecar goes last so a failure partway through still leaves
        // the index usable for a retry.
        let mut deleted = 0u64;
        for path in candidates
            .into_iter()
            .chain(std::iter::once(self.store.voice_index_path(video_id)))
        {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = ?path, error = %e, "Failed to delete cached file");
                }
            }
        }

        debug!(video_id, deleted, "Deleted video cache entries");
        deleted
    }
}
