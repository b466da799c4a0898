//! Artifact persistence: key derivation, freshness checks, reads and writes

use crate::error::Result;
use crate::types::{CacheStats, SummaryRecord, VoiceIndex, VoiceIndexEntry};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// Counter used to give concurrent writers distinct temp file names.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File-backed store for audio artifacts and summary records.
///
/// The store exclusively owns the cache root directory. There is no
/// in-memory metadata: presence and age are recomputed from file
/// modification times on every access, so the store survives restarts
/// and never drifts from what is actually on disk.
pub struct ArtifactStore {
    cache_dir: PathBuf,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ArtifactStore {
    /// Create a store over `cache_dir` with the given artifact TTL.
    ///
    /// The directory itself is created lazily on first write; reads from a
    /// missing directory behave as cache misses.
    pub fn new(cache_dir: PathBuf, ttl: Duration) -> Self {
        Self {
            cache_dir,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Eagerly create the cache root.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).await?;
        info!(cache_dir = ?self.cache_dir, "Cache initialized");
        Ok(())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Derive the audio artifact key for `(audio_id, voice)`.
    ///
    /// A SHA-256 hex digest: deterministic, collision-resistant, and free of
    /// path-traversal characters regardless of what the raw inputs contain.
    pub fn key_for_audio(audio_id: &str, voice: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}_{}", audio_id, voice).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Derive the summary record key for a video. Voice-independent.
    pub fn key_for_summary(video_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(video_id.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub(crate) fn audio_path(&self, audio_id: &str, voice: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.mp3", Self::key_for_audio(audio_id, voice)))
    }

    pub(crate) fn summary_path(&self, video_id: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}_summary.json", Self::key_for_summary(video_id)))
    }

    pub(crate) fn voice_index_path(&self, video_id: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}_voices.json", Self::key_for_summary(video_id)))
    }

    /// Strip the `_summary` suffix used for narrated-summary audio, yielding
    /// the video id that owns the artifact.
    pub(crate) fn base_video_id(audio_id: &str) -> &str {
        audio_id.strip_suffix("_summary").unwrap_or(audio_id)
    }

    /// Age of the file at `path` from its modification time, or `None` if it
    /// does not exist or cannot be stat'd.
    pub(crate) async fn file_age(path: &Path) -> Option<Duration> {
        let metadata = fs::metadata(path).await.ok()?;
        let modified = metadata.modified().ok()?;
        // A modification time in the future (clock skew) counts as age zero.
        Some(modified.elapsed().unwrap_or(Duration::ZERO))
    }

    /// Whether the file at `path` exists and is younger than the TTL,
    /// without side effects. `age >= ttl` counts as expired.
    pub(crate) async fn is_fresh_no_evict(&self, path: &Path) -> bool {
        matches!(Self::file_age(path).await, Some(age) if age < self.ttl)
    }

    /// Freshness check with lazy eviction: a file that exists but has
    /// expired is deleted before returning `false`. A missing file is a
    /// normal `false`, never an error.
    pub(crate) async fn is_fresh(&self, path: &Path) -> bool {
        match Self::file_age(path).await {
            None => false,
            Some(age) if age < self.ttl => true,
            Some(age) => {
                debug!(path = ?path, age_secs = age.as_secs(), "Evicting expired artifact");
                if let Err(e) = fs::remove_file(path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = ?path, error = %e, "Failed to evict expired artifact");
                    }
                }
                false
            }
        }
    }

    /// Read cached audio bytes for `(audio_id, voice)`, or `None` on a miss.
    ///
    /// `audio_id` is the video id, or `{videoId}_summary` for
    /// narrated-summary audio.
    pub async fn read_audio(&self, audio_id: &str, voice: &str) -> Option<Vec<u8>> {
        let path = self.audio_path(audio_id, voice);

        if !self.is_fresh(&path).await {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        match fs::read(&path).await {
            Ok(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(audio_id, voice, size = bytes.len(), "Audio cache hit");
                Some(bytes)
            }
            Err(e) => {
                warn!(audio_id, voice, error = %e, "Failed to read cached audio");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Persist audio bytes for `(audio_id, voice)`.
    ///
    /// The write is atomic relative to readers (temp file plus rename), and
    /// also upserts the voice-index sidecar so a later per-video delete can
    /// find the artifact behind its one-way key. An `Err` here means only
    /// the caching benefit was lost; callers should log it and keep serving
    /// the freshly synthesized bytes.
    pub async fn write_audio(&self, audio_id: &str, voice: &str, bytes: &[u8]) -> Result<()> {
        let file_name = format!("{}.mp3", Self::key_for_audio(audio_id, voice));
        self.write_atomic(&file_name, bytes).await?;
        debug!(audio_id, voice, size = bytes.len(), "Cached audio artifact");

        // Sidecar failures don't fail the write; deletion falls back to the
        // known-voice list when the index is missing.
        if let Err(e) = self.upsert_voice_index(audio_id, voice).await {
            warn!(audio_id, voice, error = %e, "Failed to update voice index");
        }

        Ok(())
    }

    /// Read the summary record for a video, or `None` on a miss.
    /// A record that fails to parse is treated as absent.
    pub async fn read_summary(&self, video_id: &str) -> Option<SummaryRecord> {
        let path = self.summary_path(video_id);

        if !self.is_fresh(&path).await {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(video_id, error = %e, "Failed to read cached summary");
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match serde_json::from_slice::<SummaryRecord>(&bytes) {
            Ok(record) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(video_id, "Summary cache hit");
                Some(record)
            }
            Err(e) => {
                warn!(video_id, error = %e, "Corrupt summary record, treating as absent");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Persist a summary record. Same durability contract as
    /// [`ArtifactStore::write_audio`].
    pub async fn write_summary(&self, record: &SummaryRecord) -> Result<()> {
        let file_name = format!("{}_summary.json", Self::key_for_summary(&record.video_id));
        let bytes = serde_json::to_vec(record)?;
        self.write_atomic(&file_name, &bytes).await?;
        debug!(video_id = %record.video_id, model = %record.model, "Cached summary record");
        Ok(())
    }

    /// Aggregate statistics over audio artifacts, plus hit/miss counters.
    /// A missing cache root yields zeros, not an error.
    pub async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        };

        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(_) => return stats,
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mp3") {
                continue;
            }
            if let Ok(metadata) = entry.metadata().await {
                stats.files += 1;
                stats.total_bytes += metadata.len();
            }
        }

        stats
    }

    /// Parse the voice-index sidecar for a video, ignoring entries that
    /// fail to parse. Freshness is not consulted: deletion wants the index
    /// even when it has expired.
    pub(crate) async fn read_voice_index(&self, video_id: &str) -> Option<VoiceIndex> {
        let bytes = fs::read(self.voice_index_path(video_id)).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    async fn upsert_voice_index(&self, audio_id: &str, voice: &str) -> Result<()> {
        let base_id = Self::base_video_id(audio_id);
        let mut index = self
            .read_voice_index(base_id)
            .await
            .unwrap_or_else(|| VoiceIndex {
                video_id: base_id.to_string(),
                entries: Vec::new(),
            });

        let entry = VoiceIndexEntry {
            audio_id: audio_id.to_string(),
            voice: voice.to_string(),
        };
        if !index.entries.contains(&entry) {
            index.entries.push(entry);
        }

        // Rewritten even when unchanged: the sidecar's mtime must stay at
        // least as fresh as the newest audio artifact it describes.
        let file_name = format!("{}_voices.json", Self::key_for_summary(base_id));
        let bytes = serde_json::to_vec(&index)?;
        self.write_atomic(&file_name, &bytes).await
    }

    /// Write bytes under `file_name` in the cache root so that a concurrent
    /// reader observes either the old content or the new, never a partial
    /// file.
    async fn write_atomic(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).await?;

        let tmp_name = format!(
            "{}.{}.tmp",
            file_name,
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let tmp_path = self.cache_dir.join(&tmp_name);
        let final_path = self.cache_dir.join(file_name);

        fs::write(&tmp_path, bytes).await?;
        if let Err(e) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        Ok(())
    }
}
