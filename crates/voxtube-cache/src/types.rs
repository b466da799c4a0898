//! Cache types

use serde::{Deserialize, Serialize};

/// Optional video metadata carried on a summary record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// A persisted summary for one video.
///
/// Serialized as `<digest(videoId)>_summary.json` in the cache root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub video_id: String,
    /// Markdown summary text.
    pub summary: String,
    #[serde(default)]
    pub metadata: VideoMetadata,
    /// Name of the model that produced the summary.
    pub model: String,
    /// Epoch milliseconds at write time.
    pub created_at: i64,
}

impl SummaryRecord {
    /// Build a record stamped with the current time.
    pub fn new(video_id: &str, summary: &str, model: &str, metadata: VideoMetadata) -> Self {
        Self {
            video_id: video_id.to_string(),
            summary: summary.to_string(),
            metadata,
            model: model.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// One processed video in the history listing. Derived from a fresh
/// [`SummaryRecord`], never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub video_id: String,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub duration: Option<String>,
    pub created_at: i64,
    /// Best-effort: true when a voice-index sidecar records synthesized
    /// audio for this video.
    pub has_audio: bool,
}

/// Sidecar index mapping a video to the audio artifacts written for it.
///
/// Audio filenames are one-way digests, so without this index a per-video
/// delete could only guess keys from a fixed voice list. Upserted on every
/// audio write as `<digest(videoId)>_voices.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceIndex {
    pub video_id: String,
    #[serde(default)]
    pub entries: Vec<VoiceIndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceIndexEntry {
    /// Audio identity: the video id, or `{videoId}_summary` for
    /// narrated-summary audio.
    pub audio_id: String,
    pub voice: String,
}

/// Statistics about the cache. File and byte counts cover audio artifacts
/// only; summary records and sidecars are excluded by convention.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub files: u64,
    pub total_bytes: u64,
    pub hits: u64,
    pub misses: u64,
}

/// Result of one eviction pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SweepOutcome {
    pub deleted: u64,
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_record_wire_shape() {
        let record = SummaryRecord::new(
            "abc12345678",
            "## Title\nBody",
            "model-x",
            VideoMetadata {
                title: Some("T".to_string()),
                ..Default::default()
            },
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["videoId"], "abc12345678");
        assert_eq!(json["summary"], "## Title\nBody");
        assert_eq!(json["model"], "model-x");
        assert_eq!(json["metadata"]["title"], "T");
        assert!(json["createdAt"].as_i64().unwrap() > 0);
        // Unset metadata fields are omitted from the wire shape.
        assert!(json["metadata"].get("channel").is_none());
    }

    #[test]
    fn test_summary_record_tolerates_missing_metadata() {
        let json = r#"{"videoId":"v","summary":"s","model":"m","createdAt":123}"#;
        let record: SummaryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.metadata, VideoMetadata::default());
        assert_eq!(record.created_at, 123);
    }

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.files, 0);
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_voice_index_round_trip() {
        let index = VoiceIndex {
            video_id: "abc12345678".to_string(),
            entries: vec![VoiceIndexEntry {
                audio_id: "abc12345678_summary".to_string(),
                voice: "nova".to_string(),
            }],
        };

        let json = serde_json::to_string(&index).unwrap();
        let parsed: VoiceIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.video_id, index.video_id);
        assert_eq!(parsed.entries, index.entries);
    }
}
