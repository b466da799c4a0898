//! Core types for the VoxTube server

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use voxtube_cache::{CacheStats, VideoMetadata};

/// The OpenAI speech voices the app exposes. Overridable via `TTS_VOICES`.
pub const DEFAULT_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// Server configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub cache_dir: PathBuf,
    pub ttl: Duration,
    pub sweep_interval: Duration,
    pub transcript_api_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub summary_model: String,
    pub tts_model: String,
    pub voices: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    pub video_id: String,
    pub summary: String,
    pub metadata: VideoMetadata,
    pub model: String,
    pub cached: bool,
}

#[derive(Debug, Deserialize)]
pub struct AudioParams {
    pub voice: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub files: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}
