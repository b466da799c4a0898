//! VoxTube server - local summarize-and-narrate backend
//!
//! Serves the desktop app's API: summarize a YouTube video, narrate it,
//! and keep both artifacts in a TTL-bounded file cache so repeat requests
//! never pay for the same transcript, LLM call, or synthesis twice.

mod error;
mod server;
mod speech;
mod summarizer;
mod transcript;
mod types;
mod video;

use crate::error::{Result, ServiceError};
use crate::server::{start_server, ServerState, SharedState};
use crate::speech::SpeechSynthesizer;
use crate::summarizer::Summarizer;
use crate::transcript::TranscriptFetcher;
use crate::types::{ServerConfig, DEFAULT_VOICES};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};
use voxtube_cache::{ArtifactStore, Sweeper};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("voxtube_server=info".parse()?)
        .add_directive("voxtube_cache=info".parse()?);

    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting VoxTube server...");

    // Load configuration from environment
    let config = load_config()?;
    info!("Port: {}", config.port);
    info!("Cache dir: {:?}", config.cache_dir);
    info!("Cache TTL: {} days", config.ttl.as_secs() / (24 * 60 * 60));
    info!(
        "Sweep interval: {} hours",
        config.sweep_interval.as_secs() / 3600
    );

    // Create the cache and its background eviction sweeper
    let cache = Arc::new(ArtifactStore::new(config.cache_dir.clone(), config.ttl));
    cache.init().await?;
    let sweeper = Sweeper::spawn(cache.clone(), config.sweep_interval);

    // Upstream collaborators
    let transcripts = TranscriptFetcher::new(&config.transcript_api_url)?;
    let summarizer = Summarizer::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.summary_model,
    )?;
    let speech = SpeechSynthesizer::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.tts_model,
    )?;

    // Create shared state and serve until interrupted
    let state: SharedState = Arc::new(ServerState::new(
        cache,
        transcripts,
        summarizer,
        speech,
        config.voices,
    ));
    start_server(state, config.port).await?;

    sweeper.shutdown().await;
    info!("VoxTube server stopped");
    Ok(())
}

fn load_config() -> Result<ServerConfig> {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3847);

    let cache_dir = std::env::var("CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./cache"));

    let ttl_days = std::env::var("CACHE_TTL_DAYS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(7);

    let sweep_hours = std::env::var("SWEEP_INTERVAL_HOURS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(12);

    let transcript_api_url = std::env::var("TRANSCRIPT_API_URL").map_err(|_| {
        ServiceError::Config("TRANSCRIPT_API_URL environment variable is required".to_string())
    })?;

    let openai_api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
        ServiceError::Config("OPENAI_API_KEY environment variable is required".to_string())
    })?;

    let openai_base_url = std::env::var("OPENAI_BASE_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

    let summary_model =
        std::env::var("SUMMARY_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
    let tts_model = std::env::var("TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string());

    let voices: Vec<String> = std::env::var("TTS_VOICES")
        .map(|s| {
            s.split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| DEFAULT_VOICES.iter().map(|v| v.to_string()).collect());
    if voices.is_empty() {
        return Err(ServiceError::Config(
            "TTS_VOICES must name at least one voice".to_string(),
        ));
    }

    Ok(ServerConfig {
        port,
        cache_dir,
        ttl: Duration::from_secs(ttl_days * 24 * 60 * 60),
        sweep_interval: Duration::from_secs(sweep_hours * 3600),
        transcript_api_url,
        openai_api_key,
        openai_base_url,
        summary_model,
        tts_model,
        voices,
    })
}
