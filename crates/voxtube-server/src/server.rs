//! HTTP server for the VoxTube API
//!
//! Provides /api/health, /api/summarize, /api/audio/{video_id},
//! /api/history and /api/stats. Cache hits and misses are reported to the
//! caller through an `X-Cache` header.

use crate::error::{Result, ServiceError};
use crate::speech::SpeechSynthesizer;
use crate::summarizer::Summarizer;
use crate::transcript::TranscriptFetcher;
use crate::types::{
    AudioParams, DeleteResponse, HealthResponse, StatsResponse, SummarizeRequest,
    SummarizeResponse,
};
use crate::video::{extract_video_id, is_video_id};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use voxtube_cache::{ArtifactStore, HistoryIndex, SummaryRecord};

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: Arc<ArtifactStore>,
    pub history: HistoryIndex,
    pub transcripts: TranscriptFetcher,
    pub summarizer: Summarizer,
    pub speech: SpeechSynthesizer,
    pub voices: Vec<String>,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(
        cache: Arc<ArtifactStore>,
        transcripts: TranscriptFetcher,
        summarizer: Summarizer,
        speech: SpeechSynthesizer,
        voices: Vec<String>,
    ) -> Self {
        Self {
            history: HistoryIndex::new(cache.clone()),
            cache,
            transcripts,
            summarizer,
            speech,
            voices,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<ServerState>;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/summarize", post(summarize))
        .route("/api/audio/{video_id}", get(get_audio))
        .route("/api/history", get(get_history))
        .route("/api/history/{video_id}", delete(delete_history))
        .route("/api/stats", get(get_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let cache_stats = state.cache.stats().await;
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: cache_stats,
    })
}

/// Summarize a video, serving from the cache when possible
async fn summarize(
    State(state): State<SharedState>,
    Json(request): Json<SummarizeRequest>,
) -> Response {
    let Some(video_id) = extract_video_id(&request.url) else {
        return bad_request("Not a recognizable YouTube URL or video id");
    };

    if let Some(record) = state.cache.read_summary(&video_id).await {
        return summary_response(record, true);
    }

    match generate_summary(&state, &video_id).await {
        Ok(record) => summary_response(record, false),
        Err(e) => {
            warn!(video_id = %video_id, error = %e, "Failed to summarize video");
            bad_gateway(&e)
        }
    }
}

/// Get synthesized audio for a video, serving from the cache when possible
async fn get_audio(
    State(state): State<SharedState>,
    Path(video_id): Path<String>,
    Query(params): Query<AudioParams>,
) -> Response {
    if !is_video_id(&video_id) {
        return bad_request("Not a recognizable YouTube video id");
    }

    let voice = match params.voice.or_else(|| state.voices.first().cloned()) {
        Some(voice) => voice,
        None => return bad_request("No voices configured"),
    };
    if !state.voices.contains(&voice) {
        return bad_request(&format!("Unknown voice: {}", voice));
    }

    let source = params.source.as_deref().unwrap_or("summary");
    let audio_id = match source {
        "summary" => format!("{}_summary", video_id),
        "transcript" => video_id.clone(),
        other => return bad_request(&format!("Unknown audio source: {}", other)),
    };

    if let Some(bytes) = state.cache.read_audio(&audio_id, &voice).await {
        return audio_response(bytes, "HIT");
    }

    let text = match resolve_text(&state, &video_id, source).await {
        Ok(text) => text,
        Err(e) => {
            warn!(video_id = %video_id, error = %e, "Failed to resolve narration text");
            return bad_gateway(&e);
        }
    };

    let bytes = match state.speech.synthesize(&text, &voice).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(video_id = %video_id, voice = %voice, error = %e, "Failed to synthesize audio");
            return bad_gateway(&e);
        }
    };

    // A cache write failure only loses the caching benefit; the caller
    // still gets the freshly synthesized bytes.
    if let Err(e) = state.cache.write_audio(&audio_id, &voice, &bytes).await {
        warn!(audio_id = %audio_id, voice = %voice, error = %e, "Failed to cache audio");
    }

    audio_response(bytes, "MISS")
}

/// List processed videos, newest first
async fn get_history(State(state): State<SharedState>) -> Json<Vec<voxtube_cache::HistoryEntry>> {
    Json(state.history.list().await)
}

/// Delete everything cached for a video
async fn delete_history(
    State(state): State<SharedState>,
    Path(video_id): Path<String>,
) -> Response {
    if !is_video_id(&video_id) {
        return bad_request("Not a recognizable YouTube video id");
    }

    let deleted = state.history.delete_video(&video_id, &state.voices).await;
    Json(DeleteResponse { deleted }).into_response()
}

/// Aggregate cache statistics
async fn get_stats(State(state): State<SharedState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    Json(StatsResponse {
        files: stats.files,
        total_bytes: stats.total_bytes,
    })
}

/// Fetch the transcript, summarize it, and cache the record. A record that
/// fails to cache is still returned to the caller.
async fn generate_summary(state: &ServerState, video_id: &str) -> Result<SummaryRecord> {
    let transcript = state.transcripts.fetch(video_id).await?;
    let (summary, model) = state
        .summarizer
        .summarize(&transcript.transcript, &transcript.metadata)
        .await?;

    let record = SummaryRecord::new(video_id, &summary, &model, transcript.metadata);
    if let Err(e) = state.cache.write_summary(&record).await {
        warn!(video_id = %video_id, error = %e, "Failed to cache summary");
    }

    Ok(record)
}

/// Text to narrate for the requested source: the (possibly freshly
/// generated) summary, or the raw transcript.
async fn resolve_text(state: &ServerState, video_id: &str, source: &str) -> Result<String> {
    if source == "transcript" {
        return Ok(state.transcripts.fetch(video_id).await?.transcript);
    }

    if let Some(record) = state.cache.read_summary(video_id).await {
        return Ok(record.summary);
    }
    Ok(generate_summary(state, video_id).await?.summary)
}

fn summary_response(record: SummaryRecord, cached: bool) -> Response {
    let cache_header = if cached { "HIT" } else { "MISS" };
    (
        StatusCode::OK,
        [("X-Cache", cache_header)],
        Json(SummarizeResponse {
            video_id: record.video_id,
            summary: record.summary,
            metadata: record.metadata,
            model: record.model,
            cached,
        }),
    )
        .into_response()
}

fn audio_response(bytes: Vec<u8>, cache_header: &'static str) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header("X-Cache", cache_header)
        .body(Body::from(bytes))
        .unwrap()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn bad_gateway(error: &ServiceError) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::tempdir;
    use tower::ServiceExt;
    use voxtube_cache::VideoMetadata;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    /// Collaborators point at an unreachable port so any upstream call
    /// fails fast with a connection error.
    fn create_test_state(cache_dir: PathBuf) -> SharedState {
        let cache = Arc::new(ArtifactStore::new(cache_dir, DAY));
        let transcripts = TranscriptFetcher::new("http://127.0.0.1:1").unwrap();
        let summarizer = Summarizer::new("http://127.0.0.1:1", "key", "model-x").unwrap();
        let speech = SpeechSynthesizer::new("http://127.0.0.1:1", "key", "tts-1").unwrap();
        let voices = vec!["alloy".to_string(), "nova".to_string()];
        Arc::new(ServerState::new(cache, transcripts, summarizer, speech, voices))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].as_u64().is_some());
        assert!(json["cache"]["files"].as_u64().is_some());
    }

    #[tokio::test]
    async fn test_stats_endpoint_empty_cache() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["files"], 0);
        assert_eq!(json["totalBytes"], 0);
    }

    #[tokio::test]
    async fn test_history_endpoint_empty() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_summarize_rejects_invalid_url() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(post_json(
                "/api/summarize",
                r#"{"url": "https://vimeo.com/12345"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_summarize_cache_hit() {
        let dir = tempdir().unwrap();
        let state = create_test_state(dir.path().to_path_buf());

        state
            .cache
            .write_summary(&SummaryRecord::new(
                "dQw4w9WgXcQ",
                "## Cached summary",
                "model-x",
                VideoMetadata::default(),
            ))
            .await
            .unwrap();

        let router = create_router(state);
        let response = router
            .oneshot(post_json(
                "/api/summarize",
                r#"{"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["X-Cache"], "HIT");

        let json = body_json(response).await;
        assert_eq!(json["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json["summary"], "## Cached summary");
        assert_eq!(json["cached"], true);
    }

    #[tokio::test]
    async fn test_summarize_miss_with_unreachable_upstream_is_502() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(post_json(
                "/api/summarize",
                r#"{"url": "dQw4w9WgXcQ"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let json = body_json(response).await;
        assert!(json["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_audio_rejects_unknown_voice() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/audio/dQw4w9WgXcQ?voice=unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_audio_rejects_invalid_video_id() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/audio/not-an-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_audio_cache_hit_serves_bytes_with_hit_header() {
        let dir = tempdir().unwrap();
        let state = create_test_state(dir.path().to_path_buf());

        state
            .cache
            .write_audio("dQw4w9WgXcQ_summary", "nova", b"mp3 bytes")
            .await
            .unwrap();

        let router = create_router(state);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/audio/dQw4w9WgXcQ?voice=nova")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["X-Cache"], "HIT");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"mp3 bytes");
    }

    #[tokio::test]
    async fn test_audio_miss_with_unreachable_upstream_is_502() {
        let dir = tempdir().unwrap();
        let router = create_router(create_test_state(dir.path().to_path_buf()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/audio/dQw4w9WgXcQ?voice=nova")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_delete_endpoint_is_idempotent() {
        let dir = tempdir().unwrap();
        let state = create_test_state(dir.path().to_path_buf());

        state
            .cache
            .write_summary(&SummaryRecord::new(
                "dQw4w9WgXcQ",
                "text",
                "model-x",
                VideoMetadata::default(),
            ))
            .await
            .unwrap();

        let router = create_router(state);
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/history/dQw4w9WgXcQ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["deleted"], 1);

        let response = router
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/history/dQw4w9WgXcQ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["deleted"], 0);
    }

    #[tokio::test]
    async fn test_summarize_then_history_lists_it() {
        let dir = tempdir().unwrap();
        let state = create_test_state(dir.path().to_path_buf());

        state
            .cache
            .write_summary(&SummaryRecord::new(
                "dQw4w9WgXcQ",
                "text",
                "model-x",
                VideoMetadata {
                    title: Some("A talk".to_string()),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();

        let router = create_router(state);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json[0]["videoId"], "dQw4w9WgXcQ");
        assert_eq!(json[0]["title"], "A talk");
        assert_eq!(json[0]["hasAudio"], false);
    }
}
