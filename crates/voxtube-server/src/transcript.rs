//! Transcript source client

use crate::error::{Result, ServiceError};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use voxtube_cache::VideoMetadata;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A fetched transcript with whatever metadata the source provided.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub transcript: String,
    #[serde(default)]
    pub metadata: VideoMetadata,
}

/// HTTP client for the third-party transcript source.
pub struct TranscriptFetcher {
    client: Client,
    base_url: String,
}

impl TranscriptFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the transcript for a video.
    pub async fn fetch(&self, video_id: &str) -> Result<Transcript> {
        let url = format!("{}/transcript?videoId={}", self.base_url, video_id);
        debug!(video_id, url = %url, "Fetching transcript");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "Transcript source returned status {}",
                response.status()
            )));
        }

        let transcript: Transcript = response.json().await?;
        if transcript.transcript.trim().is_empty() {
            return Err(ServiceError::Upstream(
                "Transcript source returned an empty transcript".to_string(),
            ));
        }

        debug!(
            video_id,
            chars = transcript.transcript.len(),
            "Fetched transcript"
        );
        Ok(transcript)
    }
}
