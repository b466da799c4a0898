//! TTS synthesizer client (OpenAI-compatible speech endpoint)

use crate::error::{Result, ServiceError};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The OpenAI speech endpoint caps input at 4096 characters.
const MAX_INPUT_CHARS: usize = 4096;

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

/// HTTP client for the speech synthesis engine.
pub struct SpeechSynthesizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl SpeechSynthesizer {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Synthesize `text` with the given voice, returning MP3 bytes.
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let input = truncate_input(text);
        let request = SpeechRequest {
            model: &self.model,
            input,
            voice,
        };

        let url = format!("{}/audio/speech", self.base_url);
        debug!(voice, chars = input.len(), "Requesting speech synthesis");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "TTS engine returned status {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(ServiceError::Upstream(
                "TTS engine returned no audio".to_string(),
            ));
        }

        debug!(voice, size = bytes.len(), "Synthesized audio");
        Ok(bytes)
    }
}

fn truncate_input(s: &str) -> &str {
    if s.len() <= MAX_INPUT_CHARS {
        return s;
    }
    let mut end = MAX_INPUT_CHARS;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
