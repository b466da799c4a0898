//! LLM summarizer client (OpenAI-compatible chat completions)

use crate::error::{Result, ServiceError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use voxtube_cache::VideoMetadata;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Transcripts beyond this are truncated before being sent upstream.
const MAX_TRANSCRIPT_CHARS: usize = 48_000;

const SYSTEM_PROMPT: &str = "You summarize YouTube video transcripts. Produce a \
concise markdown summary: a one-paragraph overview followed by the key points \
as a bulleted list. Preserve the speaker's terminology.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// HTTP client for the summarization model.
pub struct Summarizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Summarizer {
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

    /// Summarize a transcript. Returns `(summary, model_name)`, where the
    /// model name is the one the upstream reports having used.
    pub async fn summarize(
        &self,
        transcript: &str,
        metadata: &VideoMetadata,
    ) -> Result<(String, String)> {
        let user_message = build_user_message(transcript, metadata);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, chars = user_message.len(), "Requesting summary");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ServiceError::Upstream(format!(
                "Summarizer returned status {}",
                response.status()
            )));
        }

        let body: ChatResponse = response.json().await?;
        let summary = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::Upstream("Summarizer returned no content".to_string())
            })?;

        let model = body.model.unwrap_or_else(|| self.model.clone());
        Ok((summary, model))
    }
}

fn build_user_message(transcript: &str, metadata: &VideoMetadata) -> String {
    let mut message = String::new();
    if let Some(title) = &metadata.title {
        message.push_str(&format!("Video title: {}\n", title));
    }
    if let Some(channel) = &metadata.channel {
        message.push_str(&format!("Channel: {}\n", channel));
    }
    message.push_str("\nTranscript:\n");
    message.push_str(truncate_at_char_boundary(transcript, MAX_TRANSCRIPT_CHARS));
    message
}

fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
