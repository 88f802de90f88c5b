//! Speech Synthesis Service
//!
//! Batched narration audio for finished chapters. Partial batch
//! failure is expected: each item carries either an audio URL or its
//! own error, and the caller decides what an incomplete narration set
//! means for the story.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::ServiceError;

/// One text to synthesize, keyed so results can be re-associated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechItem {
    pub id: String,
    pub text: String,
}

impl SpeechItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Per-item synthesis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechResult {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpeechResult {
    pub fn is_ok(&self) -> bool {
        self.audio_url.is_some() && self.error.is_none()
    }
}

/// The speech synthesis collaborator.
#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn synthesize(&self, items: Vec<SpeechItem>) -> Result<Vec<SpeechResult>, ServiceError>;
}

/// reqwest-backed client for the speech endpoint.
pub struct HttpSpeechService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpSpeechService {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl SpeechService for HttpSpeechService {
    async fn synthesize(&self, items: Vec<SpeechItem>) -> Result<Vec<SpeechResult>, ServiceError> {
        let url = format!("{}/v1/speech/batch", self.base_url.trim_end_matches('/'));

        let mut http_request = self.client.post(&url).timeout(self.timeout).json(&items);
        if let Some(key) = &self.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                ServiceError::Transport(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::http(status.as_u16(), body));
        }

        let body = response.text().await.map_err(ServiceError::Transport)?;
        let results: Vec<SpeechResult> = serde_json::from_str(&body)?;
        Ok(results)
    }
}
