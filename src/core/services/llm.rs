//! Text Generation Service
//!
//! Contract and HTTP client for the LLM collaborator. The pipeline
//! sends one prompt per call and receives text plus token usage and
//! latency; prompt content itself is assembled by the orchestrator.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::ServiceError;

// ============================================================================
// Request/Response Types
// ============================================================================

/// A single text generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// System-level instruction, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// The user prompt.
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token counts reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub text: String,
    #[serde(default)]
    pub usage: TokenUsage,
    pub duration_ms: u64,
}

// ============================================================================
// Service Trait
// ============================================================================

/// The text generation collaborator.
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationResponse, ServiceError>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// Wire shape of the generation endpoint's response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    text: String,
    #[serde(default)]
    usage: TokenUsage,
}

/// reqwest-backed client for the generation endpoint.
pub struct HttpTextGenerationService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpTextGenerationService {
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
impl TextGenerationService for HttpTextGenerationService {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ServiceError> {
        let url = format!("{}/v1/generate", self.base_url.trim_end_matches('/'));
        let started = Instant::now();

        let mut http_request = self.client.post(&url).timeout(self.timeout).json(&request);
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
        let wire: WireResponse = serde_json::from_str(&body)?;
        Ok(GenerationResponse {
            text: wire.text,
            usage: wire.usage,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}
