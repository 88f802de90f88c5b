//! Image Generation Service
//!
//! Contract and HTTP client for the illustration collaborator. One
//! call produces one image; the orchestrator iterates chapters and
//! treats each failure per-item.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::ServiceError;

/// Requested output dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    /// Square cover format.
    pub const COVER: Self = Self {
        width: 1024,
        height: 1024,
    };

    /// Landscape chapter illustration format.
    pub const CHAPTER: Self = Self {
        width: 1024,
        height: 768,
    };
}

/// A completed image generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub url: String,
    pub duration_ms: u64,
}

/// The image generation collaborator.
#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        dimensions: ImageDimensions,
    ) -> Result<GeneratedImage, ServiceError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest<'a> {
    prompt: &'a str,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    url: String,
}

/// reqwest-backed client for the image endpoint.
pub struct HttpImageGenerationService {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpImageGenerationService {
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
impl ImageGenerationService for HttpImageGenerationService {
    async fn generate(
        &self,
        prompt: &str,
        dimensions: ImageDimensions,
    ) -> Result<GeneratedImage, ServiceError> {
        let url = format!("{}/v1/images", self.base_url.trim_end_matches('/'));
        let started = Instant::now();

        let mut http_request = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&WireRequest {
                prompt,
                width: dimensions.width,
                height: dimensions.height,
            });
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
        Ok(GeneratedImage {
            url: wire.url,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}
