use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub services: ServiceConfig,
    pub scoring: ScoringConfig,
    pub data: DataConfig,
}

/// Story generation tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Timeout for a single text generation call, in seconds.
    pub text_timeout_secs: u64,
    /// Timeout for a single image generation call, in seconds.
    pub image_timeout_secs: u64,
    /// Timeout for a batched speech synthesis call, in seconds.
    pub speech_timeout_secs: u64,
    /// Whether phase 0 (fairy tale selection) runs by default.
    pub use_fairy_tale_templates: bool,
}

/// Endpoints for the external generation collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the text generation service.
    pub text_url: String,
    /// Base URL of the image generation service.
    pub image_url: String,
    /// Base URL of the speech synthesis service.
    pub speech_url: String,
    /// API key sent as a bearer token, if required.
    pub api_key: Option<String>,
}

/// Batch scoring tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Maximum stories scored concurrently by the batch analyzer.
    pub batch_concurrency: usize,
    /// How many recent stories "analyze recent" covers by default.
    pub batch_window: u32,
}

/// Data directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            services: ServiceConfig::default(),
            scoring: ScoringConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            text_timeout_secs: 90,
            image_timeout_secs: 120,
            speech_timeout_secs: 120,
            use_fairy_tale_templates: true,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            text_url: "http://127.0.0.1:8089".to_string(),
            image_url: "http://127.0.0.1:8090".to_string(),
            speech_url: "http://127.0.0.1:8091".to_string(),
            api_key: None,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: 4,
            batch_window: 20,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { data_dir: None }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/fableweaver/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e}, using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("fableweaver"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    /// Path of the SQLite database file inside the data directory.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("fableweaver.db")
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("fableweaver").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
