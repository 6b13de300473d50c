//! Configuration types for the assistant.

use crate::session::{Language, Persona};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session defaults (language, persona, starting place).
    pub session: SessionConfig,
    /// Backend endpoints consumed by the session controller.
    pub backend: BackendConfig,
    /// Speech output settings.
    pub speech: SpeechConfig,
    /// Search-history persistence settings.
    pub history: HistoryConfig,
    /// Embedded suggestion service settings (`sora serve`).
    pub server: ServerConfig,
    /// Auth service settings.
    pub auth: AuthConfig,
}

/// Session defaults applied when a controller is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Output language for summaries and suggestions.
    pub language: Language,
    /// Suggestion framing persona.
    pub persona: Persona,
    /// Place shown before the user's first input.
    pub place: String,
    /// How many recent searches the dashboard view keeps.
    pub recent_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: Language::En,
            persona: Persona::Outings,
            place: "Tokyo".to_owned(),
            recent_limit: 5,
        }
    }
}

/// Backend endpoints for weather lookup and suggestion generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the service exposing `/weather` and `/suggest`.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787".to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Speech output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Speaking rate for read-aloud, relative to the engine default.
    ///
    /// Kept slightly below 1.0 so longer suggestion texts stay intelligible.
    pub read_aloud_rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            read_aloud_rate: 0.9,
        }
    }
}

/// Search-history persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Database file path. Empty = `data_dir()/sora-history.db`.
    pub db_path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            db_path: String::new(),
        }
    }
}

impl HistoryConfig {
    /// Resolved database path, falling back to the platform data dir.
    #[must_use]
    pub fn resolved_db_path(&self) -> std::path::PathBuf {
        if self.db_path.is_empty() {
            crate::sora_dirs::history_db_file()
        } else {
            std::path::PathBuf::from(&self.db_path)
        }
    }
}

/// Embedded suggestion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port. 0 = pick a free port.
    pub port: u16,
    /// Open-meteo geocoding endpoint.
    pub geocoding_url: String,
    /// Open-meteo forecast endpoint.
    pub forecast_url: String,
    /// Days of daily forecast to request.
    pub forecast_days: u8,
    /// Timeout for upstream (open-meteo, chat completions) calls, seconds.
    pub upstream_timeout_secs: u64,
    /// Geocoding cache time-to-live, seconds.
    pub geocode_cache_secs: u64,
    /// Forecast cache time-to-live, seconds.
    pub forecast_cache_secs: u64,
    /// Suggestion provider settings.
    pub suggest: SuggestProviderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8787,
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_owned(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_owned(),
            forecast_days: 3,
            upstream_timeout_secs: 10,
            geocode_cache_secs: 3600, // place names rarely move
            forecast_cache_secs: 600,
            suggest: SuggestProviderConfig::default(),
        }
    }
}

/// OpenAI-compatible chat completions provider for suggestion generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestProviderConfig {
    /// Base URL for the API server.
    pub api_url: String,
    /// Model name to request from the API.
    pub api_model: String,
    /// API key for the remote provider.
    ///
    /// Empty means "read `SORA_SUGGEST_API_KEY` from the environment".
    pub api_key: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate per response.
    pub max_tokens: usize,
}

impl Default for SuggestProviderConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_owned(),
            api_model: "gpt-4o-mini".to_owned(),
            api_key: String::new(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

impl SuggestProviderConfig {
    /// API key from config, falling back to `SORA_SUGGEST_API_KEY`.
    #[must_use]
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var("SORA_SUGGEST_API_KEY").unwrap_or_default()
    }
}

/// Auth service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL of the service exposing `/auth/*`.
    pub base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8787".to_owned(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file, falling back to
    /// defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load() -> crate::error::Result<Self> {
        let path = crate::sora_dirs::config_file();
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::SoraError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SoraError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
