//! Client for the weather and suggestion endpoints.

use crate::config::BackendConfig;
use crate::error::{Result, SoraError, SUGGEST_FALLBACK, WEATHER_FALLBACK};
use crate::session::{Language, Persona, Suggestions, WeatherReport};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Body of `POST /suggest`.
///
/// `place` and `weather_summary` come from the weather response (the
/// normalized label and summary), not from raw user input.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub query: String,
    pub place: String,
    pub weather_summary: String,
    pub persona: Persona,
    pub locale: String,
    pub output_lang: Language,
}

/// Client for the weather/suggestion endpoint pair.
#[derive(Debug, Clone)]
pub struct SuggestApi {
    http: reqwest::Client,
    base_url: String,
}

impl SuggestApi {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SoraError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Look up current weather for a place.
    ///
    /// # Errors
    ///
    /// Returns `SoraError::Weather` carrying the server's `error` message
    /// when the body has one, else the fixed fallback.
    pub async fn weather(&self, place: &str, lang: Language) -> Result<WeatherReport> {
        let url = format!("{}/weather", self.base_url);
        let body = serde_json::json!({
            "place": place,
            "timezone": "auto",
            "lang": lang.as_str(),
        });

        let response = self.http.post(&url).json(&body).send().await.map_err(|e| {
            debug!("weather request failed: {e}");
            SoraError::Weather(WEATHER_FALLBACK.to_owned())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(SoraError::Weather(error_or(&body_text, WEATHER_FALLBACK)));
        }

        response.json::<WeatherReport>().await.map_err(|e| {
            debug!("weather response decode failed: {e}");
            SoraError::Weather(WEATHER_FALLBACK.to_owned())
        })
    }

    /// Generate suggestions from a query plus weather context.
    ///
    /// # Errors
    ///
    /// Returns `SoraError::Suggest` analogously to [`Self::weather`].
    pub async fn suggest(&self, request: &SuggestionRequest) -> Result<Suggestions> {
        let url = format!("{}/suggest", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                debug!("suggest request failed: {e}");
                SoraError::Suggest(SUGGEST_FALLBACK.to_owned())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(SoraError::Suggest(error_or(&body_text, SUGGEST_FALLBACK)));
        }

        response.json::<Suggestions>().await.map_err(|e| {
            debug!("suggest response decode failed: {e}");
            SoraError::Suggest(SUGGEST_FALLBACK.to_owned())
        })
    }
}

/// Extract the `error` field from a JSON error body, else the fallback.
fn error_or(body: &str, fallback: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| fallback.to_owned())
}
