//! Embedded suggestion service: the weather/suggest endpoint pair.
//!
//! `sora serve` runs this service; [`crate::backend::SuggestApi`] clients
//! point at it. Handlers validate the request, call the open-meteo
//! provider or the chat-completions generator, and answer failures with
//! the documented status and an `{"error": ...}` body.

pub mod suggest;
pub mod weather;

pub use suggest::SuggestGenerator;
pub use weather::{Forecast, GeocodedPlace, WeatherProvider, build_summary};

use crate::config::ServerConfig;
use crate::error::{Result, SoraError};
use crate::session::{Language, Persona};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /weather`.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct WeatherRequest {
    place: String,
    timezone: String,
    lang: String,
}

impl Default for WeatherRequest {
    fn default() -> Self {
        Self {
            place: String::new(),
            timezone: "auto".to_owned(),
            lang: "en".to_owned(),
        }
    }
}

/// Body of `POST /suggest`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SuggestRequest {
    query: String,
    place: String,
    weather_summary: String,
    persona: String,
    output_lang: String,
}

impl Default for SuggestRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            place: String::new(),
            weather_summary: String::new(),
            persona: "outings".to_owned(),
            output_lang: "en".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    weather: Arc<WeatherProvider>,
    suggest: Arc<SuggestGenerator>,
}

// ---------------------------------------------------------------------------
// SuggestServer
// ---------------------------------------------------------------------------

/// HTTP service exposing `POST /weather` and `POST /suggest`.
pub struct SuggestServer {
    /// The address the service is listening on.
    addr: SocketAddr,
    /// Handle to the background serve task.
    handle: JoinHandle<()>,
}

impl SuggestServer {
    /// Start the suggestion service.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for
    /// auto-assign) and begins serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns an error if an upstream client cannot be built or the TCP
    /// listener cannot bind.
    pub async fn start(config: &ServerConfig) -> Result<Self> {
        let state = AppState {
            weather: Arc::new(WeatherProvider::new(config)?),
            suggest: Arc::new(SuggestGenerator::new(
                &config.suggest,
                config.upstream_timeout_secs,
            )?),
        };

        let app = Router::new()
            .route("/weather", post(handle_weather))
            .route("/suggest", post(handle_suggest))
            .with_state(state);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| SoraError::Server(format!("bind {bind_addr}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| SoraError::Server(format!("failed to get local addr: {e}")))?;

        info!("suggestion service listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("suggestion service error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the service is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the service is listening on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the background serve task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for SuggestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({"error": message})))
}

/// Handle `POST /weather`: geocode a place and summarize today's forecast.
async fn handle_weather(
    State(state): State<AppState>,
    Json(request): Json<WeatherRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let place = request.place.trim();
    if place.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Place is required");
    }
    if place.chars().count() > 100 {
        return error_response(StatusCode::BAD_REQUEST, "Place name too long");
    }

    let Some(geo) = state.weather.geocode(place).await else {
        return error_response(
            StatusCode::NOT_FOUND,
            &format!("Could not find location: {place}"),
        );
    };

    let Some(forecast) = state
        .weather
        .forecast(geo.latitude, geo.longitude, &request.timezone)
        .await
    else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Could not fetch weather data");
    };

    let lang = Language::parse(&request.lang).unwrap_or_default();
    let raw = forecast
        .daily
        .as_ref()
        .and_then(|daily| serde_json::to_value(daily).ok())
        .unwrap_or_else(|| serde_json::json!({}));

    let body = serde_json::json!({
        "placeLabel": geo.label(),
        "coords": {"latitude": geo.latitude, "longitude": geo.longitude},
        "summary": build_summary(&forecast, lang),
        "raw": raw,
    });
    (StatusCode::OK, Json(body))
}

/// Handle `POST /suggest`: generate persona-framed suggestions for a query.
async fn handle_suggest(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let query = request.query.trim();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Query is required");
    }
    if query.chars().count() > 500 {
        return error_response(StatusCode::BAD_REQUEST, "Query too long");
    }
    let Some(persona) = Persona::parse(&request.persona) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid persona. Must be outings, travel, or fashion",
        );
    };
    let Some(lang) = Language::parse(&request.output_lang) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid output language. Must be en or ja",
        );
    };

    let place = request.place.trim();
    let weather_summary = request.weather_summary.trim();
    match state
        .suggest
        .generate(query, place, weather_summary, persona, lang)
        .await
    {
        Ok(text) => (StatusCode::OK, Json(serde_json::json!({"text": text}))),
        Err(err) => {
            error!("suggestion generation failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}
