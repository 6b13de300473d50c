//! Open-Meteo upstream client: geocoding, daily forecast, summary text.
//!
//! Both upstream calls are cached with [`moka`] so repeated lookups for
//! the same place stay off the network: geocoding results rarely change
//! (long TTL keyed on the lowercased place), forecasts do (short TTL
//! keyed on coordinates).

use crate::config::ServerConfig;
use crate::error::{Result, SoraError};
use crate::session::Language;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Daily variables requested from the forecast endpoint.
const DAILY_FIELDS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_sum,uv_index_max,sunrise,sunset";

/// Maximum cached geocoding results.
const GEOCODE_CACHE_CAPACITY: u64 = 1_000;

/// Maximum cached forecasts.
const FORECAST_CACHE_CAPACITY: u64 = 1_000;

/// A resolved place from the geocoder's best match.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    /// First-level administrative area; empty when the geocoder has none.
    pub admin1: String,
    /// Country name; empty when the geocoder has none.
    pub country: String,
}

impl GeocodedPlace {
    /// Display label: `"{name}, {admin1}, {country}"`.
    ///
    /// Missing parts render as empty segments rather than being dropped,
    /// so the label shape is stable for clients that split on commas.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}, {}, {}", self.name, self.admin1, self.country)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeHit>,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    latitude: f64,
    longitude: f64,
    name: String,
    #[serde(default)]
    admin1: String,
    #[serde(default)]
    country: String,
}

/// Forecast payload. Only the daily block is consumed; unknown daily
/// fields are kept so the raw block can be passed through to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub daily: Option<DailyForecast>,
}

/// The daily block of an open-meteo forecast, one entry per day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyForecast {
    #[serde(default)]
    pub temperature_2m_max: Vec<f64>,
    #[serde(default)]
    pub temperature_2m_min: Vec<f64>,
    #[serde(default)]
    pub precipitation_sum: Vec<f64>,
    #[serde(default)]
    pub uv_index_max: Vec<f64>,
    #[serde(default)]
    pub sunrise: Vec<String>,
    #[serde(default)]
    pub sunset: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One-line weather summary for day 0 of the forecast.
///
/// Falls back to a fixed "unavailable" line (in the requested language)
/// when the daily block or any of its day-0 values is missing.
#[must_use]
pub fn build_summary(forecast: &Forecast, lang: Language) -> String {
    let unavailable = match lang {
        Language::En => "Weather data unavailable",
        Language::Ja => "天気データが利用できません",
    };
    let Some(daily) = &forecast.daily else {
        return unavailable.to_owned();
    };
    let (Some(max), Some(min), Some(precip), Some(uv)) = (
        daily.temperature_2m_max.first(),
        daily.temperature_2m_min.first(),
        daily.precipitation_sum.first(),
        daily.uv_index_max.first(),
    ) else {
        return unavailable.to_owned();
    };
    let sunrise = time_of(daily.sunrise.first());
    let sunset = time_of(daily.sunset.first());

    match lang {
        Language::Ja => format!(
            "今日: {max}°/{min}°C、降水量: {precip}mm、UV: {uv}、日の出: {sunrise}、日の入り: {sunset}"
        ),
        Language::En => format!(
            "Today: {max}°/{min}°C, Precip: {precip}mm, UV: {uv}, Sunrise: {sunrise}, Sunset: {sunset}"
        ),
    }
}

/// Time component of an ISO timestamp (`"2024-05-01T05:12"` → `"05:12"`).
fn time_of(timestamp: Option<&String>) -> &str {
    timestamp
        .and_then(|t| t.split('T').nth(1))
        .unwrap_or("N/A")
}

/// Geocoding and forecast lookups against open-meteo, with caching.
pub struct WeatherProvider {
    http: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
    forecast_days: u8,
    geocode_cache: Cache<String, GeocodedPlace>,
    forecast_cache: Cache<String, Forecast>,
}

impl WeatherProvider {
    /// Build a provider from the server configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .map_err(|e| SoraError::Server(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
            forecast_days: config.forecast_days,
            geocode_cache: Cache::builder()
                .max_capacity(GEOCODE_CACHE_CAPACITY)
                .time_to_live(Duration::from_secs(config.geocode_cache_secs))
                .build(),
            forecast_cache: Cache::builder()
                .max_capacity(FORECAST_CACHE_CAPACITY)
                .time_to_live(Duration::from_secs(config.forecast_cache_secs))
                .build(),
        })
    }

    /// Resolve a place name to its best geocoding match.
    ///
    /// Returns `None` when the geocoder has no match or the lookup fails;
    /// lookup failures are logged and treated as "not found".
    pub async fn geocode(&self, place: &str) -> Option<GeocodedPlace> {
        let key = place.to_lowercase();
        if let Some(hit) = self.geocode_cache.get(&key).await {
            debug!(place, "geocode cache hit");
            return Some(hit);
        }
        match self.fetch_geocode(place).await {
            Ok(Some(hit)) => {
                self.geocode_cache.insert(key, hit.clone()).await;
                Some(hit)
            }
            Ok(None) => None,
            Err(err) => {
                error!("geocoding error: {err}");
                None
            }
        }
    }

    /// Fetch the daily forecast for a coordinate pair.
    ///
    /// Returns `None` on any upstream failure; failures are logged. The
    /// cache is keyed on coordinates only, so the first requester's
    /// timezone wins for the TTL window.
    pub async fn forecast(&self, latitude: f64, longitude: f64, timezone: &str) -> Option<Forecast> {
        let key = format!("{latitude},{longitude}");
        if let Some(forecast) = self.forecast_cache.get(&key).await {
            debug!(latitude, longitude, "forecast cache hit");
            return Some(forecast);
        }
        match self.fetch_forecast(latitude, longitude, timezone).await {
            Ok(forecast) => {
                self.forecast_cache.insert(key, forecast.clone()).await;
                Some(forecast)
            }
            Err(err) => {
                error!("forecast error: {err}");
                None
            }
        }
    }

    async fn fetch_geocode(&self, place: &str) -> Result<Option<GeocodedPlace>> {
        let response = self
            .http
            .get(&self.geocoding_url)
            .query(&[
                ("name", place),
                ("count", "1"),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| SoraError::Server(format!("geocoding request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SoraError::Server(format!("geocoding returned {status}")));
        }

        let decoded: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| SoraError::Server(format!("geocoding decode: {e}")))?;

        Ok(decoded.results.into_iter().next().map(|hit| GeocodedPlace {
            latitude: hit.latitude,
            longitude: hit.longitude,
            name: hit.name,
            admin1: hit.admin1,
            country: hit.country,
        }))
    }

    async fn fetch_forecast(&self, latitude: f64, longitude: f64, timezone: &str) -> Result<Forecast> {
        let response = self
            .http
            .get(&self.forecast_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("timezone", timezone.to_owned()),
                ("daily", DAILY_FIELDS.to_owned()),
                ("forecast_days", self.forecast_days.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SoraError::Server(format!("forecast request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SoraError::Server(format!("forecast returned {status}")));
        }

        response
            .json::<Forecast>()
            .await
            .map_err(|e| SoraError::Server(format!("forecast decode: {e}")))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::config::Config;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_forecast() -> Forecast {
        Forecast {
            daily: Some(DailyForecast {
                temperature_2m_max: vec![22.5],
                temperature_2m_min: vec![14.1],
                precipitation_sum: vec![0.4],
                uv_index_max: vec![6.2],
                sunrise: vec!["2026-05-01T04:49".to_owned()],
                sunset: vec!["2026-05-01T18:27".to_owned()],
                extra: serde_json::Map::new(),
            }),
        }
    }

    #[test]
    fn english_summary_lists_day_zero_values() {
        assert_eq!(
            build_summary(&sample_forecast(), Language::En),
            "Today: 22.5°/14.1°C, Precip: 0.4mm, UV: 6.2, Sunrise: 04:49, Sunset: 18:27"
        );
    }

    #[test]
    fn japanese_summary_uses_japanese_labels_and_separators() {
        assert_eq!(
            build_summary(&sample_forecast(), Language::Ja),
            "今日: 22.5°/14.1°C、降水量: 0.4mm、UV: 6.2、日の出: 04:49、日の入り: 18:27"
        );
    }

    #[test]
    fn missing_daily_block_yields_unavailable_line() {
        let forecast = Forecast { daily: None };
        assert_eq!(build_summary(&forecast, Language::En), "Weather data unavailable");
        assert_eq!(build_summary(&forecast, Language::Ja), "天気データが利用できません");
    }

    #[test]
    fn empty_day_arrays_yield_unavailable_line() {
        let forecast = Forecast {
            daily: Some(DailyForecast::default()),
        };
        assert_eq!(build_summary(&forecast, Language::En), "Weather data unavailable");
    }

    #[test]
    fn missing_sun_times_render_as_not_available() {
        let mut forecast = sample_forecast();
        let daily = forecast.daily.as_mut().unwrap();
        daily.sunrise.clear();
        daily.sunset = vec!["18:27".to_owned()];

        let summary = build_summary(&forecast, Language::En);
        assert!(summary.contains("Sunrise: N/A"));
        assert!(summary.contains("Sunset: N/A"));
    }

    #[test]
    fn label_keeps_empty_segments_in_place() {
        let place = GeocodedPlace {
            latitude: 35.68,
            longitude: 139.69,
            name: "Tokyo".to_owned(),
            admin1: String::new(),
            country: "Japan".to_owned(),
        };
        assert_eq!(place.label(), "Tokyo, , Japan");
    }

    #[test]
    fn geocode_hit_tolerates_missing_optional_fields() {
        let json = r#"{"results":[{"latitude":35.68,"longitude":139.69,"name":"Tokyo"}]}"#;
        let decoded: GeocodeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.results[0].admin1, "");
        assert_eq!(decoded.results[0].country, "");
    }

    #[test]
    fn forecast_round_trips_unknown_daily_fields() {
        let json = r#"{"daily":{"time":["2026-05-01"],"temperature_2m_max":[22.5]}}"#;
        let forecast: Forecast = serde_json::from_str(json).unwrap();
        let daily = forecast.daily.as_ref().unwrap();
        assert_eq!(daily.temperature_2m_max, vec![22.5]);
        assert!(daily.extra.contains_key("time"));

        let back = serde_json::to_value(daily).unwrap();
        assert_eq!(back["time"][0], "2026-05-01");
    }

    fn provider_for(server: &MockServer) -> WeatherProvider {
        let mut config = Config::default().server;
        config.geocoding_url = format!("{}/v1/search", server.uri());
        config.forecast_url = format!("{}/v1/forecast", server.uri());
        WeatherProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn geocode_takes_the_first_result_and_caches_it() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "Tokyo"))
            .and(query_param("count", "1"))
            .and(query_param("language", "en"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"latitude": 35.68, "longitude": 139.69, "name": "Tokyo",
                     "admin1": "Tokyo", "country": "Japan"},
                    {"latitude": 0.0, "longitude": 0.0, "name": "Other"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let first = provider.geocode("Tokyo").await.unwrap();
        assert_eq!(first.name, "Tokyo");
        assert_eq!(first.label(), "Tokyo, Tokyo, Japan");

        // Lowercased key: a differently-cased repeat stays off the network.
        let second = provider.geocode("tokyo").await.unwrap();
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn geocode_with_no_results_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert!(provider.geocode("Nowhereville").await.is_none());
    }

    #[tokio::test]
    async fn geocode_upstream_failure_is_none_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert!(provider.geocode("Tokyo").await.is_none());
        // Failures are not cached; the retry goes upstream again.
        assert!(provider.geocode("Tokyo").await.is_none());
    }

    #[tokio::test]
    async fn forecast_requests_the_daily_fields_and_caches_by_coords() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "35.68"))
            .and(query_param("longitude", "139.69"))
            .and(query_param("timezone", "auto"))
            .and(query_param("daily", DAILY_FIELDS))
            .and(query_param("forecast_days", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {
                    "temperature_2m_max": [22.5],
                    "temperature_2m_min": [14.1],
                    "precipitation_sum": [0.4],
                    "uv_index_max": [6.2],
                    "sunrise": ["2026-05-01T04:49"],
                    "sunset": ["2026-05-01T18:27"]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let first = provider.forecast(35.68, 139.69, "auto").await.unwrap();
        assert_eq!(
            build_summary(&first, Language::En),
            "Today: 22.5°/14.1°C, Precip: 0.4mm, UV: 6.2, Sunrise: 04:49, Sunset: 18:27"
        );

        let second = provider.forecast(35.68, 139.69, "auto").await;
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn forecast_upstream_failure_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert!(provider.forecast(1.0, 2.0, "auto").await.is_none());
    }
}
