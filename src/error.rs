//! Error types for the sora session pipeline.

/// Fixed message shown when a submit arrives with a blank place or query.
pub const VALIDATION_MESSAGE: &str = "Please enter both place and query";

/// Fallback message when the weather endpoint fails without a usable body.
pub const WEATHER_FALLBACK: &str = "Failed to fetch weather";

/// Fallback message when the suggestion endpoint fails without a usable body.
pub const SUGGEST_FALLBACK: &str = "Failed to generate suggestions";

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum SoraError {
    /// Local input validation failure; never reaches the network.
    #[error("{0}")]
    Validation(String),

    /// Weather endpoint failure (transport, HTTP status, or bad payload).
    #[error("{0}")]
    Weather(String),

    /// Suggestion endpoint failure (transport, HTTP status, or bad payload).
    #[error("{0}")]
    Suggest(String),

    /// A submit arrived while a request cycle was already in flight.
    #[error("a request cycle is already in flight")]
    CycleInFlight,

    /// Auth service failure.
    #[error("auth error: {0}")]
    Auth(String),

    /// Search-history persistence error.
    #[error("history error: {0}")]
    History(String),

    /// Speech provider error (start/stop of a capture).
    #[error("speech error: {0}")]
    Speech(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Embedded suggestion service error.
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SoraError>;

impl From<crate::history::HistoryError> for SoraError {
    fn from(err: crate::history::HistoryError) -> Self {
        SoraError::History(err.to_string())
    }
}
