//! Sora: voice-enabled weather and activity suggestions.
//!
//! This crate drives a two-step request cycle for a place and a query:
//! Place + query → geocoding + forecast → persona-framed suggestions
//!
//! # Architecture
//!
//! A session controller owns the cycle and talks to the suggestion
//! service over HTTP; the service itself also lives in this crate:
//! - **Session**: request state machine, voice capture glue, read-aloud
//! - **Backend**: typed client for the `/weather` and `/suggest` endpoints
//! - **Server**: embedded `axum` service backed by open-meteo and an
//!   OpenAI-compatible chat-completions provider
//! - **History**: per-user SQLite persistence of completed searches
//! - **Speech**: engine-agnostic capture and read-aloud interfaces

pub mod backend;
pub mod config;
pub mod error;
pub mod history;
pub mod server;
pub mod session;
pub mod sora_dirs;
pub mod speech;

#[cfg(test)]
mod test_support;

pub use backend::SuggestApi;
pub use config::Config;
pub use error::{Result, SoraError};
pub use history::{HistoryStore, SearchRecord, SqliteHistoryStore};
pub use server::SuggestServer;
pub use session::{Controller, Language, Persona, SessionEvent, SessionState};
pub use speech::{SpeechInput, SpeechOutput};
