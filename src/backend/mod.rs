//! Typed clients for the remote backend services.
//!
//! Two collaborators live here: [`SuggestApi`], the weather/suggestion
//! endpoint pair driven by the session controller, and [`AuthClient`], the
//! cookie-session auth service. Both take error messages from the response
//! body's `error` field when present and fall back to fixed strings.

mod auth;
mod client;

pub use auth::{AuthClient, AuthSession, RegisteredUser, User, UserProfile};
pub use client::{SuggestApi, SuggestionRequest};
