//! Session state machine for the weather-and-suggestions request cycle.
//!
//! A [`Controller`] owns one [`SessionState`] and drives it through the
//! request phases: validate input, fetch the weather report, generate
//! activity suggestions, then persist the completed search in the
//! background. Voice capture and read-aloud hang off the same controller
//! through the provider traits in [`crate::speech`].

mod controller;
mod events;
mod state;

pub use controller::{CaptureToggle, Controller};
pub use events::{CaptureEvent, SessionEvent};
pub use state::{
    Coordinates, Language, Persona, RequestPhase, SessionState, Suggestions, WeatherReport,
};
