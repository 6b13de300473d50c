//! Events flowing into and out of the session controller.
//!
//! Platform speech engines are callback-based; the controller is not. The
//! host bridges the two by forwarding each engine callback as a
//! [`CaptureEvent`] message, and the controller publishes [`SessionEvent`]
//! values so a host can render transitions as they happen.

use crate::session::state::{RequestPhase, Suggestions, WeatherReport};

/// Terminal events of one speech capture, delivered by the input provider.
///
/// Capture is single-shot: exactly one of these ends each capture session
/// and returns the voice sub-state to idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The engine produced a final transcript.
    Transcript(String),
    /// The engine reported an error (engine-specific code).
    Error(String),
    /// The engine ended the capture without a result.
    End,
}

/// Events that describe what a session is doing "right now".
///
/// Published on a broadcast channel; hosts that do not subscribe lose
/// nothing but live progress display.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The request cycle moved to a new phase.
    PhaseChanged { phase: RequestPhase },
    /// Weather lookup succeeded.
    WeatherReady { report: WeatherReport },
    /// Suggestion generation succeeded.
    SuggestionsReady { suggestions: Suggestions },
    /// The cycle ended in an error (validation or endpoint failure).
    CycleFailed { message: String },
    /// Voice capture started.
    CaptureStarted,
    /// Voice capture ended (result, error, end, or explicit stop).
    CaptureStopped,
    /// A capture transcript replaced the session query.
    QueryTranscribed { text: String },
    /// A history entry was persisted for a completed cycle.
    HistoryRecorded { id: String },
}
