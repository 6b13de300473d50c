//! Platform speech capability seams.
//!
//! sora does not implement speech recognition or synthesis; the platform
//! does. These traits are the boundary: hosts with a native engine adapt it
//! here, hosts without one attach nothing and the controller degrades to
//! typed input and silent output.
//!
//! Capture is single-shot and locale-tagged: one `start` eventually yields
//! exactly one terminal [`CaptureEvent`](crate::session::CaptureEvent),
//! which the host forwards to the controller. There is no continuous or
//! interim-result mode.

use crate::error::Result;

/// Fixed speaking rate for read-aloud, relative to the engine default.
///
/// Slightly slower than normal so longer suggestion texts stay
/// intelligible.
pub const READ_ALOUD_RATE: f32 = 0.9;

/// One utterance handed to the output provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak.
    pub text: String,
    /// BCP 47 locale tag (`"en-US"` / `"ja-JP"`).
    pub locale: String,
    /// Speaking rate relative to the engine default.
    pub rate: f32,
}

/// Speech-to-text capability.
///
/// Implementations wrap a platform recognizer configured non-continuous
/// and single-result. Terminal events are delivered out-of-band as
/// [`CaptureEvent`](crate::session::CaptureEvent) messages, not through
/// return values here.
pub trait SpeechInput: Send {
    /// Begin one capture session tagged with `locale`.
    ///
    /// The controller guarantees no capture is already outstanding when it
    /// calls this.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine refuses to start.
    fn start(&mut self, locale: &str) -> Result<()>;

    /// Cancel the outstanding capture, if any.
    ///
    /// Engines may still deliver a terminal event afterwards; the
    /// controller applies a late transcript like any other.
    fn stop(&mut self);

    /// Update the recognition locale used by subsequent captures.
    fn set_locale(&mut self, locale: &str);
}

/// Text-to-speech capability.
///
/// `speak` is fire-and-forget: no completion callback is consumed by the
/// controller, and overlapping utterances are the engine's concern.
pub trait SpeechOutput: Send {
    /// Queue one utterance for synthesis.
    fn speak(&mut self, utterance: Utterance);
}
