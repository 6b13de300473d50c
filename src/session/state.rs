//! Session state owned by the controller.
//!
//! One [`SessionState`] instance exists per active session. It is mutated
//! only by controller methods; hosts read it between events and re-render.

use serde::{Deserialize, Serialize};

/// Output language for summaries and suggestions.
///
/// Drives both the text the backend produces and the speech locale.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    #[default]
    En,
    /// Japanese.
    Ja,
}

impl Language {
    /// BCP 47 locale tag for speech capture and synthesis.
    ///
    /// Derived from the language, never stored independently.
    #[must_use]
    pub fn locale(self) -> &'static str {
        match self {
            Language::En => "en-US",
            Language::Ja => "ja-JP",
        }
    }

    /// Wire form (`"en"` / `"ja"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
        }
    }

    /// Parse the wire form. Unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "en" => Some(Language::En),
            "ja" => Some(Language::Ja),
            _ => None,
        }
    }
}

/// Suggestion framing persona.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Local activities and outings lasting 2-4 hours.
    #[default]
    Outings,
    /// Day trips and overnight travel.
    Travel,
    /// Weather-appropriate fashion and outfits.
    Fashion,
}

impl Persona {
    /// Wire form (`"outings"` / `"travel"` / `"fashion"`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Persona::Outings => "outings",
            Persona::Travel => "travel",
            Persona::Fashion => "fashion",
        }
    }

    /// Parse the wire form. Unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "outings" => Some(Persona::Outings),
            "travel" => Some(Persona::Travel),
            "fashion" => Some(Persona::Fashion),
            _ => None,
        }
    }
}

/// Where the current request cycle stands.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    /// No cycle started, or the previous cycle's results are on display.
    #[default]
    Idle,
    /// Weather request in flight.
    FetchingWeather,
    /// Weather succeeded; suggestion request in flight.
    FetchingSuggestions,
    /// Both requests succeeded.
    Done,
    /// The cycle ended in a validation or endpoint error.
    Failed,
}

impl RequestPhase {
    /// True while either network request of the cycle is outstanding.
    #[must_use]
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            RequestPhase::FetchingWeather | RequestPhase::FetchingSuggestions
        )
    }
}

/// Geographic coordinates returned by the weather endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Successful weather lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Normalized place label (e.g. `"Tokyo, Japan"`), distinct from the
    /// raw user-entered place.
    #[serde(rename = "placeLabel")]
    pub place_label: String,
    /// One-line weather summary in the session language.
    pub summary: String,
    /// Resolved coordinates of the place.
    pub coords: Coordinates,
}

/// Successful suggestion generation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    /// Suggestion text, typically a short numbered list.
    pub text: String,
}

/// State of one user session, owned exclusively by its controller.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Output language; the speech locale follows from it.
    pub language: Language,
    /// Suggestion framing persona.
    pub persona: Persona,
    /// Free-text place, user-edited or voice-populated.
    pub place: String,
    /// Free-text activity query, user-edited or voice-populated.
    pub query: String,
    /// True strictly between a capture start and its terminal event.
    pub listening: bool,
    /// Request cycle phase.
    pub phase: RequestPhase,
    /// Weather result of the current cycle.
    pub weather: Option<WeatherReport>,
    /// Suggestion result of the current cycle.
    pub suggestions: Option<Suggestions>,
    /// Terminal error of the current cycle. Never set while `phase` is `Done`.
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            language: Language::En,
            persona: Persona::Outings,
            place: String::new(),
            query: String::new(),
            listening: false,
            phase: RequestPhase::Idle,
            weather: None,
            suggestions: None,
            error: None,
        }
    }
}

impl SessionState {
    /// Current speech locale, derived from the language.
    #[must_use]
    pub fn locale(&self) -> &'static str {
        self.language.locale()
    }

    /// True while either network request of the cycle is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// Reset the per-cycle fields ahead of a new fetch cycle.
    ///
    /// Clears previous results and error so a new cycle never displays
    /// stale data from an earlier place.
    pub(crate) fn begin_cycle(&mut self) {
        self.weather = None;
        self.suggestions = None;
        self.error = None;
        self.phase = RequestPhase::FetchingWeather;
    }

    /// Mark the cycle failed with a user-visible message.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.phase = RequestPhase::Failed;
    }
}
