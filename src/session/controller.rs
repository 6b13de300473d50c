//! Drives a session through the request cycle and voice sub-state.
//!
//! The controller owns the [`SessionState`] and is the only writer. Hosts
//! call its methods from their event loop, forward speech engine callbacks
//! as [`CaptureEvent`]s, and either poll [`Controller::state`] or subscribe
//! to [`SessionEvent`]s for live transitions.
//!
//! `submit` runs the two-phase fetch (weather, then suggestions) to
//! completion in place. History persistence is spawned off the cycle so a
//! slow or broken store never delays the suggestions reaching the user.

use crate::backend::{SuggestApi, SuggestionRequest};
use crate::config::SessionConfig;
use crate::error::{Result, SoraError, VALIDATION_MESSAGE};
use crate::history::{HistoryStore, NewSearchRecord, SearchRecord};
use crate::session::events::{CaptureEvent, SessionEvent};
use crate::session::state::{Language, Persona, RequestPhase, SessionState};
use crate::speech::{READ_ALOUD_RATE, SpeechInput, SpeechOutput, Utterance};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Outcome of [`Controller::toggle_capture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureToggle {
    /// A capture session began; a terminal [`CaptureEvent`] will follow.
    Started,
    /// The outstanding capture was cancelled.
    Stopped,
    /// No input provider is attached; the toggle did nothing.
    Unavailable,
}

/// Session controller: one per active session.
pub struct Controller {
    state: SessionState,
    api: SuggestApi,
    input: Option<Box<dyn SpeechInput>>,
    output: Option<Box<dyn SpeechOutput>>,
    history: Option<Arc<dyn HistoryStore>>,
    user_id: String,
    recent_limit: usize,
    recent: Vec<SearchRecord>,
    read_aloud_rate: f32,
    events: Option<broadcast::Sender<SessionEvent>>,
    persist_task: Option<JoinHandle<()>>,
}

impl Controller {
    /// Create a controller over the given endpoint client.
    ///
    /// Starts with default state, no speech providers, and no history
    /// store. Attach capabilities with the `with_*` builders.
    pub fn new(api: SuggestApi) -> Self {
        Self {
            state: SessionState::default(),
            api,
            input: None,
            output: None,
            history: None,
            user_id: "local".to_owned(),
            recent_limit: 5,
            recent: Vec::new(),
            read_aloud_rate: READ_ALOUD_RATE,
            events: None,
            persist_task: None,
        }
    }

    /// Seed language, persona, place, and the recent-list size from config.
    #[must_use]
    pub fn with_session_defaults(mut self, defaults: &SessionConfig) -> Self {
        self.state.language = defaults.language;
        self.state.persona = defaults.persona;
        self.state.place = defaults.place.clone();
        self.recent_limit = defaults.recent_limit;
        self
    }

    /// Attach a speech-to-text provider.
    #[must_use]
    pub fn with_speech_input(mut self, input: Box<dyn SpeechInput>) -> Self {
        self.input = Some(input);
        self
    }

    /// Attach a text-to-speech provider.
    #[must_use]
    pub fn with_speech_output(mut self, output: Box<dyn SpeechOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Attach a history store; completed cycles are persisted under `user_id`.
    #[must_use]
    pub fn with_history(mut self, store: Arc<dyn HistoryStore>, user_id: impl Into<String>) -> Self {
        self.history = Some(store);
        self.user_id = user_id.into();
        self
    }

    /// Attach a session event broadcaster for live progress display.
    #[must_use]
    pub fn with_events(mut self, tx: broadcast::Sender<SessionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Override the read-aloud speaking rate.
    #[must_use]
    pub fn with_read_aloud_rate(mut self, rate: f32) -> Self {
        self.read_aloud_rate = rate;
        self
    }

    /// Current session state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Snapshot of the user's most recent searches, newest first.
    ///
    /// Populated by [`Self::refresh_history`] and [`Self::flush_history`];
    /// empty when no history store is attached.
    #[must_use]
    pub fn recent(&self) -> &[SearchRecord] {
        &self.recent
    }

    /// Replace the place input.
    pub fn set_place(&mut self, place: impl Into<String>) {
        self.state.place = place.into();
    }

    /// Replace the query input.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.state.query = query.into();
    }

    /// Switch the suggestion persona. Takes effect from the next cycle.
    pub fn set_persona(&mut self, persona: Persona) {
        self.state.persona = persona;
    }

    /// Switch the output language and retag the capture locale to match.
    pub fn set_language(&mut self, language: Language) {
        self.state.language = language;
        if let Some(input) = self.input.as_mut() {
            input.set_locale(language.locale());
        }
    }

    /// Run one request cycle: validate, fetch weather, generate suggestions.
    ///
    /// All cycle outcomes land in the state: `Done` with both results set,
    /// or `Failed` with a user-visible `error`. A validation failure keeps
    /// the previous cycle's results on display and performs no network
    /// call. On success the completed search is persisted in the
    /// background when a history store is attached.
    ///
    /// # Errors
    ///
    /// Returns [`SoraError::CycleInFlight`] when called while a cycle is
    /// already loading; the state is untouched in that case.
    pub async fn submit(&mut self) -> Result<()> {
        if self.state.is_loading() {
            return Err(SoraError::CycleInFlight);
        }

        if self.state.place.trim().is_empty() || self.state.query.trim().is_empty() {
            debug!("submit rejected: blank place or query");
            self.fail_cycle(VALIDATION_MESSAGE.to_owned());
            return Ok(());
        }
        let place = self.state.place.clone();
        let query = self.state.query.clone();
        let language = self.state.language;

        self.state.begin_cycle();
        self.emit(SessionEvent::PhaseChanged {
            phase: RequestPhase::FetchingWeather,
        });

        info!(place = %place, lang = language.as_str(), "fetching weather");
        let report = match self.api.weather(&place, language).await {
            Ok(report) => report,
            Err(err) => {
                self.fail_cycle(err.to_string());
                return Ok(());
            }
        };
        self.state.weather = Some(report.clone());
        self.emit(SessionEvent::WeatherReady {
            report: report.clone(),
        });
        self.enter_phase(RequestPhase::FetchingSuggestions);

        let request = SuggestionRequest {
            query: query.clone(),
            place: report.place_label.clone(),
            weather_summary: report.summary.clone(),
            persona: self.state.persona,
            locale: language.locale().to_owned(),
            output_lang: language,
        };
        info!(place = %report.place_label, persona = self.state.persona.as_str(), "generating suggestions");
        let suggestions = match self.api.suggest(&request).await {
            Ok(suggestions) => suggestions,
            Err(err) => {
                self.fail_cycle(err.to_string());
                return Ok(());
            }
        };
        self.state.suggestions = Some(suggestions.clone());
        self.emit(SessionEvent::SuggestionsReady {
            suggestions: suggestions.clone(),
        });
        self.enter_phase(RequestPhase::Done);

        self.spawn_history_persist(place, query, report.summary, suggestions.text);
        Ok(())
    }

    /// Start a capture when idle, cancel it when listening.
    ///
    /// # Errors
    ///
    /// Returns [`SoraError::Speech`] when the engine refuses to start; the
    /// session stays idle.
    pub fn toggle_capture(&mut self) -> Result<CaptureToggle> {
        let Some(input) = self.input.as_mut() else {
            debug!("capture toggled with no input provider attached");
            return Ok(CaptureToggle::Unavailable);
        };

        if self.state.listening {
            input.stop();
            self.state.listening = false;
            self.emit(SessionEvent::CaptureStopped);
            return Ok(CaptureToggle::Stopped);
        }

        input.start(self.state.language.locale())?;
        self.state.listening = true;
        self.emit(SessionEvent::CaptureStarted);
        Ok(CaptureToggle::Started)
    }

    /// Apply a terminal capture event from the input provider.
    ///
    /// A transcript overwrites the query in full; errors and bare ends
    /// leave it untouched. All three return the voice sub-state to idle.
    pub fn on_capture_event(&mut self, event: CaptureEvent) {
        let was_listening = self.state.listening;
        self.state.listening = false;
        match event {
            CaptureEvent::Transcript(text) => {
                info!("capture transcript: {text:?}");
                self.state.query = text.clone();
                self.emit(SessionEvent::QueryTranscribed { text });
            }
            CaptureEvent::Error(code) => warn!("speech capture error: {code}"),
            CaptureEvent::End => debug!("capture ended without a result"),
        }
        if was_listening {
            self.emit(SessionEvent::CaptureStopped);
        }
    }

    /// Speak the current suggestions in the session locale.
    ///
    /// Returns `false` when there is nothing to read or no output provider
    /// is attached.
    pub fn read_aloud(&mut self) -> bool {
        let Some(text) = self.state.suggestions.as_ref().map(|s| s.text.clone()) else {
            return false;
        };
        let Some(output) = self.output.as_mut() else {
            debug!("read aloud with no output provider attached");
            return false;
        };
        output.speak(Utterance {
            text,
            locale: self.state.locale().to_owned(),
            rate: self.read_aloud_rate,
        });
        true
    }

    /// Load a past search back into the inputs for re-running.
    ///
    /// Restores place, query, persona, and language (retagging the capture
    /// locale). Results are not restored; the user re-submits for fresh
    /// weather.
    pub fn restore_from_history(&mut self, record: &SearchRecord) {
        self.state.place = record.place.clone();
        self.state.query = record.query.clone();
        self.state.persona = record.persona;
        self.set_language(record.language);
    }

    /// Reload the recent-searches snapshot from the history store.
    ///
    /// Load failures are logged and leave the previous snapshot in place.
    pub async fn refresh_history(&mut self) {
        let Some(store) = self.history.clone() else {
            return;
        };
        match store.list_recent(&self.user_id, Some(self.recent_limit)).await {
            Ok(records) => self.recent = records,
            Err(err) => error!("failed to load search history: {err}"),
        }
    }

    /// Wait for any in-flight history write, then refresh the snapshot.
    ///
    /// Hosts that exit right after a cycle call this so the write is not
    /// lost to process teardown.
    pub async fn flush_history(&mut self) {
        if let Some(task) = self.persist_task.take() {
            if let Err(err) = task.await {
                error!("history persist task panicked: {err}");
            }
        }
        self.refresh_history().await;
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn enter_phase(&mut self, phase: RequestPhase) {
        self.state.phase = phase;
        self.emit(SessionEvent::PhaseChanged { phase });
    }

    fn fail_cycle(&mut self, message: String) {
        warn!("request cycle failed: {message}");
        self.state.fail(message.clone());
        self.emit(SessionEvent::PhaseChanged {
            phase: RequestPhase::Failed,
        });
        self.emit(SessionEvent::CycleFailed { message });
    }

    /// Persist a completed search without blocking the cycle.
    ///
    /// Store failures are logged and never surface to the session; the
    /// suggestions are already on screen by the time this runs.
    fn spawn_history_persist(
        &mut self,
        place: String,
        query: String,
        weather_summary: String,
        suggestions: String,
    ) {
        let Some(store) = self.history.clone() else {
            return;
        };
        let entry = NewSearchRecord {
            user_id: self.user_id.clone(),
            place,
            query,
            persona: self.state.persona,
            language: self.state.language,
            weather_summary,
            suggestions,
        };
        let events = self.events.clone();
        self.persist_task = Some(tokio::spawn(async move {
            match store.record(entry).await {
                Ok(stored) => {
                    debug!(id = %stored.id, "search history recorded");
                    if let Some(tx) = events {
                        let _ = tx.send(SessionEvent::HistoryRecorded { id: stored.id });
                    }
                }
                Err(err) => error!("failed to persist search history: {err}"),
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::history::SqliteHistoryStore;
    use crate::session::state::{Coordinates, Suggestions, WeatherReport};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct InputLog(Arc<Mutex<InputCalls>>);

    #[derive(Default)]
    struct InputCalls {
        starts: Vec<String>,
        stops: usize,
        locales: Vec<String>,
    }

    struct FakeInput {
        log: InputLog,
        fail_start: bool,
    }

    impl SpeechInput for FakeInput {
        fn start(&mut self, locale: &str) -> Result<()> {
            if self.fail_start {
                return Err(SoraError::Speech("engine refused to start".to_owned()));
            }
            self.log.0.lock().unwrap().starts.push(locale.to_owned());
            Ok(())
        }

        fn stop(&mut self) {
            self.log.0.lock().unwrap().stops += 1;
        }

        fn set_locale(&mut self, locale: &str) {
            self.log.0.lock().unwrap().locales.push(locale.to_owned());
        }
    }

    #[derive(Clone, Default)]
    struct OutputLog(Arc<Mutex<Vec<Utterance>>>);

    struct FakeOutput {
        log: OutputLog,
    }

    impl SpeechOutput for FakeOutput {
        fn speak(&mut self, utterance: Utterance) {
            self.log.0.lock().unwrap().push(utterance);
        }
    }

    /// Client pointed at a closed port; tests that reach the network would
    /// fail with the fetch fallback rather than the asserted message.
    fn offline_api() -> SuggestApi {
        let config = BackendConfig {
            base_url: "http://127.0.0.1:9".to_owned(),
            timeout_secs: 1,
        };
        SuggestApi::new(&config).unwrap()
    }

    fn sample_report() -> WeatherReport {
        WeatherReport {
            place_label: "Tokyo, Japan".to_owned(),
            summary: "Today: 22°/14°C".to_owned(),
            coords: Coordinates {
                latitude: 35.68,
                longitude: 139.69,
            },
        }
    }

    #[test]
    fn toggle_without_provider_is_unavailable() {
        let mut controller = Controller::new(offline_api());
        assert_eq!(controller.toggle_capture().unwrap(), CaptureToggle::Unavailable);
        assert!(!controller.state().listening);
    }

    #[test]
    fn toggle_starts_then_stops_capture() {
        let log = InputLog::default();
        let mut controller = Controller::new(offline_api()).with_speech_input(Box::new(FakeInput {
            log: log.clone(),
            fail_start: false,
        }));

        assert_eq!(controller.toggle_capture().unwrap(), CaptureToggle::Started);
        assert!(controller.state().listening);
        assert_eq!(log.0.lock().unwrap().starts, vec!["en-US".to_owned()]);

        assert_eq!(controller.toggle_capture().unwrap(), CaptureToggle::Stopped);
        assert!(!controller.state().listening);
        assert_eq!(log.0.lock().unwrap().stops, 1);
    }

    #[test]
    fn failed_capture_start_leaves_session_idle() {
        let mut controller = Controller::new(offline_api()).with_speech_input(Box::new(FakeInput {
            log: InputLog::default(),
            fail_start: true,
        }));

        assert!(controller.toggle_capture().is_err());
        assert!(!controller.state().listening);
    }

    #[test]
    fn transcript_overwrites_query_and_ends_capture() {
        let mut controller = Controller::new(offline_api()).with_speech_input(Box::new(FakeInput {
            log: InputLog::default(),
            fail_start: false,
        }));
        controller.set_query("typed draft");
        controller.toggle_capture().unwrap();

        controller.on_capture_event(CaptureEvent::Transcript("picnic near the river".to_owned()));

        assert_eq!(controller.state().query, "picnic near the river");
        assert!(!controller.state().listening);
    }

    #[test]
    fn capture_error_and_end_keep_query() {
        let mut controller = Controller::new(offline_api());
        controller.set_query("typed draft");
        controller.state.listening = true;
        controller.on_capture_event(CaptureEvent::Error("no-speech".to_owned()));
        assert_eq!(controller.state().query, "typed draft");
        assert!(!controller.state().listening);

        controller.state.listening = true;
        controller.on_capture_event(CaptureEvent::End);
        assert_eq!(controller.state().query, "typed draft");
        assert!(!controller.state().listening);
    }

    #[test]
    fn read_aloud_without_suggestions_does_nothing() {
        let log = OutputLog::default();
        let mut controller = Controller::new(offline_api())
            .with_speech_output(Box::new(FakeOutput { log: log.clone() }));

        assert!(!controller.read_aloud());
        assert!(log.0.lock().unwrap().is_empty());
    }

    #[test]
    fn read_aloud_speaks_in_session_locale() {
        let log = OutputLog::default();
        let mut controller = Controller::new(offline_api())
            .with_speech_output(Box::new(FakeOutput { log: log.clone() }));
        controller.set_language(Language::Ja);
        controller.state.suggestions = Some(Suggestions {
            text: "1. 美術館".to_owned(),
        });

        assert!(controller.read_aloud());

        let spoken = log.0.lock().unwrap();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "1. 美術館");
        assert_eq!(spoken[0].locale, "ja-JP");
        assert!((spoken[0].rate - READ_ALOUD_RATE).abs() < f32::EPSILON);
    }

    #[test]
    fn language_change_retags_capture_locale() {
        let log = InputLog::default();
        let mut controller = Controller::new(offline_api()).with_speech_input(Box::new(FakeInput {
            log: log.clone(),
            fail_start: false,
        }));

        controller.set_language(Language::Ja);
        assert_eq!(log.0.lock().unwrap().locales, vec!["ja-JP".to_owned()]);

        controller.toggle_capture().unwrap();
        assert_eq!(log.0.lock().unwrap().starts, vec!["ja-JP".to_owned()]);
    }

    #[tokio::test]
    async fn submit_is_rejected_while_a_cycle_is_loading() {
        let mut controller = Controller::new(offline_api());
        controller.set_place("Tokyo");
        controller.set_query("picnic");
        controller.state.phase = RequestPhase::FetchingWeather;

        let result = controller.submit().await;

        assert!(matches!(result, Err(SoraError::CycleInFlight)));
        assert_eq!(controller.state().phase, RequestPhase::FetchingWeather);
        assert!(controller.state().error.is_none());
    }

    #[tokio::test]
    async fn blank_input_fails_validation_without_a_network_call() {
        let mut controller = Controller::new(offline_api());
        controller.set_place("   ");
        controller.set_query("picnic");
        controller.state.weather = Some(sample_report());

        controller.submit().await.unwrap();

        assert_eq!(controller.state().phase, RequestPhase::Failed);
        assert_eq!(
            controller.state().error.as_deref(),
            Some("Please enter both place and query")
        );
        // Validation failures keep the previous results on display.
        assert!(controller.state().weather.is_some());
    }

    #[tokio::test]
    async fn blank_query_fails_validation_too() {
        let mut controller = Controller::new(offline_api());
        controller.set_place("Tokyo");
        controller.set_query("\t ");

        controller.submit().await.unwrap();

        assert_eq!(controller.state().phase, RequestPhase::Failed);
        assert_eq!(controller.state().error.as_deref(), Some(VALIDATION_MESSAGE));
    }

    #[test]
    fn restore_from_history_restores_inputs_and_locale() {
        let log = InputLog::default();
        let mut controller = Controller::new(offline_api()).with_speech_input(Box::new(FakeInput {
            log: log.clone(),
            fail_start: false,
        }));
        let record = SearchRecord {
            id: "a1".to_owned(),
            user_id: "local".to_owned(),
            place: "Kyoto".to_owned(),
            query: "autumn leaves".to_owned(),
            persona: Persona::Travel,
            language: Language::Ja,
            weather_summary: "今日: 18°/9°C".to_owned(),
            suggestions: "1. 嵐山".to_owned(),
            created_at: 1_700_000_000,
        };

        controller.restore_from_history(&record);

        assert_eq!(controller.state().place, "Kyoto");
        assert_eq!(controller.state().query, "autumn leaves");
        assert_eq!(controller.state().persona, Persona::Travel);
        assert_eq!(controller.state().language, Language::Ja);
        assert_eq!(log.0.lock().unwrap().locales, vec!["ja-JP".to_owned()]);
    }

    #[tokio::test]
    async fn refresh_history_caps_the_snapshot_at_the_recent_limit() {
        let store = Arc::new(SqliteHistoryStore::open_in_memory().unwrap());
        for i in 1..=7 {
            store
                .record(NewSearchRecord {
                    user_id: "local".to_owned(),
                    place: format!("place-{i}"),
                    query: "walk".to_owned(),
                    persona: Persona::Outings,
                    language: Language::En,
                    weather_summary: String::new(),
                    suggestions: String::new(),
                })
                .await
                .unwrap();
        }
        let mut controller = Controller::new(offline_api())
            .with_session_defaults(&SessionConfig::default())
            .with_history(store, "local");

        controller.refresh_history().await;

        assert_eq!(controller.recent().len(), 5);
        assert_eq!(controller.recent()[0].place, "place-7");
        assert_eq!(controller.recent()[4].place, "place-3");
    }

    #[test]
    fn capture_transitions_are_broadcast() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut controller = Controller::new(offline_api())
            .with_speech_input(Box::new(FakeInput {
                log: InputLog::default(),
                fail_start: false,
            }))
            .with_events(tx);

        controller.toggle_capture().unwrap();
        controller.on_capture_event(CaptureEvent::Transcript("museum".to_owned()));

        assert!(matches!(rx.try_recv().unwrap(), SessionEvent::CaptureStarted));
        assert!(matches!(
            rx.try_recv().unwrap(),
            SessionEvent::QueryTranscribed { text } if text == "museum"
        ));
        assert!(matches!(rx.try_recv().unwrap(), SessionEvent::CaptureStopped));
        assert!(rx.try_recv().is_err());
    }
}
