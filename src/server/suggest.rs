//! Suggestion generation via an OpenAI-compatible chat completions API.
//!
//! The persona selects the system prompt; the user prompt carries the
//! place, the weather summary, and the query, followed by the fixed
//! three-suggestion format contract. The output language switches the
//! whole prompt pair, so the model answers in the session language.

use crate::config::SuggestProviderConfig;
use crate::error::{Result, SoraError};
use crate::session::{Language, Persona};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// System prompt for a persona in the given output language.
#[must_use]
pub fn persona_prompt(persona: Persona, lang: Language) -> &'static str {
    match (persona, lang) {
        (Persona::Outings, Language::En) => {
            "You are a helpful assistant specializing in local activities and outings lasting 2-4 hours. Focus on practical, budget-friendly recommendations."
        }
        (Persona::Outings, Language::Ja) => {
            "あなたは2〜4時間の地元のアクティビティや外出に特化した親切なアシスタントです。実用的で予算に優しい推奨事項に焦点を当ててください。"
        }
        (Persona::Travel, Language::En) => {
            "You are a helpful assistant specializing in day trips and overnight travel. Include transport hints and booking considerations."
        }
        (Persona::Travel, Language::Ja) => {
            "あなたは日帰り旅行や宿泊旅行に特化した親切なアシスタントです。交通手段のヒントや予約の考慮事項を含めてください。"
        }
        (Persona::Fashion, Language::En) => {
            "You are a helpful assistant specializing in weather-appropriate fashion and outfit recommendations. Focus on layers, shoes, accessories, and weather protection."
        }
        (Persona::Fashion, Language::Ja) => {
            "あなたは天候に適したファッションと服装の推奨に特化した親切なアシスタントです。レイヤー、靴、アクセサリー、天候保護に焦点を当ててください。"
        }
    }
}

/// User prompt: request context plus the three-suggestion format contract.
#[must_use]
pub fn user_prompt(query: &str, place: &str, weather_summary: &str, lang: Language) -> String {
    match lang {
        Language::Ja => format!(
            "場所: {place}\n天気の概要: {weather_summary}\nクエリ: {query}\n\n上記の情報に基づいて、正確に3つの提案を番号付きリストとして提供してください。各提案には以下を含めてください：\n1) 概要（1文）\n2) ステップ\n3) 持ち物\n4) 注意事項\n\n簡潔で実用的な内容にしてください。"
        ),
        Language::En => format!(
            "Place: {place}\nWeather summary: {weather_summary}\nQuery: {query}\n\nBased on the information above, provide exactly 3 suggestions as a numbered list. For each suggestion, include:\n1) Summary (one sentence)\n2) Steps\n3) Items to bring\n4) Cautions\n\nKeep it concise and practical."
        ),
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Chat-completions client that turns a request context into suggestions.
pub struct SuggestGenerator {
    http: reqwest::Client,
    config: SuggestProviderConfig,
}

impl SuggestGenerator {
    /// Build a generator from the provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &SuggestProviderConfig, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SoraError::Server(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Generate suggestion text for an already-validated request.
    ///
    /// The API key is resolved per call, so a key exported after startup
    /// is picked up without a restart.
    ///
    /// # Errors
    ///
    /// Returns `SoraError::Suggest` with a user-visible message: missing
    /// key, transport failure, provider error, or empty completion.
    pub async fn generate(
        &self,
        query: &str,
        place: &str,
        weather_summary: &str,
        persona: Persona,
        lang: Language,
    ) -> Result<String> {
        let api_key = self.config.resolved_api_key();
        if api_key.is_empty() {
            return Err(SoraError::Suggest(
                "Suggestion API key not configured".to_owned(),
            ));
        }

        let body = serde_json::json!({
            "model": self.config.api_model,
            "messages": [
                {"role": "system", "content": persona_prompt(persona, lang)},
                {"role": "user", "content": user_prompt(query, place, weather_summary, lang)},
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let url = format!(
            "{}/v1/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| SoraError::Suggest(format!("Failed to generate suggestions: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            debug!("chat completions returned {status}: {body_text}");
            return Err(SoraError::Suggest(format!(
                "Failed to generate suggestions: {}",
                provider_detail(&body_text, status)
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| SoraError::Suggest(format!("Failed to generate suggestions: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                SoraError::Suggest("Failed to generate suggestions: empty completion".to_owned())
            })
    }
}

/// Pull `error.message` from an OpenAI-style error body, else the status.
fn provider_detail(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| format!("provider returned {status}"))
}
