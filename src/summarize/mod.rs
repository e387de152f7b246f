use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::SummarizationConfig;
use crate::{Result, TranscriptorError};

pub mod models;
pub mod openrouter;

pub use models::{ModelSelection, DEFAULT_MODEL, MODEL_TABLE};
pub use openrouter::OpenRouterClient;

/// `[01:25] ` markers
static MINUTE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+:\d+\]\s*").unwrap());

/// `[85.40] ` markers from older transcript dumps
static DECIMAL_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\.\d+\]\s*").unwrap());

const TURKISH_PROMPT: &str = "Aşağıdaki YouTube videosu transkriptini, ana noktaları kaçırmadan, akıcı ve bilgilendirici bir Türkçe paragraf olarak özetle:\n\n";
const ENGLISH_PROMPT: &str =
    "Summarize the following YouTube video transcript into a fluent and informative paragraph in English:\n\n";

/// Raw answer from a chat-style generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    /// HTTP status code
    pub status: u16,

    /// Generated text on 200, the service's error body otherwise
    pub text: String,
}

/// Chat-style text-generation service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one user prompt to the given model. `Err` means the request never got an answer.
    async fn complete(&self, model: &str, prompt: &str) -> Result<ChatReply>;
}

/// How a single generation attempt ended
#[derive(Debug, Clone, PartialEq)]
enum AttemptOutcome {
    Generated(String),
    RateLimited,
    ModelNotFound,
    Retryable(String),
}

impl AttemptOutcome {
    fn classify(reply: Result<ChatReply>) -> Self {
        match reply {
            Ok(reply) => match reply.status {
                200 => Self::Generated(reply.text),
                429 => Self::RateLimited,
                404 => Self::ModelNotFound,
                status => Self::Retryable(format!("HTTP {} - {}", status, reply.text)),
            },
            Err(e) => Self::Retryable(format!("{:#}", e)),
        }
    }
}

/// Retry knobs for summarization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    pub max_retries: u32,

    /// Wait after a 429 on attempt `k` is `rate_limit_step * k`
    pub rate_limit_step: Duration,

    /// Wait after any other failure
    pub retry_delay: Duration,
}

impl Default for SummaryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rate_limit_step: Duration::from_secs(5),
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl From<&SummarizationConfig> for SummaryPolicy {
    fn from(config: &SummarizationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            rate_limit_step: Duration::from_secs(config.rate_limit_step_secs),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// A summary and the model that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSummary {
    pub text: String,
    pub model: String,
}

/// Remove inline timestamp markers before sending text to a model
pub fn strip_timestamps(text: &str) -> String {
    let text = MINUTE_MARKER.replace_all(text, "");
    DECIMAL_MARKER.replace_all(&text, "").into_owned()
}

/// Dominant language as an ISO 639-1 code where one exists, `en` when detection fails
pub fn detect_language(text: &str) -> String {
    match whatlang::detect_lang(text) {
        Some(whatlang::Lang::Tur) => "tr".to_string(),
        Some(whatlang::Lang::Eng) | None => "en".to_string(),
        Some(lang) => lang.code().to_string(),
    }
}

/// Turkish text gets the Turkish prompt; everything else gets the English one
pub fn build_prompt(language: &str, text: &str) -> String {
    let template = if language == "tr" { TURKISH_PROMPT } else { ENGLISH_PROMPT };
    format!("{}{}", template, text)
}

/// Condenses transcripts with a chat model, with retries and model fallback
pub struct Summarizer {
    backend: Arc<dyn ChatBackend>,
    policy: SummaryPolicy,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn ChatBackend>, policy: SummaryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Summarize a transcript with the model selected by `model_key`.
    ///
    /// The model switches to the fallback permanently after a 404, and the
    /// final attempt always runs on the fallback regardless of what happened
    /// before.
    pub async fn summarize(
        &self,
        transcript: &str,
        model_key: &str,
    ) -> std::result::Result<GeneratedSummary, TranscriptorError> {
        let cleaned = strip_timestamps(transcript);
        let language = detect_language(&cleaned);
        let prompt = build_prompt(&language, &cleaned);

        let ModelSelection { target, fallback } = ModelSelection::resolve(model_key);
        let max_retries = self.policy.max_retries;
        let total_attempts = max_retries + 1;
        let mut selected = target;

        for attempt in 0..=max_retries {
            let model = if attempt == max_retries {
                if selected != fallback {
                    tracing::warn!("[AI] Primary model not responding, switching to fallback: {}", fallback);
                }
                fallback
            } else {
                selected
            };

            tracing::info!("[AI] Sending request ({}/{}). Model: {}", attempt + 1, total_attempts, model);

            let is_last = attempt == max_retries;
            match AttemptOutcome::classify(self.backend.complete(model, &prompt).await) {
                AttemptOutcome::Generated(text) => {
                    return Ok(GeneratedSummary {
                        text,
                        model: model.to_string(),
                    });
                }
                AttemptOutcome::RateLimited => {
                    let wait = self.policy.rate_limit_step * (attempt + 1);
                    tracing::warn!("[AI] {}", TranscriptorError::RateLimited(model.to_string()));
                    if !is_last {
                        tracing::warn!("[AI] Waiting {}s before retrying", wait.as_secs());
                        sleep(wait).await;
                    }
                }
                AttemptOutcome::ModelNotFound => {
                    tracing::warn!(
                        "[AI] {}. Switching to fallback model.",
                        TranscriptorError::ModelNotFound(model.to_string())
                    );
                    selected = fallback;
                }
                AttemptOutcome::Retryable(reason) => {
                    tracing::warn!("[AI] Request failed: {}", reason);
                    if !is_last {
                        sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }

        Err(TranscriptorError::GenerationExhausted {
            attempts: total_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;
    use tokio::time::Instant;

    fn reply(status: u16, text: &str) -> Result<ChatReply> {
        Ok(ChatReply {
            status,
            text: text.to_string(),
        })
    }

    #[test]
    fn test_strip_timestamps() {
        assert_eq!(strip_timestamps("[00:00] hello\n[01:25] world"), "hello\nworld");
        assert_eq!(strip_timestamps("[12.5] legacy [3.25]format"), "legacy format");
        assert_eq!(strip_timestamps("no [markers] here"), "no [markers] here");
    }

    #[test]
    fn test_prompt_selection() {
        assert!(build_prompt("tr", "metin").starts_with("Aşağıdaki YouTube"));
        assert!(build_prompt("en", "text").starts_with("Summarize the following"));
        assert!(build_prompt("de", "Text").starts_with("Summarize the following"));
        assert!(build_prompt("en", "text").ends_with("\n\ntext"));
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(
            detect_language("Bugün sizlere yapay zeka ile ilgili çok önemli bir konudan bahsetmek istiyorum ve bunun neden önemli olduğunu anlatacağım."),
            "tr"
        );
        assert_eq!(
            detect_language("Today I want to talk to you about a very important topic and explain why it matters for everyone."),
            "en"
        );
        assert_eq!(detect_language(""), "en");
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let mut backend = MockChatBackend::new();
        backend
            .expect_complete()
            .withf(|model, prompt| {
                model == "mistralai/devstral-2512:free" && !prompt.contains("[00:00]")
            })
            .times(1)
            .returning(|_, _| reply(200, "summary"));

        let summarizer = Summarizer::new(Arc::new(backend), SummaryPolicy::default());
        let summary = summarizer.summarize("[00:00] hello there", "mistral").await.unwrap();

        assert_eq!(summary.text, "summary");
        assert_eq!(summary.model, "mistralai/devstral-2512:free");
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_switches_to_fallback() {
        let mut backend = MockChatBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_complete()
            .withf(|model, _| model == "openai/gpt-oss-120b:free")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| reply(404, "no such model"));
        backend
            .expect_complete()
            .withf(|model, _| model == DEFAULT_MODEL)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| reply(200, "fallback summary"));

        let summarizer = Summarizer::new(Arc::new(backend), SummaryPolicy::default());
        let started = Instant::now();
        let summary = summarizer.summarize("text", "gpt").await.unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(summary.text, "fallback summary");
        assert_eq!(summary.model, DEFAULT_MODEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_switch_holds_for_later_attempts() {
        let mut backend = MockChatBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_complete()
            .withf(|model, _| model == "openai/gpt-oss-120b:free")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| reply(404, "no such model"));
        backend
            .expect_complete()
            .withf(|model, _| model == DEFAULT_MODEL)
            .times(3)
            .in_sequence(&mut seq)
            .returning(|_, _| reply(500, "internal error"));

        let summarizer = Summarizer::new(Arc::new(backend), SummaryPolicy::default());
        let started = Instant::now();
        let outcome = summarizer.summarize("text", "gpt").await;

        // no wait after the 404, 2s after each of the first two 500s
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(outcome, Err(TranscriptorError::GenerationExhausted { attempts: 4 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backoff_grows() {
        let mut backend = MockChatBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_complete()
            .withf(|model, _| model == "google/gemini-2.0-flash-exp:free")
            .times(3)
            .in_sequence(&mut seq)
            .returning(|_, _| reply(429, "slow down"));
        backend
            .expect_complete()
            .withf(|model, _| model == DEFAULT_MODEL)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| reply(200, "done"));

        let summarizer = Summarizer::new(Arc::new(backend), SummaryPolicy::default());
        let started = Instant::now();
        let summary = summarizer.summarize("text", "gemini").await.unwrap();

        // 5s + 10s + 15s, and the final attempt is forced onto the fallback
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert_eq!(summary.model, DEFAULT_MODEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_typed_failure() {
        let mut backend = MockChatBackend::new();
        let mut seq = Sequence::new();
        backend
            .expect_complete()
            .withf(|model, _| model == "mistralai/devstral-2512:free")
            .times(3)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));
        backend
            .expect_complete()
            .withf(|model, _| model == DEFAULT_MODEL)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| reply(500, "internal error"));

        let summarizer = Summarizer::new(Arc::new(backend), SummaryPolicy::default());
        let started = Instant::now();
        let outcome = summarizer.summarize("text", "mistral").await;

        assert_eq!(started.elapsed(), Duration::from_secs(6));
        assert_eq!(outcome, Err(TranscriptorError::GenerationExhausted { attempts: 4 }));
        assert!(outcome
            .unwrap_err()
            .to_string()
            .contains("choose a different model"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            AttemptOutcome::classify(reply(200, "ok")),
            AttemptOutcome::Generated("ok".to_string())
        );
        assert_eq!(AttemptOutcome::classify(reply(429, "")), AttemptOutcome::RateLimited);
        assert_eq!(AttemptOutcome::classify(reply(404, "")), AttemptOutcome::ModelNotFound);
        assert_eq!(
            AttemptOutcome::classify(reply(502, "bad gateway")),
            AttemptOutcome::Retryable("HTTP 502 - bad gateway".to_string())
        );
    }
}
