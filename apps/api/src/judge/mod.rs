//! Judgment capability client. The single point of entry for all external
//! model calls in Talentgate: free-text completion for scoring, generation,
//! and field extraction, plus text embeddings for screening similarity.
//!
//! The capability is treated as unreliable. A missing API key at startup
//! constructs a permanently disabled client: every call reports
//! `JudgeError::Disabled` without touching the network, and callers route to
//! their deterministic fallbacks.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const MAX_RETRIES: u32 = 3;
/// Inputs to the capability are truncated to this many characters.
const MAX_INPUT_CHARS: usize = 8000;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Judgment capability is disabled (no API key configured)")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Capability returned empty content")]
    EmptyContent,

    #[error("Malformed judgment payload: {0}")]
    MalformedJudgment(String),
}

/// Free-text judgment port. Implemented by [`OpenAiJudge`] in production and
/// by stubs in tests.
#[async_trait]
pub trait Judgment: Send + Sync {
    /// Sends a prompt and returns the raw text reply.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, JudgeError>;
}

/// Text-embedding port, used only by the screening pipeline.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, JudgeError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// The judgment capability client used by every pipeline in Talentgate.
/// Wraps an OpenAI-style API with a bounded timeout and retry on 429/5xx.
#[derive(Clone)]
pub struct OpenAiJudge {
    client: Client,
    api_key: Option<String>,
    judge_model: String,
    embed_model: String,
}

impl OpenAiJudge {
    /// `api_key: None` yields a client that is disabled for the lifetime of
    /// the process; no per-call probing happens.
    pub fn new(
        api_key: Option<String>,
        judge_model: String,
        embed_model: String,
        timeout_secs: u64,
    ) -> Self {
        if api_key.is_none() {
            warn!("No judgment API key configured; all scoring uses deterministic fallbacks");
        }
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            judge_model,
            embed_model,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn post_with_retry<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, JudgeError> {
        let api_key = self.api_key.as_ref().ok_or(JudgeError::Disabled)?;

        let mut last_error: Option<JudgeError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Judge call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(url)
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(JudgeError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Judge API returned {}: {}", status, body);
                last_error = Some(JudgeError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(JudgeError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response.json::<R>().await?);
        }

        Err(last_error.unwrap_or(JudgeError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl Judgment for OpenAiJudge {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, JudgeError> {
        let prompt = truncate_chars(prompt, MAX_INPUT_CHARS);
        let request = ChatRequest {
            model: &self.judge_model,
            temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: ChatResponse = self.post_with_retry(CHAT_COMPLETIONS_URL, &request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(JudgeError::EmptyContent)?;

        debug!("Judge call succeeded ({} chars)", text.len());
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl Embedder for OpenAiJudge {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, JudgeError> {
        let request = EmbeddingRequest {
            model: &self.embed_model,
            input: truncate_chars(text, MAX_INPUT_CHARS),
        };

        let response: EmbeddingResponse = self.post_with_retry(EMBEDDINGS_URL, &request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(JudgeError::EmptyContent)
    }
}

/// Sends a prompt and strictly decodes the reply as JSON, stripping markdown
/// code fences first. A decode failure is a `MalformedJudgment`; callers that
/// tolerate sloppier output perform their own bounded recovery before giving
/// up (see `screening::fields`).
pub async fn complete_json<T: DeserializeOwned>(
    judge: &dyn Judgment,
    prompt: &str,
    temperature: f32,
) -> Result<T, JudgeError> {
    let text = judge.complete(prompt, temperature).await?;
    let text = strip_json_fences(&text);
    serde_json::from_str(text).map_err(|e| JudgeError::MalformedJudgment(e.to_string()))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
