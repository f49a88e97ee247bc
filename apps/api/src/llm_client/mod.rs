/// LLM Client: the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the generation service directly.
/// Everything goes through `TextGenerator`, which `AppState` carries as
/// `Arc<dyn TextGenerator>` so tests can swap in a mock.
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::generation::{GeneratedArtifact, GenerationRequest};

pub mod prompts;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MAX_OUTPUT_TOKENS: u32 = 16_384;
const TEMPERATURE: f32 = 0.7;
/// One original attempt plus at most one retry of a transient failure.
const MAX_ATTEMPTS: u32 = 2;
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("the generation service rejected the API credential: {0}")]
    Authentication(String),

    #[error("the generation service quota or rate limit was exceeded: {0}")]
    QuotaExceeded(String),

    #[error("could not reach the generation service: {0}")]
    Network(#[from] reqwest::Error),

    #[error("generation failed: {0}")]
    Generation(String),
}

/// Text generation capability. One method for both document kinds; the
/// artifact variant follows `request.kind()`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArtifact, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    /// Thought summaries from thinking models; never part of the answer.
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<Value>,
}

impl Candidate {
    fn answer_text(&self) -> String {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter(|p| !p.thought)
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Sends one request, retrying once on transport errors and 5xx responses.
    /// Credential, quota and request errors are returned immediately.
    async fn call(&self, request: &GenerationRequest) -> Result<GeminiResponse, LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::Authentication(
                "no API key configured; set GEMINI_API_KEY".to_string(),
            ));
        }

        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system(),
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart {
                    text: request.prompt(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };
        let url = self.endpoint();

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                warn!(
                    "Generation attempt {} failed, retrying after {}ms...",
                    attempt,
                    RETRY_DELAY.as_millis()
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }

            let response = match self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status();
            let text = response.text().await?;

            if status.is_server_error() {
                warn!("Gemini API returned {}: {}", status, text);
                last_error = Some(LlmError::Generation(format!(
                    "the service failed with {status}: {}",
                    error_message(&text)
                )));
                continue;
            }

            if !status.is_success() {
                return Err(classify_error(status, &text));
            }

            return serde_json::from_str(&text)
                .map_err(|e| LlmError::Generation(format!("undecodable service response: {e}")));
        }

        Err(last_error.unwrap_or_else(|| {
            LlmError::Generation("no request was attempted".to_string())
        }))
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedArtifact, LlmError> {
        let started = Instant::now();
        let response = self.call(request).await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(LlmError::Generation(format!(
                "the prompt was blocked by the service ({reason})"
            )));
        }

        let candidate = response.candidates.first().ok_or_else(|| {
            LlmError::Generation("the service returned no candidates".to_string())
        })?;

        match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => {
                return Err(LlmError::Generation(
                    "the completion was cut off at the output token limit".to_string(),
                ))
            }
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII")) => {
                return Err(LlmError::Generation(format!(
                    "the completion was withheld by the service ({reason})"
                )))
            }
            _ => {}
        }

        if let Some(usage) = &response.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        let artifact = GeneratedArtifact::from_completion(request.kind(), &candidate.answer_text())?;
        info!(
            kind = request.kind().label(),
            model = %self.model,
            chars = artifact.text().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generation completed"
        );
        Ok(artifact)
    }
}

fn parse_error(body: &str) -> Option<GoogleError> {
    serde_json::from_str::<GoogleErrorEnvelope>(body)
        .ok()
        .map(|e| e.error)
}

fn error_message(body: &str) -> String {
    parse_error(body)
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

/// Maps a non-success, non-5xx response to the caller-facing error kind.
fn classify_error(status: StatusCode, body: &str) -> LlmError {
    let error = parse_error(body);
    let message = error
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    let google_status = error.as_ref().and_then(|e| e.status.as_deref());
    let invalid_key = error.as_ref().is_some_and(|e| {
        e.details
            .iter()
            .any(|d| d.get("reason").and_then(Value::as_str) == Some("API_KEY_INVALID"))
    }) || message.contains("API key not valid");

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) || invalid_key {
        LlmError::Authentication(message)
    } else if status == StatusCode::TOO_MANY_REQUESTS || google_status == Some("RESOURCE_EXHAUSTED") {
        LlmError::QuotaExceeded(message)
    } else {
        LlmError::Generation(format!("the service rejected the request ({status}): {message}"))
    }
}
