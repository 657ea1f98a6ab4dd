//! OpenAiContentGenerator - chat completions client producing candidates.
//!
//! Calls an OpenAI-compatible `/chat/completions` endpoint directly.
//! Configuration priority: `[generator]` settings > environment variables.

use crate::prompt::PromptRenderer;
use async_trait::async_trait;
use backlog_core::config::GeneratorSettings;
use backlog_core::error::{BacklogError, Result};
use backlog_core::generation::{
    ContentGenerator, GenerationInput, GenerationMetadata, GenerationOutput, RawCandidate,
    TokenUsage,
};
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::time::{Duration, Instant};

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str =
    "You are a product analyst who writes precise, reviewable backlog items as JSON.";

/// Generator backed by the OpenAI chat completions API.
pub struct OpenAiContentGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    renderer: PromptRenderer,
}

impl OpenAiContentGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: None,
            temperature: None,
            renderer: PromptRenderer::new()?,
        })
    }

    /// Builds a generator from `[generator]` settings, falling back to the
    /// environment.
    ///
    /// - API key: `OPENAI_API_KEY` (required)
    /// - Model: settings, then `OPENAI_MODEL_NAME`, then `gpt-4o`
    /// - Base URL: settings, then `OPENAI_BASE_URL`, then the public API
    pub fn try_from_settings(settings: &GeneratorSettings) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            BacklogError::config("OPENAI_API_KEY not found in environment variables")
        })?;

        let model = settings
            .model
            .clone()
            .or_else(|| env::var("OPENAI_MODEL_NAME").ok())
            .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.into());
        let base_url = settings
            .base_url
            .clone()
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| BacklogError::config(format!("failed to build HTTP client: {}", e)))?;

        let mut generator = Self::new(api_key, model)?.with_base_url(base_url);
        generator.client = client;
        generator.max_tokens = settings.max_tokens;
        generator.temperature = settings.temperature;
        Ok(generator)
    }

    /// Points the generator at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                let message = format!("OpenAI API request failed: {err}");
                if err.is_connect() || err.is_timeout() {
                    BacklogError::generation_retryable(message)
                } else {
                    BacklogError::generation(message)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        response
            .json()
            .await
            .map_err(|err| BacklogError::generation(format!("Failed to parse OpenAI response: {err}")))
    }
}

#[async_trait]
impl ContentGenerator for OpenAiContentGenerator {
    async fn generate(&self, input: &GenerationInput) -> Result<GenerationOutput> {
        let prompt = self.renderer.render(input)?;
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.clone(),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!(
            "[OpenAiContentGenerator] Requesting {} {} candidate(s) from {}",
            input.quantity,
            input.target_type,
            self.model
        );
        let started = Instant::now();
        let response = self.send_request(&request).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let reply = Reply::from_response(response)?;
        let model = reply.model.unwrap_or_else(|| self.model.clone());
        let candidates = parse_candidates(&reply.content);

        tracing::info!(
            "[OpenAiContentGenerator] {} returned {} raw candidate(s) in {}ms",
            model,
            candidates.len(),
            elapsed_ms
        );

        Ok(GenerationOutput {
            candidates,
            metadata: GenerationMetadata {
                elapsed_ms,
                token_usage: reply.token_usage,
                prompt,
                model: Some(model),
            },
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// The parts of a completion the generator keeps.
struct Reply {
    content: String,
    model: Option<String>,
    token_usage: Option<TokenUsage>,
}

impl Reply {
    fn from_response(response: ChatCompletionResponse) -> Result<Self> {
        let ChatCompletionResponse {
            model,
            choices,
            usage,
        } = response;

        let content = choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                BacklogError::generation("OpenAI API returned no content in the response")
            })?;

        Ok(Self {
            content,
            model,
            token_usage: usage.map(TokenUsage::from),
        })
    }
}

/// Splits the model's reply into raw candidates.
///
/// A JSON array (or an object wrapping one under `items`) yields one
/// candidate per element. Anything else is handed to the recovery step whole.
fn parse_candidates(content: &str) -> Vec<RawCandidate> {
    match serde_json::from_str::<Value>(content.trim()) {
        Ok(Value::Array(values)) => values.into_iter().map(RawCandidate::from_value).collect(),
        Ok(Value::Object(mut map)) => match map.remove("items") {
            Some(Value::Array(values)) => {
                values.into_iter().map(RawCandidate::from_value).collect()
            }
            Some(other) => {
                map.insert("items".to_string(), other);
                vec![RawCandidate::Structured(map)]
            }
            None => vec![RawCandidate::Structured(map)],
        },
        _ => vec![RawCandidate::NeedsReparse(content.to_string())],
    }
}

fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> BacklogError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    let is_retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    let message = match retry_after {
        Some(delay) => format!(
            "OpenAI API returned {}: {} (retry after {}s)",
            status.as_u16(),
            message,
            delay.as_secs()
        ),
        None => format!("OpenAI API returned {}: {}", status.as_u16(), message),
    };

    if is_retryable {
        BacklogError::generation_retryable(message)
    } else {
        BacklogError::generation(message)
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
