use crate::LlmProvider;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraipe_core::{CoreError, LlmError, DEFAULT_OPENAI_MODEL};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const OPENAI_PROVIDER: &str = "openai";
pub const DEFAULT_MAX_CONTENT_SIZE: usize = 5000;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// OpenAI chat-completions client.
#[derive(Clone)]
pub struct OpenAiProvider {
    http_client: Client,
    api_key: String,
    model: String,
    max_content_size: usize,
    base_url: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("model", &self.model)
            .field("max_content_size", &self.max_content_size)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CoreError> {
        let http_client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
            base_url: OPENAI_API_BASE.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_content_size(mut self, max_content_size: usize) -> Self {
        self.max_content_size = max_content_size;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_content_size(&self) -> usize {
        self.max_content_size
    }

    fn ensure_key(&self) -> Result<(), CoreError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::InvalidApiKey {
                provider: OPENAI_PROVIDER.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<reqwest::Response, CoreError> {
        let start_time = Instant::now();
        let response = request.bearer_auth(&self.api_key).send().await.map_err(|e| {
            error!("Network error calling OpenAI {}: {}", endpoint, e);
            if e.is_timeout() {
                CoreError::Llm(LlmError::RequestTimeout {
                    provider: OPENAI_PROVIDER.to_string(),
                })
            } else {
                CoreError::Network(e)
            }
        })?;

        let status = response.status();
        debug!(
            "OpenAI responded {} for {} in {:?}",
            status,
            endpoint,
            start_time.elapsed()
        );

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        let llm_error = status_error(status, retry_after, &body, &self.model);
        warn!("OpenAI request to {} failed: {}", endpoint, llm_error);
        Err(llm_error.into())
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        OPENAI_PROVIDER
    }

    async fn analyze(
        &self,
        content: &str,
        instruction: &str,
    ) -> Result<serde_json::Value, CoreError> {
        self.ensure_key()?;

        let content = truncate_chars(content, self.max_content_size);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.0,
        };

        let endpoint = "/chat/completions";
        let request = self
            .http_client
            .post(format!("{}{}", self.base_url, endpoint))
            .json(&body);
        let response = self.send(request, endpoint).await?;

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: OPENAI_PROVIDER.to_string(),
                details: e.to_string(),
            })
        })?;

        Ok(parse_completion(completion)?)
    }

    async fn probe(&self) -> Result<(), CoreError> {
        self.ensure_key()?;

        let endpoint = "/models";
        let request = self
            .http_client
            .get(format!("{}{}", self.base_url, endpoint));
        self.send(request, endpoint).await?;
        Ok(())
    }
}

/// Cuts `content` to at most `max_chars` characters, never splitting one.
pub fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &content[..byte_index],
        None => content,
    }
}

fn parse_completion(completion: ChatCompletionResponse) -> Result<serde_json::Value, LlmError> {
    let invalid = |details: String| LlmError::InvalidResponseFormat {
        provider: OPENAI_PROVIDER.to_string(),
        details,
    };

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| invalid("response contained no choices".to_string()))?;

    if choice.finish_reason.as_deref() == Some("content_filter") {
        return Err(LlmError::ContentFiltered {
            reason: "completion stopped by content filter".to_string(),
        });
    }

    let text = choice
        .message
        .content
        .ok_or_else(|| invalid("choice had no message content".to_string()))?;

    serde_json::from_str(&text).map_err(|e| invalid(format!("message is not JSON: {}", e)))
}

fn status_error(status: StatusCode, retry_after: Option<u64>, body: &str, model: &str) -> LlmError {
    let provider = OPENAI_PROVIDER.to_string();
    let error_body = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);
    let code = error_body.as_ref().and_then(|e| e.code.as_deref());

    if let Some(message) = error_body.as_ref().and_then(|e| e.message.as_deref()) {
        debug!("OpenAI error body: {}", message);
    }

    match status.as_u16() {
        401 => LlmError::InvalidApiKey { provider },
        429 if code == Some("insufficient_quota") => LlmError::InsufficientCredits { provider },
        429 => LlmError::RateLimitExceeded {
            provider,
            retry_after: retry_after.unwrap_or(20),
        },
        404 if code == Some("model_not_found") => LlmError::ModelNotAvailable {
            model: model.to_string(),
        },
        408 => LlmError::RequestTimeout { provider },
        500 | 502 | 503 | 504 => LlmError::ServiceUnavailable { provider },
        code => LlmError::RequestFailed {
            provider,
            status_code: code,
        },
    }
}
