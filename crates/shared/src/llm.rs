use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{LlmProvider, LlmSettings};
use crate::error::{AppError, Result};

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// One prompt in, one block of text out.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Overrides the configured sampling temperature.
    pub temperature: Option<f32>,
    /// Overrides the configured output budget.
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Anything that can complete a prompt. Implemented by the hosted providers
/// below and by the scripted fake used in tests.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Returns the completion text, never empty on success.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Build the configured provider's client.
pub fn build_model(settings: &LlmSettings) -> Result<Arc<dyn CompletionModel>> {
    let model: Arc<dyn CompletionModel> = match settings.provider {
        LlmProvider::OpenAi => Arc::new(OpenAiClient::new(settings.clone())?),
        LlmProvider::Anthropic => Arc::new(ClaudeClient::new(settings.clone())?),
    };
    Ok(model)
}

fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))
}

fn non_empty(provider: &str, text: Option<String>) -> Result<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::Model(format!("{} returned an empty response", provider))),
    }
}

// ==================== OpenAI ====================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiErrorBody {
    #[serde(default)]
    error: OpenAiErrorDetail,
}

#[derive(Deserialize, Default)]
struct OpenAiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

pub struct OpenAiClient {
    client: Client,
    settings: LlmSettings,
}

impl OpenAiClient {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = build_http_client(settings.timeout_secs)?;
        Ok(Self { client, settings })
    }

    fn classify_error(status: StatusCode, body: &str) -> AppError {
        let parsed: OpenAiErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = if parsed.error.message.is_empty() {
            body.to_string()
        } else {
            parsed.error.message
        };

        let is_quota = parsed.error.code.as_deref() == Some("insufficient_quota")
            || parsed.error.kind.as_deref() == Some("insufficient_quota");

        if is_quota {
            AppError::Quota {
                provider: "OpenAI".to_string(),
                message,
            }
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            AppError::RateLimited {
                provider: "OpenAI".to_string(),
                message,
            }
        } else {
            AppError::Model(format!("OpenAI API error ({}): {}", status, message))
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature.unwrap_or(self.settings.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.settings.max_tokens),
        };

        let url = format!(
            "{}/chat/completions",
            self.settings.api_base.trim_end_matches('/')
        );
        debug!(model = %self.settings.model, prompt_len = request.prompt.len(), "calling OpenAI");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::from_model_transport("OpenAI", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Self::classify_error(status, &error_text));
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| AppError::Model(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);

        non_empty("OpenAI", content)
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

// ==================== Anthropic ====================

#[derive(Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    text: String,
}

pub struct ClaudeClient {
    client: Client,
    settings: LlmSettings,
}

impl ClaudeClient {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = build_http_client(settings.timeout_secs)?;
        Ok(Self { client, settings })
    }
}

#[async_trait]
impl CompletionModel for ClaudeClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ClaudeRequest {
            model: &self.settings.model,
            max_tokens: request.max_tokens.unwrap_or(self.settings.max_tokens),
            temperature: request.temperature.unwrap_or(self.settings.temperature),
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let url = format!("{}/messages", self.settings.api_base.trim_end_matches('/'));
        debug!(model = %self.settings.model, prompt_len = request.prompt.len(), "calling Claude");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::from_model_transport("Claude", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(AppError::RateLimited {
                    provider: "Claude".to_string(),
                    message: error_text,
                });
            }
            return Err(AppError::Model(format!(
                "Claude API error ({}): {}",
                status, error_text
            )));
        }

        let claude_response = response
            .json::<ClaudeResponse>()
            .await
            .map_err(|e| AppError::Model(format!("Failed to parse Claude API response: {}", e)))?;

        let text = claude_response
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        non_empty("Claude", Some(text))
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(provider: LlmProvider, base: &str) -> LlmSettings {
        LlmSettings {
            provider,
            api_key: "test-key".to_string(),
            api_base: base.to_string(),
            model: "test-model".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_openai_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "test-model", "temperature": 0.9})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hello there"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(settings(LlmProvider::OpenAi, &server.uri())).unwrap();
        let text = client
            .complete(&CompletionRequest::new("hi").with_temperature(0.9))
            .await
            .unwrap();
        assert_eq!(text, "Hello there");
    }

    #[tokio::test]
    async fn test_openai_empty_content_is_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "   "}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(settings(LlmProvider::OpenAi, &server.uri())).unwrap();
        let err = client.complete(&CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, AppError::Model(_)));
    }

    #[tokio::test]
    async fn test_openai_quota_vs_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"message": "You exceeded your current quota", "type": "insufficient_quota", "code": "insufficient_quota"}
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(settings(LlmProvider::OpenAi, &server.uri())).unwrap();
        let err = client.complete(&CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, AppError::Quota { .. }));

        let err = OpenAiClient::classify_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}"#,
        );
        assert!(matches!(err, AppError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_openai_server_error_is_model_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(settings(LlmProvider::OpenAi, &server.uri())).unwrap();
        let err = client.complete(&CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, AppError::Model(ref msg) if msg.contains("boom")));
    }

    #[tokio::test]
    async fn test_claude_joins_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "Part one, "}, {"type": "text", "text": "part two"}]
            })))
            .mount(&server)
            .await;

        let client = ClaudeClient::new(settings(LlmProvider::Anthropic, &server.uri())).unwrap();
        let text = client.complete(&CompletionRequest::new("hi")).await.unwrap();
        assert_eq!(text, "Part one, part two");
    }

    #[tokio::test]
    async fn test_claude_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_string(
                r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
            ))
            .mount(&server)
            .await;

        let client = ClaudeClient::new(settings(LlmProvider::Anthropic, &server.uri())).unwrap();
        let err = client.complete(&CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited { .. }));
    }

    #[test]
    fn test_build_model_picks_provider() {
        let model = build_model(&settings(LlmProvider::Anthropic, "http://localhost")).unwrap();
        assert_eq!(model.model_name(), "test-model");
    }
}
