use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use curabot_core::config::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm client misconfigured: {0}")]
    Configuration(String),
    #[error("llm request timed out")]
    Timeout,
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("llm response was malformed: {0}")]
    InvalidResponse(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    /// Returns the first choice's text, or an empty string when the model produced none.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    completions_url: String,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.expose_secret().trim();
        if api_key.is_empty() {
            return Err(LlmError::Configuration("missing api key".to_owned()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|error| LlmError::Configuration(format!("invalid api key header: {error}")))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| LlmError::Configuration(error.to_string()))?;

        Ok(Self {
            client,
            completions_url: completions_url(&config.base_url),
            model: config.model.clone(),
        })
    }
}

fn completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        return base.to_owned();
    }
    format!("{base}/chat/completions")
}

#[async_trait]
impl ChatCompletionClient for OpenAiChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response =
            self.client.post(&self.completions_url).json(&body).send().await.map_err(|error| {
                if error.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Transport(error.to_string())
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|error| LlmError::Transport(error.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Status { status: status.as_u16(), body: text });
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|error| LlmError::InvalidResponse(error.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_owned())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use curabot_core::config::LlmConfig;

    use super::{completions_url, ChatCompletionClient, ChatMessage, ChatRequest, LlmError, OpenAiChatClient};

    fn config(base_url: String) -> LlmConfig {
        LlmConfig {
            api_key: "sk-test".to_owned().into(),
            base_url,
            model: "gpt-3.5-turbo".to_owned(),
            timeout_secs: 5,
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::system("be terse"), ChatMessage::user("hello")],
            max_tokens: 50,
            temperature: 0.5,
        }
    }

    #[test]
    fn completions_url_appends_path_once() {
        assert_eq!(completions_url("https://api.openai.com/v1/"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(
            completions_url("https://proxy.local/v1/chat/completions"),
            "https://proxy.local/v1/chat/completions"
        );
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let mut config = config("https://api.openai.com/v1".to_owned());
        config.api_key = String::new().into();
        assert!(matches!(OpenAiChatClient::new(&config), Err(LlmError::Configuration(_))));
    }

    #[tokio::test]
    async fn sends_model_messages_and_limits() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body_includes(json!({
                    "model": "gpt-3.5-turbo",
                    "messages": [{"role": "system", "content": "be terse"}, {"role": "user", "content": "hello"}],
                    "max_tokens": 50
                }).to_string());
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Rust / Async \n"}}]
            }));
        });

        let client = OpenAiChatClient::new(&config(server.url("/v1"))).expect("client");
        let answer = client.complete(request()).await.expect("completion");

        mock.assert();
        assert_eq!(answer, "Rust / Async");
    }

    #[tokio::test]
    async fn null_content_becomes_empty_answer() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({ "choices": [{"message": {"content": null}}] }));
        });

        let client = OpenAiChatClient::new(&config(server.url("/v1"))).expect("client");
        assert_eq!(client.complete(request()).await.expect("completion"), "");
    }

    #[tokio::test]
    async fn provider_errors_keep_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).body(r#"{"error":{"message":"rate limited"}}"#);
        });

        let client = OpenAiChatClient::new(&config(server.url("/v1"))).expect("client");
        let error = client.complete(request()).await.expect_err("rate limited");

        assert!(matches!(error, LlmError::Status { status: 429, .. }));
    }
}
