//! LLM Client — the single point of entry for all chat-completion calls.
//!
//! ARCHITECTURAL RULE: No other module may call the completion API directly.
//! Callers depend on `CompletionBackend`; `LlmClient` is the HTTP implementation.
//!
//! Every call is exactly one POST. Failures go back to the caller unchanged:
//! nothing in this module retries or backs off.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
/// The chat model every intake review is sent to.
pub const MODEL: &str = "gpt-4";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM response contained no choices")]
    NoChoices,

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            max_tokens: 256,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(flatten)]
    pub sampling: SamplingParams,
}

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl ChatCompletionResponse {
    /// Text of the first choice. Later choices are ignored.
    pub fn first_text(&self) -> Result<&str, LlmError> {
        let choice = self.choices.first().ok_or(LlmError::NoChoices)?;
        choice
            .message
            .content
            .as_deref()
            .ok_or(LlmError::EmptyContent)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Backend seam
// ────────────────────────────────────────────────────────────────────────────

/// A chat-completion backend. Implement this to swap transports without touching
/// the reviewer or the CLI.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError>;
}

/// HTTP client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Completion API returned {}", status);
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body)?;

        if let Some(usage) = &completion.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    const OK_BODY: &str = r#"{
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": "No missing information."}},
            {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
        ],
        "usage": {"prompt_tokens": 812, "completion_tokens": 9, "total_tokens": 821}
    }"#;

    fn sample_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: MODEL.to_string(),
            messages: vec![
                ChatMessage::system("criteria"),
                ChatMessage::user("case"),
                ChatMessage::assistant("instructions"),
            ],
            sampling: SamplingParams::default(),
        }
    }

    fn client_for(base_url: &str) -> LlmClient {
        LlmClient::new("sk-test".to_string(), base_url, Duration::from_secs(5)).unwrap()
    }

    async fn read_http_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serves exactly one canned HTTP response and hands back the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_http_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{addr}/v1/"), handle)
    }

    #[test]
    fn test_request_serializes_roles_and_flat_sampling_params() {
        let value = serde_json::to_value(sample_request()).unwrap();
        assert_eq!(value["model"], "gpt-4");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][2]["role"], "assistant");
        assert_eq!(value["messages"][2]["content"], "instructions");
        assert_eq!(value["temperature"], 1.0);
        assert_eq!(value["max_tokens"], 256);
        assert_eq!(value["top_p"], 1.0);
        assert_eq!(value["frequency_penalty"], 0.0);
        assert_eq!(value["presence_penalty"], 0.0);
        assert!(value.get("sampling").is_none());
    }

    #[test]
    fn test_first_text_uses_first_choice_only() {
        let response: ChatCompletionResponse = serde_json::from_str(OK_BODY).unwrap();
        assert_eq!(response.first_text().unwrap(), "No missing information.");
    }

    #[test]
    fn test_first_text_without_choices_is_an_error() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(response.first_text(), Err(LlmError::NoChoices)));
    }

    #[test]
    fn test_first_text_with_null_content_is_an_error() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
        )
        .unwrap();
        assert!(matches!(response.first_text(), Err(LlmError::EmptyContent)));
    }

    #[tokio::test]
    async fn test_complete_posts_to_chat_completions_with_bearer_auth() {
        let (base_url, server) = serve_once("200 OK", OK_BODY).await;

        let response = client_for(&base_url)
            .complete(&sample_request())
            .await
            .unwrap();
        assert_eq!(response.first_text().unwrap(), "No missing information.");
        assert_eq!(response.usage.as_ref().map(|u| u.prompt_tokens), Some(812));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /v1/chat/completions "), "got: {raw}");
        assert!(raw.to_lowercase().contains("authorization: bearer sk-test"));
        let body = &raw[raw.find("\r\n\r\n").unwrap() + 4..];
        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent["model"], MODEL);
        assert_eq!(sent["messages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_error_message() {
        let (base_url, server) = serve_once(
            "401 Unauthorized",
            r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#,
        )
        .await;

        let err = client_for(&base_url)
            .complete(&sample_request())
            .await
            .unwrap_err();
        server.await.unwrap();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_keeps_raw_body_when_error_is_not_json() {
        let (base_url, server) = serve_once("429 Too Many Requests", "slow down").await;

        let err = client_for(&base_url)
            .complete(&sample_request())
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(
            matches!(err, LlmError::Api { status: 429, ref message } if message == "slow down")
        );
    }

    #[tokio::test]
    async fn test_complete_rejects_malformed_success_body() {
        let (base_url, server) = serve_once("200 OK", r#"{"unexpected": true}"#).await;

        let err = client_for(&base_url)
            .complete(&sample_request())
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[tokio::test]
    async fn test_complete_against_closed_port_is_http_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = client_for(&format!("http://127.0.0.1:{port}/v1"))
            .complete(&sample_request())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Http(_)));
    }
}
