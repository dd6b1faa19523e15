//! Upstream chat-completion client.

use super::ProxyError;
use crate::config::ProxyConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that turns a prompt into generated text.
///
/// The HTTP routes only see this trait, so tests can swap in a stub.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProxyError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Pull `choices[0].message.content` out of a raw upstream reply.
///
/// A body that is not JSON, has no choices, or whose first choice carries
/// no text is a [`ProxyError::MalformedReply`].
pub fn extract_content(body: &[u8]) -> Result<String, ProxyError> {
    let reply: CompletionReply = serde_json::from_slice(body)
        .map_err(|e| ProxyError::MalformedReply(e.to_string()))?;
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ProxyError::MalformedReply("missing choices[0].message.content".into()))
}

/// [`CompletionClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpCompletionClient {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            url: config.upstream_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, ProxyError> {
        let body = CompletionRequest {
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let mut request = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Status(status));
        }
        let bytes = response.bytes().await?;
        debug!(status = status.as_u16(), bytes = bytes.len(), "upstream replied");
        extract_content(&bytes)
    }
}
