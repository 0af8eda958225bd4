//! Anthropic Messages API client.

use super::{Completion, CompletionClient, CompletionRequest, Message, require_env_key};
use crate::error::{CapabilityError, CapabilityResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Reads the key from `ANTHROPIC_API_KEY`.
    pub fn from_env(model: String) -> CapabilityResult<Self> {
        Ok(Self::new(require_env_key("ANTHROPIC_API_KEY")?, model))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> CapabilityResult<Completion> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system,
            messages: request.messages,
        };

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| CapabilityError::Completion {
                provider: "anthropic",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ErrorResponse>().await {
                Ok(err) => err.error.message,
                Err(_) => format!("request failed with status {status}"),
            };
            return Err(CapabilityError::Completion {
                provider: "anthropic",
                message,
            });
        }

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| CapabilityError::Completion {
                    provider: "anthropic",
                    message: format!("malformed response: {e}"),
                })?;

        let content = parsed
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        let (input_tokens, output_tokens) = parsed
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((None, None));

        Ok(Completion {
            content,
            model: parsed.model,
            input_tokens,
            output_tokens,
        })
    }
}
