//! OpenAI Chat Completions API client.

use super::{Completion, CompletionClient, CompletionRequest, require_env_key};
use crate::error::{CapabilityError, CapabilityResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Reads the key from `OPENAI_API_KEY`.
    pub fn from_env(model: String) -> CapabilityResult<Self> {
        Ok(Self::new(require_env_key("OPENAI_API_KEY")?, model))
    }
}

// Unlike Anthropic, the system prompt rides in the messages array.
#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: String,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
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
impl CompletionClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> CapabilityResult<Completion> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system {
            messages.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        for message in request.messages {
            messages.push(WireMessage {
                role: match message.role {
                    super::Role::User => "user",
                    super::Role::Assistant => "assistant",
                },
                content: &message.content,
            });
        }

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CapabilityError::Completion {
                provider: "openai",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ErrorResponse>().await {
                Ok(err) => err.error.message,
                Err(_) => format!("request failed with status {status}"),
            };
            return Err(CapabilityError::Completion {
                provider: "openai",
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Completion {
                provider: "openai",
                message: format!("malformed response: {e}"),
            })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(CapabilityError::Completion {
                provider: "openai",
                message: "response contained no choices".to_string(),
            })?;

        let (input_tokens, output_tokens) = parsed
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((None, None));

        Ok(Completion {
            content,
            model: parsed.model,
            input_tokens,
            output_tokens,
        })
    }
}
