//! Completion capability: chat-style LLM clients.
//!
//! The serving layer only sees [`CompletionClient`]; concrete clients speak
//! each vendor's JSON wire format over reqwest. API keys come from the
//! conventional environment variables and are never persisted.

pub mod anthropic;
pub mod google;
pub mod openai;

pub use anthropic::AnthropicClient;
pub use google::GoogleClient;
pub use openai::OpenAiClient;

use crate::config::LlmConfig;
use crate::error::{CapabilityError, CapabilityResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chat role. Vendors spell these the same way, lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A completed model response.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

/// The closed set of supported completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
    Google,
}

impl FromStr for Provider {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            "google" => Ok(Self::Google),
            other => Err(CapabilityError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Google => "google",
        };
        write!(f, "{name}")
    }
}

/// One completion call, borrowed from the caller.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub messages: &'a [Message],
    pub system: Option<&'a str>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A chat completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Model identifier sent on the wire.
    fn model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest<'_>) -> CapabilityResult<Completion>;
}

/// Builds a client for `provider` (falling back to the configured default),
/// using `model` when given, the configured per-provider model otherwise.
///
/// The API key is read from the provider's conventional environment variable;
/// a missing key fails here, before any request is attempted.
pub fn client_for(
    provider: Option<Provider>,
    model: Option<String>,
    config: &LlmConfig,
) -> CapabilityResult<Box<dyn CompletionClient>> {
    let provider = provider.unwrap_or(config.default_provider);

    match provider {
        Provider::Anthropic => {
            let model = model.unwrap_or_else(|| config.anthropic_model.clone());
            Ok(Box::new(AnthropicClient::from_env(model)?))
        }
        Provider::OpenAi => {
            let model = model.unwrap_or_else(|| config.openai_model.clone());
            Ok(Box::new(OpenAiClient::from_env(model)?))
        }
        Provider::Google => {
            let model = model.unwrap_or_else(|| config.google_model.clone());
            Ok(Box::new(GoogleClient::from_env(model)?))
        }
    }
}

pub(crate) fn require_env_key(var: &'static str) -> CapabilityResult<String> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(CapabilityError::MissingApiKey(var))
}
