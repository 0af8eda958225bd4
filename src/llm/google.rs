//! Google Gemini generateContent API client.

use super::{Completion, CompletionClient, CompletionRequest, Role, require_env_key};
use crate::error::{CapabilityError, CapabilityResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GoogleClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GoogleClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// Reads the key from `GOOGLE_API_KEY`.
    pub fn from_env(model: String) -> CapabilityResult<Self> {
        Ok(Self::new(require_env_key("GOOGLE_API_KEY")?, model))
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata", default)]
    usage: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
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
impl CompletionClient for GoogleClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> CapabilityResult<Completion> {
        let contents = request
            .messages
            .iter()
            .map(|message| Content {
                // Gemini calls the assistant role "model".
                role: Some(match message.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }),
                parts: vec![Part {
                    text: &message.content,
                }],
            })
            .collect();

        let body = GenerateRequest {
            contents,
            system_instruction: request.system.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CapabilityError::Completion {
                provider: "google",
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<ErrorResponse>().await {
                Ok(err) => err.error.message,
                Err(_) => format!("request failed with status {status}"),
            };
            return Err(CapabilityError::Completion {
                provider: "google",
                message,
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| CapabilityError::Completion {
                    provider: "google",
                    message: format!("malformed response: {e}"),
                })?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or(CapabilityError::Completion {
                provider: "google",
                message: "response contained no candidates".to_string(),
            })?;

        let (input_tokens, output_tokens) = parsed
            .usage
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or((None, None));

        Ok(Completion {
            content,
            model: self.model.clone(),
            input_tokens,
            output_tokens,
        })
    }
}
