//! Configuration for the document QA service.
//!
//! Layered settings that support:
//! - Default values
//! - TOML configuration file (`docqa.toml`)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DOCQA_` and use double
//! underscores to separate nested levels:
//! - `DOCQA_CHUNKING__CHUNK_SIZE=800` sets `chunking.chunk_size`
//! - `DOCQA_LLM__DEFAULT_PROVIDER=openai` sets `llm.default_provider`
//! - `DOCQA_SERVER__BIND=0.0.0.0:9000` sets `server.bind`
//!
//! Provider API keys are read from the conventional variables
//! (`ANTHROPIC_API_KEY`, `OPENAI_API_KEY`, `GOOGLE_API_KEY`) by the LLM
//! clients themselves, never stored in settings.

use crate::llm::Provider;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const CONFIG_FILE: &str = "docqa.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Text segmentation settings
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Completion model settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between adjacent chunks in characters
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Cache directory for downloaded models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    /// Provider used when a request does not name one
    #[serde(default = "default_provider")]
    pub default_provider: Provider,

    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_google_model")]
    pub google_model: String,

    /// Sampling temperature for completions
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token budget
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// HTTP server bind address
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_false() -> bool {
    false
}
fn default_chunk_size() -> usize {
    crate::chunking::DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    crate::chunking::DEFAULT_OVERLAP
}
fn default_embedding_model() -> String {
    // Good balance between speed and quality.
    "all-MiniLM-L6-v2".to_string()
}
fn default_provider() -> Provider {
    Provider::Anthropic
}
fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o".to_string()
}
fn default_google_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_top_k() -> usize {
    3
}
fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            debug: false,
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            anthropic_model: default_anthropic_model(),
            openai_model: default_openai_model(),
            google_model: default_google_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources: defaults, then `docqa.toml`,
    /// then `DOCQA_*` environment variables.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(PathBuf::from(CONFIG_FILE))
    }

    /// Load with an explicit config file path.
    pub fn load_from(config_path: PathBuf) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            // Double underscore becomes dot; single underscores stay inside
            // field names.
            .merge(Env::prefixed("DOCQA_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }
}
