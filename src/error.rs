//! Error types for the retrieval engine and its collaborators.
//!
//! Structured errors using thiserror, split by boundary: `IndexError` for the
//! core retrieval path, `CapabilityError` for the hosted embedding and
//! completion models, and `ExtractError` for the file-format extraction layer.
//! Each exposes a stable `status_code()` used by the API layer when mapping
//! failures to HTTP responses.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the core retrieval path (segmentation, indexing, search).
#[derive(Error, Debug)]
pub enum IndexError {
    /// The embedding capability produced vectors of a different width than the
    /// collection's existing index. Continuing would silently corrupt every
    /// future ranking, so this fails fast.
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}. All vectors in a collection must come from the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension} ({reason})")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    /// A hosted-model call failed mid-operation. The store guarantees the
    /// collection was left in its prior consistent state.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

impl IndexError {
    /// Stable status code for JSON error responses.
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::InvalidDimension { .. } => "INVALID_DIMENSION",
            Self::Capability(e) => e.status_code(),
        }
    }
}

/// Errors from the external model capabilities (embedding and completion).
///
/// These are never retried inside the core; retry policy belongs to the
/// caller.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Completion request to {provider} failed: {message}")]
    Completion {
        provider: &'static str,
        message: String,
    },

    #[error("Missing API key: set the {0} environment variable")]
    MissingApiKey(&'static str),

    #[error("Unknown LLM provider '{0}'. Supported providers: anthropic, openai, google")]
    UnknownProvider(String),
}

impl CapabilityError {
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::ModelInit(_) => "MODEL_INIT_FAILED",
            Self::Embedding(_) => "EMBEDDING_FAILED",
            Self::Completion { .. } => "COMPLETION_FAILED",
            Self::MissingApiKey(_) => "MISSING_API_KEY",
            Self::UnknownProvider(_) => "UNKNOWN_PROVIDER",
        }
    }
}

/// Errors from the document extraction layer.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(
        "Unsupported file type '{extension}'. Supported types: .txt, .text, .md, .pdf, .docx, .odt"
    )]
    UnsupportedFormat { extension: String },

    #[error("Failed to read file '{}': {source}", path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed {format} file '{}': {reason}", path.display())]
    Malformed {
        format: &'static str,
        path: PathBuf,
        reason: String,
    },
}

impl ExtractError {
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FILE_TYPE",
            Self::FileRead { .. } => "FILE_READ_ERROR",
            Self::Malformed { .. } => "MALFORMED_DOCUMENT",
        }
    }
}

/// Result type alias for core retrieval operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for model capability operations
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Result type alias for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;
