//! Retrieval-augmented question answering over uploaded documents.
//!
//! The core is a small retrieval engine: documents are segmented into
//! overlapping chunks, embedded with a local model, and stored per named
//! collection in an exact nearest-neighbor index. Questions retrieve the
//! closest chunks, which a completion model turns into a grounded answer.
//!
//! Modules:
//! - [`chunking`]: boundary-aware text segmentation
//! - [`vector`]: flat exact k-NN index over L2 distance
//! - [`embedding`]: the embedding capability and its fastembed implementation
//! - [`store`]: named collections keeping chunks and vectors aligned
//! - [`retriever`]: the facade composing segmentation, storage, and search
//! - [`extract`]: file-format text extraction for uploads
//! - [`eval`]: retrieval quality scoring against labelled cases
//! - [`llm`]: completion clients (Anthropic, OpenAI, Google)
//! - [`api`]: the axum HTTP surface
//! - [`config`]: layered settings (defaults, TOML, environment)

pub mod api;
pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod extract;
pub mod llm;
pub mod prompts;
pub mod retriever;
pub mod store;
pub mod vector;

pub use chunking::{Chunk, segment, segment_default};
pub use config::Settings;
pub use embedding::{EmbeddingProvider, FastEmbedProvider};
pub use error::{
    CapabilityError, CapabilityResult, ExtractError, ExtractResult, IndexError, IndexResult,
};
pub use retriever::RetrievalEngine;
pub use store::{ClearStats, CollectionStore};
pub use vector::{FlatIndex, VectorDimension};
