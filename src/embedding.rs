//! Embedding capability: text to fixed-dimension normalized vectors.
//!
//! The retrieval core only sees the [`EmbeddingProvider`] trait; the
//! production implementation runs a local fastembed model. Every vector
//! leaving a provider is L2-normalized, which is what makes Euclidean ranking
//! in the flat index monotonic with cosine ranking.

use crate::error::{CapabilityError, CapabilityResult};
use crate::vector::VectorDimension;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::Path;
use std::sync::Mutex;

/// Maps text to fixed-dimension unit vectors.
///
/// Implementations must be thread-safe, report a stable dimension across
/// calls, and embed a given text identically whether it arrives alone or in a
/// batch.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, preserving input order.
    fn embed_batch(&self, texts: &[&str]) -> CapabilityResult<Vec<Vec<f32>>>;

    /// Embed a single text. Equivalent to a one-element batch.
    fn embed(&self, text: &str) -> CapabilityResult<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| CapabilityError::Embedding("provider returned no vector".to_string()))
    }

    /// Output width of this provider's vectors.
    fn dimension(&self) -> VectorDimension;
}

/// Local embedding provider backed by fastembed.
///
/// The model runs in-process; the `Mutex` gives interior mutability since
/// fastembed's `embed` takes `&mut self`.
pub struct FastEmbedProvider {
    model: Mutex<TextEmbedding>,
    dimension: VectorDimension,
}

impl FastEmbedProvider {
    /// Initializes the provider, downloading the model on first use.
    ///
    /// The dimension is probed with a throwaway embedding rather than
    /// hardcoded, so swapping models in configuration needs no code change.
    pub fn new(model_name: &str, cache_dir: Option<&Path>) -> CapabilityResult<Self> {
        let model = resolve_model(model_name)?;

        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir.to_path_buf());
        }

        let mut text_model = TextEmbedding::try_new(options).map_err(|e| {
            CapabilityError::ModelInit(format!(
                "{e}. First-time model download requires network access"
            ))
        })?;

        let probe = text_model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| CapabilityError::ModelInit(e.to_string()))?;
        let width = probe
            .into_iter()
            .next()
            .ok_or_else(|| CapabilityError::ModelInit("model produced no output".to_string()))?
            .len();
        let dimension = VectorDimension::new(width)
            .map_err(|e| CapabilityError::ModelInit(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(text_model),
            dimension,
        })
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed_batch(&self, texts: &[&str]) -> CapabilityResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let owned: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        let mut embeddings = self
            .model
            .lock()
            .map_err(|_| {
                CapabilityError::Embedding(
                    "embedding model lock poisoned by a panic in another thread".to_string(),
                )
            })?
            .embed(owned, None)
            .map_err(|e| CapabilityError::Embedding(e.to_string()))?;

        for embedding in &mut embeddings {
            if embedding.len() != self.dimension.get() {
                return Err(CapabilityError::Embedding(format!(
                    "model produced a {}-wide vector, expected {}",
                    embedding.len(),
                    self.dimension
                )));
            }
            normalize_in_place(embedding);
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}

/// Resolves a configured model name to a fastembed model.
///
/// Accepts both the upstream sentence-transformers name and fastembed's enum
/// spelling.
fn resolve_model(name: &str) -> CapabilityResult<EmbeddingModel> {
    match name {
        "all-MiniLM-L6-v2" | "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-MiniLM-L12-v2" | "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" | "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(CapabilityError::ModelInit(format!(
            "unknown embedding model '{other}'"
        ))),
    }
}

/// Scales a vector to unit L2 norm. Zero vectors are left untouched.
fn normalize_in_place(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

/// Deterministic embedding provider for tests.
///
/// Hashes each text's bytes into dimension buckets and normalizes, so equal
/// texts embed identically and different texts land measurably apart. No
/// model download, no network.
#[cfg(test)]
pub struct MockEmbeddingProvider {
    dimension: VectorDimension,
}

#[cfg(test)]
impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self {
            dimension: VectorDimension::new(8).expect("non-zero"),
        }
    }

    pub fn with_dimension(dimension: VectorDimension) -> Self {
        Self { dimension }
    }
}

#[cfg(test)]
impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> CapabilityResult<Vec<Vec<f32>>> {
        let width = self.dimension.get();
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; width];
                for (offset, byte) in text.bytes().enumerate() {
                    vector[(byte as usize + offset) % width] += 1.0;
                }
                normalize_in_place(&mut vector);
                vector
            })
            .collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_embeddings_are_deterministic_and_normalized() {
        let provider = MockEmbeddingProvider::new();

        let a = provider.embed("retrieval engine").unwrap();
        let b = provider.embed("retrieval engine").unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn single_and_batch_embedding_agree() {
        let provider = MockEmbeddingProvider::new();

        let single = provider.embed("alpha").unwrap();
        let batch = provider.embed_batch(&["alpha", "beta"]).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(single, batch[0]);
        assert_ne!(batch[0], batch[1]);
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let provider = MockEmbeddingProvider::new();
        assert!(provider.embed_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn unknown_model_name_is_rejected() {
        let err = resolve_model("word2vec-classic").unwrap_err();
        assert!(matches!(err, CapabilityError::ModelInit(_)));
    }

    #[test]
    fn normalization_leaves_zero_vectors_alone() {
        let mut zeros = vec![0.0f32; 4];
        normalize_in_place(&mut zeros);
        assert_eq!(zeros, vec![0.0; 4]);
    }
}
