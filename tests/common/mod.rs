//! Shared test support: a deterministic embedding provider.

use docqa::embedding::EmbeddingProvider;
use docqa::error::CapabilityResult;
use docqa::vector::VectorDimension;

/// Deterministic embedding provider: hashes bytes into buckets and
/// normalizes. Equal texts embed identically; different texts land apart.
pub struct HashingProvider {
    dimension: VectorDimension,
}

impl HashingProvider {
    pub fn new() -> Self {
        Self {
            dimension: VectorDimension::new(16).expect("non-zero"),
        }
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingProvider for HashingProvider {
    fn embed_batch(&self, texts: &[&str]) -> CapabilityResult<Vec<Vec<f32>>> {
        let width = self.dimension.get();
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; width];
                for (offset, byte) in text.bytes().enumerate() {
                    vector[(byte as usize + offset) % width] += 1.0;
                }
                let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for value in &mut vector {
                        *value /= norm;
                    }
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }
}
