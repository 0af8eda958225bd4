//! Flat L2 index: exact nearest-neighbor search over contiguous storage.

use crate::error::IndexResult;
use crate::vector::VectorDimension;

/// A flat similarity index over vectors of one fixed dimension.
///
/// Vectors live in a single contiguous buffer with dimension stride, in the
/// order they were appended; a vector's position in that order is its only
/// identity. Search compares the query against every stored vector, ranking
/// by ascending Euclidean distance. With unit-normalized inputs this ordering
/// is monotonic with cosine similarity, but the index itself never normalizes
/// and is agnostic to that convention.
#[derive(Debug)]
pub struct FlatIndex {
    dimension: VectorDimension,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Allocates an empty index for vectors of exactly `dimension` width.
    #[must_use]
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Number of vectors currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension.get()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Appends vectors in the given order.
    ///
    /// Appended vectors occupy positions `len_before..len_before + vectors.len()`.
    /// Every vector is validated before anything is copied, so a dimension
    /// mismatch anywhere in the batch leaves the index unchanged.
    pub fn append(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()> {
        for vector in vectors {
            self.dimension.validate_vector(vector)?;
        }
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Returns up to `k` positions ranked by ascending Euclidean distance to
    /// `query`, ties broken by lower position.
    ///
    /// `k` is clamped to the current size; searching an empty index returns an
    /// empty sequence.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<usize>> {
        self.dimension.validate_vector(query)?;
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension.get())
            .enumerate()
            .map(|(position, vector)| (position, squared_l2_distance(query, vector)))
            .collect();

        // total_cmp keeps the ordering well-defined even for degenerate
        // (NaN-bearing) inputs; position breaks exact ties.
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(k);

        Ok(ranked.into_iter().map(|(position, _)| position).collect())
    }
}

/// Squared Euclidean distance. Monotonic with true L2 distance, so the square
/// root is never needed for ranking.
fn squared_l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
