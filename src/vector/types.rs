//! Type-safe wrapper for vector dimensions.
//!
//! A `VectorDimension` is validated at construction so downstream code can
//! rely on it being non-zero, and every vector entering the index is checked
//! against it before any state changes.

use crate::error::IndexError;

/// Validated width of the vectors held by a [`super::FlatIndex`].
///
/// Set once at index creation from the embedding capability in use; every
/// appended or queried vector must match it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension`.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, IndexError> {
        if dim == 0 {
            return Err(IndexError::InvalidDimension {
                dimension: 0,
                reason: "vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has exactly this width.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.0 {
            return Err(IndexError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for VectorDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
