//! Flat vector similarity index.
//!
//! Holds vectors of one fixed dimension in positional order and answers exact
//! k-nearest-neighbor queries by Euclidean distance. There is no partitioning
//! and no in-place deletion; callers that need to delete rebuild from scratch.

mod flat;
mod types;

pub use flat::FlatIndex;
pub use types::VectorDimension;
