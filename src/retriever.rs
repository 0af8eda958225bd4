//! Retrieval facade: the single entry point the serving layer talks to.
//!
//! Composes the segmenter and the collection store; holds no state beyond
//! the chunking parameters.

use crate::chunking::{self, Chunk};
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::IndexResult;
use crate::store::{ClearStats, CollectionStore};
use std::sync::Arc;
use tracing::info;

pub struct RetrievalEngine {
    store: CollectionStore,
    chunk_size: usize,
    overlap: usize,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, chunking: &ChunkingConfig) -> Self {
        Self {
            store: CollectionStore::new(embedder),
            chunk_size: chunking.chunk_size,
            overlap: chunking.overlap,
        }
    }

    /// Segments `raw_text` and indexes the chunks into `collection`,
    /// attributed to `source`. Returns the number of chunks produced.
    pub fn index_document(
        &mut self,
        collection: &str,
        source: &str,
        raw_text: &str,
    ) -> IndexResult<usize> {
        let chunks = chunking::segment(raw_text, source, self.chunk_size, self.overlap);
        let count = chunks.len();
        self.store.add_chunks(collection, chunks)?;
        info!(collection, source, chunks = count, "indexed document");
        Ok(count)
    }

    /// Returns up to `k` chunks ranked nearest-first against `question`,
    /// ready for prompt construction by the caller.
    pub fn answer_context(
        &self,
        collection: &str,
        question: &str,
        k: usize,
    ) -> IndexResult<Vec<Chunk>> {
        self.store.search(collection, question, k)
    }

    pub fn clear(&mut self, collection: &str) -> bool {
        self.store.clear(collection)
    }

    pub fn clear_all(&mut self) -> ClearStats {
        self.store.clear_all()
    }

    pub fn remove_source(&mut self, collection: &str, source: &str) -> IndexResult<usize> {
        self.store.remove_source(collection, source)
    }

    pub fn remove_source_everywhere(&mut self, source: &str) -> IndexResult<usize> {
        self.store.remove_source_everywhere(source)
    }

    pub fn list_collections(&self) -> Vec<String> {
        self.store.list_collections()
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.store.contains(collection)
    }

    pub fn collection_len(&self, collection: &str) -> usize {
        self.store.collection_len(collection)
    }
}
