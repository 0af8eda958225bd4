//! Collection store: named chunk sequences kept in lock-step with flat
//! vector indexes.
//!
//! The central invariant: position `i` in a collection's chunk sequence
//! always corresponds to the `i`-th vector in its index. Every mutating
//! operation here either upholds that alignment or leaves the collection in
//! its prior consistent state; embedding failures never publish a partial
//! append or a half-rebuilt index.
//!
//! The store is single-threaded per collection by contract; the serving layer
//! serializes access. Distinct stores (and the collections inside one store,
//! from the caller's perspective) share nothing.

use crate::chunking::Chunk;
use crate::embedding::EmbeddingProvider;
use crate::error::{IndexError, IndexResult};
use crate::vector::FlatIndex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A named grouping of chunks and their search index.
///
/// `index` is absent until the first non-empty batch of chunks arrives, and
/// becomes absent again when the last chunk is removed.
struct Collection {
    chunks: Vec<Chunk>,
    index: Option<FlatIndex>,
}

impl Collection {
    fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            index: None,
        }
    }
}

/// Counts returned by [`CollectionStore::clear_all`], computed before
/// anything is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearStats {
    pub collections: usize,
    pub chunks: usize,
}

/// Owns every collection and the embedding capability used to index them.
///
/// Collections are created explicitly on first write; read paths treat
/// unknown names as empty and never create anything.
pub struct CollectionStore {
    collections: HashMap<String, Collection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl CollectionStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            collections: HashMap::new(),
            embedder,
        }
    }

    fn get_or_create(&mut self, name: &str) -> &mut Collection {
        self.collections
            .entry(name.to_string())
            .or_insert_with(Collection::empty)
    }

    /// Embeds `chunks` in one batch and appends them, in order, to the named
    /// collection. Creates the collection (and its index, at the embedder's
    /// dimension) lazily. An empty batch is a no-op.
    pub fn add_chunks(&mut self, name: &str, chunks: Vec<Chunk>) -> IndexResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        let dimension = self.embedder.dimension();

        // Every failure must happen before get_or_create runs, so a failed
        // add never publishes a collection that did not exist before.
        for vector in &vectors {
            dimension.validate_vector(vector)?;
        }
        if let Some(existing) = self.collections.get(name) {
            if let Some(index) = &existing.index {
                if index.dimension() != dimension {
                    return Err(IndexError::DimensionMismatch {
                        expected: index.dimension().get(),
                        actual: dimension.get(),
                    });
                }
            }
        }

        let added = texts.len();
        let collection = self.get_or_create(name);
        let index = collection.index.get_or_insert_with(|| FlatIndex::new(dimension));
        index.append(&vectors)?;
        collection.chunks.extend(chunks);

        debug!(
            collection = name,
            added,
            total = collection.chunks.len(),
            "added chunks"
        );
        Ok(())
    }

    /// Returns up to `k` chunks ranked nearest-first against `query`.
    ///
    /// An absent or empty collection yields an empty result, not an error.
    /// Duplicate sources across results are expected.
    pub fn search(&self, name: &str, query: &str, k: usize) -> IndexResult<Vec<Chunk>> {
        let Some(collection) = self.collections.get(name) else {
            return Ok(Vec::new());
        };
        let Some(index) = collection.index.as_ref() else {
            return Ok(Vec::new());
        };
        if collection.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query)?;
        let k = k.min(collection.chunks.len());
        let positions = index.search(&query_vector, k)?;

        // Positions map straight into the chunk sequence; that is the
        // alignment invariant at work.
        Ok(positions
            .into_iter()
            .map(|position| collection.chunks[position].clone())
            .collect())
    }

    /// Discards the named collection entirely. Idempotent: clearing an
    /// unknown name is a no-op.
    pub fn clear(&mut self, name: &str) -> bool {
        let existed = self.collections.remove(name).is_some();
        if existed {
            info!(collection = name, "cleared collection");
        }
        existed
    }

    /// Discards every collection, reporting how much was dropped.
    pub fn clear_all(&mut self) -> ClearStats {
        let stats = ClearStats {
            collections: self.collections.len(),
            chunks: self.collections.values().map(|c| c.chunks.len()).sum(),
        };
        self.collections.clear();
        info!(
            collections = stats.collections,
            chunks = stats.chunks,
            "cleared all collections"
        );
        stats
    }

    /// Removes every chunk attributed to `source` from the named collection,
    /// returning how many were dropped.
    ///
    /// The flat index has no native deletion, so a partial removal rebuilds
    /// the index from scratch: all surviving chunk texts are re-embedded in
    /// one batch and a fresh index replaces the old one. O(n) re-embedding
    /// per delete is the accepted cost of that trade; an incremental-delete
    /// index is a future optimization. Nothing is committed until the
    /// re-embed and rebuild have both succeeded.
    pub fn remove_source(&mut self, name: &str, source: &str) -> IndexResult<usize> {
        let embedder = Arc::clone(&self.embedder);
        let Some(collection) = self.collections.get_mut(name) else {
            return Ok(0);
        };

        let retained: Vec<Chunk> = collection
            .chunks
            .iter()
            .filter(|chunk| chunk.source != source)
            .cloned()
            .collect();
        let removed = collection.chunks.len() - retained.len();
        if removed == 0 {
            return Ok(0);
        }

        if retained.is_empty() {
            collection.chunks.clear();
            collection.index = None;
            info!(collection = name, source, removed, "removed last source");
            return Ok(removed);
        }

        let texts: Vec<&str> = retained.iter().map(|c| c.text.as_str()).collect();
        let vectors = embedder.embed_batch(&texts)?;
        let mut index = FlatIndex::new(embedder.dimension());
        index.append(&vectors)?;

        collection.chunks = retained;
        collection.index = Some(index);
        info!(
            collection = name,
            source,
            removed,
            remaining = collection.chunks.len(),
            "removed source and rebuilt index"
        );
        Ok(removed)
    }

    /// Applies [`Self::remove_source`] to every existing collection and sums
    /// the results. Never creates collections.
    pub fn remove_source_everywhere(&mut self, source: &str) -> IndexResult<usize> {
        let names: Vec<String> = self.collections.keys().cloned().collect();
        let mut total = 0;
        for name in names {
            total += self.remove_source(&name, source)?;
        }
        Ok(total)
    }

    /// Names of all existing collections, sorted for stable output.
    pub fn list_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Chunk count of the named collection; absent collections count as zero.
    pub fn collection_len(&self, name: &str) -> usize {
        self.collections.get(name).map_or(0, |c| c.chunks.len())
    }

    /// Asserts the alignment invariant for every collection.
    #[cfg(test)]
    fn assert_aligned(&self) {
        for (name, collection) in &self.collections {
            let index_len = collection.index.as_ref().map_or(0, FlatIndex::len);
            assert_eq!(
                index_len,
                collection.chunks.len(),
                "collection '{name}' out of alignment"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::error::{CapabilityError, CapabilityResult};
    use crate::vector::VectorDimension;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunk(text: &str, source: &str, position: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            source: source.to_string(),
            position,
        }
    }

    fn store() -> CollectionStore {
        CollectionStore::new(Arc::new(MockEmbeddingProvider::new()))
    }

    /// Fails every embed call after the first `allow` batches; used to prove
    /// mutations are atomic under capability failure.
    struct FlakyProvider {
        calls: AtomicUsize,
        allow: usize,
        inner: MockEmbeddingProvider,
    }

    impl FlakyProvider {
        fn new(allow: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                allow,
                inner: MockEmbeddingProvider::new(),
            }
        }
    }

    impl EmbeddingProvider for FlakyProvider {
        fn embed_batch(&self, texts: &[&str]) -> CapabilityResult<Vec<Vec<f32>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.allow {
                return Err(CapabilityError::Embedding("simulated outage".to_string()));
            }
            self.inner.embed_batch(texts)
        }

        fn dimension(&self) -> VectorDimension {
            self.inner.dimension()
        }
    }

    #[test]
    fn add_and_search_returns_ranked_chunks() {
        let mut store = store();
        store
            .add_chunks(
                "docs",
                vec![
                    chunk("the quick brown fox", "a.txt", 0),
                    chunk("an entirely different topic", "a.txt", 1),
                ],
            )
            .unwrap();
        store.assert_aligned();

        let results = store.search("docs", "the quick brown fox", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "the quick brown fox");
    }

    #[test]
    fn empty_batch_is_a_noop_and_creates_nothing() {
        let mut store = store();
        store.add_chunks("docs", Vec::new()).unwrap();
        assert!(!store.contains("docs"));
    }

    #[test]
    fn search_on_absent_collection_is_empty_and_creates_nothing() {
        let store = store();
        assert!(store.search("ghost", "anything", 5).unwrap().is_empty());
        assert!(store.list_collections().is_empty());
    }

    #[test]
    fn search_clamps_k_to_chunk_count() {
        let mut store = store();
        store
            .add_chunks(
                "docs",
                vec![chunk("one", "a.txt", 0), chunk("two", "a.txt", 1)],
            )
            .unwrap();

        let results = store.search("docs", "one", 100).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn incremental_adds_stay_aligned() {
        let mut store = store();
        store
            .add_chunks("docs", vec![chunk("first", "a.txt", 0)])
            .unwrap();
        store
            .add_chunks("docs", vec![chunk("second", "b.txt", 0)])
            .unwrap();
        store.assert_aligned();
        assert_eq!(store.collection_len("docs"), 2);
    }

    #[test]
    fn remove_source_drops_only_matching_chunks() {
        let mut store = store();
        store
            .add_chunks(
                "docs",
                vec![
                    chunk("alice one", "alice.pdf", 0),
                    chunk("bob only chunk", "bob.pdf", 0),
                    chunk("alice two", "alice.pdf", 1),
                ],
            )
            .unwrap();

        let removed = store.remove_source("docs", "alice.pdf").unwrap();
        assert_eq!(removed, 2);
        store.assert_aligned();

        let results = store.search("docs", "bob only chunk", 3).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "bob.pdf");
    }

    #[test]
    fn removing_last_source_discards_the_index() {
        let mut store = store();
        store
            .add_chunks("docs", vec![chunk("only", "solo.txt", 0)])
            .unwrap();

        let removed = store.remove_source("docs", "solo.txt").unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.collection_len("docs"), 0);
        store.assert_aligned();

        // Collection still exists but behaves as empty.
        assert!(store.contains("docs"));
        assert!(store.search("docs", "only", 1).unwrap().is_empty());
    }

    #[test]
    fn remove_source_with_no_match_is_a_noop() {
        let mut store = store();
        store
            .add_chunks("docs", vec![chunk("keep me", "a.txt", 0)])
            .unwrap();

        assert_eq!(store.remove_source("docs", "missing.txt").unwrap(), 0);
        assert_eq!(store.collection_len("docs"), 1);
        store.assert_aligned();
    }

    #[test]
    fn survivors_keep_relative_ranking_after_removal() {
        let mut store = store();
        store
            .add_chunks(
                "docs",
                vec![
                    chunk("noise noise noise", "drop.txt", 0),
                    chunk("rust retrieval engine", "keep.txt", 0),
                    chunk("completely unrelated words", "keep.txt", 1),
                ],
            )
            .unwrap();

        let before: Vec<String> = store
            .search("docs", "rust retrieval engine", 3)
            .unwrap()
            .into_iter()
            .filter(|c| c.source == "keep.txt")
            .map(|c| c.text)
            .collect();

        store.remove_source("docs", "drop.txt").unwrap();
        let after: Vec<String> = store
            .search("docs", "rust retrieval engine", 3)
            .unwrap()
            .into_iter()
            .map(|c| c.text)
            .collect();

        assert_eq!(before, after);
    }

    #[test]
    fn remove_source_everywhere_sums_across_collections() {
        let mut store = store();
        store
            .add_chunks("east", vec![chunk("shared text", "shared.txt", 0)])
            .unwrap();
        store
            .add_chunks(
                "west",
                vec![
                    chunk("shared again", "shared.txt", 0),
                    chunk("local", "west.txt", 0),
                ],
            )
            .unwrap();

        let total = store.remove_source_everywhere("shared.txt").unwrap();
        assert_eq!(total, 2);
        assert_eq!(store.collection_len("west"), 1);
        store.assert_aligned();
    }

    #[test]
    fn clear_is_idempotent() {
        let mut store = store();
        store
            .add_chunks("docs", vec![chunk("text", "a.txt", 0)])
            .unwrap();

        assert!(store.clear("docs"));
        assert!(store.search("docs", "text", 1).unwrap().is_empty());
        assert!(!store.clear("docs"));
        assert!(store.search("docs", "text", 1).unwrap().is_empty());
    }

    #[test]
    fn clear_all_reports_counts_before_clearing() {
        let mut store = store();
        store
            .add_chunks(
                "a",
                vec![chunk("one", "x.txt", 0), chunk("two", "x.txt", 1)],
            )
            .unwrap();
        store.add_chunks("b", vec![chunk("three", "y.txt", 0)]).unwrap();

        let stats = store.clear_all();
        assert_eq!(
            stats,
            ClearStats {
                collections: 2,
                chunks: 3
            }
        );
        assert!(store.list_collections().is_empty());
    }

    /// Reports one dimension but emits vectors of another, the way a
    /// misconfigured model swap would.
    struct WrongWidthProvider;

    impl EmbeddingProvider for WrongWidthProvider {
        fn embed_batch(&self, texts: &[&str]) -> CapabilityResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0f32; 3]).collect())
        }

        fn dimension(&self) -> VectorDimension {
            VectorDimension::new(8).expect("non-zero")
        }
    }

    #[test]
    fn failed_first_add_publishes_no_collection() {
        let mut store = CollectionStore::new(Arc::new(WrongWidthProvider));

        let err = store.add_chunks("ghost", vec![chunk("never lands", "a.txt", 0)]);
        assert!(matches!(err, Err(IndexError::DimensionMismatch { .. })));

        assert!(!store.contains("ghost"));
        assert!(store.list_collections().is_empty());
        store.assert_aligned();
    }

    #[test]
    fn failed_add_leaves_collection_untouched() {
        let mut store = CollectionStore::new(Arc::new(FlakyProvider::new(1)));
        store
            .add_chunks("docs", vec![chunk("survives", "a.txt", 0)])
            .unwrap();

        let err = store.add_chunks("docs", vec![chunk("never lands", "b.txt", 0)]);
        assert!(err.is_err());

        assert_eq!(store.collection_len("docs"), 1);
        store.assert_aligned();
    }

    #[test]
    fn failed_rebuild_keeps_pre_removal_state() {
        let mut store = CollectionStore::new(Arc::new(FlakyProvider::new(1)));
        store
            .add_chunks(
                "docs",
                vec![
                    chunk("from alice", "alice.txt", 0),
                    chunk("from bob", "bob.txt", 0),
                ],
            )
            .unwrap();

        // The rebuild's re-embed fails; chunks and index must be untouched.
        let err = store.remove_source("docs", "alice.txt");
        assert!(err.is_err());
        assert_eq!(store.collection_len("docs"), 2);
        store.assert_aligned();
    }

    #[test]
    fn list_collections_is_sorted() {
        let mut store = store();
        store.add_chunks("zeta", vec![chunk("z", "z.txt", 0)]).unwrap();
        store.add_chunks("alpha", vec![chunk("a", "a.txt", 0)]).unwrap();

        assert_eq!(store.list_collections(), vec!["alpha", "zeta"]);
    }
}
