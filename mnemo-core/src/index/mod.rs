//! Category-scoped nearest-neighbour search over text.
//!
//! [`VectorIndex`] owns one [`CategoryIndex`] per [`MemoryKind`]: the ordered
//! list of texts and the similarity structure built over their embeddings.
//! Position `i` in the text list is always vector `i` in the structure.
//!
//! ## Locking
//!
//! Each category sits behind its own `RwLock`. Searches take a read lock and
//! may run concurrently; create, update and rebuild hold the write lock for
//! the whole structural change, embedding included. A failed build leaves
//! the previous pair untouched.
//!
//! ## Structure selection
//!
//! [`select_structure`] is a pure function of the configured kind and the
//! corpus size. Corpora below `ann_threshold` always use [`FlatIndex`].

pub mod flat;
pub mod hnsw;
pub mod ivf;
pub mod kmeans;
pub mod metric;
pub mod pq;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::IndexConfig;
use crate::embedding::{CachedEmbeddingProvider, EmbeddingProvider};
use crate::error::{MnemoError, Result};
use crate::memory::MemoryKind;
use crate::metrics::{MnemoCounters, spans};
use crate::retrieval::relevance::RelevanceMethod;

pub use flat::FlatIndex;
pub use hnsw::{HnswIndex, HnswParams};
pub use ivf::{IvfIndex, IvfParams};
pub use metric::DistanceMetric;
pub use pq::{IvfPqIndex, PqParams, ProductQuantizer};

// ---------------------------------------------------------------------------
// Index kinds and selection
// ---------------------------------------------------------------------------

/// Similarity structure families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Exact linear scan.
    #[default]
    Flat,
    /// Inverted file over a trained coarse quantizer.
    Ivf,
    /// Inverted file with product-quantized vectors.
    IvfPq,
    /// Hierarchical proximity graph.
    Hnsw,
}

impl IndexKind {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Ivf => "ivf",
            Self::IvfPq => "ivf_pq",
            Self::Hnsw => "hnsw",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = MnemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "ivf" => Ok(Self::Ivf),
            "ivf_pq" | "ivfpq" => Ok(Self::IvfPq),
            "hnsw" => Ok(Self::Hnsw),
            other => Err(MnemoError::Config(format!("unknown index kind '{other}'"))),
        }
    }
}

/// Structure used for a corpus of `n` vectors when `preferred` is configured.
///
/// | configured | n < ann_threshold | ann ≤ n < pq_threshold | n ≥ pq_threshold |
/// |------------|-------------------|------------------------|------------------|
/// | flat       | flat              | flat                   | flat             |
/// | ivf        | flat              | ivf                    | ivf              |
/// | ivf_pq     | flat              | flat                   | ivf_pq           |
/// | hnsw       | flat              | hnsw                   | hnsw             |
#[must_use]
pub fn select_structure(preferred: IndexKind, n: usize, config: &IndexConfig) -> IndexKind {
    if n < config.ann_threshold {
        return IndexKind::Flat;
    }
    match preferred {
        IndexKind::IvfPq if n < config.pq_threshold => IndexKind::Flat,
        other => other,
    }
}

/// Index settings that a snapshot must reproduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Configured structure.
    pub index_kind: IndexKind,
    /// Distance metric.
    pub metric: DistanceMetric,
}

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// A built similarity structure.
#[derive(Debug)]
pub enum Structure {
    /// Exact scan.
    Flat(FlatIndex),
    /// Inverted file.
    Ivf(IvfIndex),
    /// Compressed inverted file.
    IvfPq(IvfPqIndex),
    /// Proximity graph.
    Hnsw(HnswIndex),
}

impl Structure {
    fn build(kind: IndexKind, vectors: Vec<Vec<f32>>, config: &IndexConfig) -> Self {
        let n = vectors.len();
        let ivf_params = || {
            IvfParams::for_corpus(
                n,
                config.min_clusters,
                config.max_probes,
                config.kmeans_iterations,
                config.seed,
                config.retrain_growth_factor,
            )
        };
        match kind {
            IndexKind::Flat => Self::Flat(FlatIndex::new(config.metric, vectors)),
            IndexKind::Ivf => Self::Ivf(IvfIndex::train(config.metric, ivf_params(), vectors)),
            IndexKind::IvfPq => Self::IvfPq(IvfPqIndex::train(
                config.metric,
                ivf_params(),
                PqParams {
                    subquantizers: config.pq_subquantizers,
                    bits: config.pq_bits,
                },
                &vectors,
            )),
            IndexKind::Hnsw => Self::Hnsw(HnswIndex::build(
                config.metric,
                HnswParams {
                    ef_construction: config.hnsw_ef_construction,
                    ef_search: config.hnsw_ef_search,
                    rebuild_fraction: config.hnsw_rebuild_fraction,
                    seed: config.seed,
                },
                vectors,
            )),
        }
    }

    /// Family of this structure.
    #[must_use]
    pub fn kind(&self) -> IndexKind {
        match self {
            Self::Flat(_) => IndexKind::Flat,
            Self::Ivf(_) => IndexKind::Ivf,
            Self::IvfPq(_) => IndexKind::IvfPq,
            Self::Hnsw(_) => IndexKind::Hnsw,
        }
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(s) => s.len(),
            Self::Ivf(s) => s.len(),
            Self::IvfPq(s) => s.len(),
            Self::Hnsw(s) => s.len(),
        }
    }

    /// Whether no vectors are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add(&mut self, vectors: Vec<Vec<f32>>) {
        match self {
            Self::Flat(s) => s.add(vectors),
            Self::Ivf(s) => s.add(vectors),
            Self::IvfPq(s) => s.add(&vectors),
            Self::Hnsw(s) => s.add(vectors),
        }
    }

    /// Whether the owner must rebuild from source texts.
    fn needs_rebuild(&self) -> bool {
        match self {
            Self::IvfPq(s) => s.needs_retrain(),
            Self::Flat(_) | Self::Ivf(_) | Self::Hnsw(_) => false,
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        match self {
            Self::Flat(s) => s.search(query, k),
            Self::Ivf(s) => s.search(query, k),
            Self::IvfPq(s) => s.search(query, k),
            Self::Hnsw(s) => s.search(query, k),
        }
    }
}

/// Texts of one category paired with the structure over their embeddings.
#[derive(Debug)]
pub struct CategoryIndex {
    texts: Vec<String>,
    structure: Structure,
    dims: usize,
}

impl CategoryIndex {
    /// Indexed texts in insertion order.
    #[must_use]
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// The structure answering searches.
    #[must_use]
    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    /// Embedding dimensionality.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }
}

/// One nearest-neighbour result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Position of the text within its category.
    pub position: usize,
    /// The matched text.
    pub text: String,
    /// Raw distance under the configured metric.
    pub distance: f32,
    /// Relevance derived from `distance`.
    pub relevance: f32,
}

// ---------------------------------------------------------------------------
// VectorIndex
// ---------------------------------------------------------------------------

type Slot = Arc<RwLock<Option<CategoryIndex>>>;

/// Per-category embedding indexes sharing one provider.
pub struct VectorIndex {
    provider: Arc<dyn EmbeddingProvider>,
    config: IndexConfig,
    categories: RwLock<HashMap<MemoryKind, Slot>>,
    counters: Arc<MnemoCounters>,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("model", &self.provider.model_name())
            .field("index_kind", &self.config.index_kind)
            .field("metric", &self.config.metric)
            .field("categories", &self.categories())
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Create an empty index. The provider is wrapped in an LRU cache unless
    /// `config.embedding_cache_size` is zero.
    #[must_use]
    pub fn new(config: IndexConfig, provider: Arc<dyn EmbeddingProvider>, counters: Arc<MnemoCounters>) -> Self {
        let provider: Arc<dyn EmbeddingProvider> = if config.embedding_cache_size > 0 {
            Arc::new(CachedEmbeddingProvider::new(provider, config.embedding_cache_size))
        } else {
            provider
        };
        Self {
            provider,
            config,
            categories: RwLock::new(HashMap::new()),
            counters,
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// The embedding provider (after caching).
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Settings a snapshot records.
    #[must_use]
    pub fn settings(&self) -> IndexSettings {
        IndexSettings {
            embedding_model: self.provider.model_name().to_string(),
            index_kind: self.config.index_kind,
            metric: self.config.metric,
        }
    }

    fn slot(&self, kind: MemoryKind) -> Slot {
        if let Some(slot) = self.categories.read().get(&kind) {
            return Arc::clone(slot);
        }
        Arc::clone(self.categories.write().entry(kind).or_default())
    }

    fn existing_slot(&self, kind: MemoryKind) -> Option<Slot> {
        self.categories.read().get(&kind).map(Arc::clone)
    }

    /// Embed `texts` and bring the vectors into the form the metric expects.
    fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self.provider.embed_batch(&refs)?;
        MnemoCounters::add(&self.counters.texts_embedded, texts.len() as u64);
        if embeddings.len() != texts.len() {
            return Err(MnemoError::Embedding(format!(
                "provider returned {} vectors for {} texts",
                embeddings.len(),
                texts.len()
            )));
        }
        let expected = embeddings.first().map_or(0, |e| e.dimensions());
        embeddings
            .into_iter()
            .map(|mut e| {
                if e.dimensions() != expected {
                    return Err(MnemoError::DimensionMismatch {
                        expected,
                        got: e.dimensions(),
                    });
                }
                self.config.metric.prepare(&mut e);
                Ok(e.0)
            })
            .collect()
    }

    fn build_category(&self, kind: MemoryKind, texts: Vec<String>) -> Result<CategoryIndex> {
        let span = tracing::debug_span!(spans::INDEX_BUILD, category = %kind, items = texts.len());
        let _guard = span.enter();
        let start = Instant::now();

        let vectors = self.embed_all(&texts)?;
        let dims = vectors.first().map_or(0, Vec::len);
        let structure_kind = select_structure(self.config.index_kind, texts.len(), &self.config);
        let structure = Structure::build(structure_kind, vectors, &self.config);
        MnemoCounters::incr(&self.counters.indexes_built);

        tracing::info!(
            category = %kind,
            items = texts.len(),
            structure = %structure_kind,
            metric = %self.config.metric,
            elapsed_us = start.elapsed().as_micros() as u64,
            "index built"
        );
        Ok(CategoryIndex { texts, structure, dims })
    }

    /// Build a category from `texts`, replacing any previous index.
    ///
    /// Empty input is logged and ignored.
    ///
    /// # Errors
    /// Propagates embedding failures; the previous index is kept on error.
    pub fn create_index(&self, kind: MemoryKind, texts: &[String]) -> Result<()> {
        if texts.is_empty() {
            tracing::warn!(category = %kind, "create_index called with no texts, ignoring");
            return Ok(());
        }
        let slot = self.slot(kind);
        let mut guard = slot.write();
        let built = self.build_category(kind, texts.to_vec())?;
        *guard = Some(built);
        Ok(())
    }

    /// Append `new_texts` to a category, creating it if absent.
    ///
    /// Flat, inverted-file and graph structures absorb the new vectors in
    /// place. The category is rebuilt from all its texts when the corpus size
    /// crosses into a different structure, or when a compressed structure has
    /// outgrown its trained quantizers.
    ///
    /// # Errors
    /// Propagates embedding failures and dimension mismatches; the category
    /// is unchanged on error.
    pub fn update_index(&self, kind: MemoryKind, new_texts: &[String]) -> Result<()> {
        if new_texts.is_empty() {
            return Ok(());
        }
        let slot = self.slot(kind);
        let mut guard = slot.write();
        let Some(category) = guard.as_mut() else {
            let built = self.build_category(kind, new_texts.to_vec())?;
            *guard = Some(built);
            return Ok(());
        };

        let span = tracing::debug_span!(spans::INDEX_UPDATE, category = %kind, added = new_texts.len());
        let _enter = span.enter();

        let vectors = self.embed_all(new_texts)?;
        if let Some(got) = vectors.first().map(Vec::len).filter(|d| *d != category.dims) {
            return Err(MnemoError::DimensionMismatch {
                expected: category.dims,
                got,
            });
        }

        let new_len = category.texts.len() + new_texts.len();
        let wanted = select_structure(self.config.index_kind, new_len, &self.config);
        if wanted != category.structure.kind() || category.structure.needs_rebuild() {
            let mut all = category.texts.clone();
            all.extend_from_slice(new_texts);
            let rebuilt = self.build_category(kind, all)?;
            *guard = Some(rebuilt);
            return Ok(());
        }

        category.structure.add(vectors);
        category.texts.extend_from_slice(new_texts);
        tracing::debug!(category = %kind, items = new_len, "index extended");
        Ok(())
    }

    /// Replace a category wholesale with `texts`.
    ///
    /// Empty `texts` drops the category.
    ///
    /// # Errors
    /// Propagates embedding failures; the previous index is kept on error.
    pub fn rebuild_index(&self, kind: MemoryKind, texts: &[String]) -> Result<()> {
        let slot = self.slot(kind);
        let mut guard = slot.write();
        if texts.is_empty() {
            *guard = None;
            tracing::debug!(category = %kind, "index dropped on empty rebuild");
            return Ok(());
        }
        let built = self.build_category(kind, texts.to_vec())?;
        *guard = Some(built);
        Ok(())
    }

    /// Up to `k` texts closest to `query` with relevance at least `min_relevance`,
    /// most relevant first. Unknown or empty categories yield no hits.
    ///
    /// # Errors
    /// Propagates query embedding failures and dimension mismatches.
    pub fn search(
        &self,
        kind: MemoryKind,
        query: &str,
        k: usize,
        method: RelevanceMethod,
        min_relevance: f32,
    ) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let Some(slot) = self.existing_slot(kind) else {
            return Ok(Vec::new());
        };
        let guard = slot.read();
        let Some(category) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let span = tracing::debug_span!(spans::INDEX_SEARCH, category = %kind, k);
        let _enter = span.enter();

        let mut q = self.provider.embed(query)?;
        MnemoCounters::incr(&self.counters.texts_embedded);
        if q.dimensions() != category.dims {
            return Err(MnemoError::DimensionMismatch {
                expected: category.dims,
                got: q.dimensions(),
            });
        }
        self.config.metric.prepare(&mut q);
        MnemoCounters::incr(&self.counters.searches);

        let hits: Vec<SearchHit> = category
            .structure
            .search(&q.0, k)
            .into_iter()
            .filter_map(|(position, distance)| {
                let relevance = method.score(distance);
                if relevance < min_relevance {
                    return None;
                }
                let text = category.texts.get(position)?.clone();
                Some(SearchHit {
                    position,
                    text,
                    distance,
                    relevance,
                })
            })
            .collect();
        tracing::debug!(category = %kind, hits = hits.len(), "search complete");
        Ok(hits)
    }

    /// Number of indexed texts in a category.
    #[must_use]
    pub fn len(&self, kind: MemoryKind) -> usize {
        self.existing_slot(kind)
            .and_then(|slot| {
                let guard = slot.read();
                guard.as_ref().map(|c| c.texts.len())
            })
            .unwrap_or(0)
    }

    /// Whether a category has any indexed text.
    #[must_use]
    pub fn contains(&self, kind: MemoryKind) -> bool {
        self.len(kind) > 0
    }

    /// Copy of a category's texts in index order.
    #[must_use]
    pub fn texts(&self, kind: MemoryKind) -> Vec<String> {
        self.existing_slot(kind)
            .and_then(|slot| {
                let guard = slot.read();
                guard.as_ref().map(|c| c.texts.clone())
            })
            .unwrap_or_default()
    }

    /// Structure currently answering a category's searches.
    #[must_use]
    pub fn structure_kind(&self, kind: MemoryKind) -> Option<IndexKind> {
        self.existing_slot(kind)
            .and_then(|slot| {
                let guard = slot.read();
                guard.as_ref().map(|c| c.structure.kind())
            })
    }

    /// Drop a category's index.
    pub fn remove(&self, kind: MemoryKind) {
        if let Some(slot) = self.existing_slot(kind) {
            *slot.write() = None;
        }
    }

    /// Drop every category.
    pub fn clear(&self) {
        self.categories.write().clear();
    }

    /// Categories that currently hold texts, in [`MemoryKind`] order.
    #[must_use]
    pub fn categories(&self) -> Vec<MemoryKind> {
        let mut kinds: Vec<MemoryKind> = self
            .categories
            .read()
            .iter()
            .filter(|(_, slot)| slot.read().is_some())
            .map(|(kind, _)| *kind)
            .collect();
        kinds.sort();
        kinds
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{HashingEmbeddingProvider, StubEmbeddingProvider};
    use crate::types::Embedding;

    fn index_with(config: IndexConfig) -> VectorIndex {
        VectorIndex::new(
            config,
            Arc::new(HashingEmbeddingProvider::new(256)),
            Arc::new(MnemoCounters::new()),
        )
    }

    fn index() -> VectorIndex {
        index_with(IndexConfig::default())
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    /// Emits a vector whose length depends on the text, to provoke mismatches.
    struct Ragged;

    impl EmbeddingProvider for Ragged {
        fn embed(&self, text: &str) -> Result<Embedding> {
            Ok(Embedding(vec![1.0; text.len().max(1)]))
        }
        fn dimensions(&self) -> usize {
            0
        }
        fn model_name(&self) -> &str {
            "ragged"
        }
    }

    #[test]
    fn selection_policy_table() {
        let cfg = IndexConfig::default();
        assert_eq!(select_structure(IndexKind::Hnsw, 999, &cfg), IndexKind::Flat);
        assert_eq!(select_structure(IndexKind::Hnsw, 1000, &cfg), IndexKind::Hnsw);
        assert_eq!(select_structure(IndexKind::Ivf, 1000, &cfg), IndexKind::Ivf);
        assert_eq!(select_structure(IndexKind::IvfPq, 1000, &cfg), IndexKind::Flat);
        assert_eq!(select_structure(IndexKind::IvfPq, 5000, &cfg), IndexKind::IvfPq);
        assert_eq!(select_structure(IndexKind::Flat, 100_000, &cfg), IndexKind::Flat);
    }

    #[test]
    fn index_kind_names_round_trip() {
        for kind in [IndexKind::Flat, IndexKind::Ivf, IndexKind::IvfPq, IndexKind::Hnsw] {
            assert_eq!(kind.as_str().parse::<IndexKind>().ok(), Some(kind));
        }
        assert!("annoy".parse::<IndexKind>().is_err());
    }

    #[test]
    fn create_with_empty_texts_is_noop() {
        let index = index();
        index.create_index(MemoryKind::Facts, &[]).expect("no-op");
        assert!(!index.contains(MemoryKind::Facts));
        assert!(index.categories().is_empty());
    }

    #[test]
    fn search_unknown_category_is_empty() {
        let index = index();
        let hits = index
            .search(MemoryKind::Traits, "anything", 3, RelevanceMethod::Sigmoid, 0.0)
            .expect("search");
        assert!(hits.is_empty());
    }

    #[test]
    fn search_finds_matching_text_first() {
        let index = index();
        index
            .create_index(
                MemoryKind::Facts,
                &texts(&["I live in a lighthouse", "My cat is named Pepper", "I bake bread daily"]),
            )
            .expect("create");
        let hits = index
            .search(MemoryKind::Facts, "what is your cat called", 2, RelevanceMethod::Inverse, 0.0)
            .expect("search");
        assert_eq!(hits[0].text, "My cat is named Pepper");
        assert_eq!(hits[0].position, 1);
        assert!(hits.windows(2).all(|w| w[0].relevance >= w[1].relevance));
    }

    #[test]
    fn min_relevance_filters_hits() {
        let index = index();
        index
            .create_index(MemoryKind::Facts, &texts(&["alpha beta", "gamma delta"]))
            .expect("create");
        let hits = index
            .search(MemoryKind::Facts, "alpha beta", 5, RelevanceMethod::Sigmoid, 0.9)
            .expect("search");
        assert_eq!(hits.len(), 1);
        assert!(hits.iter().all(|h| h.relevance >= 0.9));
    }

    #[test]
    fn update_creates_then_appends() {
        let index = index();
        index.update_index(MemoryKind::Traits, &texts(&["curious"])).expect("create");
        index.update_index(MemoryKind::Traits, &texts(&["stubborn", "kind"])).expect("append");
        assert_eq!(index.texts(MemoryKind::Traits), texts(&["curious", "stubborn", "kind"]));
        let hits = index
            .search(MemoryKind::Traits, "kind", 1, RelevanceMethod::Exponential, 0.0)
            .expect("search");
        assert_eq!(hits[0].position, 2);
    }

    #[test]
    fn rebuild_replaces_and_empty_rebuild_drops() {
        let index = index();
        index.create_index(MemoryKind::Episodic, &texts(&["a", "b", "c"])).expect("create");
        index.rebuild_index(MemoryKind::Episodic, &texts(&["c"])).expect("rebuild");
        assert_eq!(index.texts(MemoryKind::Episodic), texts(&["c"]));
        index.rebuild_index(MemoryKind::Episodic, &[]).expect("drop");
        assert!(!index.contains(MemoryKind::Episodic));
    }

    #[test]
    fn failed_build_keeps_previous_pair() {
        let index = VectorIndex::new(
            IndexConfig {
                embedding_cache_size: 0,
                ..IndexConfig::default()
            },
            Arc::new(Ragged),
            Arc::new(MnemoCounters::new()),
        );
        index.create_index(MemoryKind::Facts, &texts(&["abc", "def"])).expect("create");
        let err = index.rebuild_index(MemoryKind::Facts, &texts(&["x", "longer"]));
        assert!(matches!(err, Err(MnemoError::DimensionMismatch { .. })));
        assert_eq!(index.texts(MemoryKind::Facts), texts(&["abc", "def"]));

        let err = index.update_index(MemoryKind::Facts, &texts(&["toolong"]));
        assert!(matches!(err, Err(MnemoError::DimensionMismatch { expected: 3, got: 7 })));
        assert_eq!(index.len(MemoryKind::Facts), 2);
    }

    #[test]
    fn zero_vectors_are_searchable() {
        let index = VectorIndex::new(
            IndexConfig::default(),
            Arc::new(StubEmbeddingProvider::new(8)),
            Arc::new(MnemoCounters::new()),
        );
        index.create_index(MemoryKind::Facts, &texts(&["x", "y"])).expect("create");
        let hits = index
            .search(MemoryKind::Facts, "z", 5, RelevanceMethod::Sigmoid, 0.0)
            .expect("search");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| (h.distance - 1.0).abs() < 1e-6));
    }

    #[test]
    fn crossing_threshold_switches_structure() {
        let config = IndexConfig {
            index_kind: IndexKind::Hnsw,
            ann_threshold: 20,
            ..IndexConfig::default()
        };
        let index = index_with(config);
        let first: Vec<String> = (0..19).map(|i| format!("memory number {i}")).collect();
        index.create_index(MemoryKind::Episodic, &first).expect("create");
        assert_eq!(index.structure_kind(MemoryKind::Episodic), Some(IndexKind::Flat));
        index
            .update_index(MemoryKind::Episodic, &texts(&["memory number 19"]))
            .expect("update");
        assert_eq!(index.structure_kind(MemoryKind::Episodic), Some(IndexKind::Hnsw));
        assert_eq!(index.len(MemoryKind::Episodic), 20);
        let hits = index
            .search(MemoryKind::Episodic, "memory number 19", 1, RelevanceMethod::Inverse, 0.0)
            .expect("search");
        assert_eq!(hits[0].position, 19);
    }

    #[test]
    fn counters_track_activity() {
        let counters = Arc::new(MnemoCounters::new());
        let index = VectorIndex::new(
            IndexConfig::default(),
            Arc::new(HashingEmbeddingProvider::new(16)),
            Arc::clone(&counters),
        );
        index.create_index(MemoryKind::Facts, &texts(&["one", "two"])).expect("create");
        index
            .search(MemoryKind::Facts, "one", 1, RelevanceMethod::Inverse, 0.0)
            .expect("search");
        let snap = counters.snapshot();
        assert_eq!(snap.indexes_built, 1);
        assert_eq!(snap.searches, 1);
        assert_eq!(snap.texts_embedded, 3);
    }

    #[test]
    fn settings_report_model_and_structure() {
        let index = index();
        let settings = index.settings();
        assert_eq!(settings.embedding_model, "hashing-bow-256");
        assert_eq!(settings.index_kind, IndexKind::Flat);
        assert_eq!(settings.metric, DistanceMetric::Cosine);
    }
}
