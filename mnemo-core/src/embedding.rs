//! Text → vector embedding providers.
//!
//! The engine only depends on the [`EmbeddingProvider`] contract. Providers
//! are owned by the caller and injected as `Arc<dyn EmbeddingProvider>`.
//!
//! - [`StubEmbeddingProvider`]: zero vectors, for wiring tests.
//! - [`HashingEmbeddingProvider`]: deterministic feature-hashed bag of words.
//! - [`CachedEmbeddingProvider`]: LRU decorator over any provider.
//! - `FastEmbedProvider` (feature `onnx`): sentence-transformer models via `fastembed`.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::error::{MnemoError, Result};
use crate::types::Embedding;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Generate vector embeddings from text.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string.
    ///
    /// # Errors
    ///
    /// Returns [`MnemoError::Embedding`] if the model fails to produce a vector.
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed a batch of texts, preserving order.
    ///
    /// Default implementation calls `embed` in a loop. Providers with a
    /// native batch API should override this.
    ///
    /// # Errors
    ///
    /// Returns an error if any embedding in the batch fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Model identifier recorded in snapshots.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Stub provider
// ---------------------------------------------------------------------------

/// Returns zero vectors. Every text is equidistant from every other.
#[derive(Debug, Clone)]
pub struct StubEmbeddingProvider {
    dims: usize,
}

impl StubEmbeddingProvider {
    /// Create a new stub provider with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dims: dimensions }
    }
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for StubEmbeddingProvider {
    fn embed(&self, _text: &str) -> Result<Embedding> {
        Ok(Embedding(vec![0.0; self.dims]))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "stub-zero-vector"
    }
}

// ---------------------------------------------------------------------------
// Hashing provider
// ---------------------------------------------------------------------------

/// Deterministic bag-of-words embedding.
///
/// Each lowercase alphanumeric token is hashed (FNV-1a) into one of `dims`
/// buckets with a hash-derived sign, then the vector is L2-normalised. Texts
/// sharing words land close together under cosine distance, which is enough
/// to exercise retrieval without a model download.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dims: usize,
    name: String,
}

impl HashingEmbeddingProvider {
    /// Create a hashing provider producing `dimensions`-long vectors.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        let dims = dimensions.max(1);
        Self {
            dims,
            name: format!("hashing-bow-{dims}"),
        }
    }

    fn fnv1a(bytes: &[u8]) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for b in bytes {
            hash ^= u64::from(*b);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash
    }
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut v = vec![0.0_f32; self.dims];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let h = Self::fnv1a(token.as_bytes());
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (h % self.dims as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        let mut emb = Embedding(v);
        emb.normalize();
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Caching decorator
// ---------------------------------------------------------------------------

/// LRU cache in front of another provider, keyed by the exact text.
///
/// Index rebuilds after eviction re-embed every surviving text; with the
/// cache those are hits.
pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Mutex<LruCache<String, Embedding>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CachedEmbeddingProvider {
    /// Wrap `inner` with a cache of `capacity` entries (at least one).
    #[must_use]
    pub fn new(inner: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// `(hits, misses)` since construction.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    /// Number of cached embeddings.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

impl EmbeddingProvider for CachedEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Embedding> {
        if let Some(hit) = self.cache.lock().get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let emb = self.inner.embed(text)?;
        self.cache.lock().put(text.to_string(), emb.clone());
        Ok(emb)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut out: Vec<Option<Embedding>> = Vec::with_capacity(texts.len());
        let mut missing: Vec<(usize, &str)> = Vec::new();
        {
            let mut cache = self.cache.lock();
            for (i, text) in texts.iter().enumerate() {
                match cache.get(*text) {
                    Some(hit) => out.push(Some(hit.clone())),
                    None => {
                        out.push(None);
                        missing.push((i, *text));
                    }
                }
            }
        }
        self.hits
            .fetch_add((texts.len() - missing.len()) as u64, Ordering::Relaxed);
        self.misses.fetch_add(missing.len() as u64, Ordering::Relaxed);

        if !missing.is_empty() {
            let batch: Vec<&str> = missing.iter().map(|(_, t)| *t).collect();
            let fresh = self.inner.embed_batch(&batch)?;
            if fresh.len() != batch.len() {
                return Err(MnemoError::Embedding(format!(
                    "provider returned {} vectors for {} texts",
                    fresh.len(),
                    batch.len()
                )));
            }
            let mut cache = self.cache.lock();
            for ((i, text), emb) in missing.into_iter().zip(fresh) {
                cache.put(text.to_string(), emb.clone());
                out[i] = Some(emb);
            }
        }

        out.into_iter()
            .map(|e| e.ok_or_else(|| MnemoError::Embedding("missing batch entry".into())))
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

// ---------------------------------------------------------------------------
// ONNX provider
// ---------------------------------------------------------------------------

#[cfg(feature = "onnx")]
pub use onnx::FastEmbedProvider;

#[cfg(feature = "onnx")]
mod onnx {
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::EmbeddingProvider;
    use crate::error::{MnemoError, Result};
    use crate::types::Embedding;

    /// Sentence-transformer embeddings computed locally through ONNX Runtime.
    pub struct FastEmbedProvider {
        model: TextEmbedding,
        name: String,
        dims: usize,
    }

    impl FastEmbedProvider {
        /// Load a model by its identifier, downloading it on first use.
        ///
        /// # Errors
        ///
        /// Returns [`MnemoError::Config`] for unknown identifiers and
        /// [`MnemoError::Embedding`] if the model fails to load.
        pub fn new(model_name: &str) -> Result<Self> {
            let (model, dims) = match model_name {
                "paraphrase-multilingual-MiniLM-L12-v2" => (EmbeddingModel::ParaphraseMLMiniLML12V2, 384),
                "all-MiniLM-L6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
                "all-MiniLM-L12-v2" => (EmbeddingModel::AllMiniLML12V2, 384),
                "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
                "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
                "multilingual-e5-small" => (EmbeddingModel::MultilingualE5Small, 384),
                other => {
                    return Err(MnemoError::Config(format!("unknown embedding model '{other}'")));
                }
            };
            tracing::info!(model = model_name, "loading embedding model");
            let model = TextEmbedding::try_new(InitOptions::new(model))
                .map_err(|e| MnemoError::Embedding(e.to_string()))?;
            Ok(Self {
                model,
                name: model_name.to_string(),
                dims,
            })
        }
    }

    impl EmbeddingProvider for FastEmbedProvider {
        fn embed(&self, text: &str) -> Result<Embedding> {
            self.embed_batch(&[text])?
                .into_iter()
                .next()
                .ok_or_else(|| MnemoError::Embedding("empty embedding result".into()))
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }
            let vectors = self
                .model
                .embed(texts.to_vec(), None)
                .map_err(|e| MnemoError::Embedding(e.to_string()))?;
            Ok(vectors.into_iter().map(Embedding).collect())
        }

        fn dimensions(&self) -> usize {
            self.dims
        }

        fn model_name(&self) -> &str {
            &self.name
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts how many texts reach the wrapped provider.
    struct Counting {
        inner: HashingEmbeddingProvider,
        calls: AtomicU64,
    }

    impl EmbeddingProvider for Counting {
        fn embed(&self, text: &str) -> Result<Embedding> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.inner.embed(text)
        }
        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }
        fn model_name(&self) -> &str {
            self.inner.model_name()
        }
    }

    #[test]
    fn stub_provider_returns_zeros() {
        let provider = StubEmbeddingProvider::new(4);
        let emb = provider.embed("hello").expect("embed");
        assert_eq!(emb.0.len(), 4);
        assert!(emb.0.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn hashing_provider_is_deterministic_and_unit_length() {
        let provider = HashingEmbeddingProvider::new(64);
        let a = provider.embed("The dragon sleeps").expect("embed");
        let b = provider.embed("the DRAGON sleeps!").expect("embed");
        assert_eq!(a, b);
        assert!((a.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hashing_provider_name_matches_vector_length() {
        let provider = HashingEmbeddingProvider::new(0);
        assert_eq!(provider.dimensions(), 1);
        assert_eq!(provider.embed("anything").expect("embed").0.len(), 1);
        assert_eq!(provider.model_name(), "hashing-bow-1");
        assert_eq!(HashingEmbeddingProvider::new(64).model_name(), "hashing-bow-64");
    }

    #[test]
    fn hashing_provider_empty_text_is_zero() {
        let provider = HashingEmbeddingProvider::new(16);
        let emb = provider.embed("  ,.; ").expect("embed");
        assert!(emb.0.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn shared_words_are_closer() {
        let provider = HashingEmbeddingProvider::new(256);
        let q = provider.embed("secret").expect("embed");
        let near = provider.embed("Told a secret").expect("embed");
        let far = provider.embed("Bought some bread").expect("embed");
        let dot = |a: &Embedding, b: &Embedding| -> f32 { a.0.iter().zip(&b.0).map(|(x, y)| x * y).sum() };
        assert!(dot(&q, &near) > dot(&q, &far));
    }

    #[test]
    fn batch_embed_preserves_order() {
        let provider = HashingEmbeddingProvider::new(32);
        let batch = provider.embed_batch(&["alpha", "beta"]).expect("batch");
        assert_eq!(batch[0], provider.embed("alpha").expect("embed"));
        assert_eq!(batch[1], provider.embed("beta").expect("embed"));
    }

    #[test]
    fn cache_avoids_repeat_embedding() {
        let counting = Arc::new(Counting {
            inner: HashingEmbeddingProvider::new(32),
            calls: AtomicU64::new(0),
        });
        let cached = CachedEmbeddingProvider::new(counting.clone(), 8);

        cached.embed_batch(&["a", "b", "c"]).expect("batch");
        cached.embed_batch(&["a", "b", "d"]).expect("batch");
        cached.embed("c").expect("embed");

        assert_eq!(counting.calls.load(Ordering::Relaxed), 4);
        assert_eq!(cached.stats(), (3, 4));
        assert_eq!(cached.cached(), 4);
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let inner: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbeddingProvider::new(8));
        let cached = CachedEmbeddingProvider::new(inner, 2);
        cached.embed("one").expect("embed");
        cached.embed("two").expect("embed");
        cached.embed("three").expect("embed");
        assert_eq!(cached.cached(), 2);
        cached.embed("one").expect("embed");
        assert_eq!(cached.stats().1, 4);
    }
}
