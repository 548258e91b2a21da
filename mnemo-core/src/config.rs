//! Configuration for the mnemo memory engine.
//!
//! Maps directly to `mnemo.toml`. Every field has a default, so an empty
//! document is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{MnemoError, Result};
use crate::index::IndexKind;
use crate::index::metric::DistanceMetric;
use crate::retrieval::relevance::RelevanceMethod;
use crate::snapshot::SnapshotFormat;

/// Top-level mnemo configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MnemoConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Vector index and embedding settings.
    #[serde(default)]
    pub index: IndexConfig,
    /// Episodic memory lifecycle settings.
    #[serde(default)]
    pub episodic: EpisodicConfig,
    /// Short-term conversational buffer.
    #[serde(default)]
    pub short_term: ShortTermConfig,
    /// Retrieval defaults.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Snapshot persistence settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl MnemoConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `MnemoError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| MnemoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    /// Returns `MnemoError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let ep = &self.episodic;
        if ep.max_memories == 0 {
            return Err(MnemoError::Config("episodic.max_memories must be at least 1".into()));
        }
        if !(ep.decay_rate > 0.0 && ep.decay_rate <= 1.0) {
            return Err(MnemoError::Config(format!(
                "episodic.decay_rate must be in (0, 1], got {}",
                ep.decay_rate
            )));
        }
        if ep.decay_period_days <= 0.0 {
            return Err(MnemoError::Config("episodic.decay_period_days must be positive".into()));
        }
        if !(0.0..=1.0).contains(&ep.importance_floor) {
            return Err(MnemoError::Config("episodic.importance_floor must be in [0, 1]".into()));
        }
        let weights = [ep.semantic_weight, ep.importance_weight, ep.recency_weight];
        if weights.iter().any(|w| *w < 0.0) || weights.iter().sum::<f64>() <= 0.0 {
            return Err(MnemoError::Config(
                "episodic weights must be non-negative with a positive sum".into(),
            ));
        }
        if ep.candidate_multiplier == 0 {
            return Err(MnemoError::Config("episodic.candidate_multiplier must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&ep.semantic_floor) {
            return Err(MnemoError::Config("episodic.semantic_floor must be in [0, 1]".into()));
        }
        if self.short_term.capacity == 0 {
            return Err(MnemoError::Config("short_term.capacity must be at least 1".into()));
        }
        let ix = &self.index;
        if ix.pq_threshold < ix.ann_threshold {
            return Err(MnemoError::Config(
                "index.pq_threshold must not be below index.ann_threshold".into(),
            ));
        }
        if ix.pq_bits == 0 || ix.pq_bits > 8 {
            return Err(MnemoError::Config("index.pq_bits must be in 1..=8".into()));
        }
        if ix.retrain_growth_factor < 1.0 {
            return Err(MnemoError::Config("index.retrain_growth_factor must be >= 1.0".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Vector index structure and embedding settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Embedding model identifier recorded in snapshots.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Preferred index structure; small corpora always use flat.
    #[serde(default)]
    pub index_kind: IndexKind,
    /// Distance metric.
    #[serde(default)]
    pub metric: DistanceMetric,
    /// Corpus size from which approximate structures are allowed.
    #[serde(default = "default_1000")]
    pub ann_threshold: usize,
    /// Corpus size from which product quantization is allowed.
    #[serde(default = "default_5000")]
    pub pq_threshold: usize,
    /// Lower bound on inverted-file cluster count.
    #[serde(default = "default_8")]
    pub min_clusters: usize,
    /// Upper bound on clusters probed per query.
    #[serde(default = "default_16")]
    pub max_probes: usize,
    /// Lloyd iterations when training a quantizer.
    #[serde(default = "default_20")]
    pub kmeans_iterations: usize,
    /// Retrain clustered structures once the corpus exceeds this multiple of
    /// the size they were trained on.
    #[serde(default = "default_2_0")]
    pub retrain_growth_factor: f32,
    /// Product-quantization sub-quantizers (reduced until it divides the dimension).
    #[serde(default = "default_8")]
    pub pq_subquantizers: usize,
    /// Bits per product-quantization code.
    #[serde(default = "default_8_u32")]
    pub pq_bits: u32,
    /// Graph build quality.
    #[serde(default = "default_40")]
    pub hnsw_ef_construction: usize,
    /// Graph search quality.
    #[serde(default = "default_32")]
    pub hnsw_ef_search: usize,
    /// Rebuild the graph once unindexed inserts exceed this fraction of the corpus.
    #[serde(default = "default_0_2")]
    pub hnsw_rebuild_fraction: f32,
    /// Seed for quantizer training and graph construction.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Entries in the text → embedding LRU cache (0 disables caching).
    #[serde(default = "default_1024")]
    pub embedding_cache_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_embedding_model(),
            index_kind: IndexKind::Flat,
            metric: DistanceMetric::Cosine,
            ann_threshold: 1000,
            pq_threshold: 5000,
            min_clusters: 8,
            max_probes: 16,
            kmeans_iterations: 20,
            retrain_growth_factor: 2.0,
            pq_subquantizers: 8,
            pq_bits: 8,
            hnsw_ef_construction: 40,
            hnsw_ef_search: 32,
            hnsw_rebuild_fraction: 0.2,
            seed: 42,
            embedding_cache_size: 1024,
        }
    }
}

/// Episodic memory lifecycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicConfig {
    /// Capacity bound enforced after every add.
    #[serde(default = "default_100")]
    pub max_memories: usize,
    /// Importance multiplier per decay period.
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    /// Length of one decay period in days.
    #[serde(default = "default_30_f64")]
    pub decay_period_days: f64,
    /// Decay never pushes importance below this value.
    #[serde(default = "default_importance_floor")]
    pub importance_floor: f64,
    /// Importance used when the caller supplies a non-finite value.
    #[serde(default = "default_0_5")]
    pub default_importance: f64,
    /// Weight of semantic relevance in the blended score (before normalization).
    #[serde(default = "default_0_6")]
    pub semantic_weight: f64,
    /// Weight of importance in the blended score (before normalization).
    #[serde(default = "default_0_7")]
    pub importance_weight: f64,
    /// Weight of recency in the blended score (before normalization).
    #[serde(default = "default_0_3")]
    pub recency_weight: f64,
    /// Semantic candidates fetched per requested result.
    #[serde(default = "default_2_usize")]
    pub candidate_multiplier: usize,
    /// Candidates below this semantic relevance are dropped before blending.
    #[serde(default = "default_0_2")]
    pub semantic_floor: f32,
}

impl Default for EpisodicConfig {
    fn default() -> Self {
        Self {
            max_memories: 100,
            decay_rate: 0.95,
            decay_period_days: 30.0,
            importance_floor: 0.1,
            default_importance: 0.5,
            semantic_weight: 0.6,
            importance_weight: 0.7,
            recency_weight: 0.3,
            candidate_multiplier: 2,
            semantic_floor: 0.2,
        }
    }
}

/// Short-term conversational buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTermConfig {
    /// Number of utterances kept.
    #[serde(default = "default_10")]
    pub capacity: usize,
}

impl Default for ShortTermConfig {
    fn default() -> Self {
        Self { capacity: 10 }
    }
}

/// Retrieval defaults used by [`MemoryManager::retrieve_default`](crate::MemoryManager::retrieve_default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Results per category.
    #[serde(default = "default_3")]
    pub top_k: usize,
    /// Distance → relevance mapping.
    #[serde(default)]
    pub method: RelevanceMethod,
    /// Results below this relevance are dropped.
    #[serde(default = "default_0_2")]
    pub min_relevance: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            method: RelevanceMethod::Sigmoid,
            min_relevance: 0.2,
        }
    }
}

/// Snapshot persistence configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Encoding used by file snapshots.
    #[serde(default)]
    pub format: SnapshotFormat,
    /// Use WAL mode for the SQLite store.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store and verify CRC-32 checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Number of rotating database backups to keep.
    #[serde(default = "default_3_u32")]
    pub backup_count: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            format: SnapshotFormat::Json,
            wal_mode: true,
            checksum_enabled: true,
            backup_count: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_embedding_model() -> String { "paraphrase-multilingual-MiniLM-L12-v2".to_string() }
fn default_seed() -> u64 { 42 }
fn default_0_2() -> f32 { 0.2 }
fn default_2_0() -> f32 { 2.0 }
fn default_0_3() -> f64 { 0.3 }
fn default_0_5() -> f64 { 0.5 }
fn default_0_6() -> f64 { 0.6 }
fn default_0_7() -> f64 { 0.7 }
fn default_30_f64() -> f64 { 30.0 }
fn default_decay_rate() -> f64 { 0.95 }
fn default_importance_floor() -> f64 { 0.1 }
fn default_2_usize() -> usize { 2 }
fn default_3() -> usize { 3 }
fn default_3_u32() -> u32 { 3 }
fn default_8() -> usize { 8 }
fn default_8_u32() -> u32 { 8 }
fn default_10() -> usize { 10 }
fn default_16() -> usize { 16 }
fn default_20() -> usize { 20 }
fn default_32() -> usize { 32 }
fn default_40() -> usize { 40 }
fn default_100() -> usize { 100 }
fn default_1000() -> usize { 1000 }
fn default_1024() -> usize { 1024 }
fn default_5000() -> usize { 5000 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = MnemoConfig::from_toml("").expect("parse");
        assert_eq!(config.episodic.max_memories, 100);
        assert!((config.episodic.decay_rate - 0.95).abs() < f64::EPSILON);
        assert_eq!(config.short_term.capacity, 10);
        assert_eq!(config.index.index_kind, IndexKind::Flat);
        assert_eq!(config.index.metric, DistanceMetric::Cosine);
        assert_eq!(config.retrieval.method, RelevanceMethod::Sigmoid);
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = MnemoConfig::from_toml(
            r#"
            [index]
            index_kind = "hnsw"
            metric = "euclidean"

            [episodic]
            max_memories = 2
            "#,
        )
        .expect("parse");
        assert_eq!(config.index.index_kind, IndexKind::Hnsw);
        assert_eq!(config.index.metric, DistanceMetric::Euclidean);
        assert_eq!(config.episodic.max_memories, 2);
        assert_eq!(config.index.hnsw_ef_search, 32);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(MnemoConfig::from_toml("[episodic]\nmax_memories = 0").is_err());
        assert!(MnemoConfig::from_toml("[episodic]\ndecay_rate = 1.5").is_err());
        assert!(MnemoConfig::from_toml("[episodic]\nsemantic_floor = 1.5").is_err());
        assert!(MnemoConfig::from_toml("[index]\npq_bits = 12").is_err());
        assert!(MnemoConfig::from_toml("[index]\nann_threshold = 9000").is_err());
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = MnemoConfig::from_toml("[episodic\nmax_memories = ").expect_err("must fail");
        assert!(matches!(err, MnemoError::Config(_)));
    }

    #[test]
    fn from_file_reads_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mnemo.toml");
        std::fs::write(&path, "[short_term]\ncapacity = 4\n").expect("write");
        let config = MnemoConfig::from_file(&path).expect("load");
        assert_eq!(config.short_term.capacity, 4);
    }
}
