//! The single entry point an agent talks to.
//!
//! [`MemoryManager`] owns one [`VectorIndex`] shared by the long-term and
//! episodic stores, plus the short-term buffer. Nothing past this boundary
//! returns an engine error: failures are logged and absorbed into empty
//! results, `Option`/`bool` returns or a [`RestoreOutcome`].

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::config::MnemoConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::memory::long_term::PersonaData;
use crate::memory::{
    EpisodicItem, EpisodicMemoryStore, EpisodicSort, LongTermCategory, LongTermMemoryStore, MemoryKind,
    ShortTermBuffer,
};
use crate::metrics::{CounterSnapshot, MnemoCounters, spans};
use crate::persistence::PersistenceEngine;
use crate::retrieval::relevance::RelevanceMethod;
use crate::retrieval::{RetrievalMap, RetrievedMemory};
use crate::snapshot::{EpisodicSnapshot, MemorySnapshot, SNAPSHOT_VERSION};
use crate::types::{EpisodicId, PersonaId};

/// What [`MemoryManager::restore`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The snapshot was applied.
    Restored,
    /// The snapshot was unusable; memory was reset to a fresh state.
    Reset {
        /// Why the snapshot was rejected.
        reason: String,
    },
}

impl RestoreOutcome {
    /// Whether the snapshot was applied.
    #[must_use]
    pub fn is_restored(&self) -> bool {
        matches!(self, Self::Restored)
    }
}

/// Stores rebuilt together on construction, restore and reset.
struct Parts {
    config: MnemoConfig,
    index: Arc<VectorIndex>,
    long_term: LongTermMemoryStore,
    episodic: EpisodicMemoryStore,
    short_term: ShortTermBuffer,
}

/// Hybrid memory for one persona.
pub struct MemoryManager {
    config: MnemoConfig,
    provider: Arc<dyn EmbeddingProvider>,
    clock: Arc<dyn Clock>,
    counters: Arc<MnemoCounters>,
    index: Arc<VectorIndex>,
    long_term: LongTermMemoryStore,
    episodic: EpisodicMemoryStore,
    short_term: ShortTermBuffer,
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("model", &self.provider.model_name())
            .field("long_term", &self.long_term.len())
            .field("episodic", &self.episodic.len())
            .field("short_term", &self.short_term.len())
            .finish_non_exhaustive()
    }
}

impl MemoryManager {
    /// Create an empty memory using the system clock.
    #[must_use]
    pub fn new(config: MnemoConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_clock(config, provider, Arc::new(SystemClock))
    }

    /// Create an empty memory with an explicit time source.
    #[must_use]
    pub fn with_clock(config: MnemoConfig, provider: Arc<dyn EmbeddingProvider>, clock: Arc<dyn Clock>) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "memory created with an invalid configuration");
        }
        let counters = Arc::new(MnemoCounters::new());
        let parts = Self::fresh_parts(config, &provider, &clock, &counters);
        tracing::info!(
            model = provider.model_name(),
            index_kind = %parts.config.index.index_kind,
            metric = %parts.config.index.metric,
            "memory manager created"
        );
        Self {
            config: parts.config,
            provider,
            clock,
            counters,
            index: parts.index,
            long_term: parts.long_term,
            episodic: parts.episodic,
            short_term: parts.short_term,
        }
    }

    fn fresh_parts(
        config: MnemoConfig,
        provider: &Arc<dyn EmbeddingProvider>,
        clock: &Arc<dyn Clock>,
        counters: &Arc<MnemoCounters>,
    ) -> Parts {
        let index = Arc::new(VectorIndex::new(
            config.index.clone(),
            Arc::clone(provider),
            Arc::clone(counters),
        ));
        Parts {
            long_term: LongTermMemoryStore::new(Arc::clone(&index)),
            episodic: EpisodicMemoryStore::new(
                Arc::clone(&index),
                Arc::clone(clock),
                Arc::clone(counters),
                config.episodic.clone(),
            ),
            short_term: ShortTermBuffer::new(config.short_term.capacity),
            index,
            config,
        }
    }

    fn install(&mut self, parts: Parts) {
        self.config = parts.config;
        self.index = parts.index;
        self.long_term = parts.long_term;
        self.episodic = parts.episodic;
        self.short_term = parts.short_term;
    }

    // -----------------------------------------------------------------------
    // Long-term
    // -----------------------------------------------------------------------

    /// Seed persona knowledge, replacing whatever was there.
    ///
    /// Returns `false` if any category failed to index; the others are
    /// still seeded.
    pub fn initialize_long_term(&mut self, persona: &PersonaData) -> bool {
        match self.long_term.initialize(persona) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "long-term initialisation incomplete");
                false
            }
        }
    }

    fn add_long_term(&mut self, category: LongTermCategory, text: String) -> bool {
        match self.long_term.add_item(category, text) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "failed to add long-term item");
                false
            }
        }
    }

    /// Add a fact. Returns `false` if it could not be indexed.
    pub fn add_fact(&mut self, text: impl Into<String>) -> bool {
        self.add_long_term(LongTermCategory::Facts, text.into())
    }

    /// Add a character trait. Returns `false` if it could not be indexed.
    pub fn add_trait(&mut self, text: impl Into<String>) -> bool {
        self.add_long_term(LongTermCategory::Traits, text.into())
    }

    /// Add a speech pattern. Returns `false` if it could not be indexed.
    pub fn add_speech_pattern(&mut self, text: impl Into<String>) -> bool {
        self.add_long_term(LongTermCategory::SpeechPatterns, text.into())
    }

    // -----------------------------------------------------------------------
    // Short-term
    // -----------------------------------------------------------------------

    /// Push an utterance and return the buffer, oldest first.
    pub fn add_utterance(&mut self, text: impl Into<String>) -> Vec<String> {
        self.short_term.push(text);
        self.short_term.to_vec()
    }

    /// The short-term buffer joined into one string.
    #[must_use]
    pub fn get_context(&self) -> String {
        self.short_term.context()
    }

    /// Buffered utterances, oldest first.
    #[must_use]
    pub fn short_term_messages(&self) -> Vec<String> {
        self.short_term.to_vec()
    }

    /// Empty the short-term buffer.
    pub fn clear_short_term(&mut self) {
        self.short_term.clear();
    }

    // -----------------------------------------------------------------------
    // Episodic
    // -----------------------------------------------------------------------

    /// Record an event. Returns `None` if the text could not be indexed.
    pub fn add_episodic(
        &mut self,
        text: impl Into<String>,
        importance: f64,
        category: Option<&str>,
        emotion: Option<&str>,
    ) -> Option<EpisodicId> {
        match self.episodic.add(text, importance, category, emotion) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "failed to add episodic memory");
                None
            }
        }
    }

    /// Overwrite an event's importance. Returns `false` for unknown ids.
    pub fn update_episodic_importance(&mut self, id: EpisodicId, importance: f64) -> bool {
        self.episodic.update_importance(id, importance)
    }

    /// Run a decay pass. Returns how many items changed.
    pub fn decay_episodic(&mut self) -> usize {
        self.episodic.decay()
    }

    /// Forget every event. Returns how many were removed.
    pub fn clear_episodic(&mut self) -> usize {
        self.episodic.clear()
    }

    /// Events ordered by `sort`.
    #[must_use]
    pub fn episodic_sorted(&self, sort: EpisodicSort) -> Vec<&EpisodicItem> {
        self.episodic.all_sorted(sort)
    }

    // -----------------------------------------------------------------------
    // Retrieval
    // -----------------------------------------------------------------------

    /// Relevant memories per requested kind.
    ///
    /// Long-term kinds are ranked by semantic relevance, episodic memory by
    /// blended relevance. Kinds with no result at or above `min_relevance`
    /// are absent from the map. Errors are logged and yield no results for
    /// the affected kinds.
    pub fn retrieve_relevant(
        &mut self,
        query: &str,
        kinds: &[MemoryKind],
        k: usize,
        method: RelevanceMethod,
        min_relevance: f64,
    ) -> RetrievalMap {
        let span = tracing::debug_span!(spans::RETRIEVE, k, kinds = kinds.len(), method = %method);
        let _enter = span.enter();
        let start = Instant::now();
        let mut out = RetrievalMap::new();

        let long_term: Vec<LongTermCategory> = kinds.iter().filter_map(|kind| kind.as_long_term()).collect();
        if !long_term.is_empty() {
            #[allow(clippy::cast_possible_truncation)]
            let floor = min_relevance as f32;
            match self.long_term.retrieve(query, &long_term, k, method, floor) {
                Ok(found) => {
                    for (category, hits) in found {
                        let hits: Vec<RetrievedMemory> = hits
                            .into_iter()
                            .filter(|h| f64::from(h.relevance) >= min_relevance)
                            .map(RetrievedMemory::LongTerm)
                            .collect();
                        if !hits.is_empty() {
                            out.insert(category.kind(), hits);
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "long-term retrieval failed"),
            }
        }

        if kinds.contains(&MemoryKind::Episodic) {
            match self.episodic.retrieve(query, k, method, min_relevance) {
                Ok(hits) if !hits.is_empty() => {
                    out.insert(
                        MemoryKind::Episodic,
                        hits.into_iter().map(RetrievedMemory::Episodic).collect(),
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "episodic retrieval failed"),
            }
        }

        tracing::debug!(
            kinds_found = out.len(),
            results = out.values().map(Vec::len).sum::<usize>(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "retrieval complete"
        );
        out
    }

    /// [`retrieve_relevant`](Self::retrieve_relevant) over every kind with
    /// the configured retrieval defaults.
    pub fn retrieve_default(&mut self, query: &str) -> RetrievalMap {
        let retrieval = self.config.retrieval.clone();
        self.retrieve_relevant(
            query,
            &MemoryKind::ALL,
            retrieval.top_k,
            retrieval.method,
            f64::from(retrieval.min_relevance),
        )
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Texts of one kind in insertion order.
    #[must_use]
    pub fn texts(&self, kind: MemoryKind) -> Vec<String> {
        match kind.as_long_term() {
            Some(category) => self.long_term.texts(category),
            None => self.episodic.texts(),
        }
    }

    /// The long-term store.
    #[must_use]
    pub fn long_term(&self) -> &LongTermMemoryStore {
        &self.long_term
    }

    /// The episodic store.
    #[must_use]
    pub fn episodic(&self) -> &EpisodicMemoryStore {
        &self.episodic
    }

    /// The shared vector index.
    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Configuration in effect (restores may change index and episodic settings).
    #[must_use]
    pub fn config(&self) -> &MnemoConfig {
        &self.config
    }

    /// Point-in-time counter values.
    #[must_use]
    pub fn metrics(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    // -----------------------------------------------------------------------
    // Snapshot / restore
    // -----------------------------------------------------------------------

    /// Capture texts, metadata and settings. Embeddings are not included.
    #[must_use]
    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: self.clock.now(),
            index: self.index.settings(),
            long_term: self.long_term.persona_data(),
            episodic: EpisodicSnapshot {
                settings: self.episodic.config().clone(),
                next_id: self.episodic.next_id(),
                items: self.episodic.items().to_vec(),
            },
            short_term: self.short_term.clone(),
        }
    }

    /// Replace the whole memory with `snapshot`, rebuilding every index from
    /// text with the current embedding provider.
    ///
    /// An inconsistent snapshot, or one whose texts cannot be indexed,
    /// leaves a fresh empty memory built from the current configuration.
    pub fn restore(&mut self, snapshot: MemorySnapshot) -> RestoreOutcome {
        let span = tracing::info_span!(
            spans::PERSIST_LOAD,
            version = snapshot.version,
            episodic = snapshot.episodic.items.len()
        );
        let _enter = span.enter();

        match self.build_from(snapshot) {
            Ok(parts) => {
                self.install(parts);
                MnemoCounters::incr(&self.counters.snapshots_restored);
                tracing::info!(
                    long_term = self.long_term.len(),
                    episodic = self.episodic.len(),
                    short_term = self.short_term.len(),
                    "memory restored"
                );
                RestoreOutcome::Restored
            }
            Err(e) => self.reset(e.to_string()),
        }
    }

    fn build_from(&self, snapshot: MemorySnapshot) -> Result<Parts> {
        snapshot.validate()?;

        let model = self.provider.model_name();
        if snapshot.index.embedding_model != model {
            tracing::warn!(
                snapshot_model = %snapshot.index.embedding_model,
                current_model = model,
                "snapshot was taken with a different embedding model; search results may differ"
            );
        }

        let mut config = self.config.clone();
        config.index.index_kind = snapshot.index.index_kind;
        config.index.metric = snapshot.index.metric;
        config.episodic = snapshot.episodic.settings;
        config.short_term.capacity = snapshot.short_term.capacity();
        config.validate()?;

        let mut parts = Self::fresh_parts(config, &self.provider, &self.clock, &self.counters);
        parts.long_term.initialize(&snapshot.long_term)?;
        parts
            .episodic
            .restore(snapshot.episodic.items, snapshot.episodic.next_id)?;
        parts.short_term = snapshot.short_term;
        Ok(parts)
    }

    /// Discard everything and start over from the configuration in effect
    /// before the failed restore.
    fn reset(&mut self, reason: String) -> RestoreOutcome {
        tracing::warn!(reason = %reason, "restore failed, resetting to an empty memory");
        let parts = Self::fresh_parts(self.config.clone(), &self.provider, &self.clock, &self.counters);
        self.install(parts);
        MnemoCounters::incr(&self.counters.snapshots_reset);
        RestoreOutcome::Reset { reason }
    }

    /// Decode and restore snapshot bytes in the configured format.
    pub fn restore_bytes(&mut self, bytes: &[u8]) -> RestoreOutcome {
        match MemorySnapshot::decode(bytes, self.config.persistence.format) {
            Ok(snapshot) => self.restore(snapshot),
            Err(e) => self.reset(e.to_string()),
        }
    }

    /// Write a snapshot to `path` in the configured format.
    ///
    /// The bytes go to a sibling temporary file first and are renamed into
    /// place, so a crash never leaves a truncated snapshot at `path`.
    ///
    /// # Errors
    /// Returns encoding or I/O failures.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let span = tracing::debug_span!(spans::PERSIST_SAVE, path = %path.display());
        let _enter = span.enter();
        let start = Instant::now();

        let bytes = self.snapshot().encode(self.config.persistence.format)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;

        tracing::debug!(
            bytes = bytes.len(),
            format = self.config.persistence.format.as_str(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "snapshot written"
        );
        Ok(())
    }

    /// Restore from a snapshot file. A missing or unreadable file resets to
    /// a fresh memory.
    pub fn load_from_file(&mut self, path: &Path) -> RestoreOutcome {
        match std::fs::read(path) {
            Ok(bytes) => self.restore_bytes(&bytes),
            Err(e) => self.reset(format!("cannot read {}: {e}", path.display())),
        }
    }

    /// Store a snapshot for `persona` in the database.
    ///
    /// # Errors
    /// Returns encoding or database failures.
    pub fn save_to_db(&self, engine: &PersistenceEngine, persona: PersonaId) -> Result<()> {
        engine.save_snapshot(persona, &self.snapshot())
    }

    /// Restore `persona` from the database. A missing, corrupt or
    /// unreadable row resets to a fresh memory.
    pub fn load_from_db(&mut self, engine: &PersistenceEngine, persona: PersonaId) -> RestoreOutcome {
        match engine.load_snapshot(persona) {
            Ok(Some(snapshot)) => self.restore(snapshot),
            Ok(None) => self.reset(format!("no snapshot stored for persona {persona}")),
            Err(e) => self.reset(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::embedding::{HashingEmbeddingProvider, StubEmbeddingProvider};
    use crate::error::MnemoError;
    use crate::index::IndexKind;
    use crate::types::Embedding;
    use chrono::Utc;

    fn manager() -> (MemoryManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let provider = Arc::new(HashingEmbeddingProvider::new(256));
        let memory = MemoryManager::with_clock(MnemoConfig::default(), provider, clock.clone());
        (memory, clock)
    }

    fn persona() -> PersonaData {
        let mut persona = PersonaData::new();
        persona.insert(
            LongTermCategory::Facts,
            vec!["My cat is named Pepper".into(), "I was born during a storm".into()],
        );
        persona.insert(LongTermCategory::Traits, vec!["Curious and stubborn".into()]);
        persona.insert(LongTermCategory::SpeechPatterns, vec!["Says 'well now' a lot".into()]);
        persona
    }

    /// Fails every call, to exercise the error-absorbing boundary.
    #[derive(Debug)]
    struct Broken;

    impl EmbeddingProvider for Broken {
        fn embed(&self, _text: &str) -> Result<Embedding> {
            Err(MnemoError::Embedding("model offline".into()))
        }
        fn dimensions(&self) -> usize {
            8
        }
        fn model_name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn retrieves_across_kinds() {
        let (mut memory, _) = manager();
        assert!(memory.initialize_long_term(&persona()));
        memory.add_episodic("A dragon attacked the village", 0.8, Some("danger"), Some("fear"));

        let found = memory.retrieve_relevant(
            "dragon",
            &MemoryKind::ALL,
            2,
            RelevanceMethod::Sigmoid,
            0.6,
        );
        assert!(found.contains_key(&MemoryKind::Episodic));
        assert!(!found.contains_key(&MemoryKind::Traits), "unrelated kinds are omitted");

        let found = memory.retrieve_relevant("Pepper", &[MemoryKind::Facts], 1, RelevanceMethod::Sigmoid, 0.6);
        assert_eq!(found[&MemoryKind::Facts][0].text(), "My cat is named Pepper");
    }

    #[test]
    fn secret_example_counts_access() {
        let (mut memory, _) = manager();
        let id = memory
            .add_episodic("Told a secret", 0.9, Some("private"), None)
            .expect("added");
        let found = memory.retrieve_relevant("secret", &[MemoryKind::Episodic], 1, RelevanceMethod::Sigmoid, 0.0);
        let hit = found[&MemoryKind::Episodic][0].as_episodic().expect("episodic");
        assert_eq!(hit.id, id);
        assert_eq!(hit.access_count, 1);
        assert_eq!(memory.episodic().get(id).expect("item").access_count, 1);
    }

    #[test]
    fn short_term_is_bounded() {
        let mut config = MnemoConfig::default();
        config.short_term.capacity = 2;
        let mut memory = MemoryManager::new(config, Arc::new(HashingEmbeddingProvider::new(32)));
        memory.add_utterance("one");
        memory.add_utterance("two");
        let buffer = memory.add_utterance("three");
        assert_eq!(buffer, vec!["two".to_string(), "three".to_string()]);
        assert_eq!(memory.get_context(), "two\nthree");
        memory.clear_short_term();
        assert!(memory.short_term_messages().is_empty());
    }

    #[test]
    fn errors_are_absorbed() {
        let mut memory = MemoryManager::new(MnemoConfig::default(), Arc::new(Broken));
        assert!(!memory.initialize_long_term(&persona()));
        assert!(!memory.add_fact("anything"));
        assert!(memory.add_episodic("anything", 0.5, None, None).is_none());
        assert!(memory.retrieve_default("query").is_empty());
        assert!(memory.texts(MemoryKind::Facts).is_empty());
    }

    #[test]
    fn snapshot_round_trip_preserves_everything() {
        let (mut memory, clock) = manager();
        memory.initialize_long_term(&persona());
        memory.add_trait("Hums while working");
        let id = memory.add_episodic("Lost the bet", 0.4, Some("games"), Some("annoyed")).expect("added");
        clock.advance_days(3.0);
        memory.add_episodic("Found a coin", 0.6, None, Some("glad"));
        memory.add_utterance("hello");
        let snapshot = memory.snapshot();

        let (mut other, _) = manager();
        assert_eq!(other.restore(snapshot.clone()), RestoreOutcome::Restored);
        for kind in MemoryKind::ALL {
            assert_eq!(other.texts(kind), memory.texts(kind), "{kind}");
        }
        assert_eq!(other.episodic().items(), memory.episodic().items());
        assert_eq!(other.short_term_messages(), vec!["hello".to_string()]);
        assert_eq!(other.episodic().next_id(), memory.episodic().next_id());
        assert_eq!(other.episodic().get(id).expect("item").emotion.as_deref(), Some("annoyed"));
        assert_eq!(other.metrics().snapshots_restored, 1);
        assert_eq!(other.snapshot().long_term, snapshot.long_term);
    }

    #[test]
    fn restore_applies_snapshot_settings() {
        let (mut memory, _) = manager();
        memory.add_fact("Pepper is a cat");
        let mut snapshot = memory.snapshot();
        snapshot.index.index_kind = IndexKind::Hnsw;
        snapshot.episodic.settings.max_memories = 7;

        let (mut other, _) = manager();
        assert!(other.restore(snapshot).is_restored());
        assert_eq!(other.config().index.index_kind, IndexKind::Hnsw);
        assert_eq!(other.episodic().config().max_memories, 7);
        // One item stays below the ANN threshold.
        assert_eq!(other.index().structure_kind(MemoryKind::Facts), Some(IndexKind::Flat));
    }

    #[test]
    fn corrupt_snapshot_resets() {
        let (mut memory, _) = manager();
        memory.add_fact("Pepper is a cat");
        memory.add_utterance("hi");

        let outcome = memory.restore_bytes(b"definitely not a snapshot");
        assert!(matches!(outcome, RestoreOutcome::Reset { .. }));
        assert!(memory.texts(MemoryKind::Facts).is_empty());
        assert!(memory.short_term_messages().is_empty());
        assert_eq!(memory.metrics().snapshots_reset, 1);

        // Still usable afterwards.
        assert!(memory.add_episodic("fresh start", 0.5, None, None).is_some());
    }

    #[test]
    fn invalid_snapshot_settings_reset() {
        let (mut memory, _) = manager();
        let mut snapshot = memory.snapshot();
        snapshot.episodic.settings.max_memories = 0;
        assert!(!memory.restore(snapshot).is_restored());
    }

    #[test]
    fn restore_with_broken_provider_resets() {
        let (mut memory, _) = manager();
        memory.add_fact("Pepper is a cat");
        let snapshot = memory.snapshot();

        let mut broken = MemoryManager::new(MnemoConfig::default(), Arc::new(Broken));
        assert!(matches!(broken.restore(snapshot), RestoreOutcome::Reset { .. }));
    }

    #[test]
    fn file_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memory.json");
        let (mut memory, _) = manager();
        memory.add_episodic("Saw a comet", 0.7, Some("sky"), None);
        memory.save_to_file(&path).expect("save");

        let (mut other, _) = manager();
        assert!(other.load_from_file(&path).is_restored());
        assert_eq!(other.texts(MemoryKind::Episodic), vec!["Saw a comet".to_string()]);

        let outcome = other.load_from_file(&dir.path().join("absent.json"));
        assert!(matches!(outcome, RestoreOutcome::Reset { .. }));
        assert!(other.episodic().is_empty());
    }

    #[test]
    fn database_round_trip() {
        let engine = PersistenceEngine::open_in_memory(&crate::config::PersistenceConfig::default()).expect("db");
        let persona = PersonaId::new();
        let (mut memory, _) = manager();
        memory.add_speech_pattern("Well now");
        memory.save_to_db(&engine, persona).expect("save");

        let (mut other, _) = manager();
        assert!(other.load_from_db(&engine, persona).is_restored());
        assert_eq!(other.texts(MemoryKind::SpeechPatterns), vec!["Well now".to_string()]);
        assert!(!other.load_from_db(&engine, PersonaId::new()).is_restored());
    }

    #[test]
    fn stub_provider_still_answers() {
        let mut memory = MemoryManager::new(MnemoConfig::default(), Arc::new(StubEmbeddingProvider::new(16)));
        memory.add_fact("zero vectors everywhere");
        let found = memory.retrieve_relevant("anything", &[MemoryKind::Facts], 1, RelevanceMethod::Inverse, 0.0);
        assert_eq!(found[&MemoryKind::Facts].len(), 1);
    }
}
