//! Episodic memory: a bounded, decaying, importance-weighted event log.
//!
//! Item lifecycle: created by [`EpisodicMemoryStore::add`], active while it
//! accumulates accesses and decays, removed for good by pruning or
//! [`clear`](EpisodicMemoryStore::clear). Ids come from a counter that is
//! never rewound, so an evicted id is never handed out again.
//!
//! `items[i]` always corresponds to position `i` of the episodic index
//! category. An item is appended only after the index accepted its text.
//! If a rebuild after pruning fails, the category is dropped and the store
//! is marked stale; the next add or retrieve rebuilds it before use.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, days_between};
use crate::config::EpisodicConfig;
use crate::decay::DecayPolicy;
use crate::error::Result;
use crate::eviction::{retention_score, select_victims};
use crate::index::VectorIndex;
use crate::memory::MemoryKind;
use crate::metrics::{MnemoCounters, spans};
use crate::retrieval::EpisodicHit;
use crate::retrieval::relevance::RelevanceMethod;
use crate::retrieval::scoring::{BlendWeights, recency};
use crate::types::EpisodicId;

/// A recorded interaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicItem {
    /// Stable id, never reused.
    pub id: EpisodicId,
    /// What happened.
    pub text: String,
    /// When it was recorded.
    pub created_at: DateTime<Utc>,
    /// Significance in `[0, 1]`.
    pub importance: f64,
    /// Free-form category label.
    pub category: Option<String>,
    /// Free-form emotion label.
    pub emotion: Option<String>,
    /// Times this item was returned by retrieval.
    pub access_count: u64,
    /// Time of the last decay pass applied to this item (`None`: never decayed).
    #[serde(default)]
    pub last_decayed_at: Option<DateTime<Utc>>,
}

impl EpisodicItem {
    /// Age in fractional days at `now`.
    #[must_use]
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        days_between(self.created_at, now)
    }
}

/// Orderings for [`EpisodicMemoryStore::all_sorted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodicSort {
    /// Most important first.
    Importance,
    /// Newest first.
    Recency,
    /// Most accessed first.
    AccessCount,
}

/// Bounded event memory backed by the `episodic` index category.
pub struct EpisodicMemoryStore {
    index: Arc<VectorIndex>,
    clock: Arc<dyn Clock>,
    counters: Arc<MnemoCounters>,
    config: EpisodicConfig,
    decay: DecayPolicy,
    weights: BlendWeights,
    items: Vec<EpisodicItem>,
    next_id: u64,
    stale: bool,
}

impl std::fmt::Debug for EpisodicMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodicMemoryStore")
            .field("items", &self.items.len())
            .field("max_memories", &self.config.max_memories)
            .field("next_id", &self.next_id)
            .field("stale", &self.stale)
            .finish_non_exhaustive()
    }
}

impl EpisodicMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(
        index: Arc<VectorIndex>,
        clock: Arc<dyn Clock>,
        counters: Arc<MnemoCounters>,
        config: EpisodicConfig,
    ) -> Self {
        Self {
            index,
            clock,
            counters,
            decay: DecayPolicy::from_config(&config),
            weights: BlendWeights::from_config(&config),
            config,
            items: Vec::new(),
            next_id: 0,
            stale: false,
        }
    }

    // -----------------------------------------------------------------------
    // Admission
    // -----------------------------------------------------------------------

    /// Record an event and enforce the capacity bound.
    ///
    /// Finite importance is clamped to `[0, 1]`; non-finite importance falls
    /// back to the configured default. The returned id may already have been
    /// evicted if the new item scored lowest.
    ///
    /// # Errors
    /// Propagates indexing failures; nothing is recorded on error.
    pub fn add(
        &mut self,
        text: impl Into<String>,
        importance: f64,
        category: Option<&str>,
        emotion: Option<&str>,
    ) -> Result<EpisodicId> {
        let text = text.into();
        let span = tracing::debug_span!(spans::EPISODIC_ADD, importance);
        let _enter = span.enter();

        let importance = self.sanitize_importance(importance);
        if self.stale {
            let mut texts = self.texts();
            texts.push(text.clone());
            self.index.rebuild_index(MemoryKind::Episodic, &texts)?;
            self.stale = false;
        } else {
            self.index
                .update_index(MemoryKind::Episodic, std::slice::from_ref(&text))?;
        }

        let id = EpisodicId(self.next_id);
        self.next_id += 1;
        let now = self.clock.now();
        self.items.push(EpisodicItem {
            id,
            text,
            created_at: now,
            importance,
            category: category.map(str::to_string),
            emotion: emotion.map(str::to_string),
            access_count: 0,
            last_decayed_at: None,
        });
        MnemoCounters::incr(&self.counters.episodic_added);
        tracing::debug!(id = %id, importance, total = self.items.len(), "episodic memory added");

        self.prune();
        Ok(id)
    }

    fn sanitize_importance(&self, value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            tracing::warn!(value, default = self.config.default_importance, "non-finite importance, using default");
            self.config.default_importance.clamp(0.0, 1.0)
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Overwrite an item's importance (clamped to `[0, 1]`).
    ///
    /// Returns `false` for unknown ids and non-finite values.
    pub fn update_importance(&mut self, id: EpisodicId, value: f64) -> bool {
        if !value.is_finite() {
            tracing::warn!(id = %id, value, "rejecting non-finite importance");
            return false;
        }
        match self.position(id) {
            Some(pos) => {
                self.items[pos].importance = value.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Apply decay for the time elapsed since each item's previous pass.
    ///
    /// Returns the number of items whose importance changed.
    pub fn decay(&mut self) -> usize {
        let span = tracing::debug_span!(spans::DECAY_PASS, items = self.items.len());
        let _enter = span.enter();

        let now = self.clock.now();
        let mut changed = 0;
        for item in &mut self.items {
            let since = item.last_decayed_at.unwrap_or(item.created_at);
            let elapsed = days_between(since, now);
            if elapsed <= 0.0 {
                continue;
            }
            let decayed = self.decay.apply(item.importance, elapsed);
            if decayed < item.importance {
                item.importance = decayed;
                changed += 1;
            }
            item.last_decayed_at = Some(now);
        }
        MnemoCounters::incr(&self.counters.decay_passes);
        tracing::debug!(changed, "decay pass complete");
        changed
    }

    /// Evict the lowest-retention items until the store fits `max_memories`.
    ///
    /// Survivors keep their relative order and the index is rebuilt from
    /// them. Returns the number of evicted items.
    pub fn prune(&mut self) -> usize {
        let max = self.config.max_memories;
        if self.items.len() <= max {
            return 0;
        }
        let span = tracing::debug_span!(spans::PRUNE, items = self.items.len(), max);
        let _enter = span.enter();

        let now = self.clock.now();
        let scores: Vec<f64> = self
            .items
            .iter()
            .map(|item| retention_score(item.importance, item.age_days(now), item.access_count))
            .collect();
        let victims = select_victims(&scores, self.items.len() - max);

        let mut victim_iter = victims.iter().peekable();
        let mut position = 0;
        self.items.retain(|_| {
            let evict = victim_iter.next_if_eq(&&position).is_some();
            position += 1;
            !evict
        });

        let texts = self.texts();
        if let Err(e) = self.index.rebuild_index(MemoryKind::Episodic, &texts) {
            tracing::warn!(error = %e, "episodic index rebuild failed, marking stale");
            self.index.remove(MemoryKind::Episodic);
            self.stale = true;
        }

        MnemoCounters::add(&self.counters.episodic_evicted, victims.len() as u64);
        tracing::info!(evicted = victims.len(), remaining = self.items.len(), "episodic memories pruned");
        victims.len()
    }

    /// Remove every item. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        self.index.remove(MemoryKind::Episodic);
        self.stale = false;
        tracing::info!(removed, "episodic memory cleared");
        removed
    }

    // -----------------------------------------------------------------------
    // Retrieval
    // -----------------------------------------------------------------------

    /// Up to `k` items ranked by blended relevance.
    ///
    /// Fetches `candidate_multiplier · k` semantic candidates at or above
    /// `semantic_floor`, blends each with importance and recency, drops
    /// those below `min_relevance`, and keeps the best `k`. Only the returned items have their access count
    /// incremented.
    ///
    /// # Errors
    /// Propagates index rebuild and query embedding failures.
    pub fn retrieve(
        &mut self,
        query: &str,
        k: usize,
        method: RelevanceMethod,
        min_relevance: f64,
    ) -> Result<Vec<EpisodicHit>> {
        if k == 0 || self.items.is_empty() {
            return Ok(Vec::new());
        }
        let span = tracing::debug_span!(spans::EPISODIC_RETRIEVE, k);
        let _enter = span.enter();

        self.ensure_index()?;
        let candidates = k.saturating_mul(self.config.candidate_multiplier.max(1));
        let hits = self
            .index
            .search(MemoryKind::Episodic, query, candidates, method, self.config.semantic_floor)?;

        let now = self.clock.now();
        let mut scored: Vec<(usize, f64, f32, f32)> = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(item) = self.items.get(hit.position) else {
                tracing::error!(position = hit.position, "episodic index out of step with store");
                continue;
            };
            let blended = self.weights.blend(
                f64::from(hit.relevance),
                item.importance,
                recency(item.age_days(now)),
            );
            if blended >= min_relevance {
                scored.push((hit.position, blended, hit.relevance, hit.distance));
            }
        }
        scored.sort_by_key(|&(_, blended, _, _)| Reverse(OrderedFloat(blended)));
        scored.truncate(k);

        let results = scored
            .into_iter()
            .map(|(pos, blended, semantic, distance)| {
                let item = &mut self.items[pos];
                item.access_count += 1;
                EpisodicHit {
                    id: item.id,
                    text: item.text.clone(),
                    relevance: blended,
                    semantic_relevance: semantic,
                    distance,
                    importance: item.importance,
                    category: item.category.clone(),
                    emotion: item.emotion.clone(),
                    created_at: item.created_at,
                    age_days: item.age_days(now),
                    access_count: item.access_count,
                }
            })
            .collect::<Vec<_>>();
        tracing::debug!(returned = results.len(), "episodic retrieval complete");
        Ok(results)
    }

    fn ensure_index(&mut self) -> Result<()> {
        if self.stale {
            let texts = self.texts();
            self.index.rebuild_index(MemoryKind::Episodic, &texts)?;
            self.stale = false;
            tracing::info!(items = texts.len(), "stale episodic index rebuilt");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Snapshot support
    // -----------------------------------------------------------------------

    /// Replace the contents with restored items and rebuild the index.
    ///
    /// Items are reordered by id, importance is re-clamped, and the id
    /// counter is advanced past every restored id. The capacity bound is
    /// enforced afterwards.
    ///
    /// # Errors
    /// Propagates indexing failures; the store is left empty on error.
    pub fn restore(&mut self, mut items: Vec<EpisodicItem>, next_id: u64) -> Result<()> {
        items.sort_by_key(|i| i.id);
        items.dedup_by_key(|i| i.id);
        for item in &mut items {
            item.importance = self.sanitize_importance(item.importance);
        }
        let texts: Vec<String> = items.iter().map(|i| i.text.clone()).collect();

        self.items.clear();
        self.stale = false;
        if let Err(e) = self.index.rebuild_index(MemoryKind::Episodic, &texts) {
            self.index.remove(MemoryKind::Episodic);
            return Err(e);
        }

        let max_id = items.last().map_or(0, |i| i.id.0 + 1);
        self.next_id = next_id.max(max_id);
        self.items = items;
        self.prune();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    fn position(&self, id: EpisodicId) -> Option<usize> {
        self.items.binary_search_by_key(&id, |i| i.id).ok()
    }

    /// Look up an item.
    #[must_use]
    pub fn get(&self, id: EpisodicId) -> Option<&EpisodicItem> {
        self.position(id).map(|p| &self.items[p])
    }

    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[EpisodicItem] {
        &self.items
    }

    /// Texts in insertion order.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|i| i.text.clone()).collect()
    }

    /// Items ordered by `sort`; ties keep insertion order.
    #[must_use]
    pub fn all_sorted(&self, sort: EpisodicSort) -> Vec<&EpisodicItem> {
        let mut out: Vec<&EpisodicItem> = self.items.iter().collect();
        match sort {
            EpisodicSort::Importance => out.sort_by_key(|i| Reverse(OrderedFloat(i.importance))),
            EpisodicSort::Recency => out.sort_by_key(|i| Reverse(i.created_at)),
            EpisodicSort::AccessCount => out.sort_by_key(|i| Reverse(i.access_count)),
        }
        out
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The id the next admitted item will receive.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Settings in effect.
    #[must_use]
    pub fn config(&self) -> &EpisodicConfig {
        &self.config
    }

    /// Whether the index must be rebuilt before the next search.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
