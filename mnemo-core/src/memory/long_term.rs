//! Long-term persona knowledge: facts, traits and speech patterns.
//!
//! Seeded once from persona data and rarely mutated afterwards. Each
//! category is backed by its own index category; an item is recorded only
//! after its text has been indexed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::VectorIndex;
use crate::memory::LongTermCategory;
use crate::retrieval::LongTermHit;
use crate::retrieval::relevance::RelevanceMethod;

/// Persona knowledge keyed by category.
pub type PersonaData = BTreeMap<LongTermCategory, Vec<String>>;

/// Parse persona data keyed by category name. Unknown names are skipped
/// with a warning.
#[must_use]
pub fn parse_persona(raw: &HashMap<String, Vec<String>>) -> PersonaData {
    let mut persona = PersonaData::new();
    for (name, texts) in raw {
        match name.parse::<LongTermCategory>() {
            Ok(category) => {
                persona.entry(category).or_default().extend(texts.iter().cloned());
            }
            Err(_) => tracing::warn!(category = %name, "skipping unknown persona category"),
        }
    }
    persona
}

/// A single piece of persona knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// The knowledge text.
    pub text: String,
    /// Which category it belongs to.
    pub category: LongTermCategory,
}

/// Static per-persona knowledge.
#[derive(Debug)]
pub struct LongTermMemoryStore {
    index: Arc<VectorIndex>,
    items: BTreeMap<LongTermCategory, Vec<MemoryItem>>,
}

impl LongTermMemoryStore {
    /// Create an empty store over a shared index.
    #[must_use]
    pub fn new(index: Arc<VectorIndex>) -> Self {
        Self {
            index,
            items: LongTermCategory::ALL.iter().map(|c| (*c, Vec::new())).collect(),
        }
    }

    /// Replace every category with `persona`.
    ///
    /// Categories missing from `persona` end up empty. A category whose index
    /// cannot be built is left empty and the first such error is returned
    /// after the remaining categories are processed.
    ///
    /// # Errors
    /// Returns the first embedding failure encountered.
    pub fn initialize(&mut self, persona: &PersonaData) -> Result<()> {
        let mut first_error = None;
        for category in LongTermCategory::ALL {
            let texts = persona.get(&category).cloned().unwrap_or_default();
            let kind = category.kind();
            match self.index.rebuild_index(kind, &texts) {
                Ok(()) => {
                    let items = texts
                        .into_iter()
                        .map(|text| MemoryItem { text, category })
                        .collect::<Vec<_>>();
                    tracing::debug!(category = %category, items = items.len(), "long-term category seeded");
                    self.items.insert(category, items);
                }
                Err(e) => {
                    tracing::warn!(category = %category, error = %e, "failed to index long-term category");
                    self.index.remove(kind);
                    self.items.insert(category, Vec::new());
                    first_error.get_or_insert(e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Append one item and extend its category's index.
    ///
    /// # Errors
    /// Propagates indexing failures; the store is unchanged on error.
    pub fn add_item(&mut self, category: LongTermCategory, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.index.update_index(category.kind(), std::slice::from_ref(&text))?;
        self.items
            .entry(category)
            .or_default()
            .push(MemoryItem { text, category });
        Ok(())
    }

    /// Append a fact.
    ///
    /// # Errors
    /// See [`add_item`](Self::add_item).
    pub fn add_fact(&mut self, text: impl Into<String>) -> Result<()> {
        self.add_item(LongTermCategory::Facts, text)
    }

    /// Append a trait.
    ///
    /// # Errors
    /// See [`add_item`](Self::add_item).
    pub fn add_trait(&mut self, text: impl Into<String>) -> Result<()> {
        self.add_item(LongTermCategory::Traits, text)
    }

    /// Append a speech pattern.
    ///
    /// # Errors
    /// See [`add_item`](Self::add_item).
    pub fn add_speech_pattern(&mut self, text: impl Into<String>) -> Result<()> {
        self.add_item(LongTermCategory::SpeechPatterns, text)
    }

    /// Relevant items per requested category. Categories without data or
    /// without hits above `min_relevance` are omitted.
    ///
    /// # Errors
    /// Propagates query embedding failures.
    pub fn retrieve(
        &self,
        query: &str,
        categories: &[LongTermCategory],
        k: usize,
        method: RelevanceMethod,
        min_relevance: f32,
    ) -> Result<BTreeMap<LongTermCategory, Vec<LongTermHit>>> {
        let mut out = BTreeMap::new();
        for &category in categories {
            if self.items(category).is_empty() || out.contains_key(&category) {
                continue;
            }
            let hits: Vec<LongTermHit> = self
                .index
                .search(category.kind(), query, k, method, min_relevance)?
                .into_iter()
                .map(|hit| LongTermHit {
                    category,
                    text: hit.text,
                    relevance: hit.relevance,
                    distance: hit.distance,
                })
                .collect();
            if !hits.is_empty() {
                out.insert(category, hits);
            }
        }
        Ok(out)
    }

    /// Items of one category in insertion order.
    #[must_use]
    pub fn items(&self, category: LongTermCategory) -> &[MemoryItem] {
        self.items.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Texts of one category in insertion order.
    #[must_use]
    pub fn texts(&self, category: LongTermCategory) -> Vec<String> {
        self.items(category).iter().map(|i| i.text.clone()).collect()
    }

    /// All categories as persona data, omitting empty ones.
    #[must_use]
    pub fn persona_data(&self) -> PersonaData {
        self.items
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(c, items)| (*c, items.iter().map(|i| i.text.clone()).collect()))
            .collect()
    }

    /// Total items across categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    /// Whether every category is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
