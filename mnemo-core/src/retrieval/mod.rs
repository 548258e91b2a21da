//! Retrieval results and scoring.

pub mod relevance;
pub mod scoring;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::memory::{LongTermCategory, MemoryKind};
use crate::types::EpisodicId;

/// A long-term knowledge match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongTermHit {
    /// Category the text belongs to.
    pub category: LongTermCategory,
    /// Matched text.
    pub text: String,
    /// Relevance in `(0, 1]`.
    pub relevance: f32,
    /// Raw distance.
    pub distance: f32,
}

/// An episodic match with its metadata after retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodicHit {
    /// Stable item id.
    pub id: EpisodicId,
    /// Event text.
    pub text: String,
    /// Blended relevance (semantic, importance, recency).
    pub relevance: f64,
    /// Semantic component alone.
    pub semantic_relevance: f32,
    /// Raw distance.
    pub distance: f32,
    /// Importance at retrieval time.
    pub importance: f64,
    /// Free-form category label.
    pub category: Option<String>,
    /// Free-form emotion label.
    pub emotion: Option<String>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
    /// Age at retrieval time, in days.
    pub age_days: f64,
    /// Access count including this retrieval.
    pub access_count: u64,
}

/// One retrieved memory of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetrievedMemory {
    /// Persona knowledge.
    LongTerm(LongTermHit),
    /// Interaction event.
    Episodic(EpisodicHit),
}

impl RetrievedMemory {
    /// The memory text.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::LongTerm(h) => &h.text,
            Self::Episodic(h) => &h.text,
        }
    }

    /// Relevance used for filtering and ordering.
    #[must_use]
    pub fn relevance(&self) -> f64 {
        match self {
            Self::LongTerm(h) => f64::from(h.relevance),
            Self::Episodic(h) => h.relevance,
        }
    }

    /// The episodic payload, if any.
    #[must_use]
    pub fn as_episodic(&self) -> Option<&EpisodicHit> {
        match self {
            Self::Episodic(h) => Some(h),
            Self::LongTerm(_) => None,
        }
    }
}

/// Results keyed by memory kind; kinds without results are absent.
pub type RetrievalMap = BTreeMap<MemoryKind, Vec<RetrievedMemory>>;
