//! Versioned, serialisable memory state.
//!
//! A snapshot carries texts and metadata only. Embeddings and index
//! internals are never persisted; restoring rebuilds every index from text,
//! so the embedding model, not the saved bytes, determines search behaviour.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EpisodicConfig;
use crate::error::{MnemoError, Result};
use crate::index::IndexSettings;
use crate::memory::long_term::PersonaData;
use crate::memory::{EpisodicItem, ShortTermBuffer};

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Byte encoding of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotFormat {
    /// UTF-8 JSON.
    #[default]
    Json,
    /// MessagePack with named fields.
    MessagePack,
}

impl SnapshotFormat {
    /// Stable lowercase name, as stored in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MessagePack => "message_pack",
        }
    }

    /// Parse a stored format name.
    ///
    /// # Errors
    /// Returns [`MnemoError::CorruptSnapshot`] for unknown names.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "json" => Ok(Self::Json),
            "message_pack" => Ok(Self::MessagePack),
            other => Err(MnemoError::CorruptSnapshot(format!("unknown format '{other}'"))),
        }
    }
}

/// Episodic state inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicSnapshot {
    /// Lifecycle settings the items were recorded under.
    pub settings: EpisodicConfig,
    /// Next id to hand out.
    pub next_id: u64,
    /// Items in insertion order.
    pub items: Vec<EpisodicItem>,
}

/// Everything needed to reconstruct a memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Layout version.
    pub version: u32,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Embedding model, index kind and metric.
    pub index: IndexSettings,
    /// Long-term texts per category.
    pub long_term: PersonaData,
    /// Episodic items and settings.
    pub episodic: EpisodicSnapshot,
    /// Recent utterances and buffer capacity.
    pub short_term: ShortTermBuffer,
}

impl MemorySnapshot {
    /// Encode in `format`.
    ///
    /// # Errors
    /// Returns [`MnemoError::Serialization`] if encoding fails.
    pub fn encode(&self, format: SnapshotFormat) -> Result<Vec<u8>> {
        match format {
            SnapshotFormat::Json => serde_json::to_vec(self).map_err(|e| MnemoError::Serialization(e.to_string())),
            SnapshotFormat::MessagePack => {
                rmp_serde::to_vec_named(self).map_err(|e| MnemoError::Serialization(e.to_string()))
            }
        }
    }

    /// Decode bytes written by [`encode`](Self::encode) and validate them.
    ///
    /// # Errors
    /// Returns [`MnemoError::CorruptSnapshot`] if the bytes do not decode or
    /// the decoded snapshot is inconsistent.
    pub fn decode(bytes: &[u8], format: SnapshotFormat) -> Result<Self> {
        let snapshot: Self = match format {
            SnapshotFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| MnemoError::CorruptSnapshot(e.to_string()))?
            }
            SnapshotFormat::MessagePack => {
                rmp_serde::from_slice(bytes).map_err(|e| MnemoError::CorruptSnapshot(e.to_string()))?
            }
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    /// Returns [`MnemoError::CorruptSnapshot`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(MnemoError::CorruptSnapshot(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        let mut seen = HashSet::with_capacity(self.episodic.items.len());
        for item in &self.episodic.items {
            if !seen.insert(item.id) {
                return Err(MnemoError::CorruptSnapshot(format!("duplicate episodic id {}", item.id)));
            }
            if !item.importance.is_finite() {
                return Err(MnemoError::CorruptSnapshot(format!(
                    "episodic {} has non-finite importance",
                    item.id
                )));
            }
        }
        if self.short_term.capacity() == 0 || self.short_term.len() > self.short_term.capacity() {
            return Err(MnemoError::CorruptSnapshot(
                "short-term buffer capacity is zero or exceeded".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DistanceMetric, IndexKind};
    use crate::memory::LongTermCategory;
    use crate::types::EpisodicId;

    fn sample() -> MemorySnapshot {
        let now = Utc::now();
        let mut long_term = PersonaData::new();
        long_term.insert(LongTermCategory::Facts, vec!["I fish at dawn".into()]);
        let mut short_term = ShortTermBuffer::new(4);
        short_term.push("hello there");
        MemorySnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: now,
            index: IndexSettings {
                embedding_model: "hashing-bow-64".into(),
                index_kind: IndexKind::Flat,
                metric: DistanceMetric::Cosine,
            },
            long_term,
            episodic: EpisodicSnapshot {
                settings: EpisodicConfig::default(),
                next_id: 8,
                items: vec![EpisodicItem {
                    id: EpisodicId(7),
                    text: "Lost a bet".into(),
                    created_at: now,
                    importance: 0.4,
                    category: Some("games".into()),
                    emotion: Some("annoyed".into()),
                    access_count: 2,
                    last_decayed_at: None,
                }],
            },
            short_term,
        }
    }

    #[test]
    fn json_round_trip() {
        let snap = sample();
        let bytes = snap.encode(SnapshotFormat::Json).expect("encode");
        assert_eq!(MemorySnapshot::decode(&bytes, SnapshotFormat::Json).expect("decode"), snap);
    }

    #[test]
    fn message_pack_round_trip() {
        let snap = sample();
        let bytes = snap.encode(SnapshotFormat::MessagePack).expect("encode");
        assert_eq!(MemorySnapshot::decode(&bytes, SnapshotFormat::MessagePack).expect("decode"), snap);
    }

    #[test]
    fn garbage_is_corrupt() {
        let err = MemorySnapshot::decode(b"{not json", SnapshotFormat::Json).expect_err("must fail");
        assert!(matches!(err, MnemoError::CorruptSnapshot(_)));
        let err = MemorySnapshot::decode(&[0xc1, 0x00], SnapshotFormat::MessagePack).expect_err("must fail");
        assert!(matches!(err, MnemoError::CorruptSnapshot(_)));
    }

    #[test]
    fn validation_rejects_inconsistencies() {
        let mut snap = sample();
        snap.version = 99;
        assert!(snap.validate().is_err());

        let mut snap = sample();
        let dup = snap.episodic.items[0].clone();
        snap.episodic.items.push(dup);
        assert!(snap.validate().is_err());
    }

    #[test]
    fn format_names() {
        for format in [SnapshotFormat::Json, SnapshotFormat::MessagePack] {
            assert_eq!(SnapshotFormat::from_name(format.as_str()).expect("parse"), format);
        }
        assert!(SnapshotFormat::from_name("yaml").is_err());
    }
}
