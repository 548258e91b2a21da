//! Memory kinds and the stores that own them.
//!
//! Four kinds of searchable memory exist: three long-term categories seeded
//! from persona data and the episodic log. Each kind owns exactly one
//! category inside the shared [`VectorIndex`](crate::index::VectorIndex).
//! The short-term buffer is context only and is never searched.

pub mod episodic;
pub mod long_term;
pub mod short_term;

pub use episodic::{EpisodicItem, EpisodicMemoryStore, EpisodicSort};
pub use long_term::{LongTermMemoryStore, MemoryItem, PersonaData, parse_persona};
pub use short_term::ShortTermBuffer;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MnemoError;

/// A searchable memory category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Facts about the persona.
    Facts,
    /// Character traits.
    Traits,
    /// Characteristic phrasing and verbal habits.
    SpeechPatterns,
    /// Notable interaction events.
    Episodic,
}

impl MemoryKind {
    /// Every searchable kind, in the order results are reported.
    pub const ALL: [Self; 4] = [Self::Facts, Self::Traits, Self::SpeechPatterns, Self::Episodic];

    /// The snake_case name used in configuration and serialized output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Facts => "facts",
            Self::Traits => "traits",
            Self::SpeechPatterns => "speech_patterns",
            Self::Episodic => "episodic",
        }
    }

    /// The long-term category this kind maps to, if any.
    #[must_use]
    pub fn as_long_term(self) -> Option<LongTermCategory> {
        match self {
            Self::Facts => Some(LongTermCategory::Facts),
            Self::Traits => Some(LongTermCategory::Traits),
            Self::SpeechPatterns => Some(LongTermCategory::SpeechPatterns),
            Self::Episodic => None,
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryKind {
    type Err = MnemoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facts" => Ok(Self::Facts),
            "traits" => Ok(Self::Traits),
            "speech_patterns" => Ok(Self::SpeechPatterns),
            "episodic" => Ok(Self::Episodic),
            other => Err(MnemoError::UnknownCategory(other.to_string())),
        }
    }
}

/// One of the three fixed long-term categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LongTermCategory {
    /// Facts about the persona.
    Facts,
    /// Character traits.
    Traits,
    /// Characteristic phrasing and verbal habits.
    SpeechPatterns,
}

impl LongTermCategory {
    /// All long-term categories.
    pub const ALL: [Self; 3] = [Self::Facts, Self::Traits, Self::SpeechPatterns];

    /// The index category backing this long-term category.
    #[must_use]
    pub fn kind(self) -> MemoryKind {
        match self {
            Self::Facts => MemoryKind::Facts,
            Self::Traits => MemoryKind::Traits,
            Self::SpeechPatterns => MemoryKind::SpeechPatterns,
        }
    }
}

impl fmt::Display for LongTermCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().as_str())
    }
}

impl FromStr for LongTermCategory {
    type Err = MnemoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemoryKind::from_str(s)?
            .as_long_term()
            .ok_or_else(|| MnemoError::UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_names() {
        for kind in MemoryKind::ALL {
            assert_eq!(kind.as_str().parse::<MemoryKind>().expect("parse"), kind);
        }
        assert!("gossip".parse::<MemoryKind>().is_err());
    }

    #[test]
    fn episodic_is_not_long_term() {
        assert!(MemoryKind::Episodic.as_long_term().is_none());
        assert!("episodic".parse::<LongTermCategory>().is_err());
        assert_eq!(
            "speech_patterns".parse::<LongTermCategory>().expect("parse"),
            LongTermCategory::SpeechPatterns
        );
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&MemoryKind::SpeechPatterns).expect("json");
        assert_eq!(json, "\"speech_patterns\"");
    }
}
