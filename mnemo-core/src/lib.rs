//! # mnemo Core Library
//!
//! Hybrid memory retrieval for a conversational character. A persona's
//! knowledge is split into three kinds of memory:
//!
//! - **Long-term**: static facts, traits and speech patterns seeded once
//!   from persona data.
//! - **Episodic**: a bounded, decaying log of notable interaction events,
//!   weighted by importance and recency.
//! - **Short-term**: the last few raw utterances, used verbatim as context.
//!
//! Retrieval embeds the query, finds nearest neighbours per category in a
//! [`VectorIndex`], converts raw distances into bounded relevance values and,
//! for episodic memory, blends semantic relevance with importance and recency.
//!
//! The single entry point for an agent is [`MemoryManager`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mnemo_core::{MemoryManager, MnemoConfig, MemoryKind, RelevanceMethod};
//! use mnemo_core::embedding::HashingEmbeddingProvider;
//!
//! let provider = Arc::new(HashingEmbeddingProvider::new(64));
//! let mut memory = MemoryManager::new(MnemoConfig::default(), provider);
//!
//! let id = memory.add_episodic("Told a secret about the lighthouse", 0.9, Some("private"), None);
//! assert!(id.is_some());
//!
//! let found = memory.retrieve_relevant("secret", &[MemoryKind::Episodic], 1, RelevanceMethod::Sigmoid, 0.2);
//! assert_eq!(found[&MemoryKind::Episodic].len(), 1);
//! ```

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod clock;
pub mod config;
pub mod decay;
pub mod embedding;
pub mod error;
pub mod eviction;
pub mod index;
pub mod logging;
pub mod manager;
pub mod memory;
pub mod metrics;
pub mod persistence;
pub mod retrieval;
pub mod snapshot;
pub mod types;

pub use config::MnemoConfig;
pub use error::MnemoError;
pub use index::VectorIndex;
pub use manager::{MemoryManager, RestoreOutcome};
pub use memory::{LongTermCategory, MemoryKind, PersonaData};
pub use persistence::PersistenceEngine;
pub use retrieval::relevance::RelevanceMethod;
pub use retrieval::{RetrievalMap, RetrievedMemory};
pub use snapshot::{MemorySnapshot, SnapshotFormat};
pub use types::*;
