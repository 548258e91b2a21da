//! Core type definitions shared across the mnemo crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Identifier of a persona whose memory is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonaId(pub Uuid);

impl PersonaId {
    /// Create a new random persona ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PersonaId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of an episodic item.
///
/// Assigned at insertion from a monotonically increasing counter and never
/// reused, even after the item is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodicId(pub u64);

impl fmt::Display for EpisodicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Embedding Vector
// ---------------------------------------------------------------------------

/// A dense vector embedding produced by an
/// [`EmbeddingProvider`](crate::embedding::EmbeddingProvider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Dimensionality of the embedding.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Euclidean norm of the vector.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Scale the vector to unit length in place.
    ///
    /// Zero vectors are left untouched.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm < f32::EPSILON {
            return;
        }
        for x in &mut self.0 {
            *x /= norm;
        }
    }

    /// Return a unit-length copy of this embedding.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_vector() {
        let e = Embedding(vec![3.0, 4.0]).normalized();
        assert!((e.norm() - 1.0).abs() < 1e-6);
        assert!((e.0[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector() {
        let e = Embedding(vec![0.0, 0.0, 0.0]).normalized();
        assert!(e.0.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn episodic_id_display() {
        assert_eq!(EpisodicId(7).to_string(), "#7");
    }
}
