//! Distance metrics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MnemoError;
use crate::types::Embedding;

/// How two vectors are compared.
///
/// Distances are always "smaller is closer" and never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `1 − cos(a, b)` over L2-normalised vectors, in `[0, 2]`.
    #[default]
    Cosine,
    /// Squared Euclidean distance over raw vectors.
    Euclidean,
}

impl DistanceMetric {
    /// Whether vectors must be L2-normalised before insertion and search.
    #[must_use]
    pub fn normalizes(self) -> bool {
        matches!(self, Self::Cosine)
    }

    /// Bring an embedding into the form this metric expects.
    pub fn prepare(self, embedding: &mut Embedding) {
        if self.normalizes() {
            embedding.normalize();
        }
    }

    /// Distance between two prepared vectors of equal length.
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => (1.0 - dot(a, b)).max(0.0),
            Self::Euclidean => squared_l2(a, b),
        }
    }

    /// Convert a squared L2 distance between prepared vectors to this metric.
    ///
    /// For unit vectors `‖a − b‖² = 2 − 2·cos`, so cosine distance is half of it.
    #[must_use]
    pub fn from_squared_l2(self, d2: f32) -> f32 {
        match self {
            Self::Cosine => (d2 * 0.5).max(0.0),
            Self::Euclidean => d2.max(0.0),
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = MnemoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" | "ip" | "inner_product" => Ok(Self::Cosine),
            "euclidean" | "l2" => Ok(Self::Euclidean),
            other => Err(MnemoError::Config(format!("unknown distance metric '{other}'"))),
        }
    }
}

/// Inner product.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Squared Euclidean distance.
#[must_use]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
