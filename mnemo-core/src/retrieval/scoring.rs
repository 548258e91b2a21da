//! Recency and blended relevance for episodic retrieval.
//!
//! ```text
//! recency  = 1 / (1 + age_days / 30)
//! blended  = ŵs·semantic + ŵi·importance + ŵr·recency
//! ```
//!
//! where `ŵ` are the configured weights normalised to sum to 1. The three
//! inputs are blended as-is even though they live on different scales.

use crate::config::EpisodicConfig;

/// Days over which recency falls to one half.
pub const RECENCY_SCALE_DAYS: f64 = 30.0;

/// `1 / (1 + age_days / 30)`; negative ages count as zero.
#[must_use]
pub fn recency(age_days: f64) -> f64 {
    1.0 / (1.0 + age_days.max(0.0) / RECENCY_SCALE_DAYS)
}

/// Normalised blend weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    /// Weight of semantic relevance.
    pub semantic: f64,
    /// Weight of importance.
    pub importance: f64,
    /// Weight of recency.
    pub recency: f64,
}

impl BlendWeights {
    /// Normalise raw weights so they sum to 1.
    ///
    /// A non-positive sum yields equal thirds.
    #[must_use]
    pub fn normalized(semantic: f64, importance: f64, recency: f64) -> Self {
        let sum = semantic + importance + recency;
        if sum <= 0.0 || !sum.is_finite() {
            return Self {
                semantic: 1.0 / 3.0,
                importance: 1.0 / 3.0,
                recency: 1.0 / 3.0,
            };
        }
        Self {
            semantic: semantic / sum,
            importance: importance / sum,
            recency: recency / sum,
        }
    }

    /// Weights from the episodic configuration.
    #[must_use]
    pub fn from_config(config: &EpisodicConfig) -> Self {
        Self::normalized(config.semantic_weight, config.importance_weight, config.recency_weight)
    }

    /// Weighted sum of the three components.
    #[must_use]
    pub fn blend(&self, semantic: f64, importance: f64, recency: f64) -> f64 {
        self.semantic * semantic + self.importance * importance + self.recency * recency
    }
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self::normalized(0.6, 0.7, 0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recency_curve() {
        assert!((recency(0.0) - 1.0).abs() < f64::EPSILON);
        assert!((recency(30.0) - 0.5).abs() < 1e-12);
        assert!((recency(-5.0) - 1.0).abs() < f64::EPSILON);
        assert!(recency(300.0) < recency(30.0));
    }

    #[test]
    fn default_weights_normalise() {
        let w = BlendWeights::default();
        assert!((w.semantic + w.importance + w.recency - 1.0).abs() < 1e-12);
        assert!((w.semantic - 0.375).abs() < 1e-12);
        assert!((w.importance - 0.4375).abs() < 1e-12);
        assert!((w.recency - 0.1875).abs() < 1e-12);
    }

    #[test]
    fn blend_of_perfect_inputs_is_one() {
        let w = BlendWeights::default();
        assert!((w.blend(1.0, 1.0, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_weights_fall_back_to_thirds() {
        let w = BlendWeights::normalized(0.0, 0.0, 0.0);
        assert!((w.semantic - 1.0 / 3.0).abs() < 1e-12);
    }
}
