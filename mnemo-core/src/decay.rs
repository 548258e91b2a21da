//! Importance decay for episodic memory.
//!
//! Importance shrinks geometrically with age:
//!
//! ```text
//! importance(age) = max(floor, importance₀ · rate^(age_days / period_days))
//! ```
//!
//! Each pass applies only the time elapsed since the item's previous pass,
//! so repeated passes compose to the closed form above and a pass with zero
//! elapsed time changes nothing. An importance already below the floor is
//! never raised to it.

use crate::config::EpisodicConfig;

/// Decay parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    /// Multiplier applied per period.
    pub rate: f64,
    /// Period length in days.
    pub period_days: f64,
    /// Lower bound decay never crosses.
    pub floor: f64,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            rate: 0.95,
            period_days: 30.0,
            floor: 0.1,
        }
    }
}

impl DecayPolicy {
    /// Policy from the episodic configuration.
    #[must_use]
    pub fn from_config(config: &EpisodicConfig) -> Self {
        Self {
            rate: config.decay_rate,
            period_days: config.decay_period_days,
            floor: config.importance_floor,
        }
    }

    /// Multiplier for `elapsed_days` of decay; 1 for non-positive spans.
    #[must_use]
    pub fn factor(&self, elapsed_days: f64) -> f64 {
        if elapsed_days <= 0.0 || self.period_days <= 0.0 {
            return 1.0;
        }
        self.rate.powf(elapsed_days / self.period_days)
    }

    /// Importance after `elapsed_days` of decay.
    #[must_use]
    pub fn apply(&self, importance: f64, elapsed_days: f64) -> f64 {
        let decayed = importance * self.factor(elapsed_days);
        decayed.max(self.floor.min(importance))
    }
}
