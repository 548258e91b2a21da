//! Retention scoring and victim selection for capacity-bounded eviction.
//!
//! ```text
//! retention = 0.7·importance + 0.2·recency + 0.1·min(1, access_count / (1 + age_days))
//! ```
//!
//! with `recency = 1 / (1 + age_days / 30)`. The lowest-scoring items go
//! first; equal scores evict the older item.

use ordered_float::OrderedFloat;

use crate::retrieval::scoring::recency;

/// Weight of importance in the retention score.
pub const IMPORTANCE_WEIGHT: f64 = 0.7;
/// Weight of recency in the retention score.
pub const RECENCY_WEIGHT: f64 = 0.2;
/// Weight of access frequency in the retention score.
pub const ACCESS_WEIGHT: f64 = 0.1;

/// Retention score of one item.
#[must_use]
pub fn retention_score(importance: f64, age_days: f64, access_count: u64) -> f64 {
    let age = age_days.max(0.0);
    let frequency = (access_count as f64 / (1.0 + age)).min(1.0);
    IMPORTANCE_WEIGHT * importance + RECENCY_WEIGHT * recency(age) + ACCESS_WEIGHT * frequency
}

/// Positions of the `excess` lowest-scoring entries, in ascending position order.
///
/// `scores` must be in insertion order.
#[must_use]
pub fn select_victims(scores: &[f64], excess: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by_key(|&i| OrderedFloat(scores[i]));
    let mut victims: Vec<usize> = order.into_iter().take(excess).collect();
    victims.sort_unstable();
    victims
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_unaccessed_score() {
        let s = retention_score(0.5, 0.0, 0);
        assert!((s - (0.35 + 0.2)).abs() < 1e-12);
    }

    #[test]
    fn access_term_saturates() {
        let a = retention_score(0.5, 0.0, 1);
        let b = retention_score(0.5, 0.0, 50);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn lowest_scores_are_selected() {
        let victims = select_victims(&[0.9, 0.1, 0.5, 0.2], 2);
        assert_eq!(victims, vec![1, 3]);
    }

    #[test]
    fn ties_evict_older_first() {
        let victims = select_victims(&[0.3, 0.3, 0.3], 1);
        assert_eq!(victims, vec![0]);
    }

    #[test]
    fn no_excess_no_victims() {
        assert!(select_victims(&[0.1, 0.2], 0).is_empty());
    }
}
