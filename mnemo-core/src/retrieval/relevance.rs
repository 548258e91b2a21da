//! Distance → relevance mappings.
//!
//! All three are non-increasing in `d ≥ 0`, equal or close to 1 at `d = 0`,
//! and stay within `(0, 1]`. Results are clamped to `f32::MIN_POSITIVE` so
//! very large distances never collapse to exactly zero.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Sigmoid steepness.
pub const SIGMOID_STEEPNESS: f32 = 5.0;
/// Distance at which the sigmoid yields 0.5.
pub const SIGMOID_MIDPOINT: f32 = 1.0;

/// How a raw distance becomes a relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceMethod {
    /// `1 / (1 + d)`
    Inverse,
    /// `e^(−d)`
    Exponential,
    /// `1 / (1 + e^(5·(d − 1)))`
    #[default]
    Sigmoid,
}

impl RelevanceMethod {
    /// Every method, in declaration order.
    pub const ALL: [Self; 3] = [Self::Inverse, Self::Exponential, Self::Sigmoid];

    /// Score a distance.
    #[must_use]
    pub fn score(self, distance: f32) -> f32 {
        match self {
            Self::Inverse => inverse(distance),
            Self::Exponential => exponential(distance),
            Self::Sigmoid => sigmoid(distance),
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inverse => "inverse",
            Self::Exponential => "exponential",
            Self::Sigmoid => "sigmoid",
        }
    }
}

impl fmt::Display for RelevanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised names fall back to [`RelevanceMethod::Inverse`].
impl FromStr for RelevanceMethod {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "inverse" => Self::Inverse,
            "exponential" => Self::Exponential,
            "sigmoid" => Self::Sigmoid,
            other => {
                tracing::warn!(method = other, "unknown relevance method, using inverse");
                Self::Inverse
            }
        })
    }
}

fn sanitize(d: f32) -> f32 {
    if d.is_nan() { 0.0 } else { d.max(0.0) }
}

fn bounded(r: f64) -> f32 {
    #[allow(clippy::cast_possible_truncation)]
    let r = r as f32;
    r.clamp(f32::MIN_POSITIVE, 1.0)
}

/// `1 / (1 + d)`
#[must_use]
pub fn inverse(distance: f32) -> f32 {
    let d = f64::from(sanitize(distance));
    bounded(1.0 / (1.0 + d))
}

/// `e^(−d)`
#[must_use]
pub fn exponential(distance: f32) -> f32 {
    let d = f64::from(sanitize(distance));
    bounded((-d).exp())
}

/// `1 / (1 + e^(5·(d − 1)))`
#[must_use]
pub fn sigmoid(distance: f32) -> f32 {
    let d = f64::from(sanitize(distance));
    let z = f64::from(SIGMOID_STEEPNESS) * (d - f64::from(SIGMOID_MIDPOINT));
    bounded(1.0 / (1.0 + z.exp()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_values() {
        assert_eq!(sigmoid(1.0), 0.5);
        assert_eq!(inverse(0.0), 1.0);
        assert_eq!(exponential(0.0), 1.0);
        assert!(sigmoid(0.0) > 0.99);
        assert!((inverse(1.0) - 0.5).abs() < 1e-7);
    }

    #[test]
    fn huge_distances_stay_positive() {
        for method in RelevanceMethod::ALL {
            let r = method.score(1.0e6);
            assert!(r > 0.0, "{method} collapsed to zero");
        }
    }

    #[test]
    fn negative_and_nan_distances_are_treated_as_zero() {
        assert_eq!(inverse(-3.0), 1.0);
        assert_eq!(exponential(f32::NAN), 1.0);
    }

    #[test]
    fn unknown_name_falls_back_to_inverse() {
        let parsed: RelevanceMethod = "cubic".parse().unwrap_or(RelevanceMethod::Sigmoid);
        assert_eq!(parsed, RelevanceMethod::Inverse);
        let parsed: RelevanceMethod = "Exponential".parse().unwrap_or(RelevanceMethod::Sigmoid);
        assert_eq!(parsed, RelevanceMethod::Exponential);
    }

    #[test]
    fn methods_are_non_increasing() {
        for method in RelevanceMethod::ALL {
            let mut prev = method.score(0.0);
            for step in 1..400 {
                #[allow(clippy::cast_precision_loss)]
                let r = method.score(step as f32 * 0.05);
                assert!(r <= prev, "{method} increased at step {step}");
                prev = r;
            }
        }
    }
}
