//! Priority scoring.
//!
//! A candidate's priority is the weighted sum of its normalized features:
//!
//! score = Σ weight_i × feature_i
//!
//! Weights are normalized to sum to 1 first, so for features in `[0, 1]` the
//! score is also in `[0, 1]`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::features::{FeatureKind, Features};

/// Weight vector over the seven features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub confidence: f64,
    pub days_since: f64,
    pub attempts: f64,
    pub time: f64,
    pub difficulty: f64,
    pub last_failed: f64,
    pub pattern_weakness: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            confidence: 0.30,
            days_since: 0.20,
            attempts: 0.10,
            time: 0.05,
            difficulty: 0.15,
            last_failed: 0.10,
            pattern_weakness: 0.10,
        }
    }
}

impl ScoringWeights {
    /// Allowed deviation of the weight sum from 1 before rescaling.
    pub const TOLERANCE: f64 = 1e-6;

    pub fn get(&self, kind: FeatureKind) -> f64 {
        match kind {
            FeatureKind::ConfidenceGap => self.confidence,
            FeatureKind::DaysSince => self.days_since,
            FeatureKind::Attempts => self.attempts,
            FeatureKind::Time => self.time,
            FeatureKind::Difficulty => self.difficulty,
            FeatureKind::LastFailed => self.last_failed,
            FeatureKind::PatternWeakness => self.pattern_weakness,
        }
    }

    fn get_mut(&mut self, kind: FeatureKind) -> &mut f64 {
        match kind {
            FeatureKind::ConfidenceGap => &mut self.confidence,
            FeatureKind::DaysSince => &mut self.days_since,
            FeatureKind::Attempts => &mut self.attempts,
            FeatureKind::Time => &mut self.time,
            FeatureKind::Difficulty => &mut self.difficulty,
            FeatureKind::LastFailed => &mut self.last_failed,
            FeatureKind::PatternWeakness => &mut self.pattern_weakness,
        }
    }

    pub fn sum(&self) -> f64 {
        FeatureKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    /// Rescale proportionally so the weights sum to 1.
    ///
    /// Returns a warning alongside the weights when rescaling was needed.
    /// Negative, non-finite or all-zero weights cannot be rescaled.
    pub fn normalized(
        &self,
    ) -> Result<(ScoringWeights, Option<WeightNormalizationWarning>), ConfigError> {
        for kind in FeatureKind::ALL {
            let w = self.get(kind);
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::InvalidWeights(format!(
                    "weight for {kind} must be a non-negative number, got {w}"
                )));
            }
        }

        let sum = self.sum();
        if sum <= 0.0 {
            return Err(ConfigError::InvalidWeights(
                "weights sum to zero".to_string(),
            ));
        }
        if (sum - 1.0).abs() <= Self::TOLERANCE {
            return Ok((*self, None));
        }

        let mut scaled = *self;
        for kind in FeatureKind::ALL {
            *scaled.get_mut(kind) /= sum;
        }
        Ok((scaled, Some(WeightNormalizationWarning { original_sum: sum })))
    }

    /// Apply a scoring emphasis and renormalize.
    pub fn with_emphasis(&self, emphasis: ScoringEmphasis) -> Result<ScoringWeights, ConfigError> {
        let mut w = *self;
        match emphasis {
            ScoringEmphasis::Standard => return Ok(w),
            ScoringEmphasis::Confidence => w.confidence *= 2.0,
            ScoringEmphasis::Failure => w.last_failed *= 2.0,
            ScoringEmphasis::Time => w.time *= 3.0,
        }
        let (w, _) = w.normalized()?;
        Ok(w)
    }
}

/// Which feature a session should lean on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringEmphasis {
    #[default]
    Standard,
    Confidence,
    Failure,
    Time,
}

impl fmt::Display for ScoringEmphasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringEmphasis::Standard => write!(f, "standard"),
            ScoringEmphasis::Confidence => write!(f, "confidence"),
            ScoringEmphasis::Failure => write!(f, "failure"),
            ScoringEmphasis::Time => write!(f, "time"),
        }
    }
}

impl FromStr for ScoringEmphasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(ScoringEmphasis::Standard),
            "confidence" => Ok(ScoringEmphasis::Confidence),
            "failure" => Ok(ScoringEmphasis::Failure),
            "time" => Ok(ScoringEmphasis::Time),
            other => Err(format!("unknown scoring emphasis: {other}")),
        }
    }
}

/// Weights did not sum to 1 and were rescaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightNormalizationWarning {
    /// Sum of the weights as supplied.
    pub original_sum: f64,
}

impl fmt::Display for WeightNormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scoring weights summed to {:.6}, rescaled to 1.0",
            self.original_sum
        )
    }
}

/// One row of a score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    pub feature: FeatureKind,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

/// A computed priority with its explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: f64,
    /// Sorted by contribution, largest first.
    pub breakdown: Vec<FeatureContribution>,
    pub reason: String,
}

/// Combines features with a normalized weight vector.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    weights: ScoringWeights,
    warning: Option<WeightNormalizationWarning>,
}

impl ScoringEngine {
    /// Build an engine, rescaling the weights if they do not sum to 1.
    pub fn new(weights: ScoringWeights) -> Result<Self, ConfigError> {
        let (weights, warning) = weights.normalized()?;
        if let Some(w) = &warning {
            tracing::warn!("{w}");
        }
        Ok(Self { weights, warning })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn warning(&self) -> Option<&WeightNormalizationWarning> {
        self.warning.as_ref()
    }

    pub fn score(&self, features: &Features) -> Score {
        let mut breakdown: Vec<FeatureContribution> = FeatureKind::ALL
            .iter()
            .map(|&kind| {
                let value = features.get(kind);
                let weight = self.weights.get(kind);
                FeatureContribution {
                    feature: kind,
                    value,
                    weight,
                    contribution: weight * value,
                }
            })
            .collect();
        breakdown.sort_by(compare_contributions);

        let value = breakdown
            .iter()
            .map(|c| c.contribution)
            .sum::<f64>()
            .clamp(0.0, 1.0);
        let reason = build_reason(&breakdown);

        Score {
            value,
            breakdown,
            reason,
        }
    }
}

/// Larger contribution first; equal contributions fall back to feature priority.
fn compare_contributions(a: &FeatureContribution, b: &FeatureContribution) -> Ordering {
    b.contribution
        .total_cmp(&a.contribution)
        .then_with(|| a.feature.tie_rank().cmp(&b.feature.tie_rank()))
}

/// Build the reason string from a sorted breakdown.
///
/// The top feature is always named. The runner-up is added when it carries
/// at least half of the top contribution.
pub fn build_reason(breakdown: &[FeatureContribution]) -> String {
    let Some(top) = breakdown.first().filter(|c| c.contribution > 0.0) else {
        return "needs review".to_string();
    };

    match breakdown.get(1) {
        Some(second) if second.contribution > 0.0 && second.contribution * 2.0 >= top.contribution => {
            format!("{}, {}", top.feature.phrase(), second.feature.phrase())
        }
        _ => top.feature.phrase().to_string(),
    }
}
