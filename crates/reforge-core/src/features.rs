//! Feature extraction.
//!
//! Turns raw per-problem and per-pattern statistics into seven normalized
//! features in `[0, 1]`. Missing statistics are a valid state and map to
//! fixed defaults; extraction never fails.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, Outcome, UserPatternStats, UserProblemReviewState};

/// The seven scoring features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    ConfidenceGap,
    DaysSince,
    Attempts,
    Time,
    Difficulty,
    LastFailed,
    PatternWeakness,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 7] = [
        FeatureKind::ConfidenceGap,
        FeatureKind::DaysSince,
        FeatureKind::Attempts,
        FeatureKind::Time,
        FeatureKind::Difficulty,
        FeatureKind::LastFailed,
        FeatureKind::PatternWeakness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureKind::ConfidenceGap => "confidence_gap",
            FeatureKind::DaysSince => "days_since",
            FeatureKind::Attempts => "attempts",
            FeatureKind::Time => "time",
            FeatureKind::Difficulty => "difficulty",
            FeatureKind::LastFailed => "last_failed",
            FeatureKind::PatternWeakness => "pattern_weakness",
        }
    }

    /// Rank used to break ties between equal contributions; lower wins.
    pub fn tie_rank(self) -> u8 {
        match self {
            FeatureKind::ConfidenceGap => 0,
            FeatureKind::LastFailed => 1,
            FeatureKind::DaysSince => 2,
            FeatureKind::PatternWeakness => 3,
            FeatureKind::Difficulty => 4,
            FeatureKind::Attempts => 5,
            FeatureKind::Time => 6,
        }
    }

    /// Fixed user-facing phrase for the "reason" string.
    pub fn phrase(self) -> &'static str {
        match self {
            FeatureKind::ConfidenceGap => "low confidence",
            FeatureKind::DaysSince => "due for review",
            FeatureKind::Attempts => "needs more practice",
            FeatureKind::Time => "long solve time",
            FeatureKind::Difficulty => "high difficulty",
            FeatureKind::LastFailed => "failed last attempt",
            FeatureKind::PatternWeakness => "weak pattern",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized feature vector for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Features {
    pub confidence_gap: f64,
    pub days_since: f64,
    pub attempts: f64,
    pub time: f64,
    pub difficulty: f64,
    pub last_failed: f64,
    pub pattern_weakness: f64,
}

impl Features {
    pub fn get(&self, kind: FeatureKind) -> f64 {
        match kind {
            FeatureKind::ConfidenceGap => self.confidence_gap,
            FeatureKind::DaysSince => self.days_since,
            FeatureKind::Attempts => self.attempts,
            FeatureKind::Time => self.time,
            FeatureKind::Difficulty => self.difficulty,
            FeatureKind::LastFailed => self.last_failed,
            FeatureKind::PatternWeakness => self.pattern_weakness,
        }
    }
}

/// Caps used to normalize unbounded statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Average solve time at which the time feature saturates.
    #[serde(default = "default_time_cap")]
    pub time_cap_seconds: u32,
    /// Days without an attempt at which the recency feature saturates.
    #[serde(default = "default_days_cap")]
    pub days_cap: u32,
}

fn default_time_cap() -> u32 {
    1800
}

fn default_days_cap() -> u32 {
    30
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            time_cap_seconds: default_time_cap(),
            days_cap: default_days_cap(),
        }
    }
}

/// Pure feature extractor.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Extract features for one problem.
    ///
    /// `pattern_stats` holds the stats of every pattern the problem is tagged
    /// with that has stats; weakness is averaged across them.
    pub fn extract(
        &self,
        state: Option<&UserProblemReviewState>,
        difficulty: Difficulty,
        pattern_stats: &[&UserPatternStats],
        as_of: DateTime<Utc>,
    ) -> Features {
        let confidence = state.map(|s| s.confidence.min(100)).unwrap_or(0);
        let confidence_gap = 1.0 - f64::from(confidence) / 100.0;

        let days_since = match state {
            Some(s) => {
                let cap = f64::from(self.config.days_cap.max(1));
                s.days_since_last_attempt(as_of).min(cap) / cap
            }
            None => 1.0,
        };

        let total_attempts = state.map(|s| s.total_attempts).unwrap_or(0);
        let attempts = 1.0 / (1.0 + f64::from(total_attempts));

        let time = match (state.and_then(|s| s.avg_time_seconds), self.config.time_cap_seconds) {
            (Some(avg), cap) if cap > 0 => f64::from(avg.min(cap)) / f64::from(cap),
            _ => 0.0,
        };

        let difficulty = match difficulty {
            Difficulty::Easy => 0.0,
            Difficulty::Medium => 0.5,
            Difficulty::Hard => 1.0,
        };

        let last_failed = match state {
            None => 0.5,
            Some(s) if s.total_attempts == 0 => 0.5,
            Some(s) => match s.last_outcome {
                Some(Outcome::Failed) => 1.0,
                Some(Outcome::Passed) => 0.0,
                None => 0.5,
            },
        };

        let pattern_weakness = if pattern_stats.is_empty() {
            0.0
        } else {
            let total: f64 = pattern_stats
                .iter()
                .map(|ps| 1.0 - f64::from(ps.avg_confidence.min(100)) / 100.0)
                .sum();
            total / pattern_stats.len() as f64
        };

        Features {
            confidence_gap: clamp_unit(confidence_gap),
            days_since: clamp_unit(days_since),
            attempts: clamp_unit(attempts),
            time: clamp_unit(time),
            difficulty,
            last_failed,
            pattern_weakness: clamp_unit(pattern_weakness),
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}
