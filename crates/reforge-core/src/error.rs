//! Configuration error types.
//!
//! Malformed session configuration is the only hard failure the core
//! reports. It is detected before any scoring or composition starts and is
//! meant to be surfaced to the caller verbatim. Empty or degraded sessions are
//! not errors; see `SessionPlan`.

use thiserror::Error;

use crate::templates::PatternMode;

/// Errors raised while validating a session configuration or weight vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Session duration must be a positive number of minutes.
    #[error("duration_min must be greater than 0")]
    NonPositiveDuration,

    /// One difficulty bucket is outside 0..=100.
    #[error("{bucket} percentage must be between 0 and 100, got {value}")]
    DistributionOutOfRange { bucket: &'static str, value: f64 },

    /// The three difficulty percentages do not add up to 100.
    #[error("difficulty distribution must sum to 100 (±1), got {sum}")]
    DistributionSum { sum: f64 },

    /// Pattern cap below one would admit nothing.
    #[error("max_same_pattern must be at least 1, got {0}")]
    MaxSamePattern(u32),

    /// Weakest-pattern mode needs at least one pattern to keep.
    #[error("weakest_pattern_count must be at least 1, got {0}")]
    WeakestPatternCount(u32),

    /// A pattern mode that selects by id was given no ids.
    #[error("pattern_mode '{0}' requires at least one pattern id")]
    MissingPatternIds(PatternMode),

    /// Confidence range bounds are reversed or above 100.
    #[error("confidence range {min}..={max} is invalid")]
    ConfidenceRange { min: u8, max: u8 },

    /// Scoring weights cannot be rescaled to sum to 1.
    #[error("invalid scoring weights: {0}")]
    InvalidWeights(String),

    /// The requested preset does not exist.
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
}
