//! Core data model types for reforge.
//!
//! These are the read-only catalog and statistics records the scoring and
//! composition engine works over. Persistence of these records is owned by
//! whoever calls the core; here they are plain values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type ProblemId = i64;
pub type PatternId = i64;

/// Problem difficulty as tagged in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "med" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Result of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passed" | "pass" => Ok(Outcome::Passed),
            "failed" | "fail" => Ok(Outcome::Failed),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

/// A practice problem from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    pub title: String,
    pub difficulty: Difficulty,
    /// Patterns this problem is tagged with.
    #[serde(default)]
    pub patterns: Vec<PatternId>,
}

/// A grouping tag such as "sliding window".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    pub title: String,
}

/// Spaced-repetition state of one problem for one user.
///
/// Created by the scheduler on the first attempt and replaced on every
/// following one. Never mutated in place by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProblemReviewState {
    pub user_id: UserId,
    pub problem_id: ProblemId,
    /// Self-reported confidence, 0..=100.
    pub confidence: u8,
    pub total_attempts: u32,
    #[serde(default)]
    pub avg_time_seconds: Option<u32>,
    #[serde(default)]
    pub last_outcome: Option<Outcome>,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub next_review_at: DateTime<Utc>,
    pub last_attempt_at: DateTime<Utc>,
}

impl UserProblemReviewState {
    /// Whole and fractional days elapsed since the last attempt, never negative.
    pub fn days_since_last_attempt(&self, as_of: DateTime<Utc>) -> f64 {
        let seconds = (as_of - self.last_attempt_at).num_seconds().max(0);
        seconds as f64 / 86_400.0
    }
}

/// Aggregate per-pattern statistics for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPatternStats {
    pub user_id: UserId,
    pub pattern_id: PatternId,
    #[serde(default)]
    pub times_revised: u32,
    /// Mean confidence across the pattern's attempted problems, 0..=100.
    pub avg_confidence: u8,
}

/// Everything the core needs to know about one user at one instant.
///
/// `as_of` is the clock used for every "days since" computation, which keeps
/// session generation a pure function of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub user_id: UserId,
    pub as_of: DateTime<Utc>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub review_states: Vec<UserProblemReviewState>,
    #[serde(default)]
    pub pattern_stats: Vec<UserPatternStats>,
}

impl Snapshot {
    pub fn problem(&self, id: ProblemId) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }

    pub fn review_state(&self, problem_id: ProblemId) -> Option<&UserProblemReviewState> {
        self.review_states
            .iter()
            .find(|s| s.problem_id == problem_id)
    }

    /// Review states keyed by problem id.
    pub fn review_state_index(&self) -> BTreeMap<ProblemId, &UserProblemReviewState> {
        self.review_states
            .iter()
            .map(|s| (s.problem_id, s))
            .collect()
    }

    /// Pattern stats keyed by pattern id.
    pub fn pattern_stats_index(&self) -> BTreeMap<PatternId, &UserPatternStats> {
        self.pattern_stats
            .iter()
            .map(|s| (s.pattern_id, s))
            .collect()
    }

    /// Insert or replace the review state for its problem.
    pub fn upsert_review_state(&mut self, state: UserProblemReviewState) {
        match self
            .review_states
            .iter_mut()
            .find(|s| s.problem_id == state.problem_id)
        {
            Some(existing) => *existing = state,
            None => self.review_states.push(state),
        }
    }

    /// Insert or replace the stats for their pattern.
    pub fn upsert_pattern_stats(&mut self, stats: UserPatternStats) {
        match self
            .pattern_stats
            .iter_mut()
            .find(|s| s.pattern_id == stats.pattern_id)
        {
            Some(existing) => *existing = stats,
            None => self.pattern_stats.push(stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Hard.to_string(), "hard");
        assert_eq!("Easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("med".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn outcome_parse() {
        assert_eq!("PASSED".parse::<Outcome>().unwrap(), Outcome::Passed);
        assert_eq!("fail".parse::<Outcome>().unwrap(), Outcome::Failed);
        assert!("skipped".parse::<Outcome>().is_err());
    }

    #[test]
    fn days_since_is_never_negative() {
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let state = UserProblemReviewState {
            user_id: 1,
            problem_id: 1,
            confidence: 50,
            total_attempts: 1,
            avg_time_seconds: None,
            last_outcome: Some(Outcome::Passed),
            ease_factor: 2.5,
            interval_days: 1,
            next_review_at: at,
            last_attempt_at: at,
        };
        let earlier = Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(state.days_since_last_attempt(earlier), 0.0);
        let later = Utc.with_ymd_and_hms(2026, 3, 12, 0, 0, 0).unwrap();
        assert!((state.days_since_last_attempt(later) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn upsert_replaces_existing_state() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut snapshot = Snapshot {
            user_id: 1,
            as_of: at,
            patterns: vec![],
            problems: vec![],
            review_states: vec![],
            pattern_stats: vec![],
        };
        let mut state = UserProblemReviewState {
            user_id: 1,
            problem_id: 7,
            confidence: 10,
            total_attempts: 1,
            avg_time_seconds: None,
            last_outcome: None,
            ease_factor: 2.5,
            interval_days: 1,
            next_review_at: at,
            last_attempt_at: at,
        };
        snapshot.upsert_review_state(state.clone());
        state.confidence = 90;
        snapshot.upsert_review_state(state);
        assert_eq!(snapshot.review_states.len(), 1);
        assert_eq!(snapshot.review_state(7).unwrap().confidence, 90);
    }
}
