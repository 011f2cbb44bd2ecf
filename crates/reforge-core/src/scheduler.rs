//! Spaced-repetition review scheduling.
//!
//! Each problem moves through `New → Scheduled → Due → Reviewing` and back to
//! `Scheduled` after an attempt. A pass grows the interval by the ease factor;
//! a failure resets it to one day. The update is a pure function of the old
//! state and the attempt, and never fails: out-of-range inputs are clamped.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    Outcome, PatternId, Problem, ProblemId, Snapshot, UserId, UserPatternStats,
    UserProblemReviewState,
};

/// Lowest ease factor a problem can reach.
pub const MIN_EASE_FACTOR: f64 = 1.3;
/// Highest ease factor a problem can reach. New problems start here.
pub const MAX_EASE_FACTOR: f64 = 2.5;
/// Upper bound on the review interval.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

const PASS_EASE_STEP: f64 = 0.1;
const FAIL_EASE_STEP: f64 = 0.2;

/// A completed attempt as reported by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub user_id: UserId,
    pub problem_id: ProblemId,
    pub outcome: Outcome,
    /// Confidence the user reported after the attempt, 0..=100.
    pub confidence_score: u8,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    pub performed_at: DateTime<Utc>,
}

/// Where a problem sits in the review cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewPhase {
    /// Never attempted.
    New,
    /// Attempted, next review in the future.
    Scheduled,
    /// Next review date has passed.
    Due,
    /// An attempt is in progress.
    Reviewing,
}

impl fmt::Display for ReviewPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewPhase::New => write!(f, "new"),
            ReviewPhase::Scheduled => write!(f, "scheduled"),
            ReviewPhase::Due => write!(f, "due"),
            ReviewPhase::Reviewing => write!(f, "reviewing"),
        }
    }
}

/// Classify a problem's phase at `as_of`.
pub fn phase(
    state: Option<&UserProblemReviewState>,
    in_progress: bool,
    as_of: DateTime<Utc>,
) -> ReviewPhase {
    if in_progress {
        return ReviewPhase::Reviewing;
    }
    match state {
        None => ReviewPhase::New,
        Some(s) if s.total_attempts == 0 => ReviewPhase::New,
        Some(s) if as_of >= s.next_review_at => ReviewPhase::Due,
        Some(_) => ReviewPhase::Scheduled,
    }
}

/// Fresh state for a problem that has never been attempted.
pub fn initial_state(user_id: UserId, problem_id: ProblemId, at: DateTime<Utc>) -> UserProblemReviewState {
    UserProblemReviewState {
        user_id,
        problem_id,
        confidence: 0,
        total_attempts: 0,
        avg_time_seconds: None,
        last_outcome: None,
        ease_factor: MAX_EASE_FACTOR,
        interval_days: 1,
        next_review_at: at,
        last_attempt_at: at,
    }
}

/// Compute the state that follows `attempt`.
///
/// `old` is `None` on the first attempt.
pub fn advance(old: Option<&UserProblemReviewState>, attempt: &Attempt) -> UserProblemReviewState {
    let old = old
        .cloned()
        .unwrap_or_else(|| initial_state(attempt.user_id, attempt.problem_id, attempt.performed_at));
    let ease = clamp_ease(old.ease_factor);
    let interval = old.interval_days.clamp(1, MAX_INTERVAL_DAYS);

    let (ease_factor, interval_days) = match attempt.outcome {
        Outcome::Passed => {
            let ease = clamp_ease(ease + PASS_EASE_STEP);
            let grown = (f64::from(interval) * ease).round();
            let grown = if grown >= f64::from(MAX_INTERVAL_DAYS) {
                MAX_INTERVAL_DAYS
            } else {
                (grown as u32).max(1)
            };
            (ease, grown)
        }
        Outcome::Failed => (clamp_ease(ease - FAIL_EASE_STEP), 1),
    };

    let reported = i32::from(attempt.confidence_score.min(100));
    let current = i32::from(old.confidence.min(100));
    let delta = reported - current;
    let confidence = (current + delta).clamp(0, 100) as u8;

    let avg_time_seconds = match (attempt.duration_seconds, old.avg_time_seconds) {
        (Some(d), Some(avg)) if old.total_attempts > 0 => {
            let n = u64::from(old.total_attempts);
            let mean = (u64::from(avg) * n + u64::from(d)) as f64 / (n + 1) as f64;
            Some(mean.round() as u32)
        }
        (Some(d), _) => Some(d),
        (None, avg) => avg,
    };

    let last_attempt_at = if old.total_attempts == 0 {
        attempt.performed_at
    } else {
        old.last_attempt_at.max(attempt.performed_at)
    };
    let next_review_at =
        (attempt.performed_at + Duration::days(i64::from(interval_days))).max(last_attempt_at);

    UserProblemReviewState {
        user_id: old.user_id,
        problem_id: old.problem_id,
        confidence,
        total_attempts: old.total_attempts.saturating_add(1),
        avg_time_seconds,
        last_outcome: Some(attempt.outcome),
        ease_factor,
        interval_days,
        next_review_at,
        last_attempt_at,
    }
}

/// Recompute a pattern's aggregate from the review states of its problems.
///
/// Returns `None` when none of the pattern's problems has been attempted.
pub fn rollup_pattern_stats(
    user_id: UserId,
    pattern_id: PatternId,
    problems: &[Problem],
    states: &[UserProblemReviewState],
) -> Option<UserPatternStats> {
    let tagged: Vec<&UserProblemReviewState> = states
        .iter()
        .filter(|s| {
            problems
                .iter()
                .any(|p| p.id == s.problem_id && p.patterns.contains(&pattern_id))
        })
        .collect();
    if tagged.is_empty() {
        return None;
    }

    let times_revised = tagged.iter().map(|s| s.total_attempts).sum();
    let mean = tagged.iter().map(|s| f64::from(s.confidence)).sum::<f64>() / tagged.len() as f64;

    Some(UserPatternStats {
        user_id,
        pattern_id,
        times_revised,
        avg_confidence: mean.round().clamp(0.0, 100.0) as u8,
    })
}

/// Apply an attempt to a snapshot: advance the problem's review state and
/// refresh the stats of every pattern the problem is tagged with.
pub fn record_attempt(snapshot: &mut Snapshot, attempt: &Attempt) -> UserProblemReviewState {
    let state = advance(snapshot.review_state(attempt.problem_id), attempt);
    snapshot.upsert_review_state(state.clone());

    let patterns = snapshot
        .problem(attempt.problem_id)
        .map(|p| p.patterns.clone())
        .unwrap_or_default();
    for pattern_id in patterns {
        if let Some(stats) = rollup_pattern_stats(
            snapshot.user_id,
            pattern_id,
            &snapshot.problems,
            &snapshot.review_states,
        ) {
            snapshot.upsert_pattern_stats(stats);
        }
    }
    tracing::debug!(
        problem_id = attempt.problem_id,
        outcome = %attempt.outcome,
        interval_days = state.interval_days,
        "attempt recorded"
    );
    state
}

fn clamp_ease(ease: f64) -> f64 {
    if ease.is_nan() {
        return MAX_EASE_FACTOR;
    }
    ease.clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, day, 9, 0, 0).unwrap()
    }

    fn attempt(outcome: Outcome, confidence: u8, day: u32) -> Attempt {
        Attempt {
            user_id: 1,
            problem_id: 42,
            outcome,
            confidence_score: confidence,
            duration_seconds: Some(900),
            performed_at: at(day),
        }
    }

    #[test]
    fn first_pass_creates_state() {
        let s = advance(None, &attempt(Outcome::Passed, 70, 1));
        assert_eq!(s.total_attempts, 1);
        assert_eq!(s.confidence, 70);
        assert_eq!(s.ease_factor, MAX_EASE_FACTOR);
        assert_eq!(s.interval_days, 3);
        assert_eq!(s.next_review_at, at(4));
        assert_eq!(s.last_attempt_at, at(1));
        assert_eq!(s.avg_time_seconds, Some(900));
        assert_eq!(s.last_outcome, Some(Outcome::Passed));
    }

    #[test]
    fn pass_never_shrinks_ease_or_interval() {
        let mut state = advance(None, &attempt(Outcome::Failed, 10, 1));
        for day in 2..20 {
            let next = advance(Some(&state), &attempt(Outcome::Passed, 80, day));
            assert!(next.ease_factor >= state.ease_factor);
            assert!(next.interval_days >= state.interval_days);
            state = next;
        }
        assert!(state.ease_factor <= MAX_EASE_FACTOR);
    }

    #[test]
    fn failure_resets_interval_and_lowers_ease() {
        let mut state = advance(None, &attempt(Outcome::Passed, 90, 1));
        state = advance(Some(&state), &attempt(Outcome::Passed, 90, 4));
        assert!(state.interval_days > 1);

        let failed = advance(Some(&state), &attempt(Outcome::Failed, 30, 20));
        assert_eq!(failed.interval_days, 1);
        assert!((failed.ease_factor - (state.ease_factor - 0.2)).abs() < 1e-9);
        assert_eq!(failed.next_review_at, at(21));
        assert_eq!(failed.confidence, 30);
    }

    #[test]
    fn ease_factor_has_a_floor() {
        let mut state = advance(None, &attempt(Outcome::Failed, 0, 1));
        for day in 2..15 {
            state = advance(Some(&state), &attempt(Outcome::Failed, 0, day));
        }
        assert_eq!(state.ease_factor, MIN_EASE_FACTOR);
        assert_eq!(state.interval_days, 1);
    }

    #[test]
    fn out_of_range_state_is_clamped() {
        let mut state = initial_state(1, 42, at(1));
        state.total_attempts = 3;
        state.ease_factor = 9.0;
        state.interval_days = 0;
        state.confidence = 250;
        let next = advance(Some(&state), &attempt(Outcome::Passed, 200, 2));
        assert_eq!(next.ease_factor, MAX_EASE_FACTOR);
        assert_eq!(next.interval_days, 3);
        assert_eq!(next.confidence, 100);
    }

    #[test]
    fn backdated_attempt_keeps_review_after_last_attempt() {
        let state = advance(None, &attempt(Outcome::Passed, 60, 10));
        let late_report = advance(Some(&state), &attempt(Outcome::Failed, 40, 2));
        assert_eq!(late_report.last_attempt_at, at(10));
        assert!(late_report.next_review_at >= late_report.last_attempt_at);
    }

    #[test]
    fn running_average_of_solve_time() {
        let first = advance(None, &attempt(Outcome::Passed, 60, 1));
        let mut second_attempt = attempt(Outcome::Passed, 60, 5);
        second_attempt.duration_seconds = Some(300);
        let second = advance(Some(&first), &second_attempt);
        assert_eq!(second.avg_time_seconds, Some(600));

        let mut untimed = attempt(Outcome::Passed, 60, 9);
        untimed.duration_seconds = None;
        assert_eq!(advance(Some(&second), &untimed).avg_time_seconds, Some(600));
    }

    #[test]
    fn phase_transitions() {
        assert_eq!(phase(None, false, at(1)), ReviewPhase::New);
        let state = advance(None, &attempt(Outcome::Passed, 60, 1));
        assert_eq!(phase(Some(&state), false, at(2)), ReviewPhase::Scheduled);
        assert_eq!(phase(Some(&state), false, at(4)), ReviewPhase::Due);
        assert_eq!(phase(Some(&state), true, at(4)), ReviewPhase::Reviewing);
    }

    #[test]
    fn pattern_rollup() {
        let problems = vec![
            Problem {
                id: 1,
                title: "Two Sum".into(),
                difficulty: Difficulty::Easy,
                patterns: vec![7],
            },
            Problem {
                id: 2,
                title: "3Sum".into(),
                difficulty: Difficulty::Medium,
                patterns: vec![7, 8],
            },
        ];
        let mut a = advance(None, &attempt(Outcome::Passed, 80, 1));
        a.problem_id = 1;
        let mut b = advance(None, &attempt(Outcome::Failed, 41, 1));
        b.problem_id = 2;
        let states = vec![a, b];

        let stats = rollup_pattern_stats(1, 7, &problems, &states).unwrap();
        assert_eq!(stats.times_revised, 2);
        assert_eq!(stats.avg_confidence, 61);
        assert_eq!(rollup_pattern_stats(1, 8, &problems, &states).unwrap().avg_confidence, 41);
        assert!(rollup_pattern_stats(1, 9, &problems, &states).is_none());
    }

    #[test]
    fn record_attempt_updates_snapshot() {
        let mut snapshot = Snapshot {
            user_id: 1,
            as_of: at(10),
            patterns: vec![],
            problems: vec![Problem {
                id: 42,
                title: "LRU Cache".into(),
                difficulty: Difficulty::Medium,
                patterns: vec![5],
            }],
            review_states: vec![],
            pattern_stats: vec![],
        };

        let first = record_attempt(&mut snapshot, &attempt(Outcome::Failed, 30, 2));
        assert_eq!(first.interval_days, 1);
        assert_eq!(snapshot.review_states.len(), 1);
        assert_eq!(snapshot.pattern_stats[0].avg_confidence, 30);

        let second = record_attempt(&mut snapshot, &attempt(Outcome::Passed, 60, 3));
        assert_eq!(second.total_attempts, 2);
        assert_eq!(snapshot.review_states.len(), 1);
        assert_eq!(snapshot.pattern_stats.len(), 1);
        assert_eq!(snapshot.pattern_stats[0].times_revised, 2);
        assert_eq!(snapshot.pattern_stats[0].avg_confidence, 60);
    }
}
