//! TOML snapshot loader.
//!
//! Loads user snapshots from TOML files and directories, writes them back,
//! and validates them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    Outcome, Pattern, PatternId, Problem, ProblemId, Snapshot, UserId, UserPatternStats,
    UserProblemReviewState,
};
use crate::scheduler::{MAX_EASE_FACTOR, MIN_EASE_FACTOR};

/// On-disk layout. `user_id` is written once at the top instead of on every
/// row, and scheduler fields may be omitted for hand-written files.
#[derive(Debug, Serialize, Deserialize)]
struct TomlSnapshotFile {
    user_id: UserId,
    as_of: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    patterns: Vec<Pattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    problems: Vec<Problem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    review_states: Vec<TomlReviewState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pattern_stats: Vec<TomlPatternStats>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlReviewState {
    problem_id: ProblemId,
    confidence: u8,
    #[serde(default)]
    total_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    avg_time_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_outcome: Option<Outcome>,
    #[serde(default = "default_ease_factor")]
    ease_factor: f64,
    #[serde(default = "default_interval_days")]
    interval_days: u32,
    last_attempt_at: DateTime<Utc>,
    /// Defaults to `last_attempt_at + interval_days`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_review_at: Option<DateTime<Utc>>,
}

fn default_ease_factor() -> f64 {
    MAX_EASE_FACTOR
}

fn default_interval_days() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
struct TomlPatternStats {
    pattern_id: PatternId,
    #[serde(default)]
    times_revised: u32,
    avg_confidence: u8,
}

/// Parse a snapshot from a TOML string.
pub fn parse_snapshot_str(content: &str) -> Result<Snapshot> {
    let parsed: TomlSnapshotFile = toml::from_str(content).context("failed to parse TOML")?;
    let user_id = parsed.user_id;

    let review_states = parsed
        .review_states
        .into_iter()
        .map(|s| UserProblemReviewState {
            user_id,
            problem_id: s.problem_id,
            confidence: s.confidence,
            total_attempts: s.total_attempts,
            avg_time_seconds: s.avg_time_seconds,
            last_outcome: s.last_outcome,
            ease_factor: s.ease_factor,
            interval_days: s.interval_days,
            next_review_at: s.next_review_at.unwrap_or_else(|| {
                s.last_attempt_at + Duration::days(i64::from(s.interval_days))
            }),
            last_attempt_at: s.last_attempt_at,
        })
        .collect();

    let pattern_stats = parsed
        .pattern_stats
        .into_iter()
        .map(|s| UserPatternStats {
            user_id,
            pattern_id: s.pattern_id,
            times_revised: s.times_revised,
            avg_confidence: s.avg_confidence,
        })
        .collect();

    Ok(Snapshot {
        user_id,
        as_of: parsed.as_of,
        patterns: parsed.patterns,
        problems: parsed.problems,
        review_states,
        pattern_stats,
    })
}

/// Parse a single snapshot file.
pub fn parse_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_snapshot_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Recursively load all `.toml` snapshot files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_snapshot_directory(dir: &Path) -> Result<Vec<(PathBuf, Snapshot)>> {
    let mut snapshots = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            snapshots.extend(load_snapshot_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_snapshot(&path) {
                Ok(snapshot) => snapshots.push((path, snapshot)),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(snapshots)
}

/// Render a snapshot in the on-disk layout.
pub fn snapshot_to_toml(snapshot: &Snapshot) -> Result<String> {
    let file = TomlSnapshotFile {
        user_id: snapshot.user_id,
        as_of: snapshot.as_of,
        patterns: snapshot.patterns.clone(),
        problems: snapshot.problems.clone(),
        review_states: snapshot
            .review_states
            .iter()
            .map(|s| TomlReviewState {
                problem_id: s.problem_id,
                confidence: s.confidence,
                total_attempts: s.total_attempts,
                avg_time_seconds: s.avg_time_seconds,
                last_outcome: s.last_outcome,
                ease_factor: s.ease_factor,
                interval_days: s.interval_days,
                last_attempt_at: s.last_attempt_at,
                next_review_at: Some(s.next_review_at),
            })
            .collect(),
        pattern_stats: snapshot
            .pattern_stats
            .iter()
            .map(|s| TomlPatternStats {
                pattern_id: s.pattern_id,
                times_revised: s.times_revised,
                avg_confidence: s.avg_confidence,
            })
            .collect(),
    };
    toml::to_string_pretty(&file).context("failed to serialize snapshot")
}

/// Overwrite a snapshot file.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let content = snapshot_to_toml(snapshot)?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// A warning from snapshot validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// What the warning is about, e.g. `problem 12`.
    pub subject: Option<String>,
    pub message: String,
}

impl ValidationWarning {
    fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            message: message.into(),
        }
    }
}

/// Check a snapshot for inconsistencies the engine would silently tolerate.
pub fn validate_snapshot(snapshot: &Snapshot) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if snapshot.problems.is_empty() {
        warnings.push(ValidationWarning {
            subject: None,
            message: "snapshot has no problems".into(),
        });
    }

    let mut pattern_ids = BTreeSet::new();
    for pattern in &snapshot.patterns {
        if !pattern_ids.insert(pattern.id) {
            warnings.push(ValidationWarning::new(
                format!("pattern {}", pattern.id),
                "duplicate pattern id",
            ));
        }
    }

    let mut problem_ids = BTreeSet::new();
    for problem in &snapshot.problems {
        let subject = format!("problem {}", problem.id);
        if !problem_ids.insert(problem.id) {
            warnings.push(ValidationWarning::new(&subject, "duplicate problem id"));
        }
        if problem.title.trim().is_empty() {
            warnings.push(ValidationWarning::new(&subject, "title is empty"));
        }
        for p in &problem.patterns {
            if !pattern_ids.contains(p) {
                warnings.push(ValidationWarning::new(
                    &subject,
                    format!("references unknown pattern {p}"),
                ));
            }
        }
    }

    let mut seen_states = BTreeSet::new();
    for state in &snapshot.review_states {
        let subject = format!("review state for problem {}", state.problem_id);
        if !seen_states.insert(state.problem_id) {
            warnings.push(ValidationWarning::new(&subject, "duplicate review state"));
        }
        if !problem_ids.contains(&state.problem_id) {
            warnings.push(ValidationWarning::new(&subject, "problem is not in the catalog"));
        }
        if state.confidence > 100 {
            warnings.push(ValidationWarning::new(
                &subject,
                format!("confidence {} is above 100", state.confidence),
            ));
        }
        if !(MIN_EASE_FACTOR..=MAX_EASE_FACTOR).contains(&state.ease_factor) {
            warnings.push(ValidationWarning::new(
                &subject,
                format!(
                    "ease factor {} is outside {MIN_EASE_FACTOR}..={MAX_EASE_FACTOR}",
                    state.ease_factor
                ),
            ));
        }
        if state.interval_days == 0 {
            warnings.push(ValidationWarning::new(&subject, "interval_days must be at least 1"));
        }
        if state.next_review_at < state.last_attempt_at {
            warnings.push(ValidationWarning::new(
                &subject,
                "next_review_at is before last_attempt_at",
            ));
        }
        if state.last_attempt_at > snapshot.as_of {
            warnings.push(ValidationWarning::new(
                &subject,
                "last_attempt_at is after the snapshot's as_of",
            ));
        }
    }

    for stats in &snapshot.pattern_stats {
        let subject = format!("pattern stats for {}", stats.pattern_id);
        if !pattern_ids.contains(&stats.pattern_id) {
            warnings.push(ValidationWarning::new(&subject, "pattern is not in the catalog"));
        }
        if stats.avg_confidence > 100 {
            warnings.push(ValidationWarning::new(
                &subject,
                format!("average confidence {} is above 100", stats.avg_confidence),
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Difficulty;

    const VALID_TOML: &str = r#"
user_id = 7
as_of = "2026-05-01T12:00:00Z"

[[patterns]]
id = 1
title = "Two Pointers"

[[patterns]]
id = 2
title = "Graphs"

[[problems]]
id = 10
title = "Two Sum"
difficulty = "easy"
patterns = [1]

[[problems]]
id = 11
title = "Course Schedule"
difficulty = "medium"
patterns = [2]

[[review_states]]
problem_id = 10
confidence = 70
total_attempts = 3
avg_time_seconds = 420
last_outcome = "passed"
ease_factor = 2.3
interval_days = 4
last_attempt_at = "2026-04-25T09:00:00Z"

[[pattern_stats]]
pattern_id = 1
times_revised = 3
avg_confidence = 70
"#;

    #[test]
    fn parse_valid_snapshot() {
        let snapshot = parse_snapshot_str(VALID_TOML).unwrap();
        assert_eq!(snapshot.user_id, 7);
        assert_eq!(snapshot.problems.len(), 2);
        assert_eq!(snapshot.problems[1].difficulty, Difficulty::Medium);

        let state = snapshot.review_state(10).unwrap();
        assert_eq!(state.user_id, 7);
        assert_eq!(state.last_outcome, Some(Outcome::Passed));
        assert_eq!(
            state.next_review_at,
            "2026-04-29T09:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(snapshot.pattern_stats[0].user_id, 7);
        assert!(validate_snapshot(&snapshot).is_empty());
    }

    #[test]
    fn scheduler_fields_default() {
        let toml = r#"
user_id = 1
as_of = "2026-05-01T00:00:00Z"

[[review_states]]
problem_id = 3
confidence = 40
last_attempt_at = "2026-04-30T00:00:00Z"
"#;
        let snapshot = parse_snapshot_str(toml).unwrap();
        let state = &snapshot.review_states[0];
        assert_eq!(state.ease_factor, 2.5);
        assert_eq!(state.interval_days, 1);
        assert_eq!(state.total_attempts, 0);
    }

    #[test]
    fn invalid_difficulty_is_an_error() {
        let toml = r#"
user_id = 1
as_of = "2026-05-01T00:00:00Z"

[[problems]]
id = 1
title = "x"
difficulty = "extreme"
"#;
        assert!(parse_snapshot_str(toml).is_err());
    }

    #[test]
    fn written_snapshot_reloads() {
        let snapshot = parse_snapshot_str(VALID_TOML).unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("snap.toml");
        write_snapshot(&path, &snapshot).unwrap();

        let reloaded = parse_snapshot(&path).unwrap();
        assert_eq!(reloaded.review_states, snapshot.review_states);
        assert_eq!(reloaded.pattern_stats, snapshot.pattern_stats);
        assert_eq!(reloaded.as_of, snapshot.as_of);
    }

    #[test]
    fn directory_load_skips_broken_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("b.toml"), "user_id = ").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("c.toml"), VALID_TOML).unwrap();

        let loaded = load_snapshot_directory(dir.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].0.ends_with("a.toml"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = load_snapshot_directory(Path::new("/definitely/not/here")).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn validation_reports_inconsistencies() {
        let mut snapshot = parse_snapshot_str(VALID_TOML).unwrap();
        snapshot.problems.push(Problem {
            id: 10,
            title: " ".into(),
            difficulty: Difficulty::Hard,
            patterns: vec![9],
        });
        let mut state = snapshot.review_states[0].clone();
        state.problem_id = 99;
        state.next_review_at = state.last_attempt_at - Duration::days(1);
        snapshot.review_states.push(state);

        let messages: Vec<String> = validate_snapshot(&snapshot)
            .into_iter()
            .map(|w| format!("{}: {}", w.subject.unwrap_or_default(), w.message))
            .collect();
        assert!(messages.contains(&"problem 10: duplicate problem id".to_string()));
        assert!(messages.contains(&"problem 10: title is empty".to_string()));
        assert!(messages.contains(&"problem 10: references unknown pattern 9".to_string()));
        assert!(messages
            .contains(&"review state for problem 99: problem is not in the catalog".to_string()));
        assert!(messages.contains(
            &"review state for problem 99: next_review_at is before last_attempt_at".to_string()
        ));
    }
}
