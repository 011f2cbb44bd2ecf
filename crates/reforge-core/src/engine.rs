//! Session generation pipeline.
//!
//! Resolves a template, filters the catalog down to eligible problems,
//! extracts features, scores every candidate and hands the ranked set to the
//! composer. The whole pipeline is a pure function of the snapshot and the
//! session source.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::composer::{Candidate, ComposerConfig, Constraints, PlannedProblem, Relaxation, SessionComposer};
use crate::error::ConfigError;
use crate::features::{FeatureConfig, FeatureExtractor};
use crate::model::{PatternId, Problem, Snapshot, UserPatternStats};
use crate::scoring::{ScoringEngine, ScoringWeights, WeightNormalizationWarning};
use crate::templates::{resolve, PatternMode, SessionConfig, SessionSource, TemplateKey};

/// A composed practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub template_key: Option<TemplateKey>,
    pub template_name: String,
    pub template_description: String,
    pub as_of: DateTime<Utc>,
    pub planned_duration_min: u32,
    pub total_planned_min: u32,
    pub items: Vec<PlannedProblem>,
    /// True when any soft constraint had to be given up.
    pub degraded: bool,
    pub relaxations: Vec<Relaxation>,
    /// Set when `items` is empty.
    pub empty_reason: Option<String>,
    pub weight_warning: Option<WeightNormalizationWarning>,
}

impl SessionPlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Orchestrates filtering, feature extraction, scoring and composition.
#[derive(Debug, Clone, Default)]
pub struct SessionGenerator {
    base_weights: ScoringWeights,
    extractor: FeatureExtractor,
    composer: SessionComposer,
}

impl SessionGenerator {
    pub fn new(base_weights: ScoringWeights, features: FeatureConfig, composer: ComposerConfig) -> Self {
        Self {
            base_weights,
            extractor: FeatureExtractor::new(features),
            composer: SessionComposer::new(composer),
        }
    }

    /// Generate a plan for the snapshot's user.
    ///
    /// Fails only on invalid configuration. Nothing eligible, or nothing
    /// fitting the budget, yields an empty plan with `empty_reason` set.
    #[instrument(skip_all, fields(user_id = snapshot.user_id))]
    pub fn generate(&self, snapshot: &Snapshot, source: &SessionSource) -> Result<SessionPlan, ConfigError> {
        let resolved = resolve(source, &self.base_weights)?;
        let (_, base_warning) = self.base_weights.normalized()?;
        let engine = ScoringEngine::new(resolved.weights)?;
        let config = &resolved.config;

        let eligible = eligible_problems(snapshot, config);
        tracing::debug!(
            catalog = snapshot.problems.len(),
            eligible = eligible.len(),
            "filtered candidates"
        );

        let states = snapshot.review_state_index();
        let stats = snapshot.pattern_stats_index();
        let candidates: Vec<Candidate> = eligible
            .iter()
            .map(|problem| {
                let state = states.get(&problem.id).copied();
                let problem_stats: Vec<&UserPatternStats> = problem
                    .patterns
                    .iter()
                    .filter_map(|p| stats.get(p).copied())
                    .collect();
                let features =
                    self.extractor
                        .extract(state, problem.difficulty, &problem_stats, snapshot.as_of);
                Candidate {
                    problem_id: problem.id,
                    title: problem.title.clone(),
                    difficulty: problem.difficulty,
                    patterns: problem.patterns.clone(),
                    score: engine.score(&features),
                    confidence: state.map(|s| s.confidence).unwrap_or(0),
                    days_since_last: state.map(|s| s.days_since_last_attempt(snapshot.as_of)),
                    avg_time_seconds: state.and_then(|s| s.avg_time_seconds),
                }
            })
            .collect();

        let composition = self.composer.compose(candidates, &Constraints::from(config));
        let total_planned_min = composition.total_minutes();

        let empty_reason = if !composition.items.is_empty() {
            None
        } else if snapshot.problems.is_empty() {
            Some("the problem catalog is empty".to_string())
        } else if eligible.is_empty() {
            Some("no problems match the session filters".to_string())
        } else {
            Some(format!(
                "no eligible problem fits in {} minutes",
                config.duration_min
            ))
        };

        let degraded = composition.items.iter().any(|i| i.degraded)
            || composition
                .relaxations
                .iter()
                .any(|r| matches!(r, Relaxation::QuickWinUnavailable));

        tracing::info!(
            items = composition.items.len(),
            total_planned_min,
            duration_min = config.duration_min,
            degraded,
            "session generated"
        );

        Ok(SessionPlan {
            template_key: resolved.template_key,
            template_name: resolved.name,
            template_description: resolved.description,
            as_of: snapshot.as_of,
            planned_duration_min: config.duration_min,
            total_planned_min,
            items: composition.items,
            degraded,
            relaxations: composition.relaxations,
            empty_reason,
            weight_warning: engine.warning().cloned().or(base_warning),
        })
    }
}

/// Apply the config's hard filters to the catalog, in catalog id order.
fn eligible_problems<'a>(snapshot: &'a Snapshot, config: &SessionConfig) -> Vec<&'a Problem> {
    let scope = pattern_scope(snapshot, config);
    let states = snapshot.review_state_index();

    let mut problems: Vec<&Problem> = snapshot
        .problems
        .iter()
        .filter(|p| scope.admits(p))
        .filter(|p| config.max_difficulty.map_or(true, |max| p.difficulty <= max))
        .filter(|p| {
            let state = states.get(&p.id);
            if let Some(range) = config.confidence_range {
                if !range.contains(state.map(|s| s.confidence).unwrap_or(0)) {
                    return false;
                }
            }
            match (config.min_days_since_last, state) {
                (Some(min_days), Some(s)) => s.days_since_last_attempt(snapshot.as_of) >= f64::from(min_days),
                _ => true,
            }
        })
        .collect();
    problems.sort_by_key(|p| p.id);
    problems
}

enum PatternScope {
    Any,
    Include(BTreeSet<PatternId>),
    Exclude(BTreeSet<PatternId>),
}

impl PatternScope {
    fn admits(&self, problem: &Problem) -> bool {
        match self {
            PatternScope::Any => true,
            PatternScope::Include(ids) => problem.patterns.iter().any(|p| ids.contains(p)),
            PatternScope::Exclude(ids) => !problem.patterns.iter().any(|p| ids.contains(p)),
        }
    }
}

fn pattern_scope(snapshot: &Snapshot, config: &SessionConfig) -> PatternScope {
    match config.pattern_mode {
        PatternMode::All => PatternScope::Any,
        PatternMode::Specific => PatternScope::Include(config.pattern_ids.iter().copied().collect()),
        PatternMode::Exclude => PatternScope::Exclude(config.pattern_ids.iter().copied().collect()),
        PatternMode::Weakest => {
            let weakest = weakest_patterns(snapshot, config.weakest_pattern_count as usize);
            if weakest.is_empty() {
                tracing::debug!("no pattern stats available, weakest mode falls back to all patterns");
                PatternScope::Any
            } else {
                tracing::debug!(?weakest, "weakest patterns selected");
                PatternScope::Include(weakest)
            }
        }
    }
}

/// The `count` patterns with the lowest average confidence that tag at least
/// one catalog problem. Ties go to the lower pattern id.
fn weakest_patterns(snapshot: &Snapshot, count: usize) -> BTreeSet<PatternId> {
    let tagged: BTreeSet<PatternId> = snapshot
        .problems
        .iter()
        .flat_map(|p| p.patterns.iter().copied())
        .collect();
    let mut stats: Vec<&UserPatternStats> = snapshot
        .pattern_stats
        .iter()
        .filter(|s| tagged.contains(&s.pattern_id))
        .collect();
    stats.sort_by_key(|s| (s.avg_confidence, s.pattern_id));
    stats.iter().take(count).map(|s| s.pattern_id).collect()
}
