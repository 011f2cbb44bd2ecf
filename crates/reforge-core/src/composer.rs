//! Session composition.
//!
//! Picks a time-budgeted, ordered subset of scored candidates. Selection is a
//! deterministic greedy walk over the ranked candidates, repeated under an
//! explicit, ordered list of passes that relax one soft constraint at a time:
//!
//! 1. budget + pattern cap + difficulty share
//! 2. budget + pattern cap (only if pass 1 filled too little)
//! 3. budget only (only if pass 2 still filled too little)
//!
//! Each pass continues from what earlier passes admitted. Relaxations are
//! recorded so a degraded session can be explained to the user.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, PatternId, ProblemId};
use crate::scoring::{FeatureContribution, Score};
use crate::templates::{DifficultyDistribution, SessionConfig};

/// Tunables for time estimates and relaxation thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposerConfig {
    #[serde(default = "default_easy_minutes")]
    pub easy_minutes: u32,
    #[serde(default = "default_medium_minutes")]
    pub medium_minutes: u32,
    #[serde(default = "default_hard_minutes")]
    pub hard_minutes: u32,
    /// Ceiling for any single problem's planned minutes.
    #[serde(default = "default_max_planned_minutes")]
    pub max_planned_minutes: u32,
    /// Problems planned at or under this many minutes count as quick wins.
    #[serde(default = "default_quick_win_minutes")]
    pub quick_win_minutes: u32,
    /// Percentage points a difficulty bucket may exceed its target share.
    #[serde(default = "default_distribution_tolerance")]
    pub distribution_tolerance_pct: f64,
    /// Fill ratio below which the next relaxation pass runs.
    #[serde(default = "default_min_fill_ratio")]
    pub min_fill_ratio: f64,
}

fn default_easy_minutes() -> u32 {
    10
}
fn default_medium_minutes() -> u32 {
    15
}
fn default_hard_minutes() -> u32 {
    20
}
fn default_max_planned_minutes() -> u32 {
    60
}
fn default_quick_win_minutes() -> u32 {
    10
}
fn default_distribution_tolerance() -> f64 {
    15.0
}
fn default_min_fill_ratio() -> f64 {
    0.6
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            easy_minutes: default_easy_minutes(),
            medium_minutes: default_medium_minutes(),
            hard_minutes: default_hard_minutes(),
            max_planned_minutes: default_max_planned_minutes(),
            quick_win_minutes: default_quick_win_minutes(),
            distribution_tolerance_pct: default_distribution_tolerance(),
            min_fill_ratio: default_min_fill_ratio(),
        }
    }
}

impl ComposerConfig {
    /// Planned minutes for a problem: the larger of the difficulty estimate
    /// and the user's own average, capped at the ceiling.
    pub fn planned_minutes(&self, difficulty: Difficulty, avg_time_seconds: Option<u32>) -> u32 {
        let base = match difficulty {
            Difficulty::Easy => self.easy_minutes,
            Difficulty::Medium => self.medium_minutes,
            Difficulty::Hard => self.hard_minutes,
        };
        let observed = avg_time_seconds.map(|s| s.div_ceil(60)).unwrap_or(0);
        base.max(observed).clamp(1, self.max_planned_minutes.max(1))
    }
}

/// A scored, eligible problem.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub problem_id: ProblemId,
    pub title: String,
    pub difficulty: Difficulty,
    pub patterns: Vec<PatternId>,
    pub score: Score,
    pub confidence: u8,
    /// `None` for problems never attempted.
    pub days_since_last: Option<f64>,
    pub avg_time_seconds: Option<u32>,
}

/// The constraint subset of a [`SessionConfig`] the composer enforces.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    pub duration_min: u32,
    pub distribution: DifficultyDistribution,
    pub max_same_pattern: u32,
    pub require_quick_win: bool,
    pub progression: bool,
}

impl From<&SessionConfig> for Constraints {
    fn from(config: &SessionConfig) -> Self {
        Self {
            duration_min: config.duration_min,
            distribution: config.difficulty_distribution,
            max_same_pattern: config.max_same_pattern,
            require_quick_win: config.require_quick_win,
            progression: config.progression,
        }
    }
}

/// A soft constraint that was given up while composing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Relaxation {
    /// Pass 2 ran: difficulty shares were ignored.
    IgnoredDifficultyDistribution { fill_before: f64 },
    /// Pass 3 ran: the per-pattern cap was ignored.
    IgnoredPatternCap { fill_before: f64 },
    /// A quick win was inserted outside the normal walk.
    QuickWinForced {
        problem_id: ProblemId,
        evicted: Vec<ProblemId>,
    },
    /// A quick win was required but none could fit.
    QuickWinUnavailable,
}

impl fmt::Display for Relaxation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relaxation::IgnoredDifficultyDistribution { fill_before } => write!(
                f,
                "difficulty mix relaxed: only {:.0}% of the time budget could be filled",
                fill_before * 100.0
            ),
            Relaxation::IgnoredPatternCap { fill_before } => write!(
                f,
                "pattern limit relaxed: only {:.0}% of the time budget could be filled",
                fill_before * 100.0
            ),
            Relaxation::QuickWinForced {
                problem_id,
                evicted,
            } if evicted.is_empty() => {
                write!(f, "problem {problem_id} added as a quick win")
            }
            Relaxation::QuickWinForced {
                problem_id,
                evicted,
            } => {
                let ids: Vec<String> = evicted.iter().map(|id| id.to_string()).collect();
                write!(
                    f,
                    "problem {problem_id} added as a quick win, replacing {}",
                    ids.join(", ")
                )
            }
            Relaxation::QuickWinUnavailable => {
                write!(f, "no quick win fits in the remaining time")
            }
        }
    }
}

/// One problem in a composed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedProblem {
    pub problem_id: ProblemId,
    pub title: String,
    pub difficulty: Difficulty,
    pub patterns: Vec<PatternId>,
    pub score: f64,
    pub breakdown: Vec<FeatureContribution>,
    pub reason: String,
    pub planned_min: u32,
    /// Admitted only because a soft constraint was relaxed.
    pub degraded: bool,
    pub quick_win: bool,
}

/// Output of [`SessionComposer::compose`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    pub items: Vec<PlannedProblem>,
    pub relaxations: Vec<Relaxation>,
}

impl Composition {
    pub fn total_minutes(&self) -> u32 {
        self.items.iter().map(|i| i.planned_min).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Strict,
    IgnoreDistribution,
    IgnorePatternCap,
}

const PASSES: [Pass; 3] = [Pass::Strict, Pass::IgnoreDistribution, Pass::IgnorePatternCap];

impl Pass {
    fn enforces_distribution(self) -> bool {
        self == Pass::Strict
    }

    fn enforces_pattern_cap(self) -> bool {
        self != Pass::IgnorePatternCap
    }

    fn relaxation(self, fill_before: f64) -> Option<Relaxation> {
        match self {
            Pass::Strict => None,
            Pass::IgnoreDistribution => {
                Some(Relaxation::IgnoredDifficultyDistribution { fill_before })
            }
            Pass::IgnorePatternCap => Some(Relaxation::IgnoredPatternCap { fill_before }),
        }
    }
}

struct Ranked {
    candidate: Candidate,
    planned_min: u32,
}

/// Running state of the greedy walk.
struct Selection<'a> {
    ranked: &'a [Ranked],
    constraints: &'a Constraints,
    tolerance_pct: f64,
    /// Rank indexes, with the degraded flag, in admission order.
    admitted: Vec<(usize, bool)>,
    taken: Vec<bool>,
    used_min: u32,
    bucket_min: BTreeMap<Difficulty, u32>,
    pattern_counts: BTreeMap<PatternId, u32>,
}

impl<'a> Selection<'a> {
    fn new(ranked: &'a [Ranked], constraints: &'a Constraints, tolerance_pct: f64) -> Self {
        Self {
            ranked,
            constraints,
            tolerance_pct,
            admitted: Vec::new(),
            taken: vec![false; ranked.len()],
            used_min: 0,
            bucket_min: BTreeMap::new(),
            pattern_counts: BTreeMap::new(),
        }
    }

    fn fill_ratio(&self) -> f64 {
        f64::from(self.used_min) / f64::from(self.constraints.duration_min.max(1))
    }

    fn fits_budget(&self, idx: usize) -> bool {
        self.used_min + self.ranked[idx].planned_min <= self.constraints.duration_min
    }

    fn within_pattern_cap(&self, idx: usize) -> bool {
        self.ranked[idx].candidate.patterns.iter().all(|p| {
            self.pattern_counts.get(p).copied().unwrap_or(0) < self.constraints.max_same_pattern
        })
    }

    fn within_distribution(&self, idx: usize) -> bool {
        let r = &self.ranked[idx];
        let difficulty = r.candidate.difficulty;
        let bucket = self.bucket_min.get(&difficulty).copied().unwrap_or(0) + r.planned_min;
        let share = f64::from(bucket) * 100.0 / f64::from(self.constraints.duration_min.max(1));
        share <= self.constraints.distribution.get(difficulty) + self.tolerance_pct + 1e-9
    }

    fn admit(&mut self, idx: usize, degraded: bool) {
        let r = &self.ranked[idx];
        self.taken[idx] = true;
        self.used_min += r.planned_min;
        *self.bucket_min.entry(r.candidate.difficulty).or_default() += r.planned_min;
        for p in &r.candidate.patterns {
            *self.pattern_counts.entry(*p).or_default() += 1;
        }
        self.admitted.push((idx, degraded));
    }

    fn evict(&mut self, idx: usize) {
        let r = &self.ranked[idx];
        self.taken[idx] = false;
        self.used_min -= r.planned_min;
        if let Some(m) = self.bucket_min.get_mut(&r.candidate.difficulty) {
            *m -= r.planned_min;
        }
        for p in &r.candidate.patterns {
            if let Some(c) = self.pattern_counts.get_mut(p) {
                *c -= 1;
            }
        }
        self.admitted.retain(|(i, _)| *i != idx);
    }

    /// Greedy walk over the not-yet-taken candidates in rank order.
    fn run(&mut self, pass: Pass, degraded: bool) -> usize {
        let mut added = 0;
        for idx in 0..self.ranked.len() {
            if self.taken[idx] || !self.fits_budget(idx) {
                continue;
            }
            if pass.enforces_pattern_cap() && !self.within_pattern_cap(idx) {
                continue;
            }
            if pass.enforces_distribution() && !self.within_distribution(idx) {
                continue;
            }
            self.admit(idx, degraded);
            added += 1;
        }
        added
    }
}

/// Greedy, deterministic session composer.
#[derive(Debug, Clone, Default)]
pub struct SessionComposer {
    config: ComposerConfig,
}

impl SessionComposer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Compose a session from filtered, scored candidates.
    ///
    /// An empty composition is a valid result meaning nothing was eligible or
    /// nothing fit the budget.
    pub fn compose(&self, mut candidates: Vec<Candidate>, constraints: &Constraints) -> Composition {
        if candidates.is_empty() || constraints.duration_min == 0 {
            return Composition::default();
        }

        candidates.sort_by(compare_candidates);
        let ranked: Vec<Ranked> = candidates
            .into_iter()
            .map(|candidate| {
                let planned_min = self
                    .config
                    .planned_minutes(candidate.difficulty, candidate.avg_time_seconds);
                Ranked {
                    candidate,
                    planned_min,
                }
            })
            .collect();

        let mut selection =
            Selection::new(&ranked, constraints, self.config.distribution_tolerance_pct);
        let mut relaxations = Vec::new();

        for pass in PASSES {
            let relaxation = if pass == Pass::Strict {
                None
            } else {
                let fill = selection.fill_ratio();
                if fill >= self.config.min_fill_ratio {
                    break;
                }
                pass.relaxation(fill)
            };
            let added = selection.run(pass, relaxation.is_some());
            tracing::debug!(
                ?pass,
                added,
                used_min = selection.used_min,
                duration_min = constraints.duration_min,
                "composition pass complete"
            );
            if added > 0 {
                relaxations.extend(relaxation);
            }
        }

        let forced = if constraints.require_quick_win {
            self.force_quick_win(&mut selection, &mut relaxations)
        } else {
            None
        };

        let mut order: Vec<(usize, bool)> = selection.admitted.clone();
        order.retain(|(idx, _)| Some(*idx) != forced.map(|(i, _)| i));
        order.sort_by_key(|(idx, _)| *idx);
        if let Some(quick) = forced {
            order.insert(order.len().min(1), quick);
        }

        let mut items: Vec<PlannedProblem> = order
            .into_iter()
            .map(|(idx, degraded)| {
                let r = &ranked[idx];
                PlannedProblem {
                    problem_id: r.candidate.problem_id,
                    title: r.candidate.title.clone(),
                    difficulty: r.candidate.difficulty,
                    patterns: r.candidate.patterns.clone(),
                    score: r.candidate.score.value,
                    breakdown: r.candidate.score.breakdown.clone(),
                    reason: r.candidate.score.reason.clone(),
                    planned_min: r.planned_min,
                    degraded,
                    quick_win: r.planned_min <= self.config.quick_win_minutes,
                }
            })
            .collect();

        if constraints.progression {
            items.sort_by_key(|i| i.difficulty);
        }

        Composition {
            items,
            relaxations,
        }
    }

    /// Make sure the session holds a quick win, returning the forced entry.
    fn force_quick_win(
        &self,
        selection: &mut Selection<'_>,
        relaxations: &mut Vec<Relaxation>,
    ) -> Option<(usize, bool)> {
        let quick = self.config.quick_win_minutes;
        let ranked = selection.ranked;
        if selection
            .admitted
            .iter()
            .any(|(idx, _)| ranked[*idx].planned_min <= quick)
        {
            return None;
        }

        let Some(pick) = (0..ranked.len())
            .filter(|&idx| !selection.taken[idx] && ranked[idx].planned_min <= quick)
            .min_by_key(|&idx| (ranked[idx].planned_min, idx))
        else {
            relaxations.push(Relaxation::QuickWinUnavailable);
            return None;
        };

        // Free time from the lowest-ranked admissions, never the top one.
        let needed = ranked[pick].planned_min;
        let mut available = selection.constraints.duration_min - selection.used_min;
        let mut victims = Vec::new();
        if available < needed {
            let top = selection.admitted.iter().map(|(idx, _)| *idx).min();
            let mut by_rank: Vec<usize> = selection
                .admitted
                .iter()
                .map(|(idx, _)| *idx)
                .filter(|idx| Some(*idx) != top)
                .collect();
            by_rank.sort_unstable_by(|a, b| b.cmp(a));
            for idx in by_rank {
                if available >= needed {
                    break;
                }
                available += ranked[idx].planned_min;
                victims.push(idx);
            }
        }
        if available < needed {
            relaxations.push(Relaxation::QuickWinUnavailable);
            return None;
        }

        for idx in &victims {
            selection.evict(*idx);
        }
        let degraded = !selection.within_pattern_cap(pick) || !selection.within_distribution(pick);
        selection.admit(pick, degraded);
        relaxations.push(Relaxation::QuickWinForced {
            problem_id: ranked[pick].candidate.problem_id,
            evicted: victims
                .iter()
                .map(|idx| ranked[*idx].candidate.problem_id)
                .collect(),
        });
        tracing::debug!(
            problem_id = ranked[pick].candidate.problem_id,
            evicted = victims.len(),
            "quick win forced"
        );
        Some((pick, degraded))
    }
}

/// Rank order: score desc, then lower confidence, then longer since last
/// attempt (never attempted counts as longest), then lower id.
fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    let days = |c: &Candidate| c.days_since_last.unwrap_or(f64::INFINITY);
    b.score
        .value
        .total_cmp(&a.score.value)
        .then_with(|| a.confidence.cmp(&b.confidence))
        .then_with(|| days(b).total_cmp(&days(a)))
        .then_with(|| a.problem_id.cmp(&b.problem_id))
}
