//! Session templates.
//!
//! A session is configured either by one of the fixed presets or by a
//! user-defined [`SessionConfig`]. Both paths end in a validated config plus
//! the weight vector adjusted for the config's scoring emphasis.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Difficulty, PatternId};
use crate::scoring::{ScoringEmphasis, ScoringWeights};

/// How candidate problems are restricted by pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternMode {
    /// Every pattern is eligible.
    #[default]
    All,
    /// Only the listed patterns.
    Specific,
    /// Everything except the listed patterns.
    Exclude,
    /// Only the pattern(s) with the lowest average confidence.
    Weakest,
}

impl fmt::Display for PatternMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternMode::All => write!(f, "all"),
            PatternMode::Specific => write!(f, "specific"),
            PatternMode::Exclude => write!(f, "exclude"),
            PatternMode::Weakest => write!(f, "weakest"),
        }
    }
}

/// Target share of session minutes per difficulty, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyDistribution {
    pub easy_percent: f64,
    pub medium_percent: f64,
    pub hard_percent: f64,
}

impl Default for DifficultyDistribution {
    fn default() -> Self {
        Self {
            easy_percent: 20.0,
            medium_percent: 50.0,
            hard_percent: 30.0,
        }
    }
}

impl DifficultyDistribution {
    /// Allowed deviation of the percentage sum from 100.
    pub const SUM_TOLERANCE: f64 = 1.0;

    pub fn new(easy_percent: f64, medium_percent: f64, hard_percent: f64) -> Self {
        Self {
            easy_percent,
            medium_percent,
            hard_percent,
        }
    }

    pub fn get(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.easy_percent,
            Difficulty::Medium => self.medium_percent,
            Difficulty::Hard => self.hard_percent,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (bucket, value) in [
            ("easy", self.easy_percent),
            ("medium", self.medium_percent),
            ("hard", self.hard_percent),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::DistributionOutOfRange { bucket, value });
            }
        }
        let sum = self.easy_percent + self.medium_percent + self.hard_percent;
        if (sum - 100.0).abs() > Self::SUM_TOLERANCE {
            return Err(ConfigError::DistributionSum { sum });
        }
        Ok(())
    }
}

/// Inclusive confidence bounds for eligible problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceRange {
    pub min: u8,
    pub max: u8,
}

impl ConfidenceRange {
    pub fn contains(&self, confidence: u8) -> bool {
        (self.min..=self.max).contains(&confidence)
    }
}

/// Constraints for one generated session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub session_name: Option<String>,
    pub duration_min: u32,
    #[serde(default)]
    pub difficulty_distribution: DifficultyDistribution,
    #[serde(default)]
    pub pattern_mode: PatternMode,
    #[serde(default)]
    pub pattern_ids: Vec<PatternId>,
    /// Number of weakest patterns kept in `weakest` mode.
    #[serde(default = "default_weakest_pattern_count")]
    pub weakest_pattern_count: u32,
    #[serde(default = "default_max_same_pattern")]
    pub max_same_pattern: u32,
    #[serde(default)]
    pub require_quick_win: bool,
    #[serde(default)]
    pub confidence_range: Option<ConfidenceRange>,
    #[serde(default)]
    pub min_days_since_last: Option<u32>,
    #[serde(default)]
    pub max_difficulty: Option<Difficulty>,
    /// Order the final plan easy → medium → hard.
    #[serde(default)]
    pub progression: bool,
    #[serde(default)]
    pub scoring_emphasis: ScoringEmphasis,
}

fn default_weakest_pattern_count() -> u32 {
    1
}

fn default_max_same_pattern() -> u32 {
    2
}

impl SessionConfig {
    /// Reject configurations that cannot produce a meaningful session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_min == 0 {
            return Err(ConfigError::NonPositiveDuration);
        }
        self.difficulty_distribution.validate()?;
        if self.max_same_pattern < 1 {
            return Err(ConfigError::MaxSamePattern(self.max_same_pattern));
        }
        match self.pattern_mode {
            PatternMode::Specific if self.pattern_ids.is_empty() => {
                return Err(ConfigError::MissingPatternIds(self.pattern_mode));
            }
            PatternMode::Weakest if self.weakest_pattern_count < 1 => {
                return Err(ConfigError::WeakestPatternCount(
                    self.weakest_pattern_count,
                ));
            }
            _ => {}
        }
        if let Some(range) = self.confidence_range {
            if range.min > range.max || range.max > 100 {
                return Err(ConfigError::ConfidenceRange {
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }
}

/// The fixed preset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKey {
    QuickReview,
    DailyPractice,
    StandardSession,
    PatternFocus,
    WeekendComprehensive,
    InterviewPrep,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 6] = [
        TemplateKey::QuickReview,
        TemplateKey::DailyPractice,
        TemplateKey::StandardSession,
        TemplateKey::PatternFocus,
        TemplateKey::WeekendComprehensive,
        TemplateKey::InterviewPrep,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKey::QuickReview => "quick-review",
            TemplateKey::DailyPractice => "daily-practice",
            TemplateKey::StandardSession => "standard-session",
            TemplateKey::PatternFocus => "pattern-focus",
            TemplateKey::WeekendComprehensive => "weekend-comprehensive",
            TemplateKey::InterviewPrep => "interview-prep",
        }
    }

    pub fn preset(self) -> TemplatePreset {
        let base = SessionConfig {
            session_name: None,
            duration_min: 60,
            difficulty_distribution: DifficultyDistribution::default(),
            pattern_mode: PatternMode::All,
            pattern_ids: Vec::new(),
            weakest_pattern_count: 1,
            max_same_pattern: 2,
            require_quick_win: false,
            confidence_range: None,
            min_days_since_last: None,
            max_difficulty: None,
            progression: false,
            scoring_emphasis: ScoringEmphasis::Standard,
        };

        match self {
            TemplateKey::QuickReview => TemplatePreset {
                key: self,
                display_name: "Quick Review",
                description: "Short refresher on easy and medium problems, opened with a quick win.",
                config: SessionConfig {
                    duration_min: 30,
                    difficulty_distribution: DifficultyDistribution::new(40.0, 60.0, 0.0),
                    require_quick_win: true,
                    max_difficulty: Some(Difficulty::Medium),
                    min_days_since_last: Some(3),
                    ..base
                },
            },
            TemplateKey::DailyPractice => TemplatePreset {
                key: self,
                display_name: "Daily Practice",
                description: "Everyday practice with an easy, medium and hard mix.",
                config: SessionConfig {
                    duration_min: 55,
                    difficulty_distribution: DifficultyDistribution::new(10.0, 60.0, 30.0),
                    require_quick_win: true,
                    ..base
                },
            },
            TemplateKey::StandardSession => TemplatePreset {
                key: self,
                display_name: "Standard Session",
                description: "Balanced hour across every pattern, ranked by urgency.",
                config: base,
            },
            TemplateKey::PatternFocus => TemplatePreset {
                key: self,
                display_name: "Pattern Focus",
                description: "Drill your weakest pattern with progressive difficulty.",
                config: SessionConfig {
                    duration_min: 90,
                    difficulty_distribution: DifficultyDistribution::new(30.0, 50.0, 20.0),
                    pattern_mode: PatternMode::Weakest,
                    max_same_pattern: 6,
                    progression: true,
                    scoring_emphasis: ScoringEmphasis::Confidence,
                    ..base
                },
            },
            TemplateKey::WeekendComprehensive => TemplatePreset {
                key: self,
                display_name: "Weekend Comprehensive",
                description: "Long weekend session across all difficulty levels and many patterns.",
                config: SessionConfig {
                    duration_min: 150,
                    difficulty_distribution: DifficultyDistribution::new(15.0, 55.0, 30.0),
                    max_same_pattern: 3,
                    require_quick_win: true,
                    ..base
                },
            },
            TemplateKey::InterviewPrep => TemplatePreset {
                key: self,
                display_name: "Interview Prep",
                description: "Interview pressure: medium and hard problems, past failures first.",
                config: SessionConfig {
                    duration_min: 100,
                    difficulty_distribution: DifficultyDistribution::new(0.0, 50.0, 50.0),
                    scoring_emphasis: ScoringEmphasis::Failure,
                    ..base
                },
            },
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        TemplateKey::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownTemplate(s.to_string()))
    }
}

/// A named preset.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePreset {
    pub key: TemplateKey,
    pub display_name: &'static str,
    pub description: &'static str,
    pub config: SessionConfig,
}

/// Where a session's configuration comes from.
#[derive(Debug, Clone)]
pub enum SessionSource {
    /// A preset, with optional request-time overrides.
    Template {
        key: TemplateKey,
        duration_min: Option<u32>,
        /// Switches the preset to `specific` mode on this pattern.
        pattern_id: Option<PatternId>,
    },
    Custom(SessionConfig),
}

impl SessionSource {
    pub fn template(key: TemplateKey) -> Self {
        SessionSource::Template {
            key,
            duration_min: None,
            pattern_id: None,
        }
    }
}

/// Output of template resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSession {
    pub template_key: Option<TemplateKey>,
    pub name: String,
    pub description: String,
    pub config: SessionConfig,
    /// Base weights adjusted for the config's scoring emphasis.
    pub weights: ScoringWeights,
}

/// Expand a preset or validate a custom config.
pub fn resolve(
    source: &SessionSource,
    base_weights: &ScoringWeights,
) -> Result<ResolvedSession, ConfigError> {
    let (template_key, name, description, config) = match source {
        SessionSource::Template {
            key,
            duration_min,
            pattern_id,
        } => {
            let preset = key.preset();
            let mut config = preset.config;
            if let Some(d) = duration_min {
                config.duration_min = *d;
            }
            if let Some(id) = pattern_id {
                config.pattern_mode = PatternMode::Specific;
                config.pattern_ids = vec![*id];
            }
            (
                Some(*key),
                preset.display_name.to_string(),
                preset.description.to_string(),
                config,
            )
        }
        SessionSource::Custom(config) => (
            None,
            config
                .session_name
                .clone()
                .unwrap_or_else(|| "Custom Session".to_string()),
            "User-defined session configuration".to_string(),
            config.clone(),
        ),
    };

    config.validate()?;
    let weights = base_weights.with_emphasis(config.scoring_emphasis)?;

    Ok(ResolvedSession {
        template_key,
        name,
        description,
        config,
        weights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom() -> SessionConfig {
        TemplateKey::StandardSession.preset().config
    }

    #[test]
    fn every_preset_is_valid() {
        for key in TemplateKey::ALL {
            let preset = key.preset();
            assert_eq!(preset.key, key);
            preset
                .config
                .validate()
                .unwrap_or_else(|e| panic!("{key} is invalid: {e}"));
        }
    }

    #[test]
    fn template_key_parse() {
        assert_eq!(
            "quick-review".parse::<TemplateKey>().unwrap(),
            TemplateKey::QuickReview
        );
        assert_eq!(
            "Weekend_Comprehensive".parse::<TemplateKey>().unwrap(),
            TemplateKey::WeekendComprehensive
        );
        assert_eq!(
            "speedrun".parse::<TemplateKey>(),
            Err(ConfigError::UnknownTemplate("speedrun".into()))
        );
    }

    #[test]
    fn resolve_preset_with_overrides() {
        let source = SessionSource::Template {
            key: TemplateKey::PatternFocus,
            duration_min: Some(45),
            pattern_id: Some(12),
        };
        let resolved = resolve(&source, &ScoringWeights::default()).unwrap();
        assert_eq!(resolved.template_key, Some(TemplateKey::PatternFocus));
        assert_eq!(resolved.name, "Pattern Focus");
        assert_eq!(resolved.config.duration_min, 45);
        assert_eq!(resolved.config.pattern_mode, PatternMode::Specific);
        assert_eq!(resolved.config.pattern_ids, vec![12]);
        // confidence emphasis doubles the confidence weight before renormalizing
        assert!(resolved.weights.confidence > ScoringWeights::default().confidence);
        assert!((resolved.weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_override_is_rejected() {
        let source = SessionSource::Template {
            key: TemplateKey::DailyPractice,
            duration_min: Some(0),
            pattern_id: None,
        };
        assert_eq!(
            resolve(&source, &ScoringWeights::default()),
            Err(ConfigError::NonPositiveDuration)
        );
    }

    #[test]
    fn custom_distribution_must_sum_to_100() {
        let mut config = custom();
        config.difficulty_distribution = DifficultyDistribution::new(30.0, 30.0, 30.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DistributionSum { .. })
        ));

        config.difficulty_distribution = DifficultyDistribution::new(33.3, 33.3, 33.3);
        assert!(config.validate().is_ok());

        config.difficulty_distribution = DifficultyDistribution::new(-10.0, 60.0, 50.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DistributionOutOfRange { bucket: "easy", .. })
        ));
    }

    #[test]
    fn custom_pattern_constraints() {
        let mut config = custom();
        config.max_same_pattern = 0;
        assert_eq!(config.validate(), Err(ConfigError::MaxSamePattern(0)));

        let mut config = custom();
        config.pattern_mode = PatternMode::Specific;
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingPatternIds(PatternMode::Specific))
        );

        let mut config = custom();
        config.confidence_range = Some(ConfidenceRange { min: 80, max: 20 });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConfidenceRange { .. })
        ));
    }

    #[test]
    fn custom_config_name_defaults() {
        let resolved = resolve(
            &SessionSource::Custom(custom()),
            &ScoringWeights::default(),
        )
        .unwrap();
        assert_eq!(resolved.template_key, None);
        assert_eq!(resolved.name, "Custom Session");
        assert_eq!(resolved.weights, ScoringWeights::default());
    }

    #[test]
    fn custom_config_from_toml() {
        let config: SessionConfig = toml::from_str(
            r#"
session_name = "Graphs"
duration_min = 45
pattern_mode = "exclude"
pattern_ids = [3]
require_quick_win = true
scoring_emphasis = "time"

[difficulty_distribution]
easy_percent = 20.0
medium_percent = 60.0
hard_percent = 20.0
"#,
        )
        .unwrap();
        assert_eq!(config.max_same_pattern, 2);
        assert_eq!(config.pattern_mode, PatternMode::Exclude);
        assert_eq!(config.scoring_emphasis, ScoringEmphasis::Time);
        assert!(config.validate().is_ok());
    }
}
