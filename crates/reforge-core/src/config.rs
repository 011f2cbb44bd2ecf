//! Configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::composer::ComposerConfig;
use crate::engine::SessionGenerator;
use crate::features::FeatureConfig;
use crate::scoring::ScoringWeights;
use crate::templates::TemplateKey;

/// Environment variable that overrides `default_template`.
pub const TEMPLATE_ENV: &str = "REFORGE_TEMPLATE";

/// Top-level reforge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReforgeConfig {
    /// Base scoring weights; rescaled when they do not sum to 1.
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub composer: ComposerConfig,
    /// Preset used when no template or custom config is given.
    #[serde(default = "default_template")]
    pub default_template: TemplateKey,
    /// Where saved session reports go.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

fn default_template() -> TemplateKey {
    TemplateKey::StandardSession
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("./reforge-sessions")
}

impl Default for ReforgeConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            features: FeatureConfig::default(),
            composer: ComposerConfig::default(),
            default_template: default_template(),
            reports_dir: default_reports_dir(),
        }
    }
}

impl ReforgeConfig {
    /// Build a session generator from this configuration.
    pub fn generator(&self) -> SessionGenerator {
        SessionGenerator::new(self.weights, self.features.clone(), self.composer.clone())
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `reforge.toml` in the current directory
/// 2. `~/.config/reforge/config.toml`
///
/// Environment variable override: `REFORGE_TEMPLATE`.
pub fn load_config() -> Result<ReforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ReforgeConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("reforge.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => ReforgeConfig::default(),
    };

    if let Ok(value) = std::env::var(TEMPLATE_ENV) {
        config.default_template = value
            .parse()
            .with_context(|| format!("invalid {TEMPLATE_ENV} value: {value}"))?;
    }

    Ok(config)
}

/// Parse a configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<ReforgeConfig> {
    let config: ReforgeConfig = toml::from_str(content)?;
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("reforge"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ReforgeConfig::default();
        assert_eq!(config.default_template, TemplateKey::StandardSession);
        assert_eq!(config.composer.max_planned_minutes, 60);
        assert_eq!(config.features.time_cap_seconds, 1800);
        assert!((config.weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
default_template = "interview-prep"

[weights]
confidence = 0.5
days_since = 0.5
attempts = 0.0
time = 0.0
difficulty = 0.0
last_failed = 0.0
pattern_weakness = 0.0

[composer]
hard_minutes = 25
"#;
        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.default_template, TemplateKey::InterviewPrep);
        assert_eq!(config.weights.confidence, 0.5);
        assert_eq!(config.composer.hard_minutes, 25);
        assert_eq!(config.composer.easy_minutes, 10);
        assert_eq!(config.features.days_cap, 30);
    }

    #[test]
    fn unknown_template_is_rejected() {
        assert!(parse_config("default_template = \"marathon\"").is_err());
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = load_config_from(Some(Path::new("/no/such/reforge.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_from_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reforge.toml");
        std::fs::write(&path, "reports_dir = \"out\"\n[features]\ntime_cap_seconds = 900\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.features.time_cap_seconds, 900);
        assert_eq!(config.reports_dir, PathBuf::from("out"));
    }
}
