//! Saved session reports with JSON persistence and markdown rendering.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::SessionPlan;
use crate::model::UserId;

/// A generated session as saved to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
    pub plan: SessionPlan,
}

impl SessionReport {
    pub fn new(user_id: UserId, plan: SessionPlan) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            user_id,
            plan,
        }
    }

    /// Default file name, sortable by creation time.
    pub fn file_name(&self) -> String {
        let id = self.id.simple().to_string();
        format!(
            "session-{}-{}.json",
            self.created_at.format("%Y%m%d-%H%M%S"),
            &id[..8]
        )
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    pub fn to_markdown(&self) -> String {
        render_markdown(&self.plan)
    }
}

/// Render a plan as a markdown checklist table.
pub fn render_markdown(plan: &SessionPlan) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", plan.template_name));
    if !plan.template_description.is_empty() {
        md.push_str(&format!("{}\n\n", plan.template_description));
    }
    md.push_str(&format!(
        "- **Planned:** {} / {} min\n",
        plan.total_planned_min, plan.planned_duration_min
    ));
    md.push_str(&format!(
        "- **As of:** {}\n\n",
        plan.as_of.format("%Y-%m-%d %H:%M UTC")
    ));

    if let Some(reason) = &plan.empty_reason {
        md.push_str(&format!("_No problems planned: {reason}._\n"));
        return md;
    }

    md.push_str("| # | Problem | Difficulty | Minutes | Score | Reason |\n");
    md.push_str("|---|---------|------------|---------|-------|--------|\n");
    for (i, item) in plan.items.iter().enumerate() {
        let mut reason = item.reason.clone();
        if item.quick_win {
            reason.push_str(" (quick win)");
        }
        if item.degraded {
            reason.push_str(" (relaxed)");
        }
        md.push_str(&format!(
            "| {} | {} (#{}) | {} | {} | {:.3} | {} |\n",
            i + 1,
            item.title.replace('|', "\\|"),
            item.problem_id,
            item.difficulty,
            item.planned_min,
            item.score,
            reason
        ));
    }

    if !plan.relaxations.is_empty() || plan.weight_warning.is_some() {
        md.push_str("\n## Adjustments\n\n");
        if let Some(w) = &plan.weight_warning {
            md.push_str(&format!("- {w}\n"));
        }
        for r in &plan.relaxations {
            md.push_str(&format!("- {r}\n"));
        }
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::{PlannedProblem, Relaxation};
    use crate::model::Difficulty;
    use crate::templates::TemplateKey;

    fn plan() -> SessionPlan {
        SessionPlan {
            template_key: Some(TemplateKey::QuickReview),
            template_name: "Quick Review".into(),
            template_description: "Short refresher.".into(),
            as_of: "2026-05-01T12:00:00Z".parse().unwrap(),
            planned_duration_min: 30,
            total_planned_min: 25,
            items: vec![
                PlannedProblem {
                    problem_id: 11,
                    title: "Course Schedule".into(),
                    difficulty: Difficulty::Medium,
                    patterns: vec![2],
                    score: 0.75172,
                    breakdown: vec![],
                    reason: "low confidence, due for review".into(),
                    planned_min: 15,
                    degraded: false,
                    quick_win: false,
                },
                PlannedProblem {
                    problem_id: 10,
                    title: "Two Sum".into(),
                    difficulty: Difficulty::Easy,
                    patterns: vec![1],
                    score: 0.4,
                    breakdown: vec![],
                    reason: "due for review".into(),
                    planned_min: 10,
                    degraded: true,
                    quick_win: true,
                },
            ],
            degraded: true,
            relaxations: vec![Relaxation::QuickWinForced {
                problem_id: 10,
                evicted: vec![],
            }],
            empty_reason: None,
            weight_warning: None,
        }
    }

    #[test]
    fn save_and_load_json() {
        let report = SessionReport::new(7, plan());
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join(report.file_name());
        report.save_json(&path).unwrap();

        let loaded = SessionReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.user_id, 7);
        assert_eq!(loaded.plan.template_key, Some(TemplateKey::QuickReview));
        assert_eq!(loaded.plan.items.len(), 2);
        assert_eq!(loaded.plan.items[1].problem_id, 10);
        assert_eq!(loaded.plan.relaxations, report.plan.relaxations);
    }

    #[test]
    fn file_name_shape() {
        let report = SessionReport::new(1, plan());
        let name = report.file_name();
        assert!(name.starts_with("session-"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn markdown_lists_items_and_adjustments() {
        let md = render_markdown(&plan());
        assert!(md.starts_with("# Quick Review\n"));
        assert!(md.contains("- **Planned:** 25 / 30 min"));
        assert!(md.contains("| 1 | Course Schedule (#11) | medium | 15 | 0.752 | low confidence, due for review |"));
        assert!(md.contains("| 2 | Two Sum (#10) | easy | 10 | 0.400 | due for review (quick win) (relaxed) |"));
        assert!(md.contains("## Adjustments"));
        assert!(md.contains("- problem 10 added as a quick win"));
    }

    #[test]
    fn markdown_header_layout() {
        let mut p = plan();
        p.items.clear();
        p.relaxations.clear();
        p.total_planned_min = 0;
        p.empty_reason = Some("nothing is due".into());
        assert_eq!(
            render_markdown(&p),
            "# Quick Review\n\n\
             Short refresher.\n\n\
             - **Planned:** 0 / 30 min\n\
             - **As of:** 2026-05-01 12:00 UTC\n\n\
             _No problems planned: nothing is due._\n"
        );
    }

    #[test]
    fn markdown_for_empty_plan() {
        let mut p = plan();
        p.items.clear();
        p.relaxations.clear();
        p.total_planned_min = 0;
        p.empty_reason = Some("no problems match the session filters".into());
        let md = render_markdown(&p);
        assert!(md.contains("_No problems planned: no problems match the session filters._"));
        assert!(!md.contains("| # |"));
    }
}
