//! The `reforge generate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use reforge_core::config::{load_config_from, ReforgeConfig};
use reforge_core::engine::SessionPlan;
use reforge_core::report::{render_markdown, SessionReport};
use reforge_core::snapshot::parse_snapshot;
use reforge_core::templates::{PatternMode, SessionConfig, SessionSource, TemplateKey};

pub struct GenerateArgs {
    pub snapshot: PathBuf,
    pub template: Option<String>,
    pub custom: Option<PathBuf>,
    pub duration: Option<u32>,
    pub pattern_id: Option<i64>,
    pub config: Option<PathBuf>,
    pub format: String,
    pub output: Option<PathBuf>,
    pub save: bool,
}

pub fn execute(args: GenerateArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;
    let snapshot = parse_snapshot(&args.snapshot)?;
    tracing::debug!(
        path = %args.snapshot.display(),
        problems = snapshot.problems.len(),
        review_states = snapshot.review_states.len(),
        "snapshot loaded"
    );
    let source = session_source(&args, &config)?;

    let plan = config.generator().generate(&snapshot, &source)?;

    let rendered = match args.format.as_str() {
        "json" => serde_json::to_string_pretty(&plan)?,
        "markdown" | "md" => render_markdown(&plan),
        "text" => render_text(&plan),
        other => anyhow::bail!("unknown format '{other}', expected text, json or markdown"),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Plan written to: {}", path.display());
        }
        None => println!("{rendered}"),
    }

    if args.save {
        let report = SessionReport::new(snapshot.user_id, plan);
        let path = config.reports_dir.join(report.file_name());
        report.save_json(&path)?;
        tracing::debug!(report_id = %report.id, "session report saved");
        eprintln!("Session saved to: {}", path.display());
    }

    Ok(())
}

fn session_source(args: &GenerateArgs, config: &ReforgeConfig) -> Result<SessionSource> {
    if let Some(path) = &args.custom {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut custom: SessionConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse session config: {}", path.display()))?;
        if let Some(minutes) = args.duration {
            custom.duration_min = minutes;
        }
        if let Some(pattern_id) = args.pattern_id {
            custom.pattern_mode = PatternMode::Specific;
            custom.pattern_ids = vec![pattern_id];
        }
        return Ok(SessionSource::Custom(custom));
    }

    let key = match &args.template {
        Some(name) => name.parse::<TemplateKey>()?,
        None => config.default_template,
    };
    Ok(SessionSource::Template {
        key,
        duration_min: args.duration,
        pattern_id: args.pattern_id,
    })
}

fn render_text(plan: &SessionPlan) -> String {
    let mut out = format!(
        "{} ({} of {} min planned)\n{}\n",
        plan.template_name,
        plan.total_planned_min,
        plan.planned_duration_min,
        plan.template_description
    );

    if let Some(reason) = &plan.empty_reason {
        out.push_str(&format!("\nNo problems planned: {reason}\n"));
        return out;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Problem", "Difficulty", "Min", "Score", "Why"]);
    for (i, item) in plan.items.iter().enumerate() {
        let mut why = item.reason.clone();
        if item.quick_win {
            why.push_str(" [quick win]");
        }
        if item.degraded {
            why.push_str(" [relaxed]");
        }
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(format!("{} (#{})", item.title, item.problem_id)),
            Cell::new(item.difficulty),
            Cell::new(item.planned_min),
            Cell::new(format!("{:.3}", item.score)),
            Cell::new(why),
        ]);
    }
    out.push_str(&format!("\n{table}\n"));

    if let Some(w) = &plan.weight_warning {
        out.push_str(&format!("\nWarning: {w}\n"));
    }
    if !plan.relaxations.is_empty() {
        out.push_str("\nAdjustments:\n");
        for r in &plan.relaxations {
            out.push_str(&format!("  - {r}\n"));
        }
    }
    out
}
