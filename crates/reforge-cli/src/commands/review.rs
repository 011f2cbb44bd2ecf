//! The `reforge review` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table};

use reforge_core::model::{Outcome, UserProblemReviewState};
use reforge_core::scheduler::{phase, record_attempt, Attempt};
use reforge_core::snapshot::{parse_snapshot, write_snapshot};

pub struct ReviewArgs {
    pub snapshot: PathBuf,
    pub problem: i64,
    pub outcome: String,
    pub confidence: u8,
    pub duration_secs: Option<u32>,
    pub performed_at: Option<String>,
    pub write: bool,
    pub format: String,
}

pub fn execute(args: ReviewArgs) -> Result<()> {
    anyhow::ensure!(
        args.confidence <= 100,
        "confidence must be between 0 and 100"
    );
    let outcome: Outcome = args.outcome.parse().map_err(anyhow::Error::msg)?;
    let performed_at = match &args.performed_at {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --performed-at '{s}', expected RFC 3339"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let mut snapshot = parse_snapshot(&args.snapshot)?;
    let Some(problem) = snapshot.problem(args.problem) else {
        anyhow::bail!("problem {} is not in the snapshot", args.problem);
    };
    let title = problem.title.clone();
    let before = snapshot.review_state(args.problem).cloned();

    let attempt = Attempt {
        user_id: snapshot.user_id,
        problem_id: args.problem,
        outcome,
        confidence_score: args.confidence,
        duration_seconds: args.duration_secs,
        performed_at,
    };
    let after = record_attempt(&mut snapshot, &attempt);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&after)?),
        "text" => print_transition(&title, before.as_ref(), &after, performed_at),
        other => anyhow::bail!("unknown format '{other}', expected text or json"),
    }

    if args.write {
        snapshot.as_of = snapshot.as_of.max(performed_at);
        write_snapshot(&args.snapshot, &snapshot)?;
        tracing::info!(
            path = %args.snapshot.display(),
            problem_id = args.problem,
            "snapshot written"
        );
        eprintln!("Snapshot updated: {}", args.snapshot.display());
    }

    Ok(())
}

fn print_transition(
    title: &str,
    before: Option<&UserProblemReviewState>,
    after: &UserProblemReviewState,
    at: DateTime<Utc>,
) {
    println!(
        "{title} (#{}): {}, next review {}",
        after.problem_id,
        after.last_outcome.map(|o| o.to_string()).unwrap_or_default(),
        after.next_review_at.format("%Y-%m-%d")
    );

    let mut table = Table::new();
    table.set_header(vec!["", "Before", "After"]);
    table.add_row(vec![
        Cell::new("Phase"),
        Cell::new(
            before
                .map(|s| phase(Some(s), false, at).to_string())
                .unwrap_or_else(|| "new".to_string()),
        ),
        Cell::new(phase(Some(after), false, at)),
    ]);
    table.add_row(row("Confidence", before, after, |s| s.confidence.to_string()));
    table.add_row(row("Attempts", before, after, |s| s.total_attempts.to_string()));
    table.add_row(row("Ease factor", before, after, |s| format!("{:.2}", s.ease_factor)));
    table.add_row(row("Interval (days)", before, after, |s| s.interval_days.to_string()));
    table.add_row(row("Next review", before, after, |s| {
        s.next_review_at.format("%Y-%m-%d %H:%M").to_string()
    }));
    println!("{table}");
}

fn row(
    label: &str,
    before: Option<&UserProblemReviewState>,
    after: &UserProblemReviewState,
    field: fn(&UserProblemReviewState) -> String,
) -> Vec<Cell> {
    vec![
        Cell::new(label),
        Cell::new(before.map(field).unwrap_or_else(|| "-".to_string())),
        Cell::new(field(after)),
    ]
}
