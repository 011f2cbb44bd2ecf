//! The `reforge due` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use reforge_core::scheduler::{phase, ReviewPhase};
use reforge_core::snapshot::parse_snapshot;

pub fn execute(snapshot_path: PathBuf, only_due: bool) -> Result<()> {
    let snapshot = parse_snapshot(&snapshot_path)?;
    let states = snapshot.review_state_index();

    let mut rows: Vec<_> = snapshot
        .problems
        .iter()
        .map(|p| {
            let state = states.get(&p.id).copied();
            (p, state, phase(state, false, snapshot.as_of))
        })
        .filter(|(_, _, ph)| !only_due || *ph == ReviewPhase::Due)
        .collect();
    // Due first (most overdue on top), then scheduled by date, then new.
    rows.sort_by_key(|(p, state, ph)| {
        let rank = match ph {
            ReviewPhase::Due | ReviewPhase::Reviewing => 0,
            ReviewPhase::Scheduled => 1,
            ReviewPhase::New => 2,
        };
        (rank, state.map(|s| s.next_review_at), p.id)
    });

    if rows.is_empty() {
        println!("Nothing to review as of {}.", snapshot.as_of.format("%Y-%m-%d"));
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Problem",
        "Difficulty",
        "Phase",
        "Confidence",
        "Next review",
        "Interval",
    ]);
    for (problem, state, ph) in &rows {
        table.add_row(vec![
            Cell::new(format!("{} (#{})", problem.title, problem.id)),
            Cell::new(problem.difficulty),
            Cell::new(ph),
            Cell::new(state.map(|s| s.confidence.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(
                state
                    .map(|s| s.next_review_at.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(
                state
                    .map(|s| format!("{}d", s.interval_days))
                    .unwrap_or_else(|| "-".into()),
            ),
        ]);
    }
    println!("{table}");

    let due = rows.iter().filter(|(_, _, ph)| *ph == ReviewPhase::Due).count();
    println!(
        "\n{due} due, {} total as of {}",
        rows.len(),
        snapshot.as_of.format("%Y-%m-%d")
    );
    Ok(())
}
