//! The `reforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

use reforge_core::snapshot::{load_snapshot_directory, parse_snapshot, validate_snapshot};

pub fn execute(snapshot_path: PathBuf) -> Result<()> {
    let snapshots = if snapshot_path.is_dir() {
        load_snapshot_directory(&snapshot_path)?
    } else {
        vec![(snapshot_path.clone(), parse_snapshot(&snapshot_path)?)]
    };

    let mut total_warnings = 0;

    for (path, snapshot) in &snapshots {
        println!(
            "Snapshot: {} (user {}, {} problems, {} review states)",
            path.display(),
            snapshot.user_id,
            snapshot.problems.len(),
            snapshot.review_states.len()
        );

        let warnings = validate_snapshot(snapshot);
        for w in &warnings {
            let prefix = w
                .subject
                .as_ref()
                .map(|s| format!("  [{s}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All snapshots valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
