//! The `reforge init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("reforge.toml").exists() {
        println!("reforge.toml already exists, skipping.");
    } else {
        std::fs::write("reforge.toml", SAMPLE_CONFIG)?;
        println!("Created reforge.toml");
    }

    std::fs::create_dir_all("snapshots")?;
    let example_path = std::path::Path::new("snapshots/example.toml");
    if example_path.exists() {
        println!("snapshots/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_SNAPSHOT)?;
        println!("Created snapshots/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Replace snapshots/example.toml with your own problems and history");
    println!("  2. Run: reforge validate --snapshot snapshots/example.toml");
    println!("  3. Run: reforge generate --snapshot snapshots/example.toml --template daily-practice");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# reforge configuration

# Preset used when neither --template nor --custom is given.
default_template = "standard-session"
reports_dir = "./reforge-sessions"

# Base scoring weights. They are rescaled if they do not sum to 1.
[weights]
confidence = 0.30
days_since = 0.20
attempts = 0.10
time = 0.05
difficulty = 0.15
last_failed = 0.10
pattern_weakness = 0.10

[features]
time_cap_seconds = 1800
days_cap = 30

[composer]
easy_minutes = 10
medium_minutes = 15
hard_minutes = 20
max_planned_minutes = 60
quick_win_minutes = 10
distribution_tolerance_pct = 15.0
min_fill_ratio = 0.6
"#;

const EXAMPLE_SNAPSHOT: &str = r#"user_id = 1
as_of = "2026-05-01T12:00:00Z"

[[patterns]]
id = 1
title = "Arrays & Hashing"

[[patterns]]
id = 2
title = "Graphs"

[[problems]]
id = 1
title = "Two Sum"
difficulty = "easy"
patterns = [1]

[[problems]]
id = 2
title = "Group Anagrams"
difficulty = "medium"
patterns = [1]

[[problems]]
id = 3
title = "Number of Islands"
difficulty = "medium"
patterns = [2]

[[problems]]
id = 4
title = "Word Ladder"
difficulty = "hard"
patterns = [2]

[[review_states]]
problem_id = 1
confidence = 80
total_attempts = 2
avg_time_seconds = 420
last_outcome = "passed"
ease_factor = 2.5
interval_days = 6
last_attempt_at = "2026-04-20T18:00:00Z"

[[review_states]]
problem_id = 3
confidence = 30
total_attempts = 1
avg_time_seconds = 1500
last_outcome = "failed"
ease_factor = 2.3
interval_days = 1
last_attempt_at = "2026-04-25T09:00:00Z"

[[pattern_stats]]
pattern_id = 1
times_revised = 2
avg_confidence = 80

[[pattern_stats]]
pattern_id = 2
times_revised = 1
avg_confidence = 30
"#;
