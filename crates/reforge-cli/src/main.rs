//! reforge CLI: plan practice sessions and record attempts.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "reforge", version, about = "Spaced-repetition planner for coding-interview practice")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a practice session from a snapshot
    Generate {
        /// Path to the snapshot .toml
        #[arg(long)]
        snapshot: PathBuf,

        /// Session template (e.g. "daily-practice")
        #[arg(long, conflicts_with = "custom")]
        template: Option<String>,

        /// Custom session config .toml
        #[arg(long)]
        custom: Option<PathBuf>,

        /// Override the session length in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Restrict the session to one pattern
        #[arg(long)]
        pattern_id: Option<i64>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the rendered plan to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also save a JSON session report under the configured reports dir
        #[arg(long)]
        save: bool,
    },

    /// Record an attempt and advance the review schedule
    Review {
        /// Path to the snapshot .toml
        #[arg(long)]
        snapshot: PathBuf,

        /// Problem id
        #[arg(long)]
        problem: i64,

        /// Attempt outcome: passed or failed
        #[arg(long)]
        outcome: String,

        /// Self-reported confidence, 0-100
        #[arg(long)]
        confidence: u8,

        /// Time spent in seconds
        #[arg(long)]
        duration_secs: Option<u32>,

        /// When the attempt happened (RFC 3339, default: now)
        #[arg(long)]
        performed_at: Option<String>,

        /// Write the updated state back into the snapshot
        #[arg(long)]
        write: bool,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show where every problem sits in the review cycle
    Due {
        /// Path to the snapshot .toml
        #[arg(long)]
        snapshot: PathBuf,

        /// Only list problems that are due
        #[arg(long)]
        only_due: bool,
    },

    /// List session templates
    Templates {
        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate snapshot files
    Validate {
        /// Path to snapshot file or directory
        #[arg(long)]
        snapshot: PathBuf,
    },

    /// Create starter config and example snapshot
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reforge=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            snapshot,
            template,
            custom,
            duration,
            pattern_id,
            config,
            format,
            output,
            save,
        } => commands::generate::execute(commands::generate::GenerateArgs {
            snapshot,
            template,
            custom,
            duration,
            pattern_id,
            config,
            format,
            output,
            save,
        }),
        Commands::Review {
            snapshot,
            problem,
            outcome,
            confidence,
            duration_secs,
            performed_at,
            write,
            format,
        } => commands::review::execute(commands::review::ReviewArgs {
            snapshot,
            problem,
            outcome,
            confidence,
            duration_secs,
            performed_at,
            write,
            format,
        }),
        Commands::Due { snapshot, only_due } => commands::due::execute(snapshot, only_due),
        Commands::Templates { format } => commands::templates::execute(format),
        Commands::Validate { snapshot } => commands::validate::execute(snapshot),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
