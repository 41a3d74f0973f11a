pub mod commands;

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use assessment_core::AssessConfig;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "assess", about = "Extract, grade and schedule study questions", version)]
pub struct Cli {
    /// JSON config file (defaults to ASSESS_* environment variables)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract question records from OCR text
    Parse {
        /// Text file to read ("-" for stdin)
        input: String,
    },

    /// Grade answers against question records
    Grade {
        /// JSON object mapping record id to question record
        #[arg(long)]
        records: String,
        /// JSON array of {"id", "answer"} entries
        #[arg(long)]
        answers: String,
    },

    /// Schedule the next review of one record
    Review {
        /// JSON review state ("-" for stdin)
        #[arg(long)]
        state: String,
        /// 0 = again, 1 = hard, 2 = good, 3 = easy
        #[arg(long, allow_hyphen_values = true)]
        quality: i32,
        /// Review time as RFC 3339 (defaults to now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// List due records and an optional per-day forecast
    Due {
        /// JSON array of review states, each with an "id"
        #[arg(long)]
        states: String,
        /// Maximum number of due records to list
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Number of days to forecast
        #[arg(long)]
        forecast: Option<u32>,
        /// Reference time as RFC 3339 (defaults to now)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
}

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref())?;

    let output = match cli.command {
        Command::Parse { input } => commands::parse_text(&read_input(&input)?, &config)?,
        Command::Grade { records, answers } => {
            commands::grade_answers(&read_input(&records)?, &read_input(&answers)?, &config)?
        }
        Command::Review {
            state,
            quality,
            now,
        } => commands::review(
            &read_input(&state)?,
            quality,
            now.unwrap_or_else(Utc::now),
            &config,
        )?,
        Command::Due {
            states,
            limit,
            forecast,
            now,
        } => commands::due(
            &read_input(&states)?,
            now.unwrap_or_else(Utc::now),
            limit,
            forecast,
        )?,
    };

    println!("{output}");
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AssessConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            AssessConfig::from_json(&raw).with_context(|| format!("loading config {}", path.display()))
        }
        None => AssessConfig::from_env().context("loading config from environment"),
    }
}

fn read_input(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(source).with_context(|| format!("reading {source}"))
}
