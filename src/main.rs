use std::io::Read;
use std::process::ExitCode;

use chrono::Utc;

use recall_engine::logging::init_tracing;
use recall_engine::{build_report, EngineConfig, EngineError, PracticeSnapshot, ReviewEngine};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("usage: recall-queue <snapshot.json | ->")]
    Usage,
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    let _log_guard = init_tracing(&log_level);

    match run() {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "recall-queue failed");
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<String, CliError> {
    let path = std::env::args().nth(1).ok_or(CliError::Usage)?;
    let raw = read_input(&path)?;

    let snapshot = PracticeSnapshot::from_json(&raw)?;
    let config = match snapshot.config.clone() {
        Some(config) => config,
        None => EngineConfig::from_env()?,
    };
    let engine = ReviewEngine::new(config)?;
    let now = snapshot.now.unwrap_or_else(Utc::now);

    tracing::info!(
        questions = snapshot.questions.len(),
        %now,
        "building practice report"
    );
    let report = build_report(&engine, &snapshot, now)?;
    Ok(serde_json::to_string_pretty(&report)?)
}

fn read_input(path: &str) -> Result<String, CliError> {
    let io_err = |source| CliError::Io {
        path: path.to_string(),
        source,
    };
    if path == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw).map_err(io_err)?;
        Ok(raw)
    } else {
        std::fs::read_to_string(path).map_err(io_err)
    }
}
