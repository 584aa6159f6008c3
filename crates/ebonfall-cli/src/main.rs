//! Single-turn runner for the Ebonfall turn engine.
//!
//! Loads a world fixture and a turn input, resolves exactly one turn with the
//! template narrator, and prints the result:
//!
//! ```text
//! fixture + turn --> TurnEngine::resolve --> narrative + outcome log (exit 0)
//!                                        \-> one violation per line  (exit 1)
//! ```
//!
//! Unusable arguments, configuration, or fixtures exit with status 2. Logs go
//! to stderr so stdout carries only the turn result.

mod args;
mod fixture;

use std::process::ExitCode;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ebonfall_core::config::{EngineConfig, LogFormat, LoggingConfig};
use ebonfall_core::narrative::TemplateNarrator;
use ebonfall_core::prompt::PromptEngine;
use ebonfall_core::turn::{TurnEngine, TurnOutcome};

use crate::args::{ArgsError, CliArgs, USAGE};

/// Exit status for a committed turn or `--help`.
const EXIT_OK: u8 = 0;

/// Exit status for a rejected turn.
const EXIT_REJECTED: u8 = 1;

/// Exit status for unusable input or configuration.
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    ExitCode::from(exit_status(run(std::env::args().skip(1)).await))
}

/// Collapse the run result into a process status, reporting any error.
fn exit_status(result: anyhow::Result<u8>) -> u8 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_USAGE
        }
    }
}

async fn run<I>(raw_args: I) -> anyhow::Result<u8>
where
    I: IntoIterator<Item = String>,
{
    let args = match CliArgs::parse(raw_args) {
        Ok(args) => args,
        Err(ArgsError::Help) => {
            println!("{USAGE}");
            return Ok(EXIT_OK);
        }
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("{USAGE}");
            return Ok(EXIT_USAGE);
        }
    };

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::from_env().context("reading environment overrides")?,
    };
    init_tracing(&config.logging);

    info!(
        fixture = %args.fixture.display(),
        timeout_ms = config.narrative.timeout_ms,
        "ebonfall starting"
    );

    let state = fixture::load_state(&args.fixture)?;
    let input = fixture::load_turn_input(args.turn.as_deref())?;

    let prompts = match &config.narrative.templates_dir {
        Some(dir) => PromptEngine::new(dir)?,
        None => PromptEngine::with_default()?,
    };
    let system_prompt = prompts.render(&state)?;

    let engine = TurnEngine::from_config(TemplateNarrator::new(), system_prompt, &config.narrative);
    let outcome = engine.resolve(state, &input).await;

    Ok(report(&outcome))
}

/// Print the outcome and return its exit status.
fn report(outcome: &TurnOutcome) -> u8 {
    match outcome {
        TurnOutcome::Committed { narrative, .. } => {
            println!("{}", narrative.narrative);
            println!("{}", narrative.outcome_log);
        }
        TurnOutcome::Rejected { violations, .. } => {
            for violation in violations {
                println!("{violation}");
            }
        }
    }
    outcome_status(outcome)
}

/// Exit status for a resolved turn.
const fn outcome_status(outcome: &TurnOutcome) -> u8 {
    if outcome.is_committed() {
        EXIT_OK
    } else {
        EXIT_REJECTED
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init(),
    }
}
