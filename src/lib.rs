//! `docwright`: a batch docstring maintenance pipeline driven by an
//! LLM, with strict, dry-run-first patch application. This crate wires
//! together the pipeline crates behind a single [`DocwrightError`] and
//! the [`run`] entrypoint the binary calls.

pub use docwright_cli::{Cli, apply_overrides};
pub use docwright_orchestrator::{OrchestratorError, RunSummary};
use docwright_utils::exit_codes::ExitCode;
use thiserror::Error;

/// Composes every sub-crate's fallible surface that can abort a run
/// before the orchestrator's own stage-gated error handling takes
/// over. `docwright-cli`'s flag parsing stays outside this enum: a
/// malformed CLI invocation is reported by `clap` directly, never
/// routed through the pipeline's error model.
#[derive(Debug, Error)]
pub enum DocwrightError {
    #[error(transparent)]
    Config(#[from] docwright_config::ConfigError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

/// Runs the CLI entrypoint, returning the process exit code.
pub async fn run() -> ExitCode {
    match docwright_cli::run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("docwright: {err:#}");
            ExitCode::Other
        }
    }
}
