//! The CLI surface: config discovery plus CLI-flag overrides (§10: CLI
//! flags win over `.docwright/config.toml`, which wins over built-in
//! defaults), then a single call into [`docwright_orchestrator::run`].

use camino::Utf8PathBuf;
use clap::Parser;
use docwright_config::Config;
use docwright_orchestrator::{OrchestratorError, RunSummary};
use docwright_utils::exit_codes::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "docwright", version, about = "Batch docstring maintenance pipeline driven by an LLM")]
pub struct Cli {
    /// Load this config file instead of discovering `.docwright/config.toml`.
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    #[arg(long)]
    pub project_root: Option<Utf8PathBuf>,

    #[arg(long)]
    pub scan_root: Option<Utf8PathBuf>,

    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub skip_scan: bool,
    #[arg(long)]
    pub skip_fetch_targets: bool,
    #[arg(long)]
    pub skip_build_prompts: bool,
    #[arg(long)]
    pub skip_run_llm: bool,
    #[arg(long)]
    pub skip_save_patch: bool,
    #[arg(long)]
    pub skip_apply_sandbox: bool,
    #[arg(long)]
    pub skip_verify: bool,

    /// Archive originals and write results back into the project tree.
    /// Without this, a run's only durable output is its `RunDir`.
    #[arg(long)]
    pub confirm_prod_writes: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

/// Layers `cli` onto a discovered [`Config`] (CLI wins).
pub fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(project_root) = &cli.project_root {
        config.paths.project_root = project_root.clone();
    }
    if let Some(scan_root) = &cli.scan_root {
        config.paths.scan_root = scan_root.clone();
    }
    if let Some(provider) = &cli.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.llm.concurrency = concurrency;
    }

    if cli.skip_scan {
        config.flags.run_scan = false;
    }
    if cli.skip_fetch_targets {
        config.flags.run_fetch_targets = false;
    }
    if cli.skip_build_prompts {
        config.flags.run_build_prompts = false;
    }
    if cli.skip_run_llm {
        config.flags.run_run_llm = false;
    }
    if cli.skip_save_patch {
        config.flags.run_save_patch = false;
    }
    if cli.skip_apply_sandbox {
        config.flags.run_apply_sandbox = false;
    }
    if cli.skip_verify {
        config.flags.run_verify = false;
    }
    if cli.confirm_prod_writes {
        config.flags.confirm_prod_writes = true;
    }
}

/// Discovers configuration, applies `cli`'s overrides, runs the
/// pipeline, and maps the outcome to an [`ExitCode`].
pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    docwright_utils::logging::init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load_file(path.as_std_path())?,
        None => Config::discover()?,
    };
    apply_overrides(&mut config, &cli);
    config.validate()?;

    match docwright_orchestrator::run(config).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(ExitCode::Ok)
        }
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            Ok(exit_code_for(&err))
        }
    }
}

fn print_summary(summary: &RunSummary) {
    match serde_json::to_string_pretty(summary) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{summary:?}"),
    }
}

fn exit_code_for(err: &OrchestratorError) -> ExitCode {
    match err {
        OrchestratorError::Config(_) => ExitCode::ConfigError,
        OrchestratorError::Apply(_) => ExitCode::ApplyRejected,
        _ => ExitCode::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_win_over_discovered_defaults() {
        let mut config = Config::default();
        let cli = Cli {
            config: None,
            project_root: None,
            scan_root: Some(Utf8PathBuf::from("lib")),
            provider: Some("mock".to_string()),
            model: None,
            concurrency: Some(4),
            skip_scan: false,
            skip_fetch_targets: false,
            skip_build_prompts: false,
            skip_run_llm: false,
            skip_save_patch: false,
            skip_apply_sandbox: false,
            skip_verify: true,
            confirm_prod_writes: true,
            verbose: false,
        };
        apply_overrides(&mut config, &cli);
        assert_eq!(config.paths.scan_root, Utf8PathBuf::from("lib"));
        assert_eq!(config.llm.provider, "mock");
        assert_eq!(config.llm.concurrency, 4);
        assert!(!config.flags.run_verify);
        assert!(config.flags.confirm_prod_writes);
        assert!(config.flags.run_scan, "unset skip flags must not disable stages");
    }
}
