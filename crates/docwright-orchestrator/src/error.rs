//! The top-level error composing every sub-crate's error enum into the
//! orchestrator's single fallible surface (§7: propagation policy).
//! Per-batch LLM failures and per-item verify failures are recorded as
//! warnings in the run's artifacts rather than raised here — only
//! failures that make the run's output untrustworthy reach this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] docwright_config::ConfigError),

    #[error(transparent)]
    Index(#[from] docwright_index::IndexError),

    #[error(transparent)]
    Sandbox(#[from] docwright_utils::SandboxError),

    #[error(transparent)]
    Retriever(#[from] docwright_context::RetrieverError),

    #[error(transparent)]
    Ast(#[from] docwright_ast::AstError),

    #[error(transparent)]
    Apply(#[from] docwright_patch::ApplyError),

    #[error(transparent)]
    RunDir(#[from] crate::run_dir::RunDirError),

    #[error("failed to write run artifact {path}: {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("prod write for {rel_path} failed after archiving; rolled back {rolled_back} file(s): {source}")]
    ProdWriteFailed {
        rel_path: String,
        rolled_back: usize,
        #[source]
        source: std::io::Error,
    },
}
