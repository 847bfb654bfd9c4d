//! Configuration schema, discovery, and validation (§10).
//!
//! A single immutable [`Config`] struct, discovered by walking upward
//! from the working directory for `.docwright/config.toml`. CLI flags
//! override it at the call site in `docwright-cli`; this crate never
//! reads `std::env` for anything but the discovery starting directory.
//! The LLM API key is never part of this struct: it is read only from
//! `DOCWRIGHT_LLM_API_KEY` at the point of use.

pub mod discovery;
pub mod model;
pub mod validation;

pub use discovery::discover_config_file_from;
pub use model::{Config, FlagsConfig, IndexConfig, LlmConfig, PathsConfig, RunConfig, SanitizerConfig};
pub use validation::ConfigError;

/// Environment variable the LLM API key is read from. Never a config
/// file key or CLI flag (teacher idiom: secrets never on the command
/// line).
pub const LLM_API_KEY_ENV: &str = "DOCWRIGHT_LLM_API_KEY";

/// Reads the LLM API key from the environment, if set.
pub fn llm_api_key() -> Option<String> {
    std::env::var(LLM_API_KEY_ENV).ok()
}
