//! The configuration schema (§10): `[paths]`, `[index]`, `[llm]`,
//! `[run]`, `[flags]`, `[sanitizer]`. Every field has a built-in default
//! so a bare `.docwright/config.toml` (or none at all) is a valid,
//! runnable configuration.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    pub project_root: Utf8PathBuf,
    pub scan_root: Utf8PathBuf,
    pub exclude_globs: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_root: Utf8PathBuf::from("."),
            scan_root: Utf8PathBuf::from("src"),
            exclude_globs: vec![
                "output/**".to_string(),
                ".git/**".to_string(),
                "target/**".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub url: String,
    pub table: String,
    pub status_filter: Option<String>,
    pub max_rows: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_tokens_per_item: u64,
    pub batch_overhead_tokens: u64,
    pub model_ctx_tokens: u64,
    pub budget_guardrail: u64,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "auto".to_string(),
            temperature: 0.1,
            max_output_tokens: 4096,
            response_tokens_per_item: 220,
            batch_overhead_tokens: 300,
            model_ctx_tokens: 128_000,
            budget_guardrail: 2000,
            concurrency: 1,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub preserve_crlf: bool,
    pub save_per_item_patches: bool,
    pub save_combined_patch: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            preserve_crlf: true,
            save_per_item_patches: true,
            save_combined_patch: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FlagsConfig {
    pub run_scan: bool,
    pub run_fetch_targets: bool,
    pub run_build_prompts: bool,
    pub run_run_llm: bool,
    pub run_save_patch: bool,
    pub run_apply_sandbox: bool,
    pub run_verify: bool,
    pub confirm_prod_writes: bool,
}

impl Default for FlagsConfig {
    fn default() -> Self {
        Self {
            run_scan: true,
            run_fetch_targets: true,
            run_build_prompts: true,
            run_run_llm: true,
            run_save_patch: true,
            run_apply_sandbox: true,
            run_verify: true,
            confirm_prod_writes: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// See DESIGN.md Open Question #1: the "Capabilities:" tag prefix is
    /// configurable rather than hard-coded to the original's `AG:`.
    pub capabilities_tag_prefix: String,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            capabilities_tag_prefix: "AG:".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub index: IndexConfig,
    pub llm: LlmConfig,
    pub run: RunConfig,
    pub flags: FlagsConfig,
    pub sanitizer: SanitizerConfig,
}
