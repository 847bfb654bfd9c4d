//! Orchestrator (C16): drives the full docstring pipeline across a
//! fresh [`RunDir`], stage by stage, honoring `flags.run_*` toggles and
//! the `confirm_prod_writes` gate that guards the only stage touching
//! files outside the run directory. Grounded on the staged,
//! tracing-span-per-stage shape of the teacher's own phase executor,
//! collapsed here to the linear `scan -> ... -> archive_and_replace`
//! chain this pipeline actually has.

pub mod error;
pub mod run_dir;

pub use error::OrchestratorError;
pub use run_dir::RunDir;

use camino::{Utf8Path, Utf8PathBuf};
use docwright_ast::AstTargeter;
use docwright_config::Config;
use docwright_context::{BudgetConfig, SourceRetriever, TokenBudgeter, build_item, build_suspect};
use docwright_docstring::{sanitize, verify};
use docwright_index::{IndexQuery, IndexSource};
use docwright_llm::{LlmBackend, LlmRequest, construct_backend};
use docwright_patch_model::{Batch, IndexRow, Item, LlmResult, PatchOp, PatchPlan, TargetInfo, UnifiedDiff};
use docwright_prompt::build_prompt;
use docwright_response::parse_response;
use docwright_utils::{Eol, SandboxRoot};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Per-run counters surfaced to the CLI for a human-readable summary.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub scanned_rows: usize,
    pub items: usize,
    pub batches: usize,
    pub llm_results: usize,
    pub files_patched: usize,
    pub verify_failures: usize,
    pub prod_files_written: usize,
}

/// A sanitized, plan-resolved item ready for verification and, if its
/// file is among the ones applied, for the prod-write stage.
struct SanitizedItem {
    id: String,
    rel_path: String,
    signature: String,
    docstring: String,
    op: PatchOp,
}

/// Runs the full pipeline for `config`, writing every artifact under a
/// freshly created [`RunDir`]. A stage disabled via `flags.run_*` is
/// skipped outright (not merely no-op'd), so a partial run's artifacts
/// reflect exactly the stages that ran.
pub async fn run(config: Config) -> Result<RunSummary, OrchestratorError> {
    let run_dir = RunDir::create(None, None)?;
    let run_id = run_dir.run_id().to_string();
    run_pipeline(config, run_dir)
        .instrument(tracing::info_span!("run", run_id))
        .await
}

async fn run_pipeline(config: Config, run_dir: RunDir) -> Result<RunSummary, OrchestratorError> {
    tracing::info!("starting run");
    let mut summary = RunSummary {
        run_id: run_dir.run_id().to_string(),
        ..Default::default()
    };

    let exclude = build_exclude_globset(&config.paths.exclude_globs);
    let sandbox = SandboxRoot::new(&config.paths.project_root, &config.paths.scan_root, exclude)?;

    let rows = if config.flags.run_scan {
        scan(&config).instrument(tracing::info_span!("stage", stage = "scan")).await?
    } else {
        Vec::new()
    };
    summary.scanned_rows = rows.len();

    let (items, sources, targets) = if config.flags.run_fetch_targets {
        let _span = tracing::info_span!("stage", stage = "fetch_targets").entered();
        fetch_targets(&sandbox, &rows)?
    } else {
        (Vec::new(), HashMap::new(), HashMap::new())
    };
    summary.items = items.len();

    let batches = if config.flags.run_build_prompts {
        let _span = tracing::info_span!("stage", stage = "build_prompts").entered();
        let batches = pack_batches(&config, items);
        save_raw_prompts(&run_dir, &batches)?;
        batches
    } else {
        Vec::new()
    };
    summary.batches = batches.len();

    let results = if config.flags.run_run_llm {
        run_llm(&config, &run_dir, &batches)
            .instrument(tracing::info_span!("stage", stage = "run_llm"))
            .await
    } else {
        HashMap::new()
    };
    summary.llm_results = results.len();

    let (plan, sanitized) = build_patch_plan(&config, &batches, &results, &targets, &sources);

    let diff = if config.flags.run_save_patch {
        let _span = tracing::info_span!("stage", stage = "save_patch").entered();
        let diff = docwright_patch::compile(&plan, |rel_path| {
            sources.get(rel_path).map(|(text, _)| text.clone())
        });
        save_patches(&config, &run_dir, &diff, &sanitized, &sources)?;
        diff
    } else {
        UnifiedDiff::default()
    };
    summary.files_patched = diff.files.len();

    let sandbox_files = if config.flags.run_apply_sandbox && !diff.files.is_empty() {
        let _span = tracing::info_span!("stage", stage = "apply_sandbox").entered();
        let originals: HashMap<String, String> = sources
            .iter()
            .map(|(k, (text, _))| (k.clone(), text.clone()))
            .collect();
        let applied = docwright_patch::apply_in_memory(&originals, &diff)?;
        write_sandbox_applied(&config, &run_dir, &applied, &sources)?;
        applied
    } else {
        HashMap::new()
    };

    if config.flags.run_verify {
        let _span = tracing::info_span!("stage", stage = "verify").entered();
        summary.verify_failures = run_verify(&run_dir, &sanitized)?;
    }

    if config.flags.confirm_prod_writes && !sandbox_files.is_empty() {
        let _span = tracing::info_span!("stage", stage = "archive_and_replace").entered();
        summary.prod_files_written =
            archive_and_replace(&config, &run_dir, &sandbox, &sources, &sandbox_files)?;
    }

    tracing::info!(?summary, "run complete");
    Ok(summary)
}

fn build_exclude_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => tracing::warn!(pattern, error = %err, "ignoring invalid exclude glob"),
        }
    }
    builder
        .build()
        .unwrap_or_else(|_| GlobSetBuilder::new().build().expect("empty glob set always builds"))
}

async fn scan(config: &Config) -> Result<Vec<IndexRow>, OrchestratorError> {
    let index = IndexSource::connect(&config.index.url).await?;
    let query = IndexQuery {
        url: config.index.url.clone(),
        table: config.index.table.clone(),
        status_filter: config.index.status_filter.clone(),
        max_rows: config.index.max_rows,
    };
    let rows = index.stream(&query).await?;
    Ok(dedup_rows(rows))
}

/// Drops later rows whose `dedup_key()` (DESIGN.md Open Question #2)
/// repeats an earlier one, keeping the first occurrence.
fn dedup_rows(rows: Vec<IndexRow>) -> Vec<IndexRow> {
    let mut seen = HashSet::new();
    rows.into_iter().filter(|row| seen.insert(row.dedup_key())).collect()
}

type SourceMap = HashMap<String, (String, Eol)>;
type TargetMap = HashMap<String, TargetInfo>;

fn fetch_targets(
    sandbox: &SandboxRoot,
    rows: &[IndexRow],
) -> Result<(Vec<Item>, SourceMap, TargetMap), OrchestratorError> {
    let targeter = AstTargeter::new()?;
    let retriever = SourceRetriever::new(sandbox);
    let mut items = Vec::with_capacity(rows.len());
    let mut sources: SourceMap = HashMap::new();
    let mut targets: TargetMap = HashMap::new();

    for row in rows {
        let resolved = match sandbox.resolve(Utf8Path::new(&row.filepath)) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(id = %row.id, filepath = %row.filepath, error = %err, "skipping row outside sandbox");
                continue;
            }
        };
        let rel_path = resolved.rel().as_str().to_string();
        let (content, eol) = match retriever.read(&rel_path) {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(id = %row.id, %rel_path, error = %err, "skipping unreadable file");
                continue;
            }
        };
        sources.entry(rel_path.clone()).or_insert_with(|| (content.clone(), eol));

        let (suspect, target) =
            build_suspect(&targeter, row, &rel_path, resolved.abs().to_path_buf(), &content);
        targets.insert(row.id.clone(), target.clone());
        items.push(build_item(suspect, &target));
    }

    Ok((items, sources, targets))
}

fn pack_batches(config: &Config, items: Vec<Item>) -> Vec<Batch> {
    let budgeter = TokenBudgeter::new(BudgetConfig {
        max_ctx: config.llm.model_ctx_tokens,
        resp_per_item: config.llm.response_tokens_per_item,
        guardrail: config.llm.budget_guardrail,
        batch_overhead: config.llm.batch_overhead_tokens,
        max_output_tokens: config.llm.max_output_tokens as u64,
    });
    budgeter.pack(items, |item| item.suspect.context_code.clone())
}

fn save_raw_prompts(run_dir: &RunDir, batches: &[Batch]) -> Result<(), OrchestratorError> {
    for (index, batch) in batches.iter().enumerate() {
        let prompt = build_prompt(batch);
        let text = format!("=== system ===\n{}\n=== user ===\n{}\n", prompt.system, prompt.user);
        let path = run_dir.raw_prompts_dir().join(RunDir::batch_filename(index, "txt"));
        write_artifact(&path, text.as_bytes())?;
    }
    Ok(())
}

async fn run_llm(config: &Config, run_dir: &RunDir, batches: &[Batch]) -> HashMap<String, LlmResult> {
    let backend: Arc<dyn LlmBackend> = Arc::from(construct_backend(
        &config.llm.provider,
        docwright_config::llm_api_key(),
        Duration::from_secs(config.llm.request_timeout_secs),
    ));
    let semaphore = Arc::new(tokio::sync::Semaphore::new(config.llm.concurrency.max(1)));
    let mut tasks = tokio::task::JoinSet::new();

    for (index, batch) in batches.iter().cloned().enumerate() {
        let backend = Arc::clone(&backend);
        let semaphore = Arc::clone(&semaphore);
        let model = config.llm.model.clone();
        let temperature = config.llm.temperature;
        let max_output_tokens = config.llm.max_output_tokens;
        let raw_responses_dir = run_dir.raw_responses_dir();

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore is never closed");
            let prompt = build_prompt(&batch);
            let request = LlmRequest {
                system: prompt.system,
                user: prompt.user,
                model,
                temperature,
                max_output_tokens,
                response_format: prompt.response_format,
            };
            match backend.complete(&request).await {
                Ok(raw) => {
                    let path = raw_responses_dir.join(RunDir::batch_filename(index, "json"));
                    if let Err(err) = std::fs::write(path.as_std_path(), &raw) {
                        tracing::warn!(index, error = %err, "failed to persist raw response");
                    }
                    let expected: HashSet<String> = batch.ids().into_iter().collect();
                    Some(parse_response(&raw, &expected))
                }
                Err(err) => {
                    tracing::error!(index, error = %err, "batch dispatch failed, skipping batch");
                    None
                }
            }
        });
    }

    let mut out = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(results)) => {
                for result in results {
                    out.insert(result.id.clone(), result);
                }
            }
            Ok(None) => {}
            Err(join_err) => tracing::error!(error = %join_err, "llm batch task panicked"),
        }
    }
    out
}

fn build_patch_plan(
    config: &Config,
    batches: &[Batch],
    results: &HashMap<String, LlmResult>,
    targets: &TargetMap,
    sources: &SourceMap,
) -> (PatchPlan, Vec<SanitizedItem>) {
    let mut plan = PatchPlan::default();
    let mut sanitized_items = Vec::new();

    for batch in batches {
        for item in &batch.items {
            let Some(result) = results.get(item.id()) else {
                tracing::warn!(id = item.id(), "no LLM result for item, skipping patch");
                continue;
            };
            let Some(target) = targets.get(item.id()) else {
                continue;
            };
            let Some((source, _)) = sources.get(&item.suspect.rel_path) else {
                continue;
            };

            let body = sanitize(&result.docstring, &config.sanitizer);
            let op = docwright_patch::plan_op(source, target, &item.suspect.rel_path, &body);
            plan.push(op.clone());
            sanitized_items.push(SanitizedItem {
                id: item.id().to_string(),
                rel_path: item.suspect.rel_path.clone(),
                signature: item.suspect.signature.clone(),
                docstring: body,
                op,
            });
        }
    }
    (plan, sanitized_items)
}

fn save_patches(
    config: &Config,
    run_dir: &RunDir,
    diff: &UnifiedDiff,
    sanitized_items: &[SanitizedItem],
    sources: &SourceMap,
) -> Result<(), OrchestratorError> {
    if config.run.save_combined_patch {
        for file in &diff.files {
            let mut text = String::new();
            docwright_patch::render::render_file(file, &mut text);
            let filename = format!("{}.patch", RunDir::sanitize_patch_filename(&file.rel_path));
            write_artifact(&run_dir.patches_dir().join(filename), text.as_bytes())?;
        }
    }

    if config.run.save_per_item_patches {
        for item in sanitized_items {
            let Some((source, _)) = sources.get(&item.rel_path) else {
                continue;
            };
            let mut item_plan = PatchPlan::default();
            item_plan.push(item.op.clone());
            let item_diff = docwright_patch::compile(&item_plan, |rel_path| {
                (rel_path == item.rel_path).then(|| source.clone())
            });
            for file in &item_diff.files {
                let mut text = String::new();
                docwright_patch::render::render_file(file, &mut text);
                let filename = format!(
                    "{}__{}.patch",
                    RunDir::sanitize_patch_filename(&item.rel_path),
                    item.id
                );
                write_artifact(&run_dir.patches_dir().join(filename), text.as_bytes())?;
            }
        }
    }
    Ok(())
}

fn write_sandbox_applied(
    config: &Config,
    run_dir: &RunDir,
    applied: &HashMap<String, String>,
    sources: &SourceMap,
) -> Result<(), OrchestratorError> {
    for (rel_path, text) in applied {
        let eol = effective_eol(config, sources, rel_path);
        let rendered = docwright_utils::render(text, eol);
        let path = run_dir.sandbox_applied_dir().join(rel_path);
        write_artifact(&path, rendered.as_bytes())?;
    }
    Ok(())
}

/// The terminator to render a file with: the file's own detected
/// dominant EOL (invariant 5), unless `run.preserve_crlf` is disabled,
/// in which case every file is normalized to LF regardless of what it
/// was originally (§6: `run.preserve_crlf` "overrides EOL policy").
fn effective_eol(config: &Config, sources: &SourceMap, rel_path: &str) -> Eol {
    if !config.run.preserve_crlf {
        return Eol::Lf;
    }
    sources.get(rel_path).map(|(_, eol)| *eol).unwrap_or(Eol::Lf)
}

fn run_verify(run_dir: &RunDir, sanitized_items: &[SanitizedItem]) -> Result<usize, OrchestratorError> {
    let mut failures = 0;
    for item in sanitized_items {
        let report = verify(&item.docstring, &item.signature);
        if !report.ok {
            failures += 1;
        }
        let payload = serde_json::json!({ "id": item.id, "ok": report.ok, "issues": report.issues });
        let path = run_dir.verify_reports_dir().join(format!("{}.json", item.id));
        write_artifact(&path, payload.to_string().as_bytes())?;
    }
    Ok(failures)
}

/// Archives each touched file's original bytes before writing the new
/// content into place, aborting before any project write if an archive
/// write fails (invariant 6: all-or-nothing), and rolling back already
/// written files if a later project write fails partway through.
fn archive_and_replace(
    config: &Config,
    run_dir: &RunDir,
    sandbox: &SandboxRoot,
    sources: &SourceMap,
    applied: &HashMap<String, String>,
) -> Result<usize, OrchestratorError> {
    let mut archived = Vec::with_capacity(applied.len());
    for rel_path in applied.keys() {
        let Some((original, eol)) = sources.get(rel_path) else {
            continue;
        };
        let rendered = docwright_utils::render(original, *eol);
        let archive_path = run_dir.archives_dir().join(rel_path);
        write_artifact(&archive_path, rendered.as_bytes())?;
        archived.push(rel_path.clone());
    }

    let mut written = Vec::with_capacity(archived.len());
    for rel_path in &archived {
        let new_text = &applied[rel_path];
        let eol = effective_eol(config, sources, rel_path);
        let rendered = docwright_utils::render(new_text, eol);

        write_artifact(&run_dir.prod_applied_dir().join(rel_path), rendered.as_bytes())?;

        let abs_path = sandbox.scan_root().join(rel_path);
        if let Err(source) = docwright_utils::write_file_atomic(&abs_path, rendered.as_bytes()) {
            rollback(run_dir, sandbox, &written)?;
            return Err(OrchestratorError::ProdWriteFailed {
                rel_path: rel_path.clone(),
                rolled_back: written.len(),
                source,
            });
        }
        written.push(rel_path.clone());
    }
    Ok(written.len())
}

fn rollback(run_dir: &RunDir, sandbox: &SandboxRoot, written: &[String]) -> Result<(), OrchestratorError> {
    for rel_path in written {
        let archive_path = run_dir.archives_dir().join(rel_path);
        let original = std::fs::read(archive_path.as_std_path()).map_err(|source| {
            OrchestratorError::Artifact {
                path: archive_path.to_string(),
                source,
            }
        })?;
        let abs_path = sandbox.scan_root().join(rel_path);
        docwright_utils::write_file_atomic(&abs_path, &original).map_err(|source| {
            OrchestratorError::Artifact {
                path: abs_path.to_string(),
                source,
            }
        })?;
    }
    Ok(())
}

/// Writes a run artifact via the same temp-file + fsync + rename idiom
/// as prod writes (SPEC_FULL §9), rather than a bare `fs::write`, so
/// parent directories for a nested `rel_path` (e.g. `pkg/mod.py` under
/// `sandbox_applied/`) are created as needed.
fn write_artifact(path: &Utf8Path, content: &[u8]) -> Result<(), OrchestratorError> {
    docwright_utils::write_file_atomic(path, content).map_err(|source| OrchestratorError::Artifact {
        path: path.to_string(),
        source,
    })
}
