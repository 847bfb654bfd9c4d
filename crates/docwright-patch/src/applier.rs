//! PatchApplier (C15): strict, dry-run-first, all-or-nothing unified
//! diff application with per-file EOL preservation and create/delete
//! support. State machine: `parsed -> dry_run_ok? -> apply -> done`,
//! or `parsed -> rejected` (terminal, no partial writes).

use camino::{Utf8Path, Utf8PathBuf};
use docwright_patch_model::{FilePatch, LineTag, UnifiedDiff};
use docwright_utils::atomic_write::write_file_atomic;
use docwright_utils::eol::Eol;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("hunk at old_start {old_start} in {rel_path} does not match file contents")]
    ContextMismatch { rel_path: String, old_start: u32 },
    #[error("target file for create already exists: {rel_path}")]
    CreateTargetExists { rel_path: String },
    #[error("target file for delete does not exist: {rel_path}")]
    DeleteTargetMissing { rel_path: String },
    #[error("failed to read {rel_path}: {source}")]
    Read {
        rel_path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {rel_path}: {source}")]
    Write {
        rel_path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove {rel_path}: {source}")]
    Remove {
        rel_path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The outcome of dry-running one file's hunks: the post-image text
/// (normalized to `\n`) ready to be rendered with the file's EOL, or
/// nothing if the file is to be deleted.
pub(crate) struct FilePlan {
    rel_path: String,
    abs_path: Utf8PathBuf,
    eol: Eol,
    action: FileAction,
}

enum FileAction {
    Write(String),
    Delete,
}

/// Dry-runs every file in `diff` against `root`, returning either the
/// full set of per-file plans (everything matched) or the first
/// mismatch encountered, with no filesystem writes in either case.
pub(crate) fn dry_run(root: &Utf8Path, diff: &UnifiedDiff) -> Result<Vec<FilePlan>, ApplyError> {
    let mut plans = Vec::new();
    for file in &diff.files {
        plans.push(dry_run_file(root, file)?);
    }
    Ok(plans)
}

fn dry_run_file(root: &Utf8Path, file: &FilePatch) -> Result<FilePlan, ApplyError> {
    let abs_path = root.join(&file.rel_path);

    if file.is_delete {
        if !abs_path.exists() {
            return Err(ApplyError::DeleteTargetMissing {
                rel_path: file.rel_path.clone(),
            });
        }
        let raw = std::fs::read_to_string(&abs_path).map_err(|source| ApplyError::Read {
            rel_path: file.rel_path.clone(),
            source,
        })?;
        return Ok(FilePlan {
            rel_path: file.rel_path.clone(),
            abs_path,
            eol: Eol::detect(&raw),
            action: FileAction::Delete,
        });
    }

    let (original, eol) = if file.is_create {
        if abs_path.exists() {
            return Err(ApplyError::CreateTargetExists {
                rel_path: file.rel_path.clone(),
            });
        }
        (String::new(), Eol::Lf)
    } else {
        let raw = std::fs::read_to_string(&abs_path).map_err(|source| ApplyError::Read {
            rel_path: file.rel_path.clone(),
            source,
        })?;
        let eol = Eol::detect(&raw);
        (raw.replace("\r\n", "\n"), eol)
    };

    let new_text = apply_hunks(&file.rel_path, &original, file)?;
    Ok(FilePlan {
        rel_path: file.rel_path.clone(),
        abs_path,
        eol,
        action: FileAction::Write(new_text),
    })
}

/// Applies every hunk in `file` to `original` (already normalized to
/// `\n`), requiring context/`-` lines to match exactly at each hunk's
/// declared position. Hunks are applied top-to-bottom; each hunk's
/// start is adjusted by the net line delta of hunks applied so far,
/// since hunk headers are computed against the pre-image.
fn apply_hunks(rel_path: &str, original: &str, file: &FilePatch) -> Result<String, ApplyError> {
    let mut lines: Vec<String> = original.lines().map(|l| l.to_string()).collect();
    let trailing_newline = original.is_empty() || original.ends_with('\n');
    let mut delta: i64 = 0;

    for hunk in &file.hunks {
        let start = ((hunk.old_start as i64 - 1) + delta).max(0) as usize;
        let mut replacement = Vec::new();
        let mut consumed = 0usize;

        for line in &hunk.lines {
            match line.tag {
                LineTag::Context | LineTag::Remove => {
                    let actual = lines.get(start + consumed);
                    if actual != Some(&line.text) {
                        return Err(ApplyError::ContextMismatch {
                            rel_path: rel_path.to_string(),
                            old_start: hunk.old_start,
                        });
                    }
                    consumed += 1;
                    if line.tag == LineTag::Context {
                        replacement.push(line.text.clone());
                    }
                }
                LineTag::Add => {
                    replacement.push(line.text.clone());
                }
            }
        }

        let end = start + consumed;
        let added = replacement.len() as i64 - consumed as i64;
        lines.splice(start..end, replacement);
        delta += added;
    }

    let body = lines.join("\n");
    if trailing_newline && !body.is_empty() {
        Ok(format!("{body}\n"))
    } else {
        Ok(body)
    }
}

/// Dry-runs then, only if every file validates, writes all files under
/// `root`. No partial writes on rejection.
pub fn apply(root: &Utf8Path, diff: &UnifiedDiff) -> Result<Vec<String>, ApplyError> {
    let plans = dry_run(root, diff)?;
    let mut touched = Vec::with_capacity(plans.len());
    for plan in &plans {
        match &plan.action {
            FileAction::Write(text) => {
                let rendered = plan.eol.apply(text);
                write_file_atomic(&plan.abs_path, rendered.as_bytes()).map_err(|source| {
                    ApplyError::Write {
                        rel_path: plan.rel_path.clone(),
                        source,
                    }
                })?;
            }
            FileAction::Delete => {
                std::fs::remove_file(&plan.abs_path).map_err(|source| ApplyError::Remove {
                    rel_path: plan.rel_path.clone(),
                    source,
                })?;
            }
        }
        touched.push(plan.rel_path.clone());
    }
    Ok(touched)
}

/// Applies `diff` to a lookup of in-memory file contents rather than
/// the filesystem, used by the orchestrator's sandbox-apply stage
/// where the sandbox tree is assembled from a working copy it already
/// owns. Returns the resulting map on success, or the first mismatch.
pub fn apply_in_memory(
    files: &HashMap<String, String>,
    diff: &UnifiedDiff,
) -> Result<HashMap<String, String>, ApplyError> {
    let mut out = files.clone();
    for file in &diff.files {
        if file.is_delete {
            out.remove(&file.rel_path);
            continue;
        }
        let original = if file.is_create {
            String::new()
        } else {
            out.get(&file.rel_path).cloned().unwrap_or_default()
        };
        let new_text = apply_hunks(&file.rel_path, &original, file)?;
        out.insert(file.rel_path.clone(), new_text);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn patch_from_text(text: &str) -> UnifiedDiff {
        crate::parse::parse(text).unwrap()
    }

    #[test]
    fn applies_a_simple_hunk_to_a_real_file() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("m.py"), "def f():\n    return 1\n").unwrap();

        let text = "--- a/m.py\n+++ b/m.py\n@@ -1,2 +1,3 @@\n def f():\n+    \"\"\"Doc.\"\"\"\n     return 1\n";
        let diff = patch_from_text(text);
        let touched = apply(root, &diff).unwrap();
        assert_eq!(touched, vec!["m.py".to_string()]);

        let contents = fs::read_to_string(root.join("m.py")).unwrap();
        assert_eq!(contents, "def f():\n    \"\"\"Doc.\"\"\"\n    return 1\n");
    }

    #[test]
    fn rejects_on_context_mismatch_without_writing() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("m.py"), "def f():\n    return 2\n").unwrap();

        let text = "--- a/m.py\n+++ b/m.py\n@@ -1,2 +1,3 @@\n def f():\n+    \"\"\"Doc.\"\"\"\n     return 1\n";
        let diff = patch_from_text(text);
        let err = apply(root, &diff);
        assert!(err.is_err());
        let contents = fs::read_to_string(root.join("m.py")).unwrap();
        assert_eq!(contents, "def f():\n    return 2\n");
    }

    #[test]
    fn preserves_crlf_line_endings() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("m.py"), "def f():\r\n    return 1\r\n").unwrap();

        let text = "--- a/m.py\n+++ b/m.py\n@@ -1,2 +1,3 @@\n def f():\n+    \"\"\"Doc.\"\"\"\n     return 1\n";
        let diff = patch_from_text(text);
        apply(root, &diff).unwrap();

        let contents = fs::read_to_string(root.join("m.py")).unwrap();
        assert_eq!(
            contents,
            "def f():\r\n    \"\"\"Doc.\"\"\"\r\n    return 1\r\n"
        );
    }

    #[test]
    fn all_or_nothing_across_multiple_files_in_one_diff() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("a.py"), "x = 1\n").unwrap();
        fs::write(root.join("b.py"), "y = 9\n").unwrap();

        let text = "--- a/a.py\n+++ b/a.py\n@@ -1,1 +1,1 @@\n-x = 1\n+x = 2\n--- a/b.py\n+++ b/b.py\n@@ -1,1 +1,1 @@\n-y = 1\n+y = 2\n";
        let diff = patch_from_text(text);
        let err = apply(root, &diff);
        assert!(err.is_err());

        assert_eq!(fs::read_to_string(root.join("a.py")).unwrap(), "x = 1\n");
        assert_eq!(fs::read_to_string(root.join("b.py")).unwrap(), "y = 9\n");
    }

    #[test]
    fn creates_and_deletes_files() {
        let dir = TempDir::new().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::write(root.join("old.py"), "z = 1\n").unwrap();

        let text = "--- /dev/null\n+++ b/new.py\n@@ -0,0 +1,1 @@\n+x = 1\n--- a/old.py\n+++ /dev/null\n@@ -1,1 +0,0 @@\n-z = 1\n";
        let diff = patch_from_text(text);
        apply(root, &diff).unwrap();

        assert_eq!(fs::read_to_string(root.join("new.py")).unwrap(), "x = 1\n");
        assert!(!root.join("old.py").exists());
    }
}
