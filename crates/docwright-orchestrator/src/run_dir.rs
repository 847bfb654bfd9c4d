//! RunDir (C2): creates and names the per-run artifact tree. The only
//! durable output of a run (§3 Lifecycle) unless `archive_and_replace`
//! is confirmed, in which case originals outside `RunDir` are also
//! touched, sequenced after the archival writes inside it.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunDirError {
    #[error("failed to create run directory {path}: {source}")]
    Create {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `DOCWRIGHT_HOME/runs/<run_id>`, mirroring the teacher's
/// `<XCHECKER_HOME>/specs/<spec_id>` layout idiom (an env-overridable
/// home directory, one subtree per invocation).
fn docwright_home() -> Utf8PathBuf {
    if let Some(p) = std::env::var_os("DOCWRIGHT_HOME") {
        return Utf8PathBuf::from(p.to_string_lossy().into_owned());
    }
    Utf8PathBuf::from(".docwright")
}

/// Generates a run id from the current time plus a short content-hash
/// suffix (of the timestamp and process id) so two runs started within
/// the same second never collide on disk.
pub fn generate_run_id() -> String {
    let now = chrono::Utc::now();
    let stamp = now.format("%Y%m%dT%H%M%S%.3fZ");
    let seed = format!("{stamp}-{}", std::process::id());
    let suffix = &docwright_utils::content_hash(seed.as_bytes())[..8];
    format!("{stamp}-{suffix}")
}

/// The per-run artifact tree. Every stage of [`crate::Orchestrator`]
/// writes exclusively under `root`; nothing else on disk is touched
/// except by the gated `archive_and_replace` stage.
#[derive(Debug, Clone)]
pub struct RunDir {
    root: Utf8PathBuf,
    run_id: String,
}

impl RunDir {
    /// Creates a fresh run directory under `base` (defaults to
    /// [`docwright_home`] when `None`), with all subdirectories
    /// pre-created so later stages never need to `create_dir_all`
    /// ad hoc.
    pub fn create(base: Option<&Utf8Path>, run_id: Option<String>) -> Result<Self, RunDirError> {
        let run_id = run_id.unwrap_or_else(generate_run_id);
        let base = base
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| docwright_home().join("runs"));
        let root = base.join(&run_id);

        for sub in [
            "raw_prompts",
            "raw_responses",
            "items",
            "verify_reports",
            "archives",
            "sandbox_applied",
            "patches",
            "prod_applied",
        ] {
            let dir = root.join(sub);
            fs::create_dir_all(dir.as_std_path()).map_err(|source| RunDirError::Create {
                path: dir,
                source,
            })?;
        }

        Ok(Self { root, run_id })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn raw_prompts_dir(&self) -> Utf8PathBuf {
        self.root.join("raw_prompts")
    }

    pub fn raw_responses_dir(&self) -> Utf8PathBuf {
        self.root.join("raw_responses")
    }

    pub fn items_dir(&self) -> Utf8PathBuf {
        self.root.join("items")
    }

    pub fn verify_reports_dir(&self) -> Utf8PathBuf {
        self.root.join("verify_reports")
    }

    pub fn archives_dir(&self) -> Utf8PathBuf {
        self.root.join("archives")
    }

    pub fn sandbox_applied_dir(&self) -> Utf8PathBuf {
        self.root.join("sandbox_applied")
    }

    pub fn patches_dir(&self) -> Utf8PathBuf {
        self.root.join("patches")
    }

    pub fn prod_applied_dir(&self) -> Utf8PathBuf {
        self.root.join("prod_applied")
    }

    /// Zero-padded batch artifact filenames (`batch_003.txt`) so
    /// artifact order is reproducible (§5: ordering guarantees).
    pub fn batch_filename(index: usize, extension: &str) -> String {
        format!("batch_{index:03}.{extension}")
    }

    /// A patch filename safe to write to disk: path separators become
    /// `__` so a relpath like `pkg/mod.py` doesn't nest directories
    /// inside `patches/`.
    pub fn sanitize_patch_filename(rel_path: &str) -> String {
        rel_path.replace(['/', '\\'], "__")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_pre_creates_every_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8Path::from_path(dir.path()).unwrap();
        let run_dir = RunDir::create(Some(base), Some("test-run".to_string())).unwrap();
        assert_eq!(run_dir.run_id(), "test-run");
        for sub in [
            run_dir.raw_prompts_dir(),
            run_dir.raw_responses_dir(),
            run_dir.items_dir(),
            run_dir.verify_reports_dir(),
            run_dir.archives_dir(),
            run_dir.sandbox_applied_dir(),
            run_dir.patches_dir(),
            run_dir.prod_applied_dir(),
        ] {
            assert!(sub.as_std_path().is_dir(), "{sub} should exist");
        }
    }

    #[test]
    fn batch_filenames_are_zero_padded() {
        assert_eq!(RunDir::batch_filename(3, "txt"), "batch_003.txt");
        assert_eq!(RunDir::batch_filename(42, "json"), "batch_042.json");
    }

    #[test]
    fn sanitizes_path_separators_in_patch_filenames() {
        assert_eq!(
            RunDir::sanitize_patch_filename("pkg/sub/mod.py"),
            "pkg__sub__mod.py"
        );
    }

    #[test]
    fn generated_run_ids_are_unique_for_distinct_seeds() {
        let a = generate_run_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = generate_run_id();
        assert_ne!(a, b);
    }
}
