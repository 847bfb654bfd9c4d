//! Path-safety primitives.
//!
//! All paths that cross the boundary from an `IndexRow` into the file
//! system go through a [`SandboxRoot`]. A `SandboxRoot` anchors a
//! `scan_root` inside a `project_root` and only ever hands out
//! [`SandboxPath`]s that have been checked to resolve inside that root,
//! with exclude-glob rejection applied before the path is trusted.

use camino::{Utf8Path, Utf8PathBuf};
use globset::GlobSet;
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("path escapes scan root: {0}")]
    OutsideScanRoot(Utf8PathBuf),

    #[error("path matches an exclude glob: {0}")]
    Excluded(Utf8PathBuf),

    #[error("path does not exist: {0}")]
    NotFound(Utf8PathBuf),

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8(std::path::PathBuf),

    #[error("failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A path that has been proven to resolve inside a [`SandboxRoot`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SandboxPath {
    /// Absolute, canonical path on disk.
    abs: Utf8PathBuf,
    /// Path relative to the sandbox's scan root, POSIX-separated.
    rel: Utf8PathBuf,
}

impl SandboxPath {
    pub fn abs(&self) -> &Utf8Path {
        &self.abs
    }

    pub fn rel(&self) -> &Utf8Path {
        &self.rel
    }
}

/// Anchors a `scan_root` inside a `project_root` and resolves
/// repo-relative paths safely, rejecting anything that escapes the root
/// or matches an exclude glob.
pub struct SandboxRoot {
    project_root: Utf8PathBuf,
    scan_root: Utf8PathBuf,
    exclude: GlobSet,
}

impl SandboxRoot {
    /// Builds a sandbox root. `scan_root` must already resolve inside
    /// `project_root`; this is checked once here rather than on every
    /// subsequent resolution.
    pub fn new(
        project_root: &Utf8Path,
        scan_root: &Utf8Path,
        exclude: GlobSet,
    ) -> Result<Self, SandboxError> {
        let project_root = canonicalize(project_root)?;
        let scan_root = canonicalize(scan_root)?;
        if !scan_root.as_std_path().starts_with(project_root.as_std_path()) {
            return Err(SandboxError::OutsideScanRoot(scan_root));
        }
        Ok(Self {
            project_root,
            scan_root,
            exclude,
        })
    }

    pub fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    pub fn scan_root(&self) -> &Utf8Path {
        &self.scan_root
    }

    /// Resolves a path (absolute or scan-root-relative) to a
    /// [`SandboxPath`], rejecting anything that escapes `scan_root` or
    /// matches an exclude glob. The file must already exist: this guards
    /// against the classic symlink-to-nonexistent-path escape, where a
    /// path that doesn't exist yet cannot be canonicalized and checked.
    pub fn resolve(&self, candidate: &Utf8Path) -> Result<SandboxPath, SandboxError> {
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.scan_root.join(candidate)
        };
        let abs = canonicalize(&joined)?;
        if !abs.as_std_path().starts_with(self.scan_root.as_std_path()) {
            return Err(SandboxError::OutsideScanRoot(abs));
        }
        let rel = abs
            .strip_prefix(&self.scan_root)
            .expect("checked by starts_with above")
            .to_path_buf();
        if self.exclude.is_match(rel.as_std_path()) {
            return Err(SandboxError::Excluded(rel));
        }
        Ok(SandboxPath { abs, rel })
    }
}

fn canonicalize(path: &Utf8Path) -> Result<Utf8PathBuf, SandboxError> {
    let std_path = fs::canonicalize(path.as_std_path()).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            SandboxError::NotFound(path.to_path_buf())
        } else {
            SandboxError::Canonicalize {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    Utf8PathBuf::from_path_buf(std_path).map_err(SandboxError::NonUtf8)
}
