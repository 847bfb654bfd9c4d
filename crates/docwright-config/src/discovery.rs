//! Upward discovery of `.docwright/config.toml`, mirroring the
//! teacher's walk-to-repo-root idiom: stop at the first directory
//! carrying the file, or at a VCS root, or at the filesystem root.

use crate::ConfigError;
use crate::model::Config;
use std::path::{Path, PathBuf};

/// Walks upward from `start_dir` looking for `.docwright/config.toml`,
/// stopping at the first VCS root (`.git`/`.hg`/`.svn`) or the
/// filesystem root if none is found.
pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(".docwright").join("config.toml");
        if candidate.exists() {
            return Some(candidate);
        }
        if current.join(".git").exists()
            || current.join(".hg").exists()
            || current.join(".svn").exists()
        {
            return None;
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

impl Config {
    /// Loads configuration with precedence: built-in defaults, then
    /// `.docwright/config.toml` if discovered from the current
    /// directory. CLI flags are applied afterward by the caller
    /// (`docwright-cli`), never here.
    pub fn discover() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        Self::discover_from(&cwd)
    }

    /// Path-driven variant used by tests to avoid depending on the
    /// process's current directory.
    pub fn discover_from(start_dir: &Path) -> Result<Self, ConfigError> {
        match discover_config_file_from(start_dir) {
            Some(path) => Self::load_file(&path),
            None => Ok(Config::default()),
        }
    }

    /// Loads and validates a specific config file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}
