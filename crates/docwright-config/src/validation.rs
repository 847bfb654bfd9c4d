//! Validation of a loaded [`Config`] and construction of its derived
//! `GlobSet` of exclude patterns.

use crate::model::Config;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid exclude glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("llm.concurrency must be at least 1")]
    ZeroConcurrency,
}

impl Config {
    /// Structural validation: glob patterns parse, and the concurrency
    /// knob is sane. Called once at discovery time; a `ConfigError` here
    /// is fatal at startup per the error-handling design (§7).
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.exclude_glob_set()?;
        if self.llm.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }

    /// Compiles `paths.exclude_globs` into a [`GlobSet`] for use by
    /// `docwright_utils::SandboxRoot`.
    pub fn exclude_glob_set(&self) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.paths.exclude_globs {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::InvalidGlob {
            pattern: "<build>".to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut config = Config::default();
        config.llm.concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroConcurrency)
        ));
    }

    #[test]
    fn rejects_invalid_glob_pattern() {
        let mut config = Config::default();
        config.paths.exclude_globs = vec!["[".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGlob { .. })
        ));
    }
}
