//! SourceRetriever (C4): guards path resolution against `scan_root` and
//! exclude globs, and reads each file's source at most once per run.

use camino::Utf8Path;
use docwright_utils::{Eol, SandboxError, SandboxRoot};
use std::cell::RefCell;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct SourceRetriever<'a> {
    sandbox: &'a SandboxRoot,
    cache: RefCell<HashMap<String, (String, Eol)>>,
}

impl<'a> SourceRetriever<'a> {
    pub fn new(sandbox: &'a SandboxRoot) -> Self {
        Self {
            sandbox,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Resolves `rel_path` inside the sandbox and returns its content
    /// (normalized to `\n`) and dominant EOL, reading from disk only on
    /// the first call for a given relative path.
    pub fn read(&self, rel_path: &str) -> Result<(String, Eol), RetrieverError> {
        if let Some(cached) = self.cache.borrow().get(rel_path) {
            return Ok(cached.clone());
        }
        let resolved = self.sandbox.resolve(Utf8Path::new(rel_path))?;
        let (content, eol) =
            docwright_utils::read_text(resolved.abs()).map_err(|source| RetrieverError::Read {
                path: rel_path.to_string(),
                source,
            })?;
        self.cache
            .borrow_mut()
            .insert(rel_path.to_string(), (content.clone(), eol));
        Ok((content, eol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::GlobSetBuilder;

    #[test]
    fn reads_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let root_path = Utf8Path::from_path(dir.path()).unwrap();
        let scan = root_path.join("src");
        std::fs::create_dir(scan.as_std_path()).unwrap();
        std::fs::write(scan.join("m.py").as_std_path(), "x = 1\n").unwrap();

        let sandbox = SandboxRoot::new(root_path, &scan, GlobSetBuilder::new().build().unwrap()).unwrap();
        let retriever = SourceRetriever::new(&sandbox);
        let (content1, _) = retriever.read("m.py").unwrap();
        std::fs::write(scan.join("m.py").as_std_path(), "x = 2\n").unwrap();
        let (content2, _) = retriever.read("m.py").unwrap();
        assert_eq!(content1, content2, "second read must come from cache");
    }
}
