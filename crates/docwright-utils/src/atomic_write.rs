//! Atomic file writes: temp file + fsync + rename, with a cross-filesystem
//! fallback when rename fails (`EXDEV`).

use camino::Utf8Path;
use std::fs;
use std::io::{self, Write};
use tempfile::NamedTempFile;

/// Writes `content` to `path` atomically: the file at `path` either has
/// its old content or its new content, never a partial write.
pub fn write_file_atomic(path: &Utf8Path, content: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())?;

    let mut tmp = NamedTempFile::new_in(parent.as_std_path())?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    match tmp.persist(path.as_std_path()) {
        Ok(_) => Ok(()),
        Err(err) => {
            // Cross-filesystem rename (EXDEV) falls back to copy + remove.
            if err.error.raw_os_error() == Some(libc_exdev()) {
                let tmp_path = err.file.path().to_path_buf();
                fs::copy(&tmp_path, path.as_std_path())?;
                fs::remove_file(&tmp_path)?;
                Ok(())
            } else {
                Err(err.error)
            }
        }
    }
}

#[cfg(unix)]
fn libc_exdev() -> i32 {
    18 // EXDEV on Linux/macOS
}

#[cfg(not(unix))]
fn libc_exdev() -> i32 {
    17 // ERROR_NOT_SAME_DEVICE-equivalent errno mapping is platform specific; unreachable in practice.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("out.txt");
        write_file_atomic(&path, b"hello\n").unwrap();
        assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "hello\n");
    }

    #[test]
    fn overwrites_existing_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("out.txt");
        fs::write(path.as_std_path(), b"old\n").unwrap();
        write_file_atomic(&path, b"new\n").unwrap();
        assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "new\n");
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path())
            .unwrap()
            .join("nested/deep/out.txt");
        write_file_atomic(&path, b"x\n").unwrap();
        assert_eq!(fs::read_to_string(path.as_std_path()).unwrap(), "x\n");
    }
}
