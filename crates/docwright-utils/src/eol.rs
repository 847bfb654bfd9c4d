//! EOL-preserving text read/write (C1: FileOps).
//!
//! One authoritative newline policy per file: the dominant terminator is
//! detected on read and reapplied on write, so a patch round-trip never
//! flips a file's line endings.

use camino::Utf8Path;
use std::fs;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eol {
    Lf,
    CrLf,
}

impl Eol {
    pub fn as_str(self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::CrLf => "\r\n",
        }
    }

    /// Detects the dominant terminator in `text`: CRLF wins only if it
    /// strictly outnumbers bare LF occurrences (a `\r\n` is also counted
    /// once as `\n`, so bare LF count must exclude CRLF's contribution).
    pub fn detect(text: &str) -> Eol {
        let crlf = text.matches("\r\n").count();
        let total_lf = text.matches('\n').count();
        let bare_lf = total_lf.saturating_sub(crlf);
        if crlf > bare_lf {
            Eol::CrLf
        } else {
            Eol::Lf
        }
    }

    /// Rewrites `text` (assumed internally normalized to `\n`) so every
    /// line ends with this terminator.
    pub fn apply(self, text: &str) -> String {
        match self {
            Eol::Lf => text.to_string(),
            Eol::CrLf => {
                let normalized = text.replace("\r\n", "\n");
                normalized.replace('\n', "\r\n")
            }
        }
    }
}

/// Reads a text file, returning content normalized to `\n` plus the
/// terminator that should be used when writing it back.
pub fn read_text(path: &Utf8Path) -> io::Result<(String, Eol)> {
    let raw = fs::read_to_string(path.as_std_path())?;
    let eol = Eol::detect(&raw);
    let normalized = raw.replace("\r\n", "\n");
    Ok((normalized, eol))
}

/// Renders `content` (normalized to `\n`) with `eol` applied, ready to
/// hand to [`crate::atomic_write::write_file_atomic`].
pub fn render(content: &str, eol: Eol) -> String {
    eol.apply(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_lf_by_default() {
        assert_eq!(Eol::detect("a\nb\nc\n"), Eol::Lf);
        assert_eq!(Eol::detect("no newline"), Eol::Lf);
    }

    #[test]
    fn detects_crlf_when_dominant() {
        assert_eq!(Eol::detect("a\r\nb\r\nc\r\n"), Eol::CrLf);
    }

    #[test]
    fn mixed_favors_strict_majority_of_crlf() {
        // one CRLF, one bare LF -> not strictly greater, so LF wins
        assert_eq!(Eol::detect("a\r\nb\n"), Eol::Lf);
        assert_eq!(Eol::detect("a\r\nb\r\nc\n"), Eol::CrLf);
    }

    #[test]
    fn apply_round_trips_crlf() {
        let normalized = "line1\nline2\n";
        let rendered = Eol::CrLf.apply(normalized);
        assert_eq!(rendered, "line1\r\nline2\r\n");
        let (back, eol) = {
            let raw = rendered;
            (raw.replace("\r\n", "\n"), Eol::detect(&raw))
        };
        assert_eq!(back, normalized);
        assert_eq!(eol, Eol::CrLf);
    }
}
