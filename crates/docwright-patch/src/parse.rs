//! Parses unified diff text back into the [`UnifiedDiff`] model. The
//! hunk-header pattern is grounded on `xchecker-engine`'s fixup parser.

use docwright_patch_model::{FilePatch, Hunk, HunkLine, LineTag, UnifiedDiff};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("diff text is empty")]
    Empty,
    #[error("missing --- or +++ header in file block {block_index}")]
    MissingHeader { block_index: usize },
    #[error("malformed hunk header: {line}")]
    MalformedHunkHeader { line: String },
}

/// Parses the full text of a unified diff (possibly covering several
/// files) into a [`UnifiedDiff`].
pub fn parse(text: &str) -> Result<UnifiedDiff, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut files = Vec::new();
    let mut i = 0;
    let mut block_index = 0;

    while i < lines.len() {
        if lines[i].starts_with("--- ") {
            let (file, consumed) = parse_file_block(&lines[i..], block_index)?;
            files.push(file);
            i += consumed;
            block_index += 1;
        } else {
            i += 1;
        }
    }

    Ok(UnifiedDiff { files })
}

fn parse_file_block(lines: &[&str], block_index: usize) -> Result<(FilePatch, usize), ParseError> {
    let old_header = lines
        .first()
        .and_then(|l| l.strip_prefix("--- "))
        .ok_or(ParseError::MissingHeader { block_index })?;
    let new_header = lines
        .get(1)
        .and_then(|l| l.strip_prefix("+++ "))
        .ok_or(ParseError::MissingHeader { block_index })?;

    let old_path = old_header.trim();
    let new_path = new_header.trim();
    let is_create = old_path == "/dev/null";
    let is_delete = new_path == "/dev/null";
    let rel_path = strip_prefix_ab(if is_delete { old_path } else { new_path }).to_string();

    let mut hunks = Vec::new();
    let mut i = 2;
    while i < lines.len() {
        if lines[i].starts_with("--- ") {
            break;
        }
        if let Some(caps) = HUNK_HEADER.captures(lines[i]) {
            let old_start: u32 = caps[1].parse().map_err(|_| ParseError::MalformedHunkHeader {
                line: lines[i].to_string(),
            })?;
            let old_count: u32 = caps
                .get(2)
                .map_or(1, |m| m.as_str().parse().unwrap_or(1));
            let new_start: u32 = caps[3].parse().map_err(|_| ParseError::MalformedHunkHeader {
                line: lines[i].to_string(),
            })?;
            let new_count: u32 = caps
                .get(4)
                .map_or(1, |m| m.as_str().parse().unwrap_or(1));
            i += 1;

            let mut body = Vec::new();
            while i < lines.len()
                && !lines[i].starts_with("--- ")
                && !HUNK_HEADER.is_match(lines[i])
            {
                if let Some(line) = parse_body_line(lines[i]) {
                    body.push(line);
                }
                i += 1;
            }
            hunks.push(Hunk {
                old_start,
                old_count,
                new_start,
                new_count,
                lines: body,
            });
        } else {
            i += 1;
        }
    }

    Ok((
        FilePatch {
            rel_path,
            is_create,
            is_delete,
            hunks,
        },
        i,
    ))
}

/// Parses one hunk body line. `\`-prefixed markers ("\ No newline at
/// end of file" and similar) are parsed and dropped entirely: they
/// carry no content to match or emit, per the unified-diff dialect's
/// "parsed and ignored on apply" contract (spec §4.8/§6).
fn parse_body_line(line: &str) -> Option<HunkLine> {
    if line.starts_with('\\') {
        return None;
    }
    Some(match line.chars().next() {
        Some('+') => HunkLine {
            tag: LineTag::Add,
            text: line[1..].to_string(),
        },
        Some('-') => HunkLine {
            tag: LineTag::Remove,
            text: line[1..].to_string(),
        },
        Some(' ') => HunkLine {
            tag: LineTag::Context,
            text: line[1..].to_string(),
        },
        _ => HunkLine {
            tag: LineTag::Context,
            text: line.to_string(),
        },
    })
}

fn strip_prefix_ab(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}
