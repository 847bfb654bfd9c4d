//! Applies a [`PatchPlan`]'s ops for a single file to its original text,
//! in descending target-line order (§5: "within a single file, edits
//! apply in descending target-line order"), producing the post-image
//! text the [`crate::compiler`] then diffs against the pre-image.

use docwright_patch_model::{Anchor, PatchOp};

/// Applies `ops` (any order) to `original` (already normalized to
/// `\n`), returning the resulting text, also normalized to `\n`.
pub fn apply_ops(original: &str, ops: &[PatchOp]) -> String {
    let trailing_newline = original.is_empty() || original.ends_with('\n');
    let mut lines: Vec<String> = original.lines().map(|l| l.to_string()).collect();

    let mut sorted: Vec<&PatchOp> = ops.iter().collect();
    sorted.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));

    for op in sorted {
        apply_one(&mut lines, op);
    }

    let body = lines.join("\n");
    if trailing_newline && !body.is_empty() {
        format!("{body}\n")
    } else {
        body
    }
}

fn apply_one(lines: &mut Vec<String>, op: &PatchOp) {
    match op {
        PatchOp::ReplaceRange {
            start_line,
            end_line,
            new_text,
            ..
        } => {
            let start_idx = (*start_line as usize).saturating_sub(1).min(lines.len());
            let end_idx = (*end_line as usize).min(lines.len());
            let replacement = split_new_text(new_text);
            if start_idx <= end_idx {
                lines.splice(start_idx..end_idx, replacement);
            }
        }
        PatchOp::InsertAt {
            anchor, new_text, ..
        } => {
            let idx = insertion_index(lines, *anchor).min(lines.len());
            let replacement = split_new_text(new_text);
            lines.splice(idx..idx, replacement);
        }
        PatchOp::AddFile { .. } | PatchOp::DeleteFile { .. } => {
            // Not emitted by this pipeline's planner; handled at the
            // applier layer (whole-file create/delete), not here.
        }
    }
}

fn split_new_text(new_text: &str) -> Vec<String> {
    new_text.lines().map(|l| l.to_string()).collect()
}

fn insertion_index(lines: &[String], anchor: Anchor) -> usize {
    match anchor {
        Anchor::FileStart => 0,
        Anchor::FileEnd => lines.len(),
        Anchor::AfterShebangAndEncoding => shebang_and_encoding_offset(lines),
        Anchor::AfterImportBlock => import_block_end(lines),
        Anchor::AfterLine(l) => l as usize,
        Anchor::BeforeLine(l) => (l as usize).saturating_sub(1),
    }
}

/// Number of leading lines occupied by a shebang (`#!...`) and/or a
/// PEP 263 encoding comment (`# -*- coding: ... -*-` / `# coding: ...`).
fn shebang_and_encoding_offset(lines: &[String]) -> usize {
    let mut i = 0;
    if lines.first().is_some_and(|l| l.starts_with("#!")) {
        i += 1;
    }
    if lines.get(i).is_some_and(|l| is_encoding_comment(l)) {
        i += 1;
    }
    i
}

fn is_encoding_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('#') && (trimmed.contains("coding:") || trimmed.contains("coding="))
}

/// End of the leading `import`/`from` block: scans past shebang,
/// encoding, blank lines, comments, and import statements, stopping at
/// the first other statement.
fn import_block_end(lines: &[String]) -> usize {
    let mut i = shebang_and_encoding_offset(lines);
    while i < lines.len() {
        let trimmed = lines[i].trim_start();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.starts_with("import ")
            || trimmed.starts_with("from ")
            || trimmed == "import"
        {
            i += 1;
        } else {
            break;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserts_docstring_after_function_header() {
        let src = "def add(a, b):\n    return a + b\n";
        let op = PatchOp::InsertAt {
            rel_path: "m.py".to_string(),
            anchor: Anchor::AfterLine(1),
            new_text: "    \"\"\"\n    Return the sum of a and b.\n    \"\"\"\n".to_string(),
        };
        let out = apply_ops(src, &[op]);
        assert_eq!(
            out,
            "def add(a, b):\n    \"\"\"\n    Return the sum of a and b.\n    \"\"\"\n    return a + b\n"
        );
    }

    #[test]
    fn replaces_existing_range_in_place() {
        let src = "def f():\n    \"\"\"Old.\"\"\"\n    return 1\n";
        let op = PatchOp::ReplaceRange {
            rel_path: "m.py".to_string(),
            start_line: 2,
            end_line: 2,
            new_text: "    \"\"\"\n    New.\n    \"\"\"\n".to_string(),
        };
        let out = apply_ops(src, &[op]);
        assert_eq!(
            out,
            "def f():\n    \"\"\"\n    New.\n    \"\"\"\n    return 1\n"
        );
    }

    #[test]
    fn descending_order_keeps_earlier_line_numbers_stable() {
        let src = "a\nb\nc\nd\n";
        let ops = vec![
            PatchOp::InsertAt {
                rel_path: "m.py".to_string(),
                anchor: Anchor::AfterLine(1),
                new_text: "X\n".to_string(),
            },
            PatchOp::InsertAt {
                rel_path: "m.py".to_string(),
                anchor: Anchor::AfterLine(3),
                new_text: "Y\n".to_string(),
            },
        ];
        let out = apply_ops(src, &ops);
        assert_eq!(out, "a\nX\nb\nc\nY\nd\n");
    }

    #[test]
    fn inserts_after_shebang_and_encoding_comment() {
        let src = "#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\nimport os\n";
        let op = PatchOp::InsertAt {
            rel_path: "m.py".to_string(),
            anchor: Anchor::AfterShebangAndEncoding,
            new_text: "\"\"\"New.\"\"\"\n".to_string(),
        };
        let out = apply_ops(src, &[op]);
        assert_eq!(
            out,
            "#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\n\"\"\"New.\"\"\"\nimport os\n"
        );
    }
}
