//! Serializes a [`UnifiedDiff`] to GNU-compatible unified diff text:
//! `--- a/<path>` / `+++ b/<path>` headers (`/dev/null` on the deleted
//! or created side), `@@ -old_start,old_count +new_start,new_count @@`
//! hunk headers, and `' '`/`'+'`/`'-'` prefixed body lines.

use docwright_patch_model::{FilePatch, Hunk, LineTag, UnifiedDiff};

/// Renders the whole diff as one string, files separated by nothing
/// extra (each file's own headers delimit it).
pub fn render(diff: &UnifiedDiff) -> String {
    let mut out = String::new();
    for file in &diff.files {
        render_file(file, &mut out);
    }
    out
}

pub fn render_file(file: &FilePatch, out: &mut String) {
    let old_path = if file.is_create {
        "/dev/null".to_string()
    } else {
        format!("a/{}", file.rel_path)
    };
    let new_path = if file.is_delete {
        "/dev/null".to_string()
    } else {
        format!("b/{}", file.rel_path)
    };
    out.push_str(&format!("--- {old_path}\n"));
    out.push_str(&format!("+++ {new_path}\n"));
    for hunk in &file.hunks {
        render_hunk(hunk, out);
    }
}

fn render_hunk(hunk: &Hunk, out: &mut String) {
    out.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
    ));
    for line in &hunk.lines {
        let prefix = match line.tag {
            LineTag::Context => ' ',
            LineTag::Add => '+',
            LineTag::Remove => '-',
        };
        out.push(prefix);
        out.push_str(&line.text);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwright_patch_model::HunkLine;

    #[test]
    fn renders_a_single_hunk_file() {
        let file = FilePatch {
            rel_path: "m.py".to_string(),
            is_create: false,
            is_delete: false,
            hunks: vec![Hunk {
                old_start: 1,
                old_count: 1,
                new_start: 1,
                new_count: 2,
                lines: vec![
                    HunkLine {
                        tag: LineTag::Context,
                        text: "def f():".to_string(),
                    },
                    HunkLine {
                        tag: LineTag::Add,
                        text: "    \"\"\"Doc.\"\"\"".to_string(),
                    },
                ],
            }],
        };
        let text = render(&UnifiedDiff { files: vec![file] });
        assert!(text.starts_with("--- a/m.py\n+++ b/m.py\n@@ -1,1 +1,2 @@\n"));
        assert!(text.contains("+    \"\"\"Doc.\"\"\"\n"));
    }

    #[test]
    fn renders_dev_null_for_created_file() {
        let file = FilePatch {
            rel_path: "new.py".to_string(),
            is_create: true,
            is_delete: false,
            hunks: vec![],
        };
        let text = render(&UnifiedDiff { files: vec![file] });
        assert_eq!(text, "--- /dev/null\n+++ b/new.py\n");
    }
}
