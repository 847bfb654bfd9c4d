//! PatchPlanner (C13): picks one [`PatchOp`] per target, per §4.7.
//!
//! - Module with an AST docstring -> `ReplaceRange` over its span.
//! - Module without one, but with a near-top orphan triple-quoted
//!   string -> `ReplaceRange` over that span.
//! - Module otherwise -> `InsertAt(after_shebang_and_encoding)`.
//! - Function/class with an existing docstring -> `ReplaceRange`.
//! - Function/class without one -> `InsertAt(after_line=header)`.

use docwright_ast::{docstring_span, orphan_module_string_span};
use docwright_docstring::render_docstring;
use docwright_patch_model::{Anchor, PatchOp, SymbolType, TargetInfo};

/// Builds the single [`PatchOp`] for `target` in `rel_path`, rendering
/// `docstring_body` (already [`docwright_docstring::sanitize`]d) at the
/// target's body indentation.
pub fn plan_op(
    source: &str,
    target: &TargetInfo,
    rel_path: &str,
    docstring_body: &str,
) -> PatchOp {
    let indent = if target.kind == SymbolType::Module {
        String::new()
    } else {
        target.body_indent.clone()
    };
    let rendered = render_docstring(docstring_body, &indent);

    if target.kind == SymbolType::Module {
        if target.has_docstring {
            if let Some((start, end)) = docstring_span(source, target) {
                return replace(rel_path, start, end, rendered);
            }
        } else if let Some((start, end)) = orphan_module_string_span(source) {
            return replace(rel_path, start, end, rendered);
        }
        return PatchOp::InsertAt {
            rel_path: rel_path.to_string(),
            anchor: Anchor::AfterShebangAndEncoding,
            new_text: rendered,
        };
    }

    if target.has_docstring {
        if let Some((start, end)) = docstring_span(source, target) {
            return replace(rel_path, start, end, rendered);
        }
    }
    PatchOp::InsertAt {
        rel_path: rel_path.to_string(),
        anchor: Anchor::AfterLine(target.lineno),
        new_text: rendered,
    }
}

fn replace(rel_path: &str, start_line: u32, end_line: u32, new_text: String) -> PatchOp {
    PatchOp::ReplaceRange {
        rel_path: rel_path.to_string(),
        start_line,
        end_line,
        new_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwright_ast::AstTargeter;

    #[test]
    fn inserts_after_header_line_when_function_has_no_docstring() {
        let src = "def add(a, b):\n    return a + b\n";
        let targeter = AstTargeter::new().unwrap();
        let target = targeter.resolve(src, 1);
        let op = plan_op(src, &target, "m.py", "Return the sum of a and b.\n");
        match op {
            PatchOp::InsertAt { anchor, new_text, .. } => {
                assert_eq!(anchor, Anchor::AfterLine(1));
                assert!(new_text.contains("Return the sum of a and b."));
            }
            other => panic!("expected InsertAt, got {other:?}"),
        }
    }

    #[test]
    fn replaces_existing_function_docstring_span() {
        let src = "def f():\n    \"\"\"Old.\"\"\"\n    return 1\n";
        let targeter = AstTargeter::new().unwrap();
        let target = targeter.resolve(src, 1);
        let op = plan_op(src, &target, "m.py", "New summary.\n");
        match op {
            PatchOp::ReplaceRange { start_line, end_line, .. } => {
                assert_eq!((start_line, end_line), (2, 2));
            }
            other => panic!("expected ReplaceRange, got {other:?}"),
        }
    }

    #[test]
    fn module_without_docstring_or_orphan_inserts_after_shebang() {
        let src = "#!/usr/bin/env python3\nimport os\n";
        let targeter = AstTargeter::new().unwrap();
        let target = targeter.resolve(src, 1);
        let op = plan_op(src, &target, "m.py", "New summary.\n");
        assert!(matches!(
            op,
            PatchOp::InsertAt {
                anchor: Anchor::AfterShebangAndEncoding,
                ..
            }
        ));
    }

    #[test]
    fn module_replaces_orphan_string_when_no_ast_docstring() {
        let src = "x = 1\n\"\"\"Orphan.\"\"\"\n";
        // hint_lineno <= 1 so AstTargeter resolves this as the module target,
        // but the module has no AST docstring predicate satisfied (first
        // statement is `x = 1`), matching the orphan-string case.
        let targeter = AstTargeter::new().unwrap();
        let target = targeter.resolve(src, 1);
        assert!(!target.has_docstring);
        let op = plan_op(src, &target, "m.py", "New summary.\n");
        assert!(matches!(op, PatchOp::ReplaceRange { .. }));
    }
}
