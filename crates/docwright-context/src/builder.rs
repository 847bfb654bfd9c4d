//! ContextBuilder (C6): assembles per-item prompt inputs from a
//! resolved [`TargetInfo`] and the source it was resolved against.

use docwright_ast::AstTargeter;
use docwright_patch_model::{IndexRow, Item, Mode, Suspect, SymbolType, TargetInfo};

const LINES_BEFORE: usize = 15;
const LINES_AFTER: usize = 50;

/// Builds a [`Suspect`] by resolving `row.lineno` against `source` and
/// slicing a ±15/+50 line context window around the authoritative
/// target line.
pub fn build_suspect(
    targeter: &AstTargeter,
    row: &IndexRow,
    rel_path: &str,
    abs_path: camino::Utf8PathBuf,
    source: &str,
) -> (Suspect, TargetInfo) {
    let target = targeter.resolve(source, row.lineno);
    let context_code = context_window(source, target.lineno);

    let suspect = Suspect {
        id: row.id.clone(),
        abs_path,
        rel_path: rel_path.to_string(),
        lineno: target.lineno,
        symbol_type: target.kind,
        name: row.name.clone(),
        description: row.description.clone(),
        signature: target.signature.clone(),
        has_docstring: target.has_docstring,
        existing_docstring: target.existing_docstring.clone().unwrap_or_default(),
        context_code,
    };
    (suspect, target)
}

fn context_window(source: &str, lineno: u32) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let idx = lineno.saturating_sub(1) as usize;
    let start = idx.saturating_sub(LINES_BEFORE);
    let end = (idx + LINES_AFTER + 1).min(lines.len());
    if start >= end {
        return String::new();
    }
    lines[start..end].join("\n")
}

/// Turns a [`Suspect`] into an [`Item`]: `mode` is `create` when the
/// target has no existing docstring, `rewrite` otherwise.
pub fn build_item(suspect: Suspect, target: &TargetInfo) -> Item {
    let mode = if target.has_docstring {
        Mode::Rewrite
    } else {
        Mode::Create
    };
    Item {
        target_lineno: target.lineno,
        suspect,
        mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_mode_when_no_existing_docstring() {
        let targeter = AstTargeter::new().unwrap();
        let row = IndexRow {
            id: "x1".into(),
            filepath: "m.py".into(),
            lineno: 1,
            symbol_type: SymbolType::Function,
            name: Some("add".into()),
            description: None,
            unique_key_hash: None,
            status: "active".into(),
        };
        let source = "def add(a, b):\n    return a + b\n";
        let (suspect, target) = build_suspect(
            &targeter,
            &row,
            "m.py",
            camino::Utf8PathBuf::from("/tmp/m.py"),
            source,
        );
        let item = build_item(suspect, &target);
        assert_eq!(item.mode, docwright_patch_model::Mode::Create);
        assert_eq!(item.target_lineno, 1);
    }
}
