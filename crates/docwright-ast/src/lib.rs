//! AstTargeting (C5): resolves a symbol from an index row to its true
//! kind, signature, existing docstring, and body indentation by walking
//! a Python parse tree. The index's `symbol_type`/`lineno` are hints
//! only (invariant 2); this crate is the ground truth.
//!
//! Resolution order, grounded on the original `ast_utils.py`:
//! 1. exact `lineno` match on a `function_definition`/`class_definition`.
//! 2. `hint_lineno <= 1` -> module.
//! 3. innermost def/class whose span contains `hint_lineno`.
//! 4. module fallback.

use docwright_patch_model::{SymbolType, TargetInfo};
use thiserror::Error;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

#[derive(Error, Debug)]
pub enum AstError {
    #[error("failed to construct Python grammar query: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("tree-sitter failed to set the Python language")]
    Language,
}

pub struct AstTargeter {
    language: Language,
    query: Query,
}

impl AstTargeter {
    pub fn new() -> Result<Self, AstError> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let query_src = r#"
            (function_definition) @item
            (class_definition) @item
        "#;
        let query = Query::new(&language, query_src)?;
        Ok(Self { language, query })
    }

    /// Resolves `hint_lineno` (1-based) against `source`. Never fails:
    /// a syntax error degrades to a module-scope `TargetInfo` with an
    /// empty signature and no existing docstring (ParseError recovery
    /// policy, §7).
    pub fn resolve(&self, source: &str, hint_lineno: u32) -> TargetInfo {
        let mut parser = Parser::new();
        if parser.set_language(&self.language).is_err() {
            return module_fallback(source, None);
        }
        let Some(tree) = parser.parse(source, None) else {
            return module_fallback(source, None);
        };
        let bytes = source.as_bytes();
        let root = tree.root_node();

        let candidates = self.collect_candidates(root, bytes);

        if let Some(exact) = candidates
            .iter()
            .find(|c| c.start_line == hint_lineno)
        {
            return target_from_candidate(exact, bytes);
        }

        if hint_lineno <= 1 {
            return module_fallback(source, Some(root));
        }

        let innermost = candidates
            .iter()
            .filter(|c| c.start_line <= hint_lineno && hint_lineno <= c.end_line)
            .min_by_key(|c| c.end_line - c.start_line);

        match innermost {
            Some(c) => target_from_candidate(c, bytes),
            None => module_fallback(source, Some(root)),
        }
    }

    fn collect_candidates<'a>(&self, root: Node<'a>, bytes: &[u8]) -> Vec<Candidate<'a>> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, root, bytes);
        let mut out = Vec::new();
        while let Some(m) = matches.next() {
            for cap in m.captures {
                let node = cap.node;
                out.push(Candidate {
                    kind: match node.kind() {
                        "function_definition" => SymbolType::Function,
                        "class_definition" => SymbolType::Class,
                        _ => continue,
                    },
                    node,
                    start_line: node.start_position().row as u32 + 1,
                    end_line: node.end_position().row as u32 + 1,
                });
            }
        }
        out
    }
}

struct Candidate<'a> {
    kind: SymbolType,
    node: Node<'a>,
    start_line: u32,
    end_line: u32,
}

fn target_from_candidate(c: &Candidate<'_>, bytes: &[u8]) -> TargetInfo {
    let body = c.node.child_by_field_name("body");
    let signature = signature_of(c.node, bytes, body);
    let body_indent = body_indent_of(c.node, bytes, body);
    let (has_docstring, existing_docstring) = body
        .map(|b| first_docstring(b, bytes))
        .unwrap_or((false, None));

    TargetInfo {
        kind: c.kind,
        lineno: c.start_line,
        end_lineno: c.end_line,
        has_docstring,
        existing_docstring,
        signature,
        body_indent,
    }
}

fn module_fallback(source: &str, root: Option<Node<'_>>) -> TargetInfo {
    let bytes = source.as_bytes();
    let (has_docstring, existing_docstring) = root
        .map(|r| first_docstring(r, bytes))
        .unwrap_or((false, None));
    let end_lineno = source.lines().count().max(1) as u32;
    TargetInfo {
        kind: SymbolType::Module,
        lineno: 1,
        end_lineno,
        has_docstring,
        existing_docstring,
        signature: "module".to_string(),
        body_indent: String::new(),
    }
}

fn signature_of(node: Node<'_>, bytes: &[u8], body: Option<Node<'_>>) -> String {
    let end_byte = body.map(|b| b.start_byte()).unwrap_or(node.end_byte());
    let raw = std::str::from_utf8(&bytes[node.start_byte()..end_byte]).unwrap_or("");
    raw.trim_end().trim_end_matches(':').trim_end().to_string() + ":"
}

fn body_indent_of(node: Node<'_>, _bytes: &[u8], body: Option<Node<'_>>) -> String {
    match body {
        Some(b) if b.start_position().row > node.start_position().row => {
            " ".repeat(b.start_position().column)
        }
        _ => {
            let header_indent = node.start_position().column;
            " ".repeat(header_indent + 4)
        }
    }
}

/// First-statement docstring predicate: the container's first named,
/// non-comment child is an `expression_statement` whose sole child is a
/// `string` node.
fn first_docstring(container: Node<'_>, bytes: &[u8]) -> (bool, Option<String>) {
    let mut cursor = container.walk();
    for child in container.named_children(&mut cursor) {
        if child.kind() == "comment" {
            continue;
        }
        if child.kind() != "expression_statement" {
            return (false, None);
        }
        let Some(string_node) = child
            .named_child(0)
            .filter(|n| n.kind() == "string")
        else {
            return (false, None);
        };
        let raw = string_node.utf8_text(bytes).unwrap_or("").to_string();
        return (true, Some(strip_string_literal(&raw)));
    }
    (false, None)
}

/// Strips Python string-literal decoration: an optional `r`/`u`/`f`/`b`
/// prefix combination and matching triple or single quotes.
fn strip_string_literal(raw: &str) -> String {
    let mut s = raw;
    while let Some(c) = s.chars().next() {
        if "rRuUfFbB".contains(c) {
            s = &s[c.len_utf8()..];
        } else {
            break;
        }
    }
    for quote in ["\"\"\"", "'''"] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|x| x.strip_suffix(quote)) {
            return inner.to_string();
        }
    }
    for quote in ['"', '\''] {
        if s.starts_with(quote) && s.ends_with(quote) && s.len() >= 2 {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

/// Locates the byte-line span `[start_line, end_line]` (1-based,
/// inclusive) of an existing docstring for a resolved target, used by
/// `docwright-patch`'s planner to build a `ReplaceRange`.
pub fn docstring_span(source: &str, target: &TargetInfo) -> Option<(u32, u32)> {
    if !target.has_docstring {
        return None;
    }
    // Re-derive via line scanning rather than re-parsing: the docstring
    // is the first non-blank line at or after `target.lineno` (module)
    // or after the header line (function/class), spanning until the
    // closing triple quote.
    let lines: Vec<&str> = source.lines().collect();
    let search_start = if target.kind == SymbolType::Module {
        0usize
    } else {
        target.lineno as usize // 0-based index of the line right after header is lineno (1-based header is lineno)
    };
    let mut i = search_start;
    while i < lines.len()
        && (lines[i].trim().is_empty()
            || (target.kind == SymbolType::Module && lines[i].trim_start().starts_with('#')))
    {
        i += 1;
    }
    if i >= lines.len() {
        return None;
    }
    let first = lines[i].trim_start();
    let is_triple = first.trim_start_matches(['r', 'R', 'u', 'U', 'f', 'F', 'b', 'B'])
        .starts_with("\"\"\"")
        || first
            .trim_start_matches(['r', 'R', 'u', 'U', 'f', 'F', 'b', 'B'])
            .starts_with("'''");
    let start_line = i as u32 + 1;
    if !is_triple {
        // Single-line string docstring: starts and ends on the same line.
        return Some((start_line, start_line));
    }
    let quote = if first.contains("\"\"\"") { "\"\"\"" } else { "'''" };
    let after_open = {
        let idx = first.find(quote).unwrap() + quote.len();
        &first[idx..]
    };
    if after_open.contains(quote) {
        return Some((start_line, start_line));
    }
    let mut j = i + 1;
    while j < lines.len() {
        if lines[j].contains(quote) {
            return Some((start_line, j as u32 + 1));
        }
        j += 1;
    }
    Some((start_line, lines.len() as u32))
}

/// Finds a near-top orphan triple-quoted string at column 0, within the
/// first ~50 non-blank/non-import lines, used when a module has no AST
/// docstring but an orphaned string literal sits where one would go.
pub fn orphan_module_string_span(source: &str) -> Option<(u32, u32)> {
    let lines: Vec<&str> = source.lines().collect();
    let mut non_blank_non_import = 0usize;
    let mut i = 0usize;
    while i < lines.len() && non_blank_non_import < 50 {
        let trimmed = lines[i].trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            i += 1;
            continue;
        }
        if trimmed.starts_with("import ") || trimmed.starts_with("from ") {
            non_blank_non_import += 1;
            i += 1;
            continue;
        }
        if lines[i].starts_with("\"\"\"") || lines[i].starts_with("'''") {
            let quote = if lines[i].starts_with("\"\"\"") { "\"\"\"" } else { "'''" };
            let start_line = i as u32 + 1;
            let after_open = &lines[i][quote.len()..];
            if after_open.contains(quote) {
                return Some((start_line, start_line));
            }
            let mut j = i + 1;
            while j < lines.len() {
                if lines[j].contains(quote) {
                    return Some((start_line, j as u32 + 1));
                }
                j += 1;
            }
            return Some((start_line, lines.len() as u32));
        }
        non_blank_non_import += 1;
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_exact_function_match() {
        let src = "def add(a, b):\n    return a + b\n";
        let target = AstTargeter::new().unwrap().resolve(src, 1);
        assert_eq!(target.kind, SymbolType::Function);
        assert_eq!(target.lineno, 1);
        assert!(!target.has_docstring);
        assert_eq!(target.signature, "def add(a, b):");
    }

    #[test]
    fn hint_lineno_one_targets_module() {
        let src = "\"\"\"Hello.\"\"\"\nimport os\n";
        let target = AstTargeter::new().unwrap().resolve(src, 1);
        assert_eq!(target.kind, SymbolType::Module);
        assert!(target.has_docstring);
        assert_eq!(target.existing_docstring.as_deref(), Some("Hello."));
    }

    #[test]
    fn resolves_innermost_nested_def() {
        let src = "class C:\n    def m(self):\n        return 1\n";
        let target = AstTargeter::new().unwrap().resolve(src, 2);
        assert_eq!(target.kind, SymbolType::Function);
        assert_eq!(target.signature, "def m(self):");
    }

    #[test]
    fn existing_docstring_detected_for_function() {
        let src = "def f():\n    \"\"\"Does a thing.\"\"\"\n    return 1\n";
        let target = AstTargeter::new().unwrap().resolve(src, 1);
        assert!(target.has_docstring);
        assert_eq!(target.existing_docstring.as_deref(), Some("Does a thing."));
        let span = docstring_span(src, &target).unwrap();
        assert_eq!(span, (2, 2));
    }

    #[test]
    fn syntax_error_falls_back_to_module() {
        let src = "def (((( broken\n";
        let target = AstTargeter::new().unwrap().resolve(src, 1);
        assert_eq!(target.kind, SymbolType::Module);
    }

    #[test]
    fn orphan_string_span_found_without_ast_docstring() {
        let src = "#!/usr/bin/env python3\n\"\"\"Orphan.\"\"\"\nx = 1\n";
        let span = orphan_module_string_span(src).unwrap();
        assert_eq!(span, (2, 2));
    }

    #[test]
    fn module_docstring_span_skips_shebang_and_encoding_comments() {
        let src = "#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\n\"\"\"Old.\"\"\"\nimport os\n";
        let target = AstTargeter::new().unwrap().resolve(src, 1);
        assert_eq!(target.kind, SymbolType::Module);
        assert!(target.has_docstring);
        let span = docstring_span(src, &target).unwrap();
        assert_eq!(span, (3, 3));
    }
}
