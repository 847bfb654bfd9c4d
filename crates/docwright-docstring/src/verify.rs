//! Verifier (C12): PEP-257-minimal rules plus params-consistency
//! checking against a parsed signature. Non-fatal: failures are
//! recorded under `verify_reports/`, never abort the pipeline (§7).

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub ok: bool,
    pub issues: Vec<String>,
}

/// Runs both layers against `docstring` and `signature`. `signature` is
/// the AST-derived `def name(...):`/`class name(...):` string; module
/// targets (signature `"module"`) skip the params-consistency layer.
pub fn verify(docstring: &str, signature: &str) -> VerifyReport {
    let mut issues = Vec::new();
    issues.extend(pep257_minimal(docstring));
    if signature != "module" {
        issues.extend(params_consistency(docstring, signature));
    }
    VerifyReport {
        ok: issues.is_empty(),
        issues,
    }
}

fn summary_line(docstring: &str) -> &str {
    docstring.lines().next().unwrap_or("").trim()
}

/// Non-empty, summary line length >= 3, summary ends with a period.
fn pep257_minimal(docstring: &str) -> Vec<String> {
    let mut issues = Vec::new();
    if docstring.trim().is_empty() {
        issues.push("docstring is empty".to_string());
        return issues;
    }
    let summary = summary_line(docstring);
    if summary.len() < 3 {
        issues.push(format!("summary line too short: {summary:?}"));
    }
    if !summary.ends_with('.') {
        issues.push(format!("summary line does not end with a period: {summary:?}"));
    }
    issues
}

static PARAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap());

/// If the docstring has an `Args:` section, every parameter name from
/// `signature` (excluding `self`/`cls`) must appear as a word in the
/// docstring.
fn params_consistency(docstring: &str, signature: &str) -> Vec<String> {
    if !docstring.contains("Args:") {
        return Vec::new();
    }
    let params = parse_param_names(signature);
    let mut issues = Vec::new();
    for param in params {
        if param == "self" || param == "cls" {
            continue;
        }
        let word_re = Regex::new(&format!(r"\b{}\b", regex::escape(&param))).unwrap();
        if !word_re.is_match(docstring) {
            issues.push(format!("missing parameter in Args: {param}"));
        }
    }
    issues
}

/// Extracts parameter names from a `def name(<params>) -> ret:`
/// signature, splitting on top-level commas (respecting nested
/// brackets so default-value expressions and type hints don't confuse
/// the split), and stripping `*`/`**`, type annotations, and defaults.
pub fn parse_param_names(signature: &str) -> Vec<String> {
    let Some(open) = signature.find('(') else {
        return Vec::new();
    };
    let Some(close) = matching_paren(signature, open) else {
        return Vec::new();
    };
    let inner = &signature[open + 1..close];
    split_top_level_commas(inner)
        .into_iter()
        .filter_map(|raw| {
            let trimmed = raw.trim().trim_start_matches('*').trim();
            if trimmed.is_empty() {
                return None;
            }
            PARAM_RE.find(trimmed).map(|m| m.as_str().to_string())
        })
        .collect()
}

fn matching_paren(s: &str, open_byte: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in s.char_indices().skip(open_byte) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_param_names() {
        let names = parse_param_names("def add(a, b):");
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn parses_names_with_type_hints_and_defaults() {
        let names = parse_param_names("def f(self, x: int, y: list[int] = None, *args, **kw):");
        assert_eq!(names, vec!["self", "x", "y", "args", "kw"]);
    }

    #[test]
    fn module_signature_skips_params_check() {
        let report = verify("Summary.\n\nArgs:\n    nothing here\n", "module");
        assert!(report.ok);
    }

    #[test]
    fn flags_missing_param_in_args_section() {
        let report = verify(
            "Add two numbers.\n\nArgs:\n    a: the first number.\n",
            "def add(a, b):",
        );
        assert!(!report.ok);
        assert!(report.issues.iter().any(|i| i.contains('b')));
    }

    #[test]
    fn passes_when_all_params_present() {
        let report = verify(
            "Add two numbers.\n\nArgs:\n    a: the first.\n    b: the second.\n",
            "def add(a, b):",
        );
        assert!(report.ok);
    }

    #[test]
    fn flags_summary_without_trailing_period() {
        let report = verify("Add two numbers", "def add(a, b):");
        assert!(!report.ok);
    }
}
