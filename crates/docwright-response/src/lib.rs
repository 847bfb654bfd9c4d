//! ResponseParser (C10): strict JSON parse, falling back to a salvage
//! pipeline when strict parsing fails. Total: never panics or returns
//! `Err` on garbage input, only an empty result (§4.5 guarantee).

use docwright_patch_model::{LlmResult, Mode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

/// Parses a raw LLM response body into id-filtered, deduplicated
/// results. `expected_ids` is the batch's id set (invariant 3: ids
/// outside it are dropped).
pub fn parse_response(raw: &str, expected_ids: &HashSet<String>) -> Vec<LlmResult> {
    if let Some(results) = strict_parse(raw) {
        return filter_and_dedupe(results, expected_ids);
    }
    let salvaged = salvage(raw);
    filter_and_dedupe(salvaged, expected_ids)
}

fn strict_parse(raw: &str) -> Option<Vec<LlmResult>> {
    let value: Value = serde_json::from_str(raw).ok()?;
    extract_items(&value)
}

/// Reads `items` or `results` from a parsed JSON value into
/// `{id, mode, docstring}` results, skipping any entry missing a
/// required field rather than failing the whole batch.
fn extract_items(value: &Value) -> Option<Vec<LlmResult>> {
    let array = value.get("items").or_else(|| value.get("results"))?.as_array()?;
    let mut out = Vec::new();
    for entry in array {
        let Some(id) = entry.get("id").and_then(Value::as_str) else {
            continue;
        };
        let Some(docstring) = entry.get("docstring").and_then(Value::as_str) else {
            continue;
        };
        let mode = match entry.get("mode").and_then(Value::as_str) {
            Some("create") => Mode::Create,
            _ => Mode::Rewrite,
        };
        out.push(LlmResult {
            id: id.to_string(),
            mode,
            docstring: docstring.to_string(),
        });
    }
    Some(out)
}

fn filter_and_dedupe(results: Vec<LlmResult>, expected_ids: &HashSet<String>) -> Vec<LlmResult> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for result in results {
        if !expected_ids.contains(&result.id) {
            continue;
        }
        if result.docstring.trim().is_empty() {
            continue;
        }
        if !seen.insert(result.id.clone()) {
            continue;
        }
        out.push(result);
    }
    out
}

fn salvage(raw: &str) -> Vec<LlmResult> {
    let stripped = strip_code_fences(raw);
    let normalized = normalize_smart_quotes(&stripped);
    let escaped = escape_raw_newlines_in_strings(&normalized);
    let repaired = remove_trailing_commas(&escaped);

    if let Some(value) = serde_json::from_str::<Value>(&repaired).ok() {
        if let Some(items) = extract_items(&value) {
            return items;
        }
    }

    balanced_object_scan(&repaired)
}

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\n?([\s\S]*?)```").unwrap());

fn strip_code_fences(raw: &str) -> String {
    if let Some(caps) = FENCE_RE.captures(raw) {
        caps.get(1).unwrap().as_str().trim().to_string()
    } else {
        raw.trim().to_string()
    }
}

fn normalize_smart_quotes(s: &str) -> String {
    s.replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Escapes raw newlines that occur *inside* string literals, tracked via
/// a small state machine (in-string / escape-pending), since a raw
/// newline inside a JSON string is otherwise invalid.
fn escape_raw_newlines_in_strings(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape_next = false;
    for ch in s.chars() {
        if in_string && ch == '\n' && !escape_next {
            out.push_str("\\n");
            continue;
        }
        if escape_next {
            escape_next = false;
        } else if ch == '\\' && in_string {
            escape_next = true;
        } else if ch == '"' {
            in_string = !in_string;
        }
        out.push(ch);
    }
    out
}

static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());

fn remove_trailing_commas(s: &str) -> String {
    TRAILING_COMMA_RE.replace_all(s, "$1").to_string()
}

/// Scans for balanced `{...}` substrings, ignoring braces inside string
/// literals, and tries to parse each as a standalone object with `id`
/// and `docstring` fields.
fn balanced_object_scan(s: &str) -> Vec<LlmResult> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = find_matching_brace(&chars, i) {
                let candidate: String = chars[i..=end].iter().collect();
                if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
                    if let (Some(id), Some(docstring)) = (
                        value.get("id").and_then(Value::as_str),
                        value.get("docstring").and_then(Value::as_str),
                    ) {
                        let mode = match value.get("mode").and_then(Value::as_str) {
                            Some("create") => Mode::Create,
                            _ => Mode::Rewrite,
                        };
                        out.push(LlmResult {
                            id: id.to_string(),
                            mode,
                            docstring: docstring.to_string(),
                        });
                    }
                }
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    out
}

fn find_matching_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;
    for (offset, &ch) in chars[open..].iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> HashSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn strict_parse_happy_path() {
        let raw = r#"{"items":[{"id":"x1","mode":"rewrite","docstring":"ok"}]}"#;
        let results = parse_response(raw, &ids(&["x1"]));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].docstring, "ok");
    }

    #[test]
    fn drops_ids_outside_expected_set() {
        let raw = r#"{"items":[{"id":"a","docstring":"x"},{"id":"c","docstring":"y"}]}"#;
        let results = parse_response(raw, &ids(&["a", "b"]));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
    }

    #[test]
    fn salvages_fenced_response_with_trailing_comma() {
        let raw = "```json\n{\"items\":[{\"id\":\"x1\",\"docstring\":\"ok\",}]}\n```";
        let results = parse_response(raw, &ids(&["x1"]));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].docstring, "ok");
    }

    #[test]
    fn garbage_input_never_panics_and_yields_empty() {
        let results = parse_response("not json at all {{{", &ids(&["x1"]));
        assert!(results.is_empty());
    }

    #[test]
    fn duplicate_ids_collapse_to_first_occurrence() {
        let raw = r#"{"items":[{"id":"a","docstring":"first"},{"id":"a","docstring":"second"}]}"#;
        let results = parse_response(raw, &ids(&["a"]));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].docstring, "first");
    }

    #[test]
    fn empty_docstrings_are_discarded() {
        let raw = r#"{"items":[{"id":"a","docstring":"   "}]}"#;
        let results = parse_response(raw, &ids(&["a"]));
        assert!(results.is_empty());
    }

    #[test]
    fn balanced_brace_scan_extracts_objects_from_noise() {
        let raw = "preamble junk { \"id\": \"a\", \"docstring\": \"ok\" } trailing junk }{";
        let results = parse_response(raw, &ids(&["a"]));
        assert_eq!(results.len(), 1);
    }
}
