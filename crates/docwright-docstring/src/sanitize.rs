//! Sanitizer (C11): normalizes raw model output to house style.
//! Grounded on the original `sanitize.py`. Idempotent by construction:
//! `sanitize(sanitize(s)) == sanitize(s)` (testable property §8.3).

use docwright_config::SanitizerConfig;
use once_cell::sync::Lazy;
use regex::Regex;

const FALLBACK_TEXT: &str = "Add a concise summary.\n";

const BANNED_OPENINGS: &[&str] = &[
    "This function",
    "This method",
    "This class",
    "This module",
    "This script",
];

/// Normalizes `raw` model output into the house docstring body (no
/// surrounding triple quotes, no banned openings, `Capabilities:`
/// bullets instead of tagged ones, at most one blank line between
/// paragraphs, always non-empty).
pub fn sanitize(raw: &str, config: &SanitizerConfig) -> String {
    let stripped = strip_enclosing_quotes(raw);
    let without_banned = strip_banned_opening(&stripped);
    let with_capabilities = rewrite_capabilities_section(&without_banned, config);
    let collapsed = collapse_blank_lines(&with_capabilities);
    let trimmed = trim_trailing_whitespace(&collapsed);
    let result = trimmed.trim().to_string();
    if result.is_empty() {
        FALLBACK_TEXT.to_string()
    } else if result.ends_with('\n') {
        result
    } else {
        format!("{result}\n")
    }
}

/// Strips a model's own `"""`/`'''` wrapping, if it echoed the quotes
/// back instead of just the body text.
fn strip_enclosing_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ["\"\"\"", "'''"] {
        if let Some(inner) = trimmed.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

static BANNED_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = BANNED_OPENINGS.join("|");
    Regex::new(&format!(r"(?i)^({alternation})\s+")).unwrap()
});

/// Removes a leading "This function/method/class/module/script "
/// phrasing, if the summary starts that way; the rest of the sentence
/// is kept and re-capitalized.
fn strip_banned_opening(s: &str) -> String {
    let Some(first_line_end) = s.find('\n') else {
        return strip_banned_from_line(s);
    };
    let (first, rest) = s.split_at(first_line_end);
    format!("{}{}", strip_banned_from_line(first), rest)
}

/// Strips repeated banned openings to a fixed point (a doubled opening
/// like "This function This function does X." would otherwise leave a
/// banned prefix behind after recapitalization, breaking sanitizer
/// idempotence).
fn strip_banned_from_line(line: &str) -> String {
    let mut current = line.to_string();
    loop {
        let Some(m) = BANNED_RE.find(&current) else {
            return current;
        };
        let remainder = &current[m.end()..];
        let mut chars = remainder.chars();
        let next = match chars.next() {
            Some(c) => format!("{}{}", c.to_uppercase(), chars.as_str()),
            None => remainder.to_string(),
        };
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Rewrites bullets carrying the configured project-internal tag prefix
/// (e.g. `- AG: does X`) into a `Capabilities:` section of plain dash
/// bullets, per Open Question #1.
fn rewrite_capabilities_section(s: &str, config: &SanitizerConfig) -> String {
    if config.capabilities_tag_prefix.is_empty() {
        return s.to_string();
    }
    let prefix = &config.capabilities_tag_prefix;
    let bullet_prefix = format!("- {prefix}");
    let mut out_lines: Vec<String> = Vec::new();
    let mut capability_lines: Vec<String> = Vec::new();
    let mut in_capabilities = false;

    for line in s.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with(&bullet_prefix) {
            let body = trimmed[bullet_prefix.len()..].trim_start();
            capability_lines.push(format!("- {body}"));
            in_capabilities = true;
            continue;
        }
        if in_capabilities && trimmed.is_empty() {
            flush_capabilities(&mut out_lines, &mut capability_lines);
            in_capabilities = false;
            out_lines.push(line.to_string());
            continue;
        }
        out_lines.push(line.to_string());
    }
    flush_capabilities(&mut out_lines, &mut capability_lines);
    out_lines.join("\n")
}

fn flush_capabilities(out_lines: &mut Vec<String>, capability_lines: &mut Vec<String>) {
    if capability_lines.is_empty() {
        return;
    }
    out_lines.push("Capabilities:".to_string());
    out_lines.append(capability_lines);
}

/// Collapses runs of two-or-more blank lines into exactly one blank
/// line, so paragraphs never have more than one line of separation.
fn collapse_blank_lines(s: &str) -> String {
    let mut out = Vec::new();
    let mut blank_run = 0;
    for line in s.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 1 {
                out.push(String::new());
            }
        } else {
            blank_run = 0;
            out.push(line.to_string());
        }
    }
    out.join("\n")
}

fn trim_trailing_whitespace(s: &str) -> String {
    s.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
