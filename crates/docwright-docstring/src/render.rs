//! Docstring rendering (§4.7): the sanitized body becomes a
//! triple-quoted block with the opening `"""` on its own line at
//! `indent`, a summary line, exactly one blank line, the body, and the
//! closing `"""` on its own line. Paragraphs wrap at a fixed width;
//! bullet lines keep their own indentation verbatim.

const WRAP_WIDTH: usize = 72;

/// Renders `sanitized` (already normalized by [`crate::sanitize`]) as a
/// full docstring block, each line prefixed with `indent`.
pub fn render_docstring(sanitized: &str, indent: &str) -> String {
    let mut lines: Vec<&str> = sanitized.trim_end().lines().collect();
    if lines.is_empty() {
        lines.push("Add a concise summary.");
    }
    let summary = lines[0];
    let body = &lines[1..];

    let mut out = String::new();
    out.push_str(indent);
    out.push_str("\"\"\"\n");
    out.push_str(indent);
    out.push_str(summary.trim());
    out.push('\n');

    if !body.iter().all(|l| l.trim().is_empty()) {
        out.push('\n');
        for paragraph in wrap_body(body) {
            out.push_str(indent);
            out.push_str(&paragraph);
            out.push('\n');
        }
    }

    out.push_str(indent);
    out.push_str("\"\"\"\n");
    out
}

/// Wraps non-bullet paragraph lines at [`WRAP_WIDTH`]; bullet lines
/// (`- `/`* ` prefixed, or already indented) pass through untouched so
/// list structure survives.
fn wrap_body(body: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    let flush = |paragraph: &mut Vec<&str>, out: &mut Vec<String>| {
        if paragraph.is_empty() {
            return;
        }
        let joined = paragraph.join(" ");
        for wrapped in textwrap::wrap(&joined, WRAP_WIDTH) {
            out.push(wrapped.into_owned());
        }
        paragraph.clear();
    };

    for &line in body {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            flush(&mut paragraph, &mut out);
            out.push(String::new());
        } else if trimmed.starts_with("- ") || trimmed.starts_with("* ") || line.starts_with(' ') {
            flush(&mut paragraph, &mut out);
            out.push(line.to_string());
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph, &mut out);

    // Collapse any leading/trailing blank lines left over from the
    // body (the caller already emitted the mandatory separating blank
    // line before the body).
    while out.first().is_some_and(|l| l.is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out
}
