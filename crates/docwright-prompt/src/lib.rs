//! PromptBuilder (C8): produces the stable `{system, user}` messages and
//! the JSON-Schema response contract (enum-constrained `id`) for a
//! batch. Grounded on the original `prompts.py`/`schema.py`.

use docwright_patch_model::{Batch, Mode};
use serde_json::{Value, json};

pub struct PromptMessages {
    pub system: String,
    pub user: String,
    pub response_format: Value,
}

const BANNED_OPENINGS: &[&str] = &[
    "This function",
    "This method",
    "This class",
    "This module",
];

pub fn build_prompt(batch: &Batch) -> PromptMessages {
    PromptMessages {
        system: build_system(),
        user: build_user(batch),
        response_format: build_response_format(&batch.ids()),
    }
}

fn build_system() -> String {
    let banned = BANNED_OPENINGS
        .iter()
        .map(|s| format!("\"{s}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You write or rewrite Python docstrings.\n\
         For each item, either create a new docstring (mode=create) or rewrite the \
         existing one (mode=rewrite).\n\
         Never start a docstring with any of: {banned}.\n\
         Respond with JSON only, of the exact shape:\n\
         {{\"items\":[{{\"id\":<string>,\"mode\":\"create\"|\"rewrite\",\"docstring\":<string>}}]}}\n\
         Echo each item's id exactly as given; do not invent ids."
    )
}

fn build_user(batch: &Batch) -> String {
    let mut out = String::new();
    out.push_str("items:\n");
    for item in &batch.items {
        let s = &item.suspect;
        out.push_str(&format!("- id: {}\n", item.id()));
        out.push_str(&format!(
            "  mode: {}\n",
            match item.mode {
                Mode::Create => "create",
                Mode::Rewrite => "rewrite",
            }
        ));
        out.push_str(&format!("  signature: {}\n", s.signature));
        out.push_str(&format!("  has_existing: {}\n", s.has_docstring));
        if let Some(desc) = &s.description {
            out.push_str(&format!("  description: {desc}\n"));
        }
        out.push_str("  context: |\n");
        for line in s.context_code.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str(&format!("allowed_ids: {:?}\n", batch.ids()));
    out
}

fn build_response_format(ids: &[String]) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "docstring_items",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string", "enum": ids },
                                "mode": { "type": "string", "enum": ["create", "rewrite"] },
                                "docstring": { "type": "string" }
                            },
                            "required": ["id", "mode", "docstring"]
                        }
                    }
                },
                "required": ["items"]
            }
        }
    })
}
