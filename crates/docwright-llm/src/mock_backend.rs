//! Deterministic mock provider used only by tests: parses the user
//! prompt for `id:`/`mode:` pairs and synthesizes a PEP-257-ish
//! docstring per item.

use crate::{LlmBackend, LlmError, LlmRequest};
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

#[derive(Default)]
pub struct MockBackend;

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let items = parse_items_from_user_prompt(&request.user);
        let payload = json!({ "items": items });
        Ok(payload.to_string())
    }
}

fn parse_items_from_user_prompt(user: &str) -> Vec<serde_json::Value> {
    let id_re = Regex::new(r"(?m)^- id:\s*(\S+)").unwrap();
    let mode_re = Regex::new(r"(?m)^\s*mode:\s*(\S+)").unwrap();

    let ids: Vec<&str> = id_re
        .captures_iter(user)
        .map(|c| c.get(1).unwrap().as_str())
        .collect();
    let modes: Vec<&str> = mode_re
        .captures_iter(user)
        .map(|c| c.get(1).unwrap().as_str())
        .collect();

    ids.iter()
        .zip(modes.iter().chain(std::iter::repeat(&"rewrite")))
        .map(|(id, mode)| {
            json!({
                "id": id,
                "mode": mode,
                "docstring": synthesize_docstring(id),
            })
        })
        .collect()
}

fn synthesize_docstring(id: &str) -> String {
    format!("Summarize {id}.\n\nSynthesized for local testing.")
}
