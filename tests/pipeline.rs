//! End-to-end scenarios S1-S6 from the pipeline's design notes, driven
//! directly through the sub-crates' public APIs (no HTTP, no index
//! database) so each one exercises the exact text transformation the
//! pipeline promises.

use camino::Utf8Path;
use docwright_ast::AstTargeter;
use docwright_config::SanitizerConfig;
use docwright_patch_model::PatchPlan;
use std::collections::{HashMap, HashSet};

fn sandbox_result(source: &str, hint_lineno: u32, raw_docstring: &str) -> String {
    let targeter = AstTargeter::new().unwrap();
    let target = targeter.resolve(source, hint_lineno);
    let sanitized = docwright_docstring::sanitize(raw_docstring, &SanitizerConfig::default());
    let op = docwright_patch::plan_op(source, &target, "m.py", &sanitized);

    let mut plan = PatchPlan::default();
    plan.push(op);
    let diff = docwright_patch::compile(&plan, |_| Some(source.to_string()));

    let mut files = HashMap::new();
    files.insert("m.py".to_string(), source.to_string());
    let applied = docwright_patch::apply_in_memory(&files, &diff).unwrap();
    applied["m.py"].clone()
}

#[test]
fn s1_create_function_docstring() {
    let source = "def add(a, b):\n    return a + b\n";
    let result = sandbox_result(source, 1, "Return the sum of a and b.");
    assert_eq!(
        result,
        "def add(a, b):\n    \"\"\"\n    Return the sum of a and b.\n    \"\"\"\n    return a + b\n"
    );
}

#[test]
fn s2_rewrite_module_docstring_preserves_shebang_and_imports() {
    let source = "#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\n\"\"\"Old.\"\"\"\nimport os\nx = 1\n";
    let result = sandbox_result(source, 1, "New summary.");
    assert!(result.starts_with("#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\n"));
    assert!(result.contains("New summary."));
    assert!(!result.contains("Old."));
    assert!(result.contains("import os\n"));
    assert!(result.contains("x = 1\n"));
}

#[test]
fn s3_applier_rejects_on_context_mismatch_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    std::fs::write(root.join("m.py").as_std_path(), "def add(a, b):\n    return a+b\n").unwrap();

    let patch_text = "--- a/m.py\n+++ b/m.py\n@@ -1,2 +1,3 @@\n def add(a, b):\n+    \"\"\"Doc.\"\"\"\n     return a + b\n";
    let diff = docwright_patch::parse(patch_text).unwrap();

    let err = docwright_patch::apply(root, &diff).unwrap_err();
    assert!(matches!(err, docwright_patch::ApplyError::ContextMismatch { .. }));

    let untouched = std::fs::read_to_string(root.join("m.py").as_std_path()).unwrap();
    assert_eq!(untouched, "def add(a, b):\n    return a+b\n");
}

#[test]
fn s4_salvages_fenced_response_with_trailing_comma() {
    let raw = "```json\n{\"items\":[{\"id\":\"x1\",\"docstring\":\"ok\",}]}\n```";
    let expected: HashSet<String> = ["x1".to_string()].into_iter().collect();
    let results = docwright_response::parse_response(raw, &expected);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "x1");
    assert_eq!(results[0].docstring, "ok");
}

#[test]
fn s5_drops_ids_outside_the_batch() {
    let raw = r#"{"items":[{"id":"a","docstring":"ok"},{"id":"c","docstring":"nope"}]}"#;
    let expected: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
    let results = docwright_response::parse_response(raw, &expected);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a");
}

#[test]
fn s6_splits_a_batch_when_combined_size_exceeds_max_ctx() {
    use docwright_context::{BudgetConfig, TokenBudgeter};
    use docwright_patch_model::{Item, Mode, Suspect, SymbolType};

    let item = |id: &str, context_len: usize| Item {
        suspect: Suspect {
            id: id.to_string(),
            abs_path: camino::Utf8PathBuf::from("/tmp/m.py"),
            rel_path: "m.py".to_string(),
            lineno: 1,
            symbol_type: SymbolType::Function,
            name: None,
            description: None,
            signature: "def f():".to_string(),
            has_docstring: false,
            existing_docstring: String::new(),
            context_code: "x".repeat(context_len),
        },
        mode: Mode::Create,
        target_lineno: 1,
    };

    // each item alone fits the input budget, but both together would
    // push the projected total over max_ctx.
    let budgeter = TokenBudgeter::new(BudgetConfig {
        max_ctx: 600,
        resp_per_item: 100,
        guardrail: 50,
        batch_overhead: 50,
        max_output_tokens: 100_000,
    });
    let batches = budgeter.pack(vec![item("i1", 700), item("i2", 700)], |i| i.suspect.context_code.clone());
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].items[0].id(), "i1");
    assert_eq!(batches[1].items[0].id(), "i2");
}
