//! Property-based tests for the pipeline's quantified invariants (spec
//! testable properties): sanitizer idempotence and the diff/apply
//! round-trip.

use docwright_config::SanitizerConfig;
use docwright_patch_model::UnifiedDiff;
use proptest::prelude::*;
use std::collections::HashMap;

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z0-9 .,]{0,10}", 0..6).prop_map(|lines| {
        if lines.is_empty() {
            String::new()
        } else {
            format!("{}\n", lines.join("\n"))
        }
    })
}

proptest! {
    /// For all byte-strings `a, b` (restricted to a plain-text alphabet
    /// so they round-trip through `.lines()` cleanly), diffing `a`
    /// against `b` and applying that diff back to `a` yields `b`.
    #[test]
    fn diff_apply_round_trip(old in arb_text(), new in arb_text()) {
        let patch = docwright_patch::diff_file("f.py", &old, &new);
        let diff = UnifiedDiff { files: vec![patch] };
        let mut files = HashMap::new();
        files.insert("f.py".to_string(), old.clone());
        let applied = docwright_patch::apply_in_memory(&files, &diff).unwrap();
        let result = applied.get("f.py").cloned().unwrap_or_default();
        prop_assert_eq!(result, new);
    }

    /// `sanitize` is idempotent: re-running it on its own output never
    /// changes the result (§8 property 3).
    #[test]
    fn sanitize_is_idempotent(raw in "\\PC{0,120}") {
        let config = SanitizerConfig::default();
        let once = docwright_docstring::sanitize(&raw, &config);
        let twice = docwright_docstring::sanitize(&once, &config);
        prop_assert_eq!(once, twice);
    }
}
