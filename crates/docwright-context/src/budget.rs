//! TokenBudgeter (C7): greedily packs items into batches under
//! `(max_ctx, resp_per_item, guardrail, batch_overhead)` constraints.
//! Grounded on the original `budget.py`'s `TokenBudgeter.estimate`/`pack`.

use docwright_patch_model::{Batch, Item};

#[derive(Debug, Clone, Copy)]
pub struct BudgetConfig {
    pub max_ctx: u64,
    pub resp_per_item: u64,
    pub guardrail: u64,
    pub batch_overhead: u64,
    pub max_output_tokens: u64,
}

/// Upper-biased token estimator: `ceil(len(s)/4 * 1.1) + 1`.
pub fn estimate_tokens(s: &str) -> u64 {
    let len = s.len() as f64;
    (len / 4.0 * 1.1).ceil() as u64 + 1
}

pub struct TokenBudgeter {
    config: BudgetConfig,
}

impl TokenBudgeter {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    /// Packs `items` into batches, given `serialize` (how one item is
    /// rendered into the prompt, for estimation purposes). An item whose
    /// own serialized size alone would exceed the available input budget
    /// becomes a forced singleton batch. A post-pass splits any batch
    /// whose predicted output would exceed `max_output_tokens`.
    pub fn pack(
        &self,
        items: Vec<Item>,
        serialize: impl Fn(&Item) -> String,
    ) -> Vec<Batch> {
        let c = &self.config;
        let available_input = c
            .max_ctx
            .saturating_sub(c.guardrail)
            .saturating_sub(c.resp_per_item)
            .saturating_sub(c.batch_overhead);

        let mut batches: Vec<Batch> = Vec::new();
        let mut current = Batch::default();
        let mut current_input_tokens: u64 = 0;

        for item in items {
            let item_tokens = estimate_tokens(&serialize(&item));

            if item_tokens > available_input {
                if !current.items.is_empty() {
                    batches.push(std::mem::take(&mut current));
                    current_input_tokens = 0;
                }
                batches.push(Batch { items: vec![item] });
                continue;
            }

            let candidate_n = current.items.len() as u64 + 1;
            let candidate_input = current_input_tokens + item_tokens;
            let projected_total =
                candidate_input + c.resp_per_item * candidate_n + c.guardrail + c.batch_overhead;

            if !current.items.is_empty() && projected_total > c.max_ctx {
                batches.push(std::mem::take(&mut current));
                current_input_tokens = 0;
            }

            current_input_tokens += item_tokens;
            current.items.push(item);
        }
        if !current.items.is_empty() {
            batches.push(current);
        }

        self.split_output_overflow(batches)
    }

    fn split_output_overflow(&self, batches: Vec<Batch>) -> Vec<Batch> {
        let c = &self.config;
        let mut out = Vec::new();
        for batch in batches {
            let predicted_output =
                c.resp_per_item * batch.items.len() as u64 + c.batch_overhead;
            if predicted_output <= c.max_output_tokens || batch.items.len() <= 1 {
                out.push(batch);
            } else {
                for item in batch.items {
                    out.push(Batch { items: vec![item] });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docwright_patch_model::{Mode, Suspect, SymbolType};

    fn item(id: &str) -> Item {
        Item {
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
                context_code: "x".repeat(200),
            },
            mode: Mode::Create,
            target_lineno: 1,
        }
    }

    #[test]
    fn packs_small_items_into_one_batch() {
        let budgeter = TokenBudgeter::new(BudgetConfig {
            max_ctx: 100_000,
            resp_per_item: 200,
            guardrail: 2000,
            batch_overhead: 300,
            max_output_tokens: 100_000,
        });
        let items = vec![item("a"), item("b")];
        let batches = budgeter.pack(items, |i| i.suspect.context_code.clone());
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].items.len(), 2);
    }

    #[test]
    fn splits_when_combined_exceeds_max_ctx() {
        // each item alone fits, but two together don't (S6 scenario)
        let budgeter = TokenBudgeter::new(BudgetConfig {
            max_ctx: 600,
            resp_per_item: 100,
            guardrail: 50,
            batch_overhead: 50,
            max_output_tokens: 100_000,
        });
        let items = vec![item("a"), item("b")];
        let batches = budgeter.pack(items, |i| i.suspect.context_code.clone());
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].items.len(), 1);
        assert_eq!(batches[1].items.len(), 1);
    }

    #[test]
    fn forces_singleton_when_item_alone_exceeds_budget() {
        let budgeter = TokenBudgeter::new(BudgetConfig {
            max_ctx: 300,
            resp_per_item: 50,
            guardrail: 10,
            batch_overhead: 10,
            max_output_tokens: 100_000,
        });
        let mut huge = item("a");
        huge.suspect.context_code = "y".repeat(5000);
        let batches = budgeter.pack(vec![huge, item("b")], |i| i.suspect.context_code.clone());
        assert!(batches.iter().any(|b| b.items.len() == 1 && b.items[0].id() == "a"));
    }
}
