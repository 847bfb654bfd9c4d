//! Record types shared across the docstring pipeline. Everything here is
//! a plain tagged struct or enum: no behavior, so the producer/consumer
//! crates (`docwright-ast`, `docwright-context`, `docwright-llm`,
//! `docwright-response`, `docwright-patch`) can depend on this crate
//! without depending on each other.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A row from the external symbol index. Immutable within a run; the
/// `symbol_type`/`lineno` are hints, not ground truth (see
/// [`TargetInfo`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRow {
    pub id: String,
    pub filepath: String,
    pub lineno: u32,
    pub symbol_type: SymbolType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub unique_key_hash: Option<String>,
    pub status: String,
}

impl IndexRow {
    /// The natural-key fallback used for de-duplication when
    /// `unique_key_hash` is absent (see DESIGN.md Open Question #2).
    pub fn natural_key(&self) -> (String, SymbolType, Option<String>, u32) {
        (
            self.filepath.clone(),
            self.symbol_type,
            self.name.clone(),
            self.lineno,
        )
    }

    /// The authoritative de-duplication key: `unique_key_hash` when
    /// present, else the natural key rendered as a string.
    pub fn dedup_key(&self) -> String {
        match &self.unique_key_hash {
            Some(hash) => hash.clone(),
            None => {
                let (path, kind, name, lineno) = self.natural_key();
                format!("{path}:{kind:?}:{}:{lineno}", name.unwrap_or_default())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolType {
    Module,
    Class,
    Function,
    Unknown,
}

/// AST-derived ground truth about a target, superseding the index's
/// `symbol_type`/`lineno` hints (invariant 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInfo {
    pub kind: SymbolType,
    pub lineno: u32,
    pub end_lineno: u32,
    pub has_docstring: bool,
    pub existing_docstring: Option<String>,
    pub signature: String,
    pub body_indent: String,
}

/// A target after enrichment with source context, ready to become an
/// [`Item`].
#[derive(Debug, Clone)]
pub struct Suspect {
    pub id: String,
    pub abs_path: Utf8PathBuf,
    pub rel_path: String,
    pub lineno: u32,
    pub symbol_type: SymbolType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub signature: String,
    pub has_docstring: bool,
    pub existing_docstring: String,
    pub context_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Create,
    Rewrite,
}

/// A [`Suspect`] plus the authoritative AST-derived target line and the
/// mode the prompt should request.
#[derive(Debug, Clone)]
pub struct Item {
    pub suspect: Suspect,
    pub mode: Mode,
    pub target_lineno: u32,
}

impl Item {
    pub fn id(&self) -> &str {
        &self.suspect.id
    }
}

/// An ordered group of items whose estimated token cost fits the budget.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub items: Vec<Item>,
}

impl Batch {
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id().to_string()).collect()
    }
}

/// A parsed, id-filtered, deduplicated LLM output for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    pub id: String,
    pub mode: Mode,
    pub docstring: String,
}

/// Where an [`PatchOp::InsertAt`] should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    FileStart,
    FileEnd,
    AfterShebangAndEncoding,
    AfterImportBlock,
    AfterLine(u32),
    BeforeLine(u32),
}

/// A single file-level edit operation. `ReplaceRange` and `InsertAt` are
/// the two variants this core emits; `AddFile`/`DeleteFile` are part of
/// the model (the applier supports them) but are never produced by this
/// pipeline.
#[derive(Debug, Clone)]
pub enum PatchOp {
    ReplaceRange {
        rel_path: String,
        start_line: u32,
        end_line: u32,
        new_text: String,
    },
    InsertAt {
        rel_path: String,
        anchor: Anchor,
        new_text: String,
    },
    AddFile {
        rel_path: String,
        content: String,
    },
    DeleteFile {
        rel_path: String,
    },
}

impl PatchOp {
    pub fn rel_path(&self) -> &str {
        match self {
            PatchOp::ReplaceRange { rel_path, .. }
            | PatchOp::InsertAt { rel_path, .. }
            | PatchOp::AddFile { rel_path, .. }
            | PatchOp::DeleteFile { rel_path } => rel_path,
        }
    }

    /// The line used to order ops within a file in descending order
    /// (§5: edits apply innermost/bottom first so earlier line numbers
    /// stay stable). Insert-at-file-start/end sort to the extremes.
    pub fn sort_key(&self) -> u32 {
        match self {
            PatchOp::ReplaceRange { start_line, .. } => *start_line,
            PatchOp::InsertAt { anchor, .. } => match anchor {
                Anchor::FileStart
                | Anchor::AfterShebangAndEncoding
                | Anchor::AfterImportBlock => 0,
                Anchor::AfterLine(l) | Anchor::BeforeLine(l) => *l,
                Anchor::FileEnd => u32::MAX,
            },
            PatchOp::AddFile { .. } => u32::MAX,
            PatchOp::DeleteFile { .. } => u32::MAX,
        }
    }
}

/// All ops for one file, grouped by `rel_path`.
#[derive(Debug, Clone, Default)]
pub struct PatchPlan {
    pub ops_by_file: std::collections::BTreeMap<String, Vec<PatchOp>>,
}

impl PatchPlan {
    pub fn push(&mut self, op: PatchOp) {
        self.ops_by_file
            .entry(op.rel_path().to_string())
            .or_default()
            .push(op);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    Context,
    Add,
    Remove,
}

#[derive(Debug, Clone)]
pub struct HunkLine {
    pub tag: LineTag,
    pub text: String,
}

/// A contiguous region of a unified diff.
#[derive(Debug, Clone)]
pub struct Hunk {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    pub lines: Vec<HunkLine>,
}

/// All hunks for one file, plus create/delete markers (`/dev/null`
/// sides).
#[derive(Debug, Clone)]
pub struct FilePatch {
    pub rel_path: String,
    pub is_create: bool,
    pub is_delete: bool,
    pub hunks: Vec<Hunk>,
}

#[derive(Debug, Clone, Default)]
pub struct UnifiedDiff {
    pub files: Vec<FilePatch>,
}
