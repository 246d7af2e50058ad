//! Unified-diff data model and parser.
//!
//! A diff is organized hierarchically: a [`PatchSet`] holds one [`FilePatch`]
//! per touched file, each of which holds ordered, non-overlapping [`Hunk`]s.
//! The model is immutable once parsed; validation never mutates it.

pub mod parser;

use serde::{Deserialize, Serialize};

pub use parser::{parse, parse_lossy, ParseOutcome};

/// How a diff changes a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
            ChangeKind::Renamed => write!(f, "renamed"),
        }
    }
}

/// Kind of a single hunk body line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

/// One line of a hunk body, without its prefix character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: LineKind,
    pub text: String,
}

impl HunkLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// True for added or removed lines.
    pub fn is_change(&self) -> bool {
        self.kind != LineKind::Context
    }
}

/// One contiguous block of changes plus surrounding context.
///
/// Offsets and lengths mirror the `@@ -a,b +c,d @@` header: 1-based line
/// numbers into the source and target files. A zero source length marks a
/// pure insertion after line `source_start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub source_start: u32,
    pub source_len: u32,
    pub target_start: u32,
    pub target_len: u32,
    pub lines: Vec<HunkLine>,
}

impl Hunk {
    /// Context + removed lines actually present in the body.
    pub fn counted_source_len(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.kind != LineKind::Added)
            .count() as u32
    }

    /// Context + added lines actually present in the body.
    pub fn counted_target_len(&self) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.kind != LineKind::Removed)
            .count() as u32
    }

    /// Last source line covered by this hunk. For pure insertions this is
    /// the line the insertion follows.
    pub fn source_end(&self) -> u32 {
        if self.source_len == 0 {
            self.source_start
        } else {
            self.source_start + self.source_len - 1
        }
    }

    /// Number of consecutive context lines before the first change.
    pub fn leading_context(&self) -> u32 {
        self.lines
            .iter()
            .take_while(|l| l.kind == LineKind::Context)
            .count() as u32
    }

    /// Number of consecutive context lines after the last change.
    pub fn trailing_context(&self) -> u32 {
        self.lines
            .iter()
            .rev()
            .take_while(|l| l.kind == LineKind::Context)
            .count() as u32
    }

    /// Whether the hunk contains any added or removed line.
    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|l| l.is_change())
    }
}

/// All hunks for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Path the diff reports the file under (the new path for renames).
    pub path: String,
    /// Previous path, set only for renames.
    pub old_path: Option<String>,
    pub change_kind: ChangeKind,
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    /// Path at which base content should be resolved: the old path for a
    /// rename, otherwise the reported path.
    pub fn base_path(&self) -> &str {
        self.old_path.as_deref().unwrap_or(&self.path)
    }

    /// Extension of the reported path, if any.
    pub fn extension(&self) -> Option<&str> {
        std::path::Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
    }
}

/// A fully parsed diff: one per validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    pub files: Vec<FilePatch>,
}

impl PatchSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}
