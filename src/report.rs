//! Validation report types.
//!
//! The report is the sole externally visible artifact of a run. It references
//! files by path and hunks by index only, so it serializes independently of
//! the parsed diff.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Category of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InsufficientContext,
    ApplyConflict,
    ParseError,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueKind::InsufficientContext => write!(f, "insufficient context"),
            IssueKind::ApplyConflict => write!(f, "apply conflict"),
            IssueKind::ParseError => write!(f, "parse error"),
        }
    }
}

/// One finding against one hunk of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub path: String,
    pub hunk_index: usize,
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        path: impl Into<String>,
        hunk_index: usize,
        kind: IssueKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            hunk_index,
            kind,
            message: message.into(),
        }
    }
}

/// Aggregated result of a validation run.
///
/// `passed` is true iff `issues` is empty. Issues are ordered by path, then
/// hunk index, so repeated runs on identical inputs serialize byte-identically
/// regardless of how the run was scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Build a report from unordered issues, sorting them deterministically.
    pub fn new(mut issues: Vec<ValidationIssue>) -> Self {
        issues.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.hunk_index.cmp(&b.hunk_index))
        });
        Self {
            passed: issues.is_empty(),
            issues,
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Human-readable summary for stderr.
    pub fn render_summary(&self) -> String {
        if self.passed {
            return "patch validation passed".to_string();
        }

        let mut out = String::new();
        for issue in &self.issues {
            out.push_str(&format!(
                "{} hunk {}: {}: {}\n",
                issue.path, issue.hunk_index, issue.kind, issue.message
            ));
        }
        let files: std::collections::BTreeSet<&str> =
            self.issues.iter().map(|i| i.path.as_str()).collect();
        out.push_str(&format!(
            "patch validation failed: {} issue(s) in {} file(s)",
            self.issues.len(),
            files.len()
        ));
        out
    }
}
