//! Dry-run apply check.
//!
//! Verifies that every hunk's context and removed lines match the base
//! content at the declared source offset. This is a conflict check only:
//! base content is never modified and no patched output is materialized.

use crate::diff::{ChangeKind, FilePatch, LineKind};
use crate::report::{IssueKind, ValidationIssue};

/// Check every hunk of a file against resolved base content.
///
/// `base` is `None` when the file does not exist in the base. Each hunk
/// reports at most its first mismatch; later hunks are still checked so the
/// report names every conflicting hunk.
pub fn check_file(
    patch: &FilePatch,
    base: Option<&str>,
    ignore_trailing_ws: bool,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if patch.change_kind == ChangeKind::Added {
        if base.is_some() {
            issues.push(ValidationIssue::new(
                &patch.path,
                0,
                IssueKind::ApplyConflict,
                "patch creates this file but it already exists in the base",
            ));
            return issues;
        }
        for (idx, hunk) in patch.hunks.iter().enumerate() {
            if hunk.source_start != 0 || hunk.source_len != 0 {
                issues.push(ValidationIssue::new(
                    &patch.path,
                    idx,
                    IssueKind::ApplyConflict,
                    format!(
                        "file creation hunk declares source range -{},{} instead of -0,0",
                        hunk.source_start, hunk.source_len
                    ),
                ));
            }
        }
        return issues;
    }

    let Some(base) = base else {
        issues.push(ValidationIssue::new(
            &patch.path,
            0,
            IssueKind::ApplyConflict,
            format!("base file {} does not exist", patch.base_path()),
        ));
        return issues;
    };

    let base_lines: Vec<&str> = base.lines().collect();

    for (idx, hunk) in patch.hunks.iter().enumerate() {
        if hunk.source_len > 0 && hunk.source_start == 0 {
            issues.push(ValidationIssue::new(
                &patch.path,
                idx,
                IssueKind::ApplyConflict,
                "hunk declares source line 0 for an existing file",
            ));
            continue;
        }

        let mut line_no = hunk.source_start as usize;
        for hunk_line in hunk
            .lines
            .iter()
            .filter(|l| l.kind != LineKind::Added)
        {
            if line_no > base_lines.len() {
                issues.push(ValidationIssue::new(
                    &patch.path,
                    idx,
                    IssueKind::ApplyConflict,
                    format!(
                        "hunk extends past the end of the base file ({} line(s))",
                        base_lines.len()
                    ),
                ));
                break;
            }
            let base_line = base_lines[line_no - 1];
            if !lines_equal(base_line, &hunk_line.text, ignore_trailing_ws) {
                let what = match hunk_line.kind {
                    LineKind::Context => "context",
                    LineKind::Removed => "removed",
                    LineKind::Added => unreachable!(),
                };
                issues.push(ValidationIssue::new(
                    &patch.path,
                    idx,
                    IssueKind::ApplyConflict,
                    format!(
                        "base line {line_no} does not match {what} line: expected {:?}, found {:?}",
                        hunk_line.text, base_line
                    ),
                ));
                break;
            }
            line_no += 1;
        }
    }

    issues
}

fn lines_equal(base: &str, hunk: &str, ignore_trailing_ws: bool) -> bool {
    if ignore_trailing_ws {
        base.trim_end() == hunk.trim_end()
    } else {
        base == hunk
    }
}
