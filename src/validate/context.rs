//! Minimum-context policy check.
//!
//! A hunk must carry at least `min_context` consecutive unchanged lines
//! immediately before its first change and after its last change, so it
//! stays anchored when the surrounding file drifts. Hunks touching the
//! start or end of the base file are exempt on that side, since the lines
//! simply do not exist there.

use crate::diff::Hunk;
use crate::report::{IssueKind, ValidationIssue};

/// Check one hunk against the minimum-context policy.
///
/// `base_line_count` is the total line count of the base file; when it is
/// unknown (the resolver already failed for this file) the trailing
/// exemption cannot be decided and the trailing check is skipped.
pub fn check_hunk(
    path: &str,
    hunk: &Hunk,
    hunk_index: usize,
    min_context: u32,
    base_line_count: Option<u32>,
) -> Option<ValidationIssue> {
    if !hunk.has_changes() {
        return None;
    }

    let mut faults = Vec::new();

    // source_start 0 only occurs for file creation, which has no base to
    // anchor against; 1 means the hunk touches the start of the file.
    let at_file_start = hunk.source_start <= 1;
    let leading = hunk.leading_context();
    if !at_file_start && leading < min_context {
        faults.push(format!("{leading} leading"));
    }

    let at_file_end = base_line_count.map(|total| hunk.source_end() >= total);
    let trailing = hunk.trailing_context();
    if at_file_end == Some(false) && trailing < min_context {
        faults.push(format!("{trailing} trailing"));
    }

    if faults.is_empty() {
        return None;
    }

    Some(ValidationIssue::new(
        path,
        hunk_index,
        IssueKind::InsufficientContext,
        format!(
            "{} context line(s), policy requires at least {min_context} on each side",
            faults.join(" and ")
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{HunkLine, LineKind};

    /// Build a hunk from (prefix, text) pairs, computing header fields the
    /// way the parser would.
    fn hunk(source_start: u32, spec: &[(char, &str)]) -> Hunk {
        let lines: Vec<HunkLine> = spec
            .iter()
            .map(|(prefix, text)| {
                let kind = match prefix {
                    ' ' => LineKind::Context,
                    '+' => LineKind::Added,
                    '-' => LineKind::Removed,
                    _ => panic!("bad prefix"),
                };
                HunkLine::new(kind, *text)
            })
            .collect();
        let source_len = lines.iter().filter(|l| l.kind != LineKind::Added).count() as u32;
        let target_len = lines.iter().filter(|l| l.kind != LineKind::Removed).count() as u32;
        Hunk {
            source_start,
            source_len,
            target_start: source_start,
            target_len,
            lines,
        }
    }

    #[test]
    fn test_sufficient_context_passes() {
        // Three context lines on each side of a one-line change.
        let h = hunk(
            4,
            &[
                (' ', "a"),
                (' ', "b"),
                (' ', "c"),
                ('-', "old"),
                ('+', "new"),
                (' ', "d"),
                (' ', "e"),
                (' ', "f"),
            ],
        );
        assert!(check_hunk("f.py", &h, 0, 3, Some(100)).is_none());
    }

    #[test]
    fn test_insufficient_leading_context() {
        let h = hunk(
            4,
            &[
                (' ', "c"),
                ('-', "old"),
                ('+', "new"),
                (' ', "d"),
                (' ', "e"),
                (' ', "f"),
            ],
        );
        let issue = check_hunk("f.py", &h, 2, 3, Some(100)).unwrap();
        assert_eq!(issue.kind, IssueKind::InsufficientContext);
        assert_eq!(issue.hunk_index, 2);
        assert!(issue.message.contains("1 leading"));
    }

    #[test]
    fn test_file_start_exemption() {
        let h = hunk(
            1,
            &[('-', "old"), ('+', "new"), (' ', "a"), (' ', "b"), (' ', "c")],
        );
        assert!(check_hunk("f.py", &h, 0, 3, Some(100)).is_none());
    }

    #[test]
    fn test_file_end_exemption() {
        // Hunk covers lines 8..10 of a 10-line base: no room for trailing
        // context.
        let h = hunk(
            5,
            &[
                (' ', "a"),
                (' ', "b"),
                (' ', "c"),
                ('-', "old"),
                ('+', "new"),
                (' ', "d"),
                (' ', "e"),
            ],
        );
        assert!(check_hunk("f.py", &h, 0, 3, Some(10)).is_none());
    }

    #[test]
    fn test_insufficient_trailing_context() {
        let h = hunk(
            5,
            &[
                (' ', "a"),
                (' ', "b"),
                (' ', "c"),
                ('-', "old"),
                ('+', "new"),
                (' ', "d"),
            ],
        );
        let issue = check_hunk("f.py", &h, 0, 3, Some(100)).unwrap();
        assert!(issue.message.contains("1 trailing"));
    }

    #[test]
    fn test_both_sides_fault_in_one_issue() {
        let h = hunk(5, &[('-', "old"), ('+', "new")]);
        let issue = check_hunk("f.py", &h, 0, 3, Some(100)).unwrap();
        assert!(issue.message.contains("0 leading and 0 trailing"));
    }

    #[test]
    fn test_all_context_hunk_is_exempt() {
        let h = hunk(5, &[(' ', "a"), (' ', "b")]);
        assert!(check_hunk("f.py", &h, 0, 3, Some(100)).is_none());
    }

    #[test]
    fn test_unknown_base_skips_trailing_check() {
        // One trailing context line would fail against a known base, but
        // without a line count the exemption cannot be ruled out.
        let h = hunk(
            4,
            &[
                (' ', "a"),
                (' ', "b"),
                (' ', "c"),
                ('-', "old"),
                ('+', "new"),
                (' ', "d"),
            ],
        );
        assert!(check_hunk("f.py", &h, 0, 3, None).is_none());
    }
}
