//! Unified-diff text parser.
//!
//! Accepts both `git diff` output (with `diff --git` and extended headers)
//! and plain `diff -u` output. Parsing is pure: text in, [`PatchSet`] out,
//! with errors carrying the 1-based input line of the malformed construct.

use std::sync::LazyLock;

use regex::Regex;

use crate::diff::{ChangeKind, FilePatch, Hunk, HunkLine, LineKind, PatchSet};
use crate::error::Error;
use crate::report::{IssueKind, ValidationIssue};

static HUNK_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap());

static DIFF_GIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").unwrap());

/// Result of lenient parsing: whatever parsed cleanly, plus one issue per
/// file section that had to be skipped.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub patchset: PatchSet,
    pub issues: Vec<ValidationIssue>,
}

/// Parse diff text strictly: the first malformed construct fails the whole
/// input.
pub fn parse(input: &str) -> Result<PatchSet, Error> {
    let mut parser = Parser::new(input)?;
    let mut files = Vec::new();
    while parser.seek_section()? {
        files.push(parser.parse_file_section()?);
    }
    if files.is_empty() {
        return Err(Error::parse(1, "no file sections found in diff input"));
    }
    Ok(PatchSet { files })
}

/// Parse diff text leniently: a malformed file section becomes a
/// [`IssueKind::ParseError`] issue and parsing resumes at the next
/// `diff --git` boundary. Fails only when the input is empty or contains
/// nothing recognizable at all.
pub fn parse_lossy(input: &str) -> Result<ParseOutcome, Error> {
    let mut parser = Parser::new(input)?;
    let mut files = Vec::new();
    let mut issues = Vec::new();

    loop {
        match parser.seek_section() {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => {
                issues.push(reject(parser.take_section_path(), &err));
                if !parser.skip_to_next_section() {
                    break;
                }
                continue;
            }
        }
        match parser.parse_file_section() {
            Ok(file) => {
                parser.section_path = None;
                files.push(file);
            }
            Err(err) => {
                issues.push(reject(parser.take_section_path(), &err));
                if !parser.skip_to_next_section() {
                    break;
                }
            }
        }
    }

    if files.is_empty() && issues.is_empty() {
        return Err(Error::parse(1, "no file sections found in diff input"));
    }
    Ok(ParseOutcome {
        patchset: PatchSet { files },
        issues,
    })
}

fn reject(path: Option<String>, err: &Error) -> ValidationIssue {
    ValidationIssue::new(
        path.unwrap_or_else(|| "<diff>".to_string()),
        0,
        IssueKind::ParseError,
        err.to_string(),
    )
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    seen_section: bool,
    /// Position of the current section's first line.
    section_start: usize,
    /// Best-known path of the section being parsed, for error reporting.
    section_path: Option<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, Error> {
        if input.trim().is_empty() {
            return Err(Error::EmptyDiff);
        }
        let mut lines: Vec<&str> = input.split('\n').collect();
        // A trailing newline yields one empty trailing element.
        if lines.last() == Some(&"") {
            lines.pop();
        }
        Ok(Self {
            lines,
            pos: 0,
            seen_section: false,
            section_start: 0,
            section_path: None,
        })
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    /// 1-based line number of the current position.
    fn line_no(&self) -> usize {
        self.pos + 1
    }

    fn bump(&mut self) -> Option<&'a str> {
        let line = self.peek();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    fn take_section_path(&mut self) -> Option<String> {
        self.section_path.take()
    }

    /// Advance to the start of the next file section. Lines before the first
    /// section are tolerated as preamble (e.g. `git format-patch` headers);
    /// after that, anything unrecognized is an error.
    fn seek_section(&mut self) -> Result<bool, Error> {
        while let Some(line) = self.peek() {
            if is_section_start(line) {
                return Ok(true);
            }
            if self.seen_section && !line.trim().is_empty() {
                return Err(Error::parse(
                    self.line_no(),
                    format!("unexpected content outside file section: {line:?}"),
                ));
            }
            self.pos += 1;
        }
        Ok(false)
    }

    /// Skip forward to the next `diff --git` boundary after a failed section.
    /// The failure may have left the cursor already on that boundary.
    fn skip_to_next_section(&mut self) -> bool {
        loop {
            match self.peek() {
                Some(line) if line.starts_with("diff --git ") && self.pos > self.section_start => {
                    return true;
                }
                Some(_) => self.pos += 1,
                None => return false,
            }
        }
    }

    fn parse_file_section(&mut self) -> Result<FilePatch, Error> {
        self.seen_section = true;
        self.section_start = self.pos;
        self.section_path = None;
        let section_line = self.line_no();

        let mut git_new_path: Option<String> = None;
        let mut new_file = false;
        let mut deleted_file = false;
        let mut rename_from: Option<String> = None;
        let mut rename_to: Option<String> = None;
        let mut meta_only = false;
        let mut binary = false;

        if let Some(line) = self.peek() {
            if let Some(caps) = DIFF_GIT.captures(line) {
                git_new_path = Some(caps[2].to_string());
                self.section_path = git_new_path.clone();
                self.bump();

                // Extended git headers between `diff --git` and `---`.
                while let Some(line) = self.peek() {
                    if let Some(rest) = line.strip_prefix("rename from ") {
                        rename_from = Some(rest.to_string());
                    } else if let Some(rest) = line.strip_prefix("rename to ") {
                        rename_to = Some(rest.to_string());
                    } else if line.starts_with("new file mode ") {
                        new_file = true;
                    } else if line.starts_with("deleted file mode ") {
                        deleted_file = true;
                    } else if line.starts_with("old mode ") || line.starts_with("new mode ") {
                        meta_only = true;
                    } else if line.starts_with("similarity index ")
                        || line.starts_with("dissimilarity index ")
                        || line.starts_with("index ")
                    {
                        // carries no information we validate
                    } else if line.starts_with("Binary files ") {
                        binary = true;
                    } else if line.starts_with("GIT binary patch") {
                        return Err(Error::parse(
                            self.line_no(),
                            "binary patches are not supported",
                        ));
                    } else {
                        break;
                    }
                    self.bump();
                }
            }
        }

        // `---` / `+++` markers. Absent for pure renames, mode changes and
        // binary stubs.
        let mut old_marker: Option<Option<String>> = None;
        let mut new_marker: Option<Option<String>> = None;
        if self.peek().is_some_and(|l| l.starts_with("--- ")) {
            let line = self.bump().unwrap();
            old_marker = Some(marker_path(&line[4..], "a/"));
            let next = self.peek();
            if !next.is_some_and(|l| l.starts_with("+++ ")) {
                return Err(Error::parse(
                    self.line_no(),
                    "expected '+++' marker after '---'",
                ));
            }
            let line = self.bump().unwrap();
            new_marker = Some(marker_path(&line[4..], "b/"));
        }

        // Resolve change kind and reported path before reading hunks, so
        // parse errors in the body can name the file.
        let old_path = old_marker.clone().flatten();
        let new_path = new_marker.clone().flatten();
        let (change_kind, path, kept_old_path) =
            if rename_from.is_some() || rename_to.is_some() {
                let to = rename_to
                    .clone()
                    .or(new_path.clone())
                    .or(git_new_path.clone())
                    .ok_or_else(|| Error::parse(section_line, "rename without target path"))?;
                (ChangeKind::Renamed, to, rename_from.clone())
            } else if new_file || (old_marker.is_some() && old_path.is_none()) {
                let to = new_path.clone().or(git_new_path.clone()).ok_or_else(|| {
                    Error::parse(section_line, "added file without target path")
                })?;
                (ChangeKind::Added, to, None)
            } else if deleted_file || (new_marker.is_some() && new_path.is_none()) {
                let from = old_path.clone().or(git_new_path.clone()).ok_or_else(|| {
                    Error::parse(section_line, "deleted file without source path")
                })?;
                (ChangeKind::Deleted, from, None)
            } else {
                let to = new_path.clone().or(git_new_path.clone()).ok_or_else(|| {
                    Error::parse(section_line, "file section without any path")
                })?;
                (ChangeKind::Modified, to, None)
            };
        self.section_path = Some(path.clone());

        let mut hunks: Vec<Hunk> = Vec::new();
        while self.peek().is_some_and(|l| l.starts_with("@@")) {
            let hunk = self.parse_hunk()?;
            if let Some(prev) = hunks.last() {
                if hunk.source_start <= prev.source_end() {
                    return Err(Error::parse(
                        self.line_no(),
                        format!(
                            "hunks overlap or are out of order: hunk at source line {} follows hunk ending at line {}",
                            hunk.source_start,
                            prev.source_end()
                        ),
                    ));
                }
            }
            hunks.push(hunk);
        }

        // A leftover body-looking line here means the previous hunk body ran
        // longer than its header declared.
        if let Some(line) = self.peek() {
            if !is_section_start(line) && !line.trim().is_empty() {
                return Err(Error::parse(
                    self.line_no(),
                    "hunk contains more lines than its header declares",
                ));
            }
        }

        if hunks.is_empty() {
            let hunkless_ok = binary
                || meta_only
                || (rename_from.is_some() && rename_to.is_some() && old_marker.is_none());
            if !hunkless_ok {
                return Err(Error::parse(
                    section_line,
                    format!("file section for {path:?} contains no hunks"),
                ));
            }
        }

        Ok(FilePatch {
            path,
            old_path: kept_old_path,
            change_kind,
            hunks,
        })
    }

    fn parse_hunk(&mut self) -> Result<Hunk, Error> {
        let header_line_no = self.line_no();
        let header = self.bump().expect("caller checked for '@@'");
        let caps = HUNK_HEADER
            .captures(header)
            .ok_or_else(|| Error::parse(header_line_no, format!("malformed hunk header: {header:?}")))?;

        let num = |digits: &str| {
            digits.parse::<u32>().map_err(|_| {
                Error::parse(
                    header_line_no,
                    format!("hunk header value out of range: {digits}"),
                )
            })
        };
        let source_start = num(&caps[1])?;
        let source_len = match caps.get(2) {
            Some(m) => num(m.as_str())?,
            None => 1,
        };
        let target_start = num(&caps[3])?;
        let target_len = match caps.get(4) {
            Some(m) => num(m.as_str())?,
            None => 1,
        };

        let mut lines = Vec::new();
        let mut remaining_source = source_len;
        let mut remaining_target = target_len;

        while remaining_source > 0 || remaining_target > 0 {
            let Some(line) = self.peek() else {
                return Err(Error::parse(
                    self.line_no(),
                    format!(
                        "hunk body ends early: header at line {header_line_no} declares more lines than follow"
                    ),
                ));
            };

            if line.starts_with('\\') {
                // "\ No newline at end of file" annotates the previous line.
                self.pos += 1;
                continue;
            }

            let (kind, text) = match line.chars().next() {
                Some(' ') => (LineKind::Context, &line[1..]),
                Some('+') => (LineKind::Added, &line[1..]),
                Some('-') => (LineKind::Removed, &line[1..]),
                // Some transports strip the single space off blank context
                // lines; git apply tolerates this and so do we.
                None => (LineKind::Context, ""),
                Some(_) => {
                    return Err(Error::parse(
                        self.line_no(),
                        format!("unexpected line in hunk body: {line:?}"),
                    ));
                }
            };

            match kind {
                LineKind::Context => {
                    if remaining_source == 0 || remaining_target == 0 {
                        return Err(self.count_mismatch(header_line_no));
                    }
                    remaining_source -= 1;
                    remaining_target -= 1;
                }
                LineKind::Removed => {
                    if remaining_source == 0 {
                        return Err(self.count_mismatch(header_line_no));
                    }
                    remaining_source -= 1;
                }
                LineKind::Added => {
                    if remaining_target == 0 {
                        return Err(self.count_mismatch(header_line_no));
                    }
                    remaining_target -= 1;
                }
            }
            lines.push(HunkLine::new(kind, text));
            self.pos += 1;
        }

        // Trailing no-newline marker after the last consumed line.
        while self.peek().is_some_and(|l| l.starts_with('\\')) {
            self.pos += 1;
        }

        Ok(Hunk {
            source_start,
            source_len,
            target_start,
            target_len,
            lines,
        })
    }

    fn count_mismatch(&self, header_line_no: usize) -> Error {
        Error::parse(
            self.line_no(),
            format!("hunk line counts disagree with header at line {header_line_no}"),
        )
    }
}

fn is_section_start(line: &str) -> bool {
    line.starts_with("diff --git ") || line.starts_with("--- ")
}

/// Extract the path from a `---`/`+++` marker payload: cut the timestamp
/// after a tab, map `/dev/null` to `None`, and strip the `a/`/`b/` prefix.
fn marker_path(raw: &str, prefix: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    if raw == "/dev/null" {
        return None;
    }
    Some(raw.strip_prefix(prefix).unwrap_or(raw).to_string())
}
