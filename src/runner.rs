//! Policy runner.
//!
//! Orchestrates the validators over a parsed [`PatchSet`]: filters files,
//! resolves base content, runs the context and apply checks, and aggregates
//! every finding into one deterministic [`ValidationReport`]. A run is a
//! pure function of its inputs; there is no cross-run state.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::diff::{ChangeKind, FilePatch, PatchSet};
use crate::error::Error;
use crate::report::{IssueKind, ValidationIssue, ValidationReport};
use crate::resolver::BaseResolver;
use crate::validate::{apply, context};

/// Options governing one validation run.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Minimum context lines required on each side of a change.
    pub min_context: u32,
    /// Compare lines with trailing whitespace stripped.
    pub ignore_trailing_ws: bool,
    /// Escalate resolver failures to fatal errors instead of per-file issues.
    pub strict_resolver: bool,
    /// Stop at the first file that produces issues.
    pub fail_fast: bool,
    /// Upper bound on resolving and validating a single file when running
    /// concurrently.
    pub resolver_timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            min_context: 3,
            ignore_trailing_ws: false,
            strict_resolver: false,
            fail_fast: false,
            resolver_timeout: Duration::from_secs(10),
        }
    }
}

/// Path filter matching on file-extension suffixes. An empty set matches
/// every path.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter {
    extensions: BTreeSet<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn matches(&self, patch: &FilePatch) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        patch
            .extension()
            .is_some_and(|e| self.extensions.contains(&e.to_ascii_lowercase()))
    }
}

/// Validate a patch set sequentially.
pub fn run_policy(
    patchset: &PatchSet,
    filter: &ExtensionFilter,
    resolver: &dyn BaseResolver,
    opts: &RunnerOptions,
) -> Result<ValidationReport, Error> {
    let mut issues = Vec::new();
    for patch in patchset.files.iter().filter(|p| filter.matches(p)) {
        let file_issues = validate_file(patch, resolver, opts)?;
        let failed = !file_issues.is_empty();
        issues.extend(file_issues);
        if failed && opts.fail_fast {
            warn!(path = %patch.path, "stopping at first failing file");
            break;
        }
    }
    Ok(ValidationReport::new(issues))
}

/// Validate a patch set with one worker task per file.
///
/// Files are independent: each task reads only its own `FilePatch` plus the
/// shared read-only resolver. Aggregated issues are sorted afterwards, so
/// the report is identical to the sequential one regardless of completion
/// order. Each file is bounded by `resolver_timeout`; a timeout surfaces as
/// that file's resolver-failure issue.
pub async fn run_policy_concurrent(
    patchset: &PatchSet,
    filter: &ExtensionFilter,
    resolver: Arc<dyn BaseResolver>,
    opts: &RunnerOptions,
) -> Result<ValidationReport, Error> {
    // fail_fast needs a defined "first", which only sequential order gives.
    if opts.fail_fast {
        return run_policy(patchset, filter, resolver.as_ref(), opts);
    }

    let mut set: JoinSet<Result<Vec<ValidationIssue>, Error>> = JoinSet::new();
    for patch in patchset.files.iter().filter(|p| filter.matches(p)).cloned() {
        let resolver = Arc::clone(&resolver);
        let opts = opts.clone();
        set.spawn(async move {
            let path = patch.path.clone();
            let strict = opts.strict_resolver;
            let timeout = opts.resolver_timeout;
            let handle =
                tokio::task::spawn_blocking(move || validate_file(&patch, resolver.as_ref(), &opts));
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(Error::Resolver(format!(
                    "validation task for {path} failed: {join_err}"
                ))),
                Err(_) if strict => Err(Error::Resolver(format!(
                    "base content resolution for {path} timed out after {}s",
                    timeout.as_secs()
                ))),
                Err(_) => Ok(vec![ValidationIssue::new(
                    path,
                    0,
                    IssueKind::ApplyConflict,
                    format!(
                        "base content resolution timed out after {}s",
                        timeout.as_secs()
                    ),
                )]),
            }
        });
    }

    let mut issues = Vec::new();
    while let Some(joined) = set.join_next().await {
        let result =
            joined.map_err(|e| Error::Resolver(format!("validation task panicked: {e}")))?;
        issues.extend(result?);
    }
    Ok(ValidationReport::new(issues))
}

/// Run both validators for one file.
fn validate_file(
    patch: &FilePatch,
    resolver: &dyn BaseResolver,
    opts: &RunnerOptions,
) -> Result<Vec<ValidationIssue>, Error> {
    debug!(
        path = %patch.path,
        kind = %patch.change_kind,
        hunks = patch.hunks.len(),
        "validating file"
    );

    let mut issues = Vec::new();
    let base = match resolver.resolve(patch.base_path()) {
        Ok(base) => base,
        Err(e) if opts.strict_resolver => return Err(e),
        Err(e) => {
            issues.push(ValidationIssue::new(
                &patch.path,
                0,
                IssueKind::ApplyConflict,
                format!("base content unavailable: {e}"),
            ));
            return Ok(issues);
        }
    };

    let base_line_count = base.as_deref().map(|c| c.lines().count() as u32);

    // Added files carry no context by construction; the apply check covers
    // their creation semantics instead.
    if patch.change_kind != ChangeKind::Added {
        for (idx, hunk) in patch.hunks.iter().enumerate() {
            issues.extend(context::check_hunk(
                &patch.path,
                hunk,
                idx,
                opts.min_context,
                base_line_count,
            ));
        }
    }

    issues.extend(apply::check_file(
        patch,
        base.as_deref(),
        opts.ignore_trailing_ws,
    ));
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse;
    use std::collections::BTreeMap;

    /// In-memory resolver for tests. A value of `None` simulates a resolver
    /// failure for that path.
    struct MapResolver {
        files: BTreeMap<String, Option<String>>,
    }

    impl MapResolver {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                files: entries
                    .iter()
                    .map(|(p, c)| (p.to_string(), Some(c.to_string())))
                    .collect(),
            }
        }

        fn failing(mut self, path: &str) -> Self {
            self.files.insert(path.to_string(), None);
            self
        }
    }

    impl BaseResolver for MapResolver {
        fn resolve(&self, path: &str) -> Result<Option<String>, Error> {
            match self.files.get(path) {
                Some(Some(content)) => Ok(Some(content.clone())),
                Some(None) => Err(Error::Resolver(format!("injected failure for {path}"))),
                None => Ok(None),
            }
        }

        fn describe(&self) -> String {
            "test map".to_string()
        }
    }

    const TEN_LINES: &str = "\
line 1
line 2
line 3
line 4
line 5
line 6
line 7
line 8
line 9
line 10
";

    const CLEAN_DIFF: &str = "\
--- a/app.py
+++ b/app.py
@@ -4,7 +4,8 @@
 line 4
 line 5
 line 6
+inserted
 line 7
 line 8
 line 9
 line 10
";

    #[test]
    fn test_clean_run_passes() {
        let patchset = parse(CLEAN_DIFF).unwrap();
        let resolver = MapResolver::new(&[("app.py", TEN_LINES)]);
        let report = run_policy(
            &patchset,
            &ExtensionFilter::match_all(),
            &resolver,
            &RunnerOptions::default(),
        )
        .unwrap();
        assert!(report.passed);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_filtered_extension_is_skipped() {
        // A conflicting .txt file must leave no trace when the filter only
        // admits py and json.
        let diff = "\
--- a/notes.txt
+++ b/notes.txt
@@ -1,2 +1,2 @@
-completely wrong
+something else
 also wrong
";
        let patchset = parse(diff).unwrap();
        let resolver = MapResolver::new(&[("notes.txt", "other\ncontent\n")]);
        let filter = ExtensionFilter::new(["py", "json"]);
        let report =
            run_policy(&patchset, &filter, &resolver, &RunnerOptions::default()).unwrap();
        assert!(report.passed);
    }

    #[test]
    fn test_extension_filter_matching() {
        let patchset = parse(CLEAN_DIFF).unwrap();
        let patch = &patchset.files[0];
        assert!(ExtensionFilter::match_all().matches(patch));
        assert!(ExtensionFilter::new(["py"]).matches(patch));
        assert!(ExtensionFilter::new([".py"]).matches(patch));
        assert!(!ExtensionFilter::new(["json"]).matches(patch));
    }

    #[test]
    fn test_issues_collected_across_files() {
        let diff = "\
--- a/b.py
+++ b/b.py
@@ -1,2 +1,2 @@
-mismatch
+x
 line 2
--- a/a.py
+++ b/a.py
@@ -2,2 +2,2 @@
-also wrong
+y
 line 3
";
        let patchset = parse(diff).unwrap();
        let resolver =
            MapResolver::new(&[("a.py", TEN_LINES), ("b.py", TEN_LINES)]);
        let report = run_policy(
            &patchset,
            &ExtensionFilter::match_all(),
            &resolver,
            &RunnerOptions::default(),
        )
        .unwrap();

        assert!(!report.passed);
        // Sorted by path even though b.py came first in the diff. a.py also
        // picks up an insufficient-context issue for its short hunk.
        assert_eq!(report.issues.first().unwrap().path, "a.py");
        assert!(report.issues.iter().any(|i| i.path == "b.py"));
    }

    #[test]
    fn test_resolver_failure_becomes_issue() {
        let diff = "\
--- a/a.py
+++ b/a.py
@@ -1,2 +1,2 @@
-line 1
+x
 line 2
";
        let patchset = parse(diff).unwrap();
        let resolver = MapResolver::new(&[]).failing("a.py");
        let report = run_policy(
            &patchset,
            &ExtensionFilter::match_all(),
            &resolver,
            &RunnerOptions::default(),
        )
        .unwrap();
        assert!(!report.passed);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::ApplyConflict);
        assert!(report.issues[0].message.contains("base content unavailable"));
    }

    #[test]
    fn test_strict_resolver_failure_is_fatal() {
        let diff = "\
--- a/a.py
+++ b/a.py
@@ -1,2 +1,2 @@
-line 1
+x
 line 2
";
        let patchset = parse(diff).unwrap();
        let resolver = MapResolver::new(&[]).failing("a.py");
        let opts = RunnerOptions {
            strict_resolver: true,
            ..Default::default()
        };
        let result = run_policy(&patchset, &ExtensionFilter::match_all(), &resolver, &opts);
        assert!(matches!(result, Err(Error::Resolver(_))));
    }

    #[test]
    fn test_fail_fast_stops_after_first_failing_file() {
        let diff = "\
--- a/a.py
+++ b/a.py
@@ -1,2 +1,2 @@
-wrong
+x
 line 2
--- a/b.py
+++ b/b.py
@@ -1,2 +1,2 @@
-also wrong
+y
 line 2
";
        let patchset = parse(diff).unwrap();
        let resolver =
            MapResolver::new(&[("a.py", TEN_LINES), ("b.py", TEN_LINES)]);
        let opts = RunnerOptions {
            fail_fast: true,
            ..Default::default()
        };
        let report =
            run_policy(&patchset, &ExtensionFilter::match_all(), &resolver, &opts).unwrap();
        assert!(report.issues.iter().all(|i| i.path == "a.py"));
    }

    #[test]
    fn test_run_is_idempotent() {
        let patchset = parse(CLEAN_DIFF).unwrap();
        let resolver = MapResolver::new(&[("app.py", TEN_LINES)]);
        let opts = RunnerOptions::default();
        let filter = ExtensionFilter::match_all();

        let first = run_policy(&patchset, &filter, &resolver, &opts)
            .unwrap()
            .to_json()
            .unwrap();
        let second = run_policy(&patchset, &filter, &resolver, &opts)
            .unwrap()
            .to_json()
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let diff = "\
--- a/b.py
+++ b/b.py
@@ -1,2 +1,2 @@
-mismatch
+x
 line 2
--- a/a.py
+++ b/a.py
@@ -2,2 +2,2 @@
-also wrong
+y
 line 3
--- a/c.py
+++ b/c.py
@@ -4,4 +4,5 @@
 line 4
 line 5
 line 6
+inserted
 line 7
";
        let patchset = parse(diff).unwrap();
        let entries = [
            ("a.py", TEN_LINES),
            ("b.py", TEN_LINES),
            ("c.py", TEN_LINES),
        ];
        let opts = RunnerOptions::default();
        let filter = ExtensionFilter::match_all();

        let sequential = run_policy(
            &patchset,
            &filter,
            &MapResolver::new(&entries),
            &opts,
        )
        .unwrap();
        let concurrent = run_policy_concurrent(
            &patchset,
            &filter,
            Arc::new(MapResolver::new(&entries)),
            &opts,
        )
        .await
        .unwrap();

        assert_eq!(sequential, concurrent);
        assert_eq!(
            sequential.to_json().unwrap(),
            concurrent.to_json().unwrap()
        );
    }
}
