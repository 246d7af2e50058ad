//! Validate a diff against a base.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use crate::config::Config;
use crate::diff;
use crate::error::Error;
use crate::report::ValidationReport;
use crate::resolver::resolver_for_base;
use crate::runner::{run_policy_concurrent, ExtensionFilter};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Base to validate against: a git revision or a directory path
    #[arg(long)]
    pub base: String,

    /// Minimum context lines required on each side of a change
    #[arg(long)]
    pub min_context: Option<u32>,

    /// Comma-separated file extensions to check (overrides config)
    #[arg(long, value_delimiter = ',')]
    pub ext: Option<Vec<String>>,

    /// Compare lines with trailing whitespace stripped
    #[arg(long)]
    pub ignore_trailing_ws: bool,

    /// Treat resolver failures as fatal instead of per-file findings
    #[arg(long)]
    pub strict: bool,

    /// Stop at the first failing file
    #[arg(long)]
    pub fail_fast: bool,

    /// Emit the report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Read the diff from this file instead of stdin
    pub diff_file: Option<PathBuf>,
}

/// Run the check command. Returns the process exit code: 0 when the report
/// passed, 1 when it failed. Fatal conditions (empty input, unresolvable
/// base) surface as `Err` and exit 2 in main.
pub async fn run(args: CheckArgs) -> Result<i32, Error> {
    let cwd = std::env::current_dir()?;
    let (config, source) = Config::load(&cwd)?;
    debug!(%source, "loaded configuration");

    let mut opts = config.runner_options();
    if let Some(k) = args.min_context {
        opts.min_context = k;
    }
    if args.ignore_trailing_ws {
        opts.ignore_trailing_ws = true;
    }
    if args.strict {
        opts.strict_resolver = true;
    }
    opts.fail_fast = args.fail_fast;

    let filter = match &args.ext {
        Some(exts) => ExtensionFilter::new(exts),
        None => config.extension_filter(),
    };

    let input = read_diff(args.diff_file.as_deref())?;
    let outcome = diff::parse_lossy(&input)?;
    debug!(
        files = outcome.patchset.len(),
        parse_issues = outcome.issues.len(),
        "parsed diff"
    );

    let resolver = resolver_for_base(&args.base)?;
    let report = run_policy_concurrent(&outcome.patchset, &filter, resolver, &opts).await?;

    // Fold parse rejects into the validation findings and re-sort.
    let mut issues = outcome.issues;
    issues.extend(report.issues);
    let report = ValidationReport::new(issues);

    eprintln!("{}", report.render_summary());
    if args.json {
        println!("{}", report.to_json()?);
    }

    Ok(if report.passed { 0 } else { 1 })
}

fn read_diff(path: Option<&Path>) -> Result<String, Error> {
    let input = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if input.trim().is_empty() {
        return Err(Error::EmptyDiff);
    }
    Ok(input)
}
