// Benchmark comparison core
//
// Raw JSON for a base run and a changed run flows through:
//
//   parse_run (x2) -> relabel -> pair -> render
//
// All of it is synchronous and pure. Obtaining the JSON, git checkouts and
// publishing the report live in `workflow` and `github`.

mod comparator;
mod error;
mod measurement;
mod parser;
mod report;

pub use comparator::{
    is_significant, pair, percent_difference, BenchmarkComparison, PairedRuns,
};
pub use error::{CompareError, ParseError, RenderError};
pub use measurement::{
    nanoseconds_per, BenchmarkResult, ChangeSummary, ChangeVerdict, MeasurementStats, StatKind,
    CHANGED_BASELINE, UNKNOWN_BASELINE,
};
pub use parser::{parse_run, relabel, RunResults, BENCHMARK_COMPLETE};
pub use report::{
    convert_duration, display_units, format_measurement, render, short_sha, ReportColumn,
    BOLD_CHANGED_ABOVE_PCT, SHORT_SHA_LEN,
};

/// Errors from the end-to-end comparison pipeline
#[derive(thiserror::Error, Debug)]
pub enum ComparisonError {
    #[error("Failed to parse {run} benchmark results")]
    Parse {
        run: &'static str,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Parse both runs, pair them and render the markdown report
///
/// The base run is relabeled with `base_label` and the changed run with
/// [`CHANGED_BASELINE`] before pairing.
///
/// # Example
/// ```
/// use benchcmp::comparison::compare_runs;
///
/// let base = r#"{"benchmarks": {"fib": {"criterion_estimates_v1": {
///     "mean": {"point_estimate": 100.0}, "median": {"point_estimate": 100.0},
///     "std_dev": {"point_estimate": 5.0}}}}}"#;
/// let changed = r#"{"benchmarks": {"fib": {"criterion_estimates_v1": {
///     "mean": {"point_estimate": 120.0}, "median": {"point_estimate": 120.0},
///     "std_dev": {"point_estimate": 5.0}}}}}"#;
///
/// let report = compare_runs(base, changed, "main", "0123456789abcdef").unwrap();
/// assert!(report.contains("Benchmark for 0123456"));
/// assert!(report.contains("| fib |"));
/// ```
pub fn compare_runs(
    base_json: &str,
    changed_json: &str,
    base_label: &str,
    commit: &str,
) -> Result<String, ComparisonError> {
    let mut base = parse_run(base_json).map_err(|source| ComparisonError::Parse {
        run: "base",
        source,
    })?;
    let mut changed = parse_run(changed_json).map_err(|source| ComparisonError::Parse {
        run: "changed",
        source,
    })?;

    relabel(&mut base, base_label);
    relabel(&mut changed, CHANGED_BASELINE);

    tracing::info!(
        "Comparing {} base benchmarks against {} changed benchmarks",
        base.len(),
        changed.len()
    );

    let paired = pair(base, changed);
    Ok(render(&paired, base_label, commit)?)
}
