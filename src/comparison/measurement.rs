// Measurement model: one statistical estimate and one named benchmark record
//
// Values are always stored in nanoseconds. Unit scaling for display happens
// in the report renderer only.

use serde_json::{Map, Value};
use std::fmt;

/// Default baseline label when an export does not carry one
pub const UNKNOWN_BASELINE: &str = "unknown";

/// Baseline label given to the changed run
pub const CHANGED_BASELINE: &str = "changes";

/// Values below this many nanoseconds usually mean an upstream unit or schema bug
const IMPLAUSIBLE_NS: f64 = 1.0;

/// Which statistic a [`MeasurementStats`] estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Mean,
    Median,
    StdDev,
}

impl StatKind {
    /// Key used for this statistic in criterion exports
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKind::Mean => "mean",
            StatKind::Median => "median",
            StatKind::StdDev => "std_dev",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One statistical estimate with its confidence interval
///
/// When the source omits the confidence interval the interval collapses onto the
/// point estimate (`lower_bound == upper_bound == point_estimate`) with a
/// confidence level of zero, so callers never special-case missing intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementStats {
    pub kind: StatKind,
    /// Point estimate in nanoseconds
    pub point_estimate: f64,
    pub standard_error: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Confidence level in `[0, 1)`; zero when unknown
    pub confidence_level: f64,
}

impl MeasurementStats {
    /// Build an estimate from a critcmp/criterion `estimates.json` fragment
    ///
    /// Expected shape:
    /// ```json
    /// { "point_estimate": 1.0, "standard_error": 0.1,
    ///   "confidence_interval": { "lower_bound": 0.9, "upper_bound": 1.1, "confidence_level": 0.95 } }
    /// ```
    ///
    /// A non-numeric `point_estimate` is logged and treated as zero rather than
    /// aborting, to tolerate minor schema drift.
    pub fn from_record(kind: StatKind, body: &Map<String, Value>) -> Self {
        let point_estimate = match body.get("point_estimate").and_then(Value::as_f64) {
            Some(value) => value,
            None => {
                tracing::warn!(
                    "{} estimate has no numeric point_estimate (got {:?}), using 0.0",
                    kind,
                    body.get("point_estimate")
                );
                0.0
            }
        };

        let standard_error = match body.get("standard_error").and_then(Value::as_f64) {
            Some(value) => {
                warn_if_implausible(kind, "standard_error", value);
                value
            }
            None => {
                tracing::debug!("{} estimate has no standard_error, using 0.0", kind);
                0.0
            }
        };

        warn_if_implausible(kind, "point_estimate", point_estimate);

        let interval = body.get("confidence_interval").and_then(Value::as_object);
        let (lower_bound, upper_bound, confidence_level) =
            read_interval(kind, interval, point_estimate);

        Self {
            kind,
            point_estimate,
            standard_error,
            lower_bound,
            upper_bound,
            confidence_level,
        }
    }

    /// Build an estimate from a `cargo criterion --message-format=json` fragment
    ///
    /// Expected shape: `{ "estimate": 1.0, "lower_bound": 0.9, "upper_bound": 1.1, "unit": "ns" }`.
    /// Values are converted to nanoseconds from `unit`; an unrecognized unit is
    /// logged and the values are taken as nanoseconds.
    pub fn from_stream_record(kind: StatKind, body: &Map<String, Value>) -> Self {
        let scale = match body.get("unit").and_then(Value::as_str) {
            Some(unit) => nanoseconds_per(unit).unwrap_or_else(|| {
                tracing::warn!("{} estimate has unknown unit '{}', assuming ns", kind, unit);
                1.0
            }),
            None => 1.0,
        };

        let point_estimate = match body.get("estimate").and_then(Value::as_f64) {
            Some(value) => value * scale,
            None => {
                tracing::warn!(
                    "{} estimate has no numeric estimate (got {:?}), using 0.0",
                    kind,
                    body.get("estimate")
                );
                0.0
            }
        };
        warn_if_implausible(kind, "estimate", point_estimate);

        let lower = body.get("lower_bound").and_then(Value::as_f64);
        let upper = body.get("upper_bound").and_then(Value::as_f64);
        let (lower_bound, upper_bound) = match (lower, upper) {
            (Some(lower), Some(upper)) => (lower * scale, upper * scale),
            _ => {
                tracing::debug!("{} estimate has no interval bounds", kind);
                (point_estimate, point_estimate)
            }
        };

        Self {
            kind,
            point_estimate,
            standard_error: 0.0,
            lower_bound,
            upper_bound,
            // Streaming messages never state the level.
            confidence_level: 0.0,
        }
    }

    /// Whether the source carried a real confidence interval
    pub fn has_interval(&self) -> bool {
        self.confidence_level > 0.0
    }
}

fn read_interval(
    kind: StatKind,
    interval: Option<&Map<String, Value>>,
    point_estimate: f64,
) -> (f64, f64, f64) {
    let Some(interval) = interval else {
        tracing::debug!("{} estimate has no confidence_interval", kind);
        return (point_estimate, point_estimate, 0.0);
    };

    let bound = |key: &str| {
        interval.get(key).and_then(Value::as_f64).unwrap_or_else(|| {
            tracing::debug!("{} confidence_interval has no {}", kind, key);
            point_estimate
        })
    };
    let lower_bound = bound("lower_bound");
    let upper_bound = bound("upper_bound");
    let confidence_level = interval
        .get("confidence_level")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    (lower_bound, upper_bound, confidence_level)
}

fn warn_if_implausible(kind: StatKind, field: &str, value: f64) {
    if value.abs() < IMPLAUSIBLE_NS {
        tracing::warn!(
            "{} {} is {} ns, which is implausibly small; check the export's units",
            kind,
            field,
            value
        );
    }
}

/// Nanoseconds per unit for time units criterion emits
pub fn nanoseconds_per(unit: &str) -> Option<f64> {
    match unit {
        "ns" => Some(1.0),
        "us" | "µs" | "μs" => Some(1e3),
        "ms" => Some(1e6),
        "s" => Some(1e9),
        _ => None,
    }
}

/// Change classification reported by cargo-criterion against its own history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeVerdict {
    NoChange,
    Improved,
    Regressed,
    /// Classification string not known to this crate, preserved verbatim
    Other(String),
}

impl ChangeVerdict {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "NoChange" => ChangeVerdict::NoChange,
            "Improved" => ChangeVerdict::Improved,
            "Regressed" => ChangeVerdict::Regressed,
            other => ChangeVerdict::Other(other.to_string()),
        }
    }
}

/// Percent-change estimates attached to a streaming completion message
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSummary {
    /// Estimated percent change of the mean
    pub mean_pct: Option<f64>,
    /// Estimated percent change of the median
    pub median_pct: Option<f64>,
    pub verdict: Option<ChangeVerdict>,
}

impl ChangeSummary {
    pub fn from_record(body: &Map<String, Value>) -> Self {
        let estimate = |key: &str| {
            body.get(key)
                .and_then(Value::as_object)
                .and_then(|est| est.get("estimate"))
                .and_then(Value::as_f64)
        };

        Self {
            mean_pct: estimate("mean"),
            median_pct: estimate("median"),
            verdict: body
                .get("change")
                .and_then(Value::as_str)
                .map(ChangeVerdict::parse),
        }
    }
}

/// One named benchmark's estimates from a single run
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    /// Benchmark id; the join key between runs
    pub name: String,
    /// Baseline label this result was saved under
    pub baseline: String,
    pub mean: MeasurementStats,
    pub median: MeasurementStats,
    pub std_dev: MeasurementStats,
    /// Only present for streaming exports that compared against history
    pub change: Option<ChangeSummary>,
}

impl BenchmarkResult {
    /// Mean point estimate in nanoseconds
    pub fn mean_ns(&self) -> f64 {
        self.mean.point_estimate
    }

    /// Standard-deviation point estimate in nanoseconds
    pub fn std_dev_ns(&self) -> f64 {
        self.std_dev.point_estimate
    }
}
