// Result parser for criterion benchmark exports
//
// Two shapes are auto-detected:
// - A single `critcmp --export` object keyed by benchmark name under "benchmarks"
// - A stream of `cargo criterion --message-format=json` messages, of which only
//   "benchmark-complete" messages are consumed
//
// Valid JSON in any other shape is rejected rather than read as an empty run.
// Parsing is fail-fast: the first bad record aborts the whole run.

use crate::comparison::error::ParseError;
use crate::comparison::measurement::{
    BenchmarkResult, ChangeSummary, MeasurementStats, StatKind, UNKNOWN_BASELINE,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Benchmark name → record for one run, ordered by name
pub type RunResults = BTreeMap<String, BenchmarkResult>;

/// `reason` discriminant of a finished benchmark in cargo-criterion output
pub const BENCHMARK_COMPLETE: &str = "benchmark-complete";

/// Key holding per-benchmark estimates in critcmp exports
const ESTIMATES_KEY: &str = "criterion_estimates_v1";

/// Parse one run's raw JSON export into benchmark records
///
/// # Example
/// ```
/// use benchcmp::comparison::parse_run;
///
/// let json = r#"{"benchmarks": {"fib": {"baseline": "main", "criterion_estimates_v1": {
///     "mean": {"point_estimate": 100.0},
///     "median": {"point_estimate": 99.0},
///     "std_dev": {"point_estimate": 5.0}}}}}"#;
///
/// let run = parse_run(json).unwrap();
/// assert_eq!(run["fib"].mean.point_estimate, 100.0);
/// assert_eq!(run["fib"].baseline, "main");
/// ```
pub fn parse_run(json_text: &str) -> Result<RunResults, ParseError> {
    let values = read_values(json_text)?;

    match values.as_slice() {
        // group-complete messages also carry "benchmarks"; exports never carry "reason".
        [Value::Object(root)] if root.contains_key("benchmarks") && !is_message(root) => {
            parse_export(root)
        }
        [Value::Object(root)] if is_message(root) => parse_messages(&values),
        [Value::Object(_)] => Err(ParseError::UnrecognizedShape {
            reason: "object has neither \"benchmarks\" nor \"reason\"".to_string(),
        }),
        [other] => Err(ParseError::UnrecognizedShape {
            reason: format!("top-level {} is not an object", json_type(other)),
        }),
        _ if values.iter().filter_map(Value::as_object).any(is_message) => {
            parse_messages(&values)
        }
        _ => Err(ParseError::UnrecognizedShape {
            reason: format!("none of {} stream values is a criterion message", values.len()),
        }),
    }
}

/// Overwrite the baseline label of every record in a run
pub fn relabel(results: &mut RunResults, baseline: &str) {
    for result in results.values_mut() {
        result.baseline = baseline.to_string();
    }
}

fn is_message(value: &Map<String, Value>) -> bool {
    value.contains_key("reason")
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn read_values(json_text: &str) -> Result<Vec<Value>, ParseError> {
    let malformed = |source| ParseError::MalformedInput {
        input: json_text.to_string(),
        source,
    };

    if json_text.trim().is_empty() {
        // Surface serde_json's own EOF error for empty input.
        return match serde_json::from_str::<Value>(json_text) {
            Ok(_) => Err(ParseError::UnrecognizedShape {
                reason: "empty input".to_string(),
            }),
            Err(source) => Err(malformed(source)),
        };
    }

    serde_json::Deserializer::from_str(json_text)
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(malformed)
}

fn parse_export(root: &Map<String, Value>) -> Result<RunResults, ParseError> {
    let benchmarks = root
        .get("benchmarks")
        .and_then(Value::as_object)
        .ok_or_else(|| ParseError::UnrecognizedShape {
            reason: "\"benchmarks\" is not an object".to_string(),
        })?;

    let mut results = RunResults::new();
    for (name, record) in benchmarks {
        let result = parse_export_record(name, record)?;
        results.insert(name.clone(), result);
    }

    tracing::debug!("Parsed {} benchmarks from export", results.len());
    Ok(results)
}

fn parse_export_record(name: &str, record: &Value) -> Result<BenchmarkResult, ParseError> {
    if name.is_empty() {
        return Err(missing(name, "name"));
    }

    let record = record.as_object().ok_or_else(|| missing(name, ESTIMATES_KEY))?;

    let baseline = match record.get("baseline").and_then(Value::as_str) {
        Some(label) => label.to_string(),
        None => {
            tracing::debug!("Benchmark '{}' has no baseline label", name);
            UNKNOWN_BASELINE.to_string()
        }
    };

    let estimates = record
        .get(ESTIMATES_KEY)
        .and_then(Value::as_object)
        .ok_or_else(|| missing(name, ESTIMATES_KEY))?;

    let stat = |kind: StatKind| {
        estimates
            .get(kind.as_str())
            .and_then(Value::as_object)
            .map(|body| MeasurementStats::from_record(kind, body))
            .ok_or_else(|| missing(name, kind.as_str()))
    };

    Ok(BenchmarkResult {
        name: name.to_string(),
        baseline,
        mean: stat(StatKind::Mean)?,
        median: stat(StatKind::Median)?,
        std_dev: stat(StatKind::StdDev)?,
        change: None,
    })
}

fn parse_messages(values: &[Value]) -> Result<RunResults, ParseError> {
    let mut results = RunResults::new();

    for value in values {
        let Some(message) = value.as_object() else {
            tracing::debug!("Skipping non-object stream value");
            continue;
        };

        match message.get("reason").and_then(Value::as_str) {
            Some(BENCHMARK_COMPLETE) => {}
            Some(reason) => {
                tracing::debug!("Skipping '{}' message", reason);
                continue;
            }
            None => {
                tracing::debug!("Skipping message without a reason");
                continue;
            }
        }

        let result = parse_complete_message(message)?;
        if results.contains_key(&result.name) {
            tracing::warn!(
                "Benchmark '{}' reported more than once, keeping the last report",
                result.name
            );
        }
        results.insert(result.name.clone(), result);
    }

    tracing::debug!("Parsed {} benchmarks from message stream", results.len());
    Ok(results)
}

fn parse_complete_message(message: &Map<String, Value>) -> Result<BenchmarkResult, ParseError> {
    let name = message
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| missing("<unnamed>", "id"))?;

    let stat = |kind: StatKind, key: &str| {
        message
            .get(key)
            .and_then(Value::as_object)
            .map(|body| MeasurementStats::from_stream_record(kind, body))
    };

    let mean = stat(StatKind::Mean, "mean").ok_or_else(|| missing(name, "mean"))?;
    let median = stat(StatKind::Median, "median").ok_or_else(|| missing(name, "median"))?;
    let std_dev = stat(StatKind::StdDev, "std_dev")
        .or_else(|| stat(StatKind::StdDev, "median_abs_dev"))
        .ok_or_else(|| missing(name, "std_dev"))?;

    let change = message
        .get("change")
        .and_then(Value::as_object)
        .map(ChangeSummary::from_record);

    Ok(BenchmarkResult {
        name: name.to_string(),
        baseline: UNKNOWN_BASELINE.to_string(),
        mean,
        median,
        std_dev,
        change,
    })
}

fn missing(benchmark: &str, field: &str) -> ParseError {
    ParseError::MissingField {
        benchmark: benchmark.to_string(),
        field: field.to_string(),
    }
}
