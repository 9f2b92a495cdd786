// Error kinds for the comparison core
//
// Fatal kinds are returned as `Err`; tolerable ones (missing standard error or
// confidence interval) never reach this module and are only logged.

use thiserror::Error;

/// Maximum number of characters of offending input echoed in error messages
const EXCERPT_CHARS: usize = 200;

/// Errors raised while turning raw JSON exports into benchmark records
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Malformed benchmark JSON ({source}): {}", excerpt(.input))]
    MalformedInput {
        /// The complete text that failed to parse
        input: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unrecognized benchmark export: {reason}")]
    UnrecognizedShape { reason: String },

    #[error("Benchmark '{benchmark}' is missing required field '{field}'")]
    MissingField { benchmark: String, field: String },
}

/// Errors raised while pairing base and changed records
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompareError {
    #[error("Cannot compare '{base}' against '{delta}': benchmark names differ")]
    NameMismatch { base: String, delta: String },

    #[error("Percent difference for '{name}' is undefined: base mean is zero")]
    UndefinedRatio { name: String },
}

/// Errors raised while rendering the markdown report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Unknown display unit: {0}")]
    UnknownDisplayUnit(String),
}

fn excerpt(input: &str) -> String {
    let mut chars = input.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
