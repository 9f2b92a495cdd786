// Markdown report renderer
//
// The renderer is the only place that knows about display units, bolding and
// markdown syntax. Output is a pure function of its inputs.

use crate::comparison::comparator::{BenchmarkComparison, PairedRuns};
use crate::comparison::error::RenderError;

/// Length of the abbreviated commit id shown in the report title
pub const SHORT_SHA_LEN: usize = 7;

/// The changed side is bolded only when the percent difference exceeds this value;
/// otherwise the base side is bolded. Kept pending product review of the threshold.
pub const BOLD_CHANGED_ABOVE_PCT: f64 = 100.0;

/// Label for the changed run in headers and orphan lists
const CHANGED_LABEL: &str = "Changes";

/// One column of the significance table, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportColumn {
    TestName,
    Changed,
    Base,
    Difference,
}

impl ReportColumn {
    pub const ALL: [ReportColumn; 4] = [
        ReportColumn::TestName,
        ReportColumn::Changed,
        ReportColumn::Base,
        ReportColumn::Difference,
    ];

    /// Header text; the base column is labeled with the base branch name
    pub fn label(&self, base_label: &str) -> String {
        match self {
            ReportColumn::TestName => "Test Name".to_string(),
            ReportColumn::Changed => CHANGED_LABEL.to_string(),
            ReportColumn::Base => base_label.to_string(),
            ReportColumn::Difference => "Difference".to_string(),
        }
    }

    /// Cell text for one comparison row
    pub fn cell(&self, comparison: &BenchmarkComparison) -> Result<String, RenderError> {
        match self {
            ReportColumn::TestName => Ok(escape_cell(&comparison.name)),
            ReportColumn::Changed => {
                let text = format_measurement(
                    comparison.bench_delta.mean_ns(),
                    comparison.bench_delta.std_dev_ns(),
                )?;
                Ok(emphasize(text, bold_side(comparison) == Some(Side::Changed)))
            }
            ReportColumn::Base => {
                let text = format_measurement(
                    comparison.bench_base.mean_ns(),
                    comparison.bench_base.std_dev_ns(),
                )?;
                Ok(emphasize(text, bold_side(comparison) == Some(Side::Base)))
            }
            ReportColumn::Difference => Ok(match comparison.pct_diff {
                Some(pct) => format!("{}%", pct.round() as i64),
                None => "n/a".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Base,
    Changed,
}

fn bold_side(comparison: &BenchmarkComparison) -> Option<Side> {
    if !comparison.is_significant {
        return None;
    }
    let pct = comparison.pct_diff?;
    if pct > BOLD_CHANGED_ABOVE_PCT {
        Some(Side::Changed)
    } else {
        Some(Side::Base)
    }
}

fn emphasize(text: String, bold: bool) -> String {
    if bold {
        format!("**{text}**")
    } else {
        text
    }
}

/// Display unit for a duration given in nanoseconds
///
/// # Example
/// ```
/// use benchcmp::comparison::display_units;
///
/// assert_eq!(display_units(500.0), "ns");
/// assert_eq!(display_units(1500.0), "μs");
/// assert_eq!(display_units(2_000_000.0), "ms");
/// assert_eq!(display_units(3e9), "s");
/// ```
pub fn display_units(nanos: f64) -> &'static str {
    if nanos < 1e3 {
        "ns"
    } else if nanos < 1e6 {
        "μs"
    } else if nanos < 1e9 {
        "ms"
    } else {
        "s"
    }
}

/// Convert nanoseconds into `unit`
pub fn convert_duration(nanos: f64, unit: &str) -> Result<f64, RenderError> {
    let divisor = match unit {
        "ns" => 1.0,
        "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        other => return Err(RenderError::UnknownDisplayUnit(other.to_string())),
    };
    Ok(nanos / divisor)
}

/// `"mean ± std_dev unit"`, both values scaled to the unit chosen for the mean
pub fn format_measurement(mean_ns: f64, std_dev_ns: f64) -> Result<String, RenderError> {
    let unit = display_units(mean_ns);
    let mean = convert_duration(mean_ns, unit)?;
    let std_dev = convert_duration(std_dev_ns, unit)?;
    Ok(format!("{mean:.2} ± {std_dev:.2} {unit}"))
}

/// First [`SHORT_SHA_LEN`] characters of a commit id
pub fn short_sha(commit: &str) -> &str {
    match commit.char_indices().nth(SHORT_SHA_LEN) {
        Some((idx, _)) => &commit[..idx],
        None => commit,
    }
}

/// Escape characters that would break a markdown table cell
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Render the comparison as a collapsible markdown section
///
/// Only significant comparisons become table rows. Other compared names are
/// listed together, and names present in only one run are listed per run.
pub fn render(paired: &PairedRuns, base_label: &str, commit: &str) -> Result<String, RenderError> {
    let mut report = String::new();

    report.push_str("<details>\n");
    report.push_str(&format!(
        "<summary>Benchmark for {}</summary>\n\n",
        short_sha(commit)
    ));

    let rows = paired
        .significant()
        .map(render_row)
        .collect::<Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        report.push_str("No benchmark changed significantly.\n");
    } else {
        let headers: Vec<String> = ReportColumn::ALL
            .iter()
            .map(|column| escape_cell(&column.label(base_label)))
            .collect();
        report.push_str(&format!("| {} |\n", headers.join(" | ")));
        report.push_str(&format!("|{}\n", "---|".repeat(ReportColumn::ALL.len())));
        for row in rows {
            report.push_str(&row);
            report.push('\n');
        }
    }

    let insignificant = paired.insignificant_names();
    if !insignificant.is_empty() {
        report.push_str(&format!(
            "\n**No significant difference:** {}\n",
            insignificant.join(", ")
        ));
    }

    // Orphan lists
    if !paired.base_only.is_empty() || !paired.delta_only.is_empty() {
        report.push('\n');
    }
    if !paired.base_only.is_empty() {
        report.push_str(&format!(
            "**Only in {}:** {}\n",
            base_label,
            paired.base_only.join(", ")
        ));
    }
    if !paired.delta_only.is_empty() {
        report.push_str(&format!(
            "**Only in {}:** {}\n",
            CHANGED_LABEL,
            paired.delta_only.join(", ")
        ));
    }

    report.push_str("\n</details>\n");

    Ok(report)
}

fn render_row(comparison: &BenchmarkComparison) -> Result<String, RenderError> {
    let cells = ReportColumn::ALL
        .iter()
        .map(|column| column.cell(comparison))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("| {} |", cells.join(" | ")))
}
