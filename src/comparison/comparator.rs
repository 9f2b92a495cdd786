// Comparator: pairs base and changed records by name and applies the
// error-bar separation heuristic
//
// The heuristic is deliberately asymmetric and is not a hypothesis test:
//
//   delta faster (m_delta < m_base):
//     significant <=> m_delta + e_delta < m_base  OR  m_base - e_base > m_delta
//   otherwise:
//     significant <=> m_delta - e_delta > m_base  OR  m_base + e_base < m_delta
//
// where m is the mean point estimate and e the std_dev point estimate.

use crate::comparison::error::CompareError;
use crate::comparison::measurement::BenchmarkResult;
use crate::comparison::parser::RunResults;

/// A base/changed pair for one benchmark name
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkComparison {
    pub name: String,
    pub bench_base: BenchmarkResult,
    pub bench_delta: BenchmarkResult,
    pub is_significant: bool,
    /// Percent change of the changed mean over the base mean; `None` when the
    /// base mean is zero and the ratio is undefined
    pub pct_diff: Option<f64>,
}

impl BenchmarkComparison {
    /// Pair two records of the same benchmark
    ///
    /// Fails with [`CompareError::NameMismatch`] if the records name different
    /// benchmarks. An undefined percent difference does not fail construction;
    /// it is logged and stored as `None`.
    pub fn new(base: BenchmarkResult, delta: BenchmarkResult) -> Result<Self, CompareError> {
        if base.name != delta.name {
            return Err(CompareError::NameMismatch {
                base: base.name,
                delta: delta.name,
            });
        }

        let is_significant = is_significant(
            base.mean_ns(),
            base.std_dev_ns(),
            delta.mean_ns(),
            delta.std_dev_ns(),
        );

        let pct_diff = match percent_difference(&base.name, base.mean_ns(), delta.mean_ns()) {
            Ok(pct) => Some(pct),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        };

        Ok(Self {
            name: base.name.clone(),
            bench_base: base,
            bench_delta: delta,
            is_significant,
            pct_diff,
        })
    }

    /// Percent difference, or [`CompareError::UndefinedRatio`] when the base mean is zero
    pub fn percent_diff(&self) -> Result<f64, CompareError> {
        self.pct_diff.ok_or_else(|| CompareError::UndefinedRatio {
            name: self.name.clone(),
        })
    }
}

/// Error-bar separation test between a base and a changed measurement
///
/// # Example
/// ```
/// use benchcmp::comparison::is_significant;
///
/// // 100 + 5 < 120: the error bars do not overlap
/// assert!(is_significant(100.0, 5.0, 120.0, 5.0));
/// assert!(!is_significant(100.0, 5.0, 100.0, 5.0));
/// ```
pub fn is_significant(m_base: f64, e_base: f64, m_delta: f64, e_delta: f64) -> bool {
    if m_delta < m_base {
        m_delta + e_delta < m_base || m_base - e_base > m_delta
    } else {
        m_delta - e_delta > m_base || m_base + e_base < m_delta
    }
}

/// `100 * (m_delta - m_base) / m_base`, refusing to divide by a zero base mean
pub fn percent_difference(name: &str, m_base: f64, m_delta: f64) -> Result<f64, CompareError> {
    let undefined = || CompareError::UndefinedRatio {
        name: name.to_string(),
    };

    if m_base == 0.0 {
        return Err(undefined());
    }

    let pct = 100.0 * (m_delta - m_base) / m_base;
    if pct.is_finite() {
        Ok(pct)
    } else {
        Err(undefined())
    }
}

/// Output of [`pair`]: compared benchmarks plus names present in only one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairedRuns {
    /// One entry per name present in both runs, ordered by name
    pub comparisons: Vec<BenchmarkComparison>,
    /// Names only present in the base run, sorted
    pub base_only: Vec<String>,
    /// Names only present in the changed run, sorted
    pub delta_only: Vec<String>,
}

impl PairedRuns {
    /// Comparisons whose difference passed the significance heuristic
    pub fn significant(&self) -> impl Iterator<Item = &BenchmarkComparison> {
        self.comparisons.iter().filter(|c| c.is_significant)
    }

    /// Names of compared benchmarks with no significant difference
    pub fn insignificant_names(&self) -> Vec<&str> {
        self.comparisons
            .iter()
            .filter(|c| !c.is_significant)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Pair base and changed runs by benchmark name
///
/// Names present in both runs are compared; names present in only one run are
/// reported as orphans and never compared.
pub fn pair(base: RunResults, mut delta: RunResults) -> PairedRuns {
    let mut paired = PairedRuns::default();

    for (name, base_result) in base {
        let Some(delta_result) = delta.remove(&name) else {
            paired.base_only.push(name);
            continue;
        };

        match BenchmarkComparison::new(base_result, delta_result) {
            Ok(comparison) => paired.comparisons.push(comparison),
            Err(e) => tracing::error!("Skipping '{}': {}", name, e),
        }
    }

    paired.delta_only = delta.into_keys().collect();

    tracing::debug!(
        "Paired {} benchmarks ({} base-only, {} changed-only)",
        paired.comparisons.len(),
        paired.base_only.len(),
        paired.delta_only.len()
    );

    paired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::measurement::{MeasurementStats, StatKind};

    fn stats(kind: StatKind, value: f64) -> MeasurementStats {
        MeasurementStats {
            kind,
            point_estimate: value,
            standard_error: 0.0,
            lower_bound: value,
            upper_bound: value,
            confidence_level: 0.0,
        }
    }

    fn result(name: &str, mean: f64, std_dev: f64) -> BenchmarkResult {
        BenchmarkResult {
            name: name.to_string(),
            baseline: "test".to_string(),
            mean: stats(StatKind::Mean, mean),
            median: stats(StatKind::Median, mean),
            std_dev: stats(StatKind::StdDev, std_dev),
            change: None,
        }
    }

    fn run(entries: &[(&str, f64, f64)]) -> RunResults {
        entries
            .iter()
            .map(|&(name, mean, std_dev)| (name.to_string(), result(name, mean, std_dev)))
            .collect()
    }

    #[test]
    fn test_identical_measurements_not_significant() {
        assert!(!is_significant(100.0, 5.0, 100.0, 5.0));
        assert!(!is_significant(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_slower_delta_significant() {
        assert!(is_significant(100.0, 5.0, 120.0, 5.0));
    }

    #[test]
    fn test_faster_delta_significant() {
        // 80 + 5 < 100
        assert!(is_significant(100.0, 5.0, 80.0, 5.0));
    }

    #[test]
    fn test_overlapping_error_bars_not_significant() {
        // 100 + 15 >= 110 and 110 - 15 <= 100
        assert!(!is_significant(100.0, 15.0, 110.0, 15.0));
        assert!(!is_significant(110.0, 15.0, 100.0, 15.0));
    }

    #[test]
    fn test_asymmetric_error_bars() {
        // Delta slower with a wide delta error but a tight base error:
        // 100 + 1 < 110 even though 110 - 50 < 100
        assert!(is_significant(100.0, 1.0, 110.0, 50.0));
        // Delta faster with a wide base error but a tight delta error:
        // 90 + 1 < 100 even though 100 - 50 < 90
        assert!(is_significant(100.0, 50.0, 90.0, 1.0));
    }

    #[test]
    fn test_percent_difference() {
        assert_eq!(percent_difference("x", 100.0, 120.0).unwrap(), 20.0);
        assert_eq!(percent_difference("x", 200.0, 150.0).unwrap(), -25.0);
        assert_eq!(percent_difference("x", 50.0, 50.0).unwrap(), 0.0);
    }

    #[test]
    fn test_percent_difference_zero_base_undefined() {
        assert_eq!(
            percent_difference("zero", 0.0, 10.0),
            Err(CompareError::UndefinedRatio {
                name: "zero".to_string()
            })
        );
    }

    #[test]
    fn test_comparison_new() {
        let comparison =
            BenchmarkComparison::new(result("b", 100.0, 5.0), result("b", 120.0, 5.0)).unwrap();

        assert_eq!(comparison.name, "b");
        assert!(comparison.is_significant);
        assert_eq!(comparison.pct_diff, Some(20.0));
        assert_eq!(comparison.percent_diff().unwrap(), 20.0);
    }

    #[test]
    fn test_comparison_name_mismatch() {
        let err = BenchmarkComparison::new(result("a", 1.0, 0.0), result("b", 1.0, 0.0))
            .unwrap_err();
        assert_eq!(
            err,
            CompareError::NameMismatch {
                base: "a".to_string(),
                delta: "b".to_string()
            }
        );
    }

    #[test]
    fn test_comparison_zero_base_mean() {
        let comparison =
            BenchmarkComparison::new(result("z", 0.0, 0.0), result("z", 10.0, 1.0)).unwrap();

        assert_eq!(comparison.pct_diff, None);
        assert!(matches!(
            comparison.percent_diff(),
            Err(CompareError::UndefinedRatio { .. })
        ));
    }

    #[test]
    fn test_pair_partitions_names() {
        let base = run(&[("a", 10.0, 1.0), ("b", 10.0, 1.0)]);
        let delta = run(&[("b", 11.0, 1.0), ("c", 10.0, 1.0)]);

        let paired = pair(base, delta);

        assert_eq!(paired.comparisons.len(), 1);
        assert_eq!(paired.comparisons[0].name, "b");
        assert_eq!(paired.base_only, vec!["a".to_string()]);
        assert_eq!(paired.delta_only, vec!["c".to_string()]);
    }

    #[test]
    fn test_pair_orders_by_name() {
        let base = run(&[("zeta", 1.0, 0.1), ("alpha", 1.0, 0.1), ("mid", 1.0, 0.1)]);
        let delta = run(&[("mid", 1.0, 0.1), ("zeta", 1.0, 0.1), ("alpha", 1.0, 0.1)]);

        let names: Vec<_> = pair(base, delta)
            .comparisons
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_pair_empty_runs() {
        let paired = pair(RunResults::new(), RunResults::new());
        assert_eq!(paired, PairedRuns::default());
    }

    #[test]
    fn test_significant_and_insignificant_split() {
        let base = run(&[("fast", 100.0, 5.0), ("same", 100.0, 5.0)]);
        let delta = run(&[("fast", 50.0, 5.0), ("same", 101.0, 5.0)]);

        let paired = pair(base, delta);

        let significant: Vec<_> = paired.significant().map(|c| c.name.as_str()).collect();
        assert_eq!(significant, vec!["fast"]);
        assert_eq!(paired.insignificant_names(), vec!["same"]);
    }
}
