//! Benchmark workflow: produces the two raw JSON exports and compares them
//!
//! The changed run is benchmarked on the current checkout, then the base branch
//! is checked out and benchmarked, and the original commit is restored.

use crate::comparison::compare_runs;
use crate::config::{CompareConfig, Harness};
use crate::runner::{current_commit, run_checked, CommandRunner};
use anyhow::{Context, Result};
use std::path::Path;

pub use crate::comparison::CHANGED_BASELINE;

/// Raw exports of both runs plus the commit the changes were benchmarked at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPair {
    pub base_json: String,
    pub changed_json: String,
    pub commit: String,
}

/// Drives cargo, git and critcmp through a [`CommandRunner`]
pub struct BenchmarkWorkflow<'a, R: CommandRunner + ?Sized> {
    config: &'a CompareConfig,
    runner: &'a R,
}

impl<'a, R: CommandRunner + ?Sized> BenchmarkWorkflow<'a, R> {
    pub fn new(config: &'a CompareConfig, runner: &'a R) -> Self {
        Self { config, runner }
    }

    fn cwd(&self) -> &Path {
        &self.config.working_directory
    }

    /// Benchmark the current checkout and the base branch
    pub fn collect(&self) -> Result<RunPair> {
        let commit = current_commit(self.runner, self.cwd())
            .context("Failed to determine the current commit")?;
        tracing::info!("Benchmarking changes at {}", commit);

        let changed_json = self
            .run_benchmarks(CHANGED_BASELINE)
            .context("Benchmarking the changes failed")?;

        let base_ref = self.base_ref()?;
        run_checked(self.runner, "git", &["checkout", &base_ref], self.cwd())
            .with_context(|| format!("Failed to check out {}", self.config.base_branch))?;
        tracing::info!("Benchmarking base {}", self.config.base_branch);

        let base_json = self.run_benchmarks(&baseline_name(&self.config.base_branch));

        // Restore the original checkout even when the base run failed.
        let restored = run_checked(self.runner, "git", &["checkout", &commit], self.cwd())
            .with_context(|| format!("Failed to restore checkout of {}", commit));

        let base_json = base_json
            .with_context(|| format!("Benchmarking {} failed", self.config.base_branch))?;
        restored?;

        Ok(RunPair {
            base_json,
            changed_json,
            commit,
        })
    }

    /// Parse, pair and render a collected run pair
    pub fn report(&self, runs: &RunPair) -> Result<String> {
        run_comparison(
            &runs.base_json,
            &runs.changed_json,
            &self.config.base_branch,
            &runs.commit,
        )
    }

    /// Ref to check out for the base run, fetching it first when configured
    fn base_ref(&self) -> Result<String> {
        if !self.config.fetch {
            return Ok(self.config.base_branch.clone());
        }

        run_checked(
            self.runner,
            "git",
            &["fetch", "origin", &self.config.base_branch],
            self.cwd(),
        )
        .with_context(|| format!("Failed to fetch {}", self.config.base_branch))?;
        Ok("FETCH_HEAD".to_string())
    }

    /// Run the benchmarks once and return the export for `baseline`
    fn run_benchmarks(&self, baseline: &str) -> Result<String> {
        if self.config.clean {
            run_checked(self.runner, "cargo", &["clean"], self.cwd())?;
        }

        match self.config.harness {
            Harness::Critcmp => {
                let mut args = vec!["bench"];
                args.extend(self.target_args());
                args.extend(["--", "--save-baseline", baseline]);
                run_checked(self.runner, "cargo", &args, self.cwd())?;

                run_checked(self.runner, "critcmp", &["--export", baseline], self.cwd())
            }
            Harness::CargoCriterion => {
                let mut args = vec!["criterion", "--message-format=json"];
                args.extend(self.target_args());
                run_checked(self.runner, "cargo", &args, self.cwd())
            }
        }
    }

    fn target_args(&self) -> Vec<&str> {
        let mut args = Vec::new();
        if let Some(benchmark) = &self.config.benchmark {
            args.extend(["--bench", benchmark.as_str()]);
        }
        if let Some(features) = &self.config.features {
            args.extend(["--features", features.as_str()]);
        }
        args
    }
}

/// Criterion baseline name for a branch; path separators are not allowed
pub fn baseline_name(branch: &str) -> String {
    branch.replace(['/', '\\'], "-")
}

/// Parse both exports, pair them and render the markdown report
pub fn run_comparison(
    base_json: &str,
    changed_json: &str,
    base_label: &str,
    commit: &str,
) -> Result<String> {
    compare_runs(base_json, changed_json, base_label, commit)
        .with_context(|| format!("Failed to compare benchmarks against {}", base_label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::path::PathBuf;

    /// Replays canned outputs in order and records every invocation
    struct ScriptedRunner {
        outputs: RefCell<VecDeque<CommandOutput>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedRunner {
        fn new(outputs: Vec<(i32, &str)>) -> Self {
            Self {
                outputs: RefCell::new(
                    outputs
                        .into_iter()
                        .map(|(exit_code, stdout)| CommandOutput {
                            exit_code,
                            stdout: stdout.to_string(),
                            stderr: if exit_code == 0 {
                                String::new()
                            } else {
                                "boom".to_string()
                            },
                        })
                        .collect(),
                ),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, program: &str, args: &[&str], _cwd: &Path) -> Result<CommandOutput> {
            self.calls
                .borrow_mut()
                .push(format!("{} {}", program, args.join(" ")));
            self.outputs
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("unexpected call to {}", program))
        }
    }

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn export(mean: f64) -> String {
        format!(
            r#"{{"benchmarks": {{"fib": {{"criterion_estimates_v1": {{
                "mean": {{"point_estimate": {mean:?}}},
                "median": {{"point_estimate": {mean:?}}},
                "std_dev": {{"point_estimate": 2.0}}}}}}}}}}"#
        )
    }

    fn config(harness: Harness) -> CompareConfig {
        CompareConfig {
            benchmark: Some("fib".to_string()),
            base_branch: "main".to_string(),
            working_directory: PathBuf::from("."),
            fetch: true,
            clean: false,
            post_comment: false,
            harness,
            features: None,
        }
    }

    #[test]
    fn test_collect_critcmp_sequence() {
        let changed = export(80.0);
        let base = export(100.0);
        let runner = ScriptedRunner::new(vec![
            (0, SHA),
            (0, ""),
            (0, changed.as_str()),
            (0, ""),
            (0, ""),
            (0, ""),
            (0, base.as_str()),
            (0, ""),
        ]);
        let config = config(Harness::Critcmp);

        let runs = BenchmarkWorkflow::new(&config, &runner).collect().unwrap();

        assert_eq!(runs.commit, SHA);
        assert_eq!(runs.changed_json, changed);
        assert_eq!(runs.base_json, base);
        assert_eq!(
            runner.calls(),
            vec![
                "git rev-parse HEAD".to_string(),
                "cargo bench --bench fib -- --save-baseline changes".to_string(),
                "critcmp --export changes".to_string(),
                "git fetch origin main".to_string(),
                "git checkout FETCH_HEAD".to_string(),
                "cargo bench --bench fib -- --save-baseline main".to_string(),
                "critcmp --export main".to_string(),
                format!("git checkout {}", SHA),
            ]
        );
    }

    #[test]
    fn test_collect_cargo_criterion_without_fetch_with_clean() {
        let runner = ScriptedRunner::new(vec![
            (0, SHA),
            (0, ""),
            (0, "{}"),
            (0, ""),
            (0, ""),
            (0, "{}"),
            (0, ""),
        ]);
        let mut config = config(Harness::CargoCriterion);
        config.fetch = false;
        config.clean = true;
        config.benchmark = None;
        config.features = Some("simd".to_string());

        BenchmarkWorkflow::new(&config, &runner).collect().unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "git rev-parse HEAD".to_string(),
                "cargo clean".to_string(),
                "cargo criterion --message-format=json --features simd".to_string(),
                "git checkout main".to_string(),
                "cargo clean".to_string(),
                "cargo criterion --message-format=json --features simd".to_string(),
                format!("git checkout {}", SHA),
            ]
        );
    }

    #[test]
    fn test_collect_restores_checkout_when_base_run_fails() {
        let runner = ScriptedRunner::new(vec![
            (0, SHA),
            (0, ""),
            (0, "{}"),
            (0, ""),
            (0, ""),
            (101, ""),
            (0, ""),
        ]);
        let config = config(Harness::Critcmp);

        let err = BenchmarkWorkflow::new(&config, &runner)
            .collect()
            .unwrap_err();

        assert!(format!("{:#}", err).contains("Benchmarking main failed"));
        assert_eq!(
            runner.calls().last().unwrap(),
            &format!("git checkout {}", SHA)
        );
    }

    #[test]
    fn test_collect_fails_when_changes_do_not_build() {
        let runner = ScriptedRunner::new(vec![(0, SHA), (101, "")]);
        let config = config(Harness::Critcmp);

        let err = BenchmarkWorkflow::new(&config, &runner)
            .collect()
            .unwrap_err();

        assert!(format!("{:#}", err).contains("Benchmarking the changes failed"));
        // Never touched the checkout
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_report_from_collected_runs() {
        let runner = ScriptedRunner::new(vec![]);
        let config = config(Harness::Critcmp);
        let runs = RunPair {
            base_json: export(100.0),
            changed_json: export(80.0),
            commit: SHA.to_string(),
        };

        let report = BenchmarkWorkflow::new(&config, &runner)
            .report(&runs)
            .unwrap();

        assert!(report.contains("Benchmark for 0123456"));
        assert!(report.contains("| fib | 80.00 ± 2.00 ns | **100.00 ± 2.00 ns** | -20% |"));
    }

    #[test]
    fn test_run_comparison_reports_parse_failure() {
        let err = run_comparison("not json", &export(1.0), "main", SHA).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to compare benchmarks against main"));
        assert!(message.contains("Failed to parse base benchmark results"));
        assert!(message.contains("Malformed benchmark JSON"));
    }

    #[test]
    fn test_baseline_name() {
        assert_eq!(baseline_name("main"), "main");
        assert_eq!(baseline_name("release/1.2"), "release-1.2");
    }
}
