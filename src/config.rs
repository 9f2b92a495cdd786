//! Configuration for a benchmark comparison run
//!
//! Settings come from an optional `benchcmp.toml` and are then overridden by
//! command-line flags.
//!
//! # Example benchcmp.toml
//!
//! ```toml
//! benchmark = "parser"
//! base_branch = "develop"
//! working_directory = "crates/parser"
//! fetch = true
//! clean = false
//! post_comment = true
//! harness = "critcmp"
//! ```

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Tool used to run benchmarks and export their results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Harness {
    /// `cargo bench --save-baseline` followed by `critcmp --export`
    #[default]
    Critcmp,
    /// `cargo criterion --message-format=json`
    CargoCriterion,
}

/// Settings for one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Only run this benchmark target (`cargo bench --bench NAME`)
    pub benchmark: Option<String>,

    /// Branch to compare against; also the base-run label in the report
    pub base_branch: String,

    /// Directory containing the crate to benchmark
    pub working_directory: PathBuf,

    /// Fetch the base branch from `origin` before checking it out
    pub fetch: bool,

    /// Run `cargo clean` before each benchmark run
    pub clean: bool,

    /// Post the report as a pull-request comment
    pub post_comment: bool,

    pub harness: Harness,

    /// Extra cargo features (`--features`)
    pub features: Option<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            benchmark: None,
            base_branch: "main".to_string(),
            working_directory: PathBuf::from("."),
            fetch: true,
            clean: false,
            post_comment: true,
            harness: Harness::default(),
            features: None,
        }
    }
}

impl CompareConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Load configuration from a TOML string; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_branch.trim().is_empty() {
            return Err("base_branch must not be empty".to_string());
        }

        if !self.working_directory.is_dir() {
            return Err(format!(
                "working_directory {} is not a directory",
                self.working_directory.display()
            ));
        }

        if let Some(benchmark) = &self.benchmark {
            if benchmark.trim().is_empty() {
                return Err("benchmark must not be empty when set".to_string());
            }
        }

        Ok(())
    }
}
