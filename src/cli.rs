//! CLI argument parsing for benchcmp

use crate::config::{CompareConfig, Harness};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "benchcmp")]
#[command(version)]
#[command(about = "Compare criterion benchmark runs and report significant changes", long_about = None)]
pub struct Cli {
    /// Enable verbose diagnostics on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two captured benchmark exports
    Compare(CompareArgs),
    /// Benchmark the current checkout against a base branch and publish the report
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Export of the base run (critcmp JSON or cargo-criterion message stream)
    #[arg(long, value_name = "FILE")]
    pub base: PathBuf,

    /// Export of the changed run
    #[arg(long, value_name = "FILE")]
    pub changed: PathBuf,

    /// Label for the base run in the report
    #[arg(long, value_name = "LABEL", default_value = "main")]
    pub base_label: String,

    /// Commit id shown in the report title
    #[arg(long, value_name = "SHA", default_value = "unknown")]
    pub commit: String,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only run this benchmark target
    #[arg(long, value_name = "NAME")]
    pub benchmark: Option<String>,

    /// Branch to compare against
    #[arg(long, value_name = "BRANCH")]
    pub base_branch: Option<String>,

    /// Directory containing the crate to benchmark
    #[arg(long = "cwd", value_name = "DIR")]
    pub working_directory: Option<PathBuf>,

    /// Do not fetch the base branch before checking it out
    #[arg(long)]
    pub no_fetch: bool,

    /// Run `cargo clean` before each benchmark run
    #[arg(long)]
    pub clean: bool,

    /// Print the report instead of commenting on the pull request
    #[arg(long)]
    pub no_comment: bool,

    /// Benchmark harness
    #[arg(long, value_enum)]
    pub harness: Option<Harness>,

    /// Cargo features to enable for the benchmarks
    #[arg(long, value_name = "FEATURES")]
    pub features: Option<String>,
}

impl RunArgs {
    /// Overlay flags given on the command line onto a loaded configuration
    pub fn apply(&self, config: &mut CompareConfig) {
        if let Some(benchmark) = &self.benchmark {
            config.benchmark = Some(benchmark.clone());
        }
        if let Some(base_branch) = &self.base_branch {
            config.base_branch = base_branch.clone();
        }
        if let Some(dir) = &self.working_directory {
            config.working_directory = dir.clone();
        }
        if self.no_fetch {
            config.fetch = false;
        }
        if self.clean {
            config.clean = true;
        }
        if self.no_comment {
            config.post_comment = false;
        }
        if let Some(harness) = self.harness {
            config.harness = harness;
        }
        if let Some(features) = &self.features {
            config.features = Some(features.clone());
        }
    }
}
