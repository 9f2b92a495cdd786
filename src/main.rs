use anyhow::{Context, Result};
use benchcmp::cli::{Cli, Commands, CompareArgs, RunArgs};
use benchcmp::config::CompareConfig;
use benchcmp::github::{self, CommentPoster, GithubCommentPoster, IssueTarget, REPORT_OUTPUT};
use benchcmp::runner::SystemRunner;
use benchcmp::workflow::{run_comparison, BenchmarkWorkflow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise RUST_LOG or warn
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Compare two captured exports
fn compare(args: CompareArgs) -> Result<()> {
    let base_json = std::fs::read_to_string(&args.base)
        .with_context(|| format!("Failed to read {}", args.base.display()))?;
    let changed_json = std::fs::read_to_string(&args.changed)
        .with_context(|| format!("Failed to read {}", args.changed.display()))?;

    let report = run_comparison(&base_json, &changed_json, &args.base_label, &args.commit)?;

    github::write_output(REPORT_OUTPUT, &report)?;

    match &args.output {
        Some(path) => std::fs::write(path, &report)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", report),
    }

    Ok(())
}

/// Benchmark both sides, render and publish
fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => CompareConfig::from_file(path)?,
        None => CompareConfig::default(),
    };
    args.apply(&mut config);
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let runner = SystemRunner;
    let workflow = BenchmarkWorkflow::new(&config, &runner);
    let runs = workflow.collect()?;
    let report = workflow.report(&runs)?;

    github::write_output(REPORT_OUTPUT, &report)?;

    if !config.post_comment {
        print!("{}", report);
        return Ok(());
    }

    let destination = IssueTarget::from_env()
        .and_then(|target| GithubCommentPoster::from_env().map(|poster| (target, poster)));
    match destination {
        Ok((target, poster)) => {
            post_report(&poster, &target, &report);
        }
        Err(e) => {
            tracing::warn!("Cannot comment on the pull request: {}", e);
            print!("{}", report);
        }
    }

    Ok(())
}

fn post_report(poster: &dyn CommentPoster, target: &IssueTarget, report: &str) {
    if github::publish(poster, target, report) {
        eprintln!(
            "Posted benchmark report to {}/{}#{}",
            target.owner, target.repo, target.number
        );
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    match args.command {
        Commands::Compare(compare_args) => compare(compare_args),
        Commands::Run(run_args) => run(run_args),
    }
}
