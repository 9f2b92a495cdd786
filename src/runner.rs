//! External command execution
//!
//! Everything that shells out (cargo, git, critcmp) goes through
//! [`CommandRunner`] so the workflow can be driven by a scripted runner in tests.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Captured result of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; -1 when the process was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout of a successful command, or an error carrying stderr
    pub fn into_stdout(self, what: &str) -> Result<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            anyhow::bail!(
                "{} failed with exit code {}: {}",
                what,
                self.exit_code,
                self.stderr.trim()
            )
        }
    }
}

/// Runs external programs
pub trait CommandRunner {
    /// Run `program args...` in `cwd` and capture its output
    ///
    /// A non-zero exit is not an error here; only failing to start the process is.
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
        tracing::info!("Running {} {} in {}", program, args.join(" "), cwd.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .with_context(|| format!("Failed to execute {}", program))?;

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!("{} exited with {}", program, result.exit_code);
        Ok(result)
    }
}

/// Run a command and require it to succeed
pub fn run_checked<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: &[&str],
    cwd: &Path,
) -> Result<String> {
    let what = format!("{} {}", program, args.join(" "));
    runner.run(program, args, cwd)?.into_stdout(&what)
}

/// Full id of the commit checked out in `cwd`
pub fn current_commit<R: CommandRunner + ?Sized>(runner: &R, cwd: &Path) -> Result<String> {
    let stdout = run_checked(runner, "git", &["rev-parse", "HEAD"], cwd)?;
    let commit = stdout.trim();
    if commit.is_empty() {
        anyhow::bail!("git rev-parse HEAD returned no commit id");
    }
    Ok(commit.to_string())
}
