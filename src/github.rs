//! Publishing the report to a pull request
//!
//! Posting is best-effort: when it fails the report is printed instead, so a
//! missing token or an API outage never fails the comparison itself.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Default GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Name of the action output carrying the markdown report
pub const REPORT_OUTPUT: &str = "report";

/// Errors from publishing a report
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("Invalid repository '{0}', expected owner/repo")]
    InvalidRepository(String),

    #[error("Event payload has no pull request or issue number")]
    NoIssueNumber,

    #[error("Failed to read event payload: {0}")]
    EventPayload(String),

    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pull request (or issue) a comment is posted on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueTarget {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    pull_request: Option<NumberedItem>,
    issue: Option<NumberedItem>,
    number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct NumberedItem {
    number: u64,
}

impl IssueTarget {
    /// Resolve the target from `GITHUB_REPOSITORY` and the `GITHUB_EVENT_PATH` payload
    pub fn from_env() -> Result<Self, PublishError> {
        let repository = std::env::var("GITHUB_REPOSITORY")
            .map_err(|_| PublishError::MissingEnv("GITHUB_REPOSITORY"))?;
        let event_path = std::env::var("GITHUB_EVENT_PATH")
            .map_err(|_| PublishError::MissingEnv("GITHUB_EVENT_PATH"))?;

        let payload = std::fs::read_to_string(&event_path)
            .map_err(|e| PublishError::EventPayload(format!("{}: {}", event_path, e)))?;

        Self::from_parts(&repository, &payload)
    }

    /// Build a target from an `owner/repo` string and an event payload
    pub fn from_parts(repository: &str, event_payload: &str) -> Result<Self, PublishError> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| PublishError::InvalidRepository(repository.to_string()))?;

        let payload: EventPayload = serde_json::from_str(event_payload)
            .map_err(|e| PublishError::EventPayload(e.to_string()))?;

        let number = payload
            .pull_request
            .map(|pr| pr.number)
            .or(payload.issue.map(|issue| issue.number))
            .or(payload.number)
            .ok_or(PublishError::NoIssueNumber)?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        })
    }
}

/// Posts a comment body on a pull request
pub trait CommentPoster {
    fn post(&self, target: &IssueTarget, body: &str) -> Result<(), PublishError>;
}

#[derive(Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

/// [`CommentPoster`] using the GitHub REST API
#[derive(Debug, Clone)]
pub struct GithubCommentPoster {
    api_url: String,
    token: String,
    client: reqwest::blocking::Client,
}

impl GithubCommentPoster {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Configure from `GITHUB_TOKEN` and `GITHUB_API_URL`
    pub fn from_env() -> Result<Self, PublishError> {
        let token =
            std::env::var("GITHUB_TOKEN").map_err(|_| PublishError::MissingEnv("GITHUB_TOKEN"))?;
        let api_url =
            std::env::var("GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Ok(Self::new(api_url, token))
    }

    /// Comments endpoint for a target
    pub fn comments_url(&self, target: &IssueTarget) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, target.owner, target.repo, target.number
        )
    }
}

impl CommentPoster for GithubCommentPoster {
    fn post(&self, target: &IssueTarget, body: &str) -> Result<(), PublishError> {
        let url = self.comments_url(target);
        tracing::info!("Posting benchmark report to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, concat!("benchcmp/", env!("CARGO_PKG_VERSION")))
            .json(&CommentRequest { body })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Api {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        Ok(())
    }
}

/// Post the report, falling back to printing it when posting fails
///
/// Returns whether the comment was posted.
pub fn publish<P: CommentPoster + ?Sized>(poster: &P, target: &IssueTarget, body: &str) -> bool {
    match poster.post(target, body) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                "Failed to comment on {}/{}#{}: {}",
                target.owner,
                target.repo,
                target.number,
                e
            );
            println!("{}", body);
            false
        }
    }
}

/// Append a named output for the enclosing workflow step
///
/// Writes to the file named by `GITHUB_OUTPUT`; does nothing when it is unset.
pub fn write_output(name: &str, value: &str) -> Result<(), PublishError> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) => append_output(Path::new(&path), name, value),
        None => {
            tracing::debug!("GITHUB_OUTPUT not set, skipping output '{}'", name);
            Ok(())
        }
    }
}

/// Append `name<<DELIM\nvalue\nDELIM` to an output file
pub fn append_output(path: &Path, name: &str, value: &str) -> Result<(), PublishError> {
    let delimiter = output_delimiter(value);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}<<{}", name, delimiter)?;
    writeln!(file, "{}", value.trim_end_matches('\n'))?;
    writeln!(file, "{}", delimiter)?;
    Ok(())
}

/// Heredoc delimiter that does not occur as a line of `value`
fn output_delimiter(value: &str) -> String {
    let mut delimiter = "BENCHCMP_EOF".to_string();
    while value.lines().any(|line| line == delimiter) {
        delimiter.push('_');
    }
    delimiter
}
