//! benchcmp - Compare two criterion benchmark runs and report significant changes
//!
//! The comparison core parses two JSON exports (a base run and a changed run),
//! pairs benchmarks by name, applies an error-bar separation heuristic and
//! renders a deterministic markdown report. The remaining modules obtain the
//! exports by running cargo/git and publish the report to a pull request.

pub mod cli;
pub mod comparison;
pub mod config;
pub mod github;
pub mod runner;
pub mod workflow;
