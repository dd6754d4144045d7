//! Command-line interface for webrunner.
//!
//! Provides the `run` command for executing declarative test suites and
//! the `profiles` commands for managing browser profiles.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
