//! Command-line entry point for the scheduled job.
//!
//! This crate provides the `cowgill` binary: configuration loading, secret
//! resolution, wiring of the production clients and output rendering.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod secret;

pub use cli::Cli;
pub use config::JobConfig;
pub use error::{CliError, CliResult};
