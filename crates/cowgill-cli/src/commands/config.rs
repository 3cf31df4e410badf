//! Configuration commands.

use std::path::Path;

use crate::cli::Cli;
use crate::config::JobConfig;
use crate::error::CliResult;

/// Validates the configuration and resolves every secret input.
///
/// Prints where each input comes from, never its value.
pub fn validate(cli: &Cli, config: &JobConfig) -> CliResult<()> {
    config.validate()?;

    let overrides = cli.secret_overrides();
    for (input, source) in config.input_sources(&overrides) {
        println!("{:<22} {}", format!("{}:", input), source);
    }
    config.resolve_inputs(&overrides)?;

    println!(
        "listing: {}/{}/{}",
        config.github.owner, config.github.repo, config.github.content_path
    );
    println!("Configuration is valid.");
    Ok(())
}

/// Shows the configuration file path.
pub fn path(explicit: Option<&Path>) -> CliResult<()> {
    match explicit {
        Some(path) => println!("config: {}", path.display()),
        None => {
            let config_path = JobConfig::default_path();
            let state = if config_path.exists() {
                ""
            } else {
                " (not present, using defaults)"
            };
            println!("config: {}{}", config_path.display(), state);
        }
    }
    Ok(())
}
