//! Subcommand implementations.

pub mod config;
pub mod run;

use crate::cli::{Cli, Command, ConfigAction};
use crate::config::JobConfig;
use crate::error::CliResult;

/// Runs the selected command.
///
/// `config path` only reports where the file lives, so it never loads it.
pub async fn dispatch(cli: &Cli) -> CliResult<()> {
    if matches!(
        cli.command,
        Some(Command::Config {
            action: ConfigAction::Path
        })
    ) {
        return config::path(cli.config.as_deref());
    }

    let job_config = match cli.config {
        Some(ref path) => JobConfig::load_from(path)?,
        None => JobConfig::load()?,
    };

    match cli.command {
        Some(Command::Config { .. }) => config::validate(cli, &job_config),
        Some(Command::Run) | None => run::run(cli, &job_config).await,
    }
}
