//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use cowgill_core::{TracingConfig, TracingOutputFormat};

// Not `Debug`: it holds secret values.
/// cowgill - Rotates the Strava credential and republishes upcoming club rides
#[derive(Parser)]
#[command(name = "cowgill")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "COWGILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log line format on stderr
    #[arg(long, default_value = "compact")]
    pub log_format: TracingOutputFormat,

    /// Format of the event listing printed on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Per-request timeout in seconds (overrides [http] timeout_secs)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    // --- Secrets, normally supplied by the job runner ---
    /// Strava OAuth client secret
    #[arg(long, env = "STRAVA_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Currently stored Strava refresh token
    #[arg(long, env = "STRAVA_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// GitHub token with secrets and contents write access
    #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Logging setup selected by `--debug` and `--log-format`.
    pub fn tracing_config(&self) -> TracingConfig {
        let config = if self.debug {
            TracingConfig::cli_debug()
        } else {
            TracingConfig::scheduled()
        };
        config.with_format(self.log_format)
    }

    /// Secrets given on the command line or through the environment.
    pub fn secret_overrides(&self) -> SecretOverrides {
        SecretOverrides {
            client_secret: self.client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
            github_token: self.github_token.clone(),
        }
    }
}

/// Secret values that take precedence over the config file.
#[derive(Clone, Default)]
pub struct SecretOverrides {
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub github_token: Option<String>,
}

impl std::fmt::Debug for SecretOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let given = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("SecretOverrides")
            .field("client_secret", &given(&self.client_secret))
            .field("refresh_token", &given(&self.refresh_token))
            .field("github_token", &given(&self.github_token))
            .finish()
    }
}

/// How the final event set is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One line per event with its next occurrence
    #[default]
    Text,
    /// The listing exactly as stored in the repository
    Json,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the job once (default)
    Run,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Resolve every input and validate the configuration
    Validate,

    /// Show configuration file path
    Path,
}
