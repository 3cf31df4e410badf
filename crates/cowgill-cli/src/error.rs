//! CLI error types.

use cowgill_core::{SnapshotError, TracingError};
use cowgill_sync::SyncError;
use thiserror::Error;

use crate::secret::SecretError;

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end the process with a failure status.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required input is absent from both the environment and the config file.
    #[error("missing {input}: set {env} or `{key}` in config.toml")]
    MissingInput {
        input: &'static str,
        env: &'static str,
        key: &'static str,
    },

    /// A secret reference could not be resolved.
    #[error("failed to resolve {input}: {source}")]
    Secret {
        input: &'static str,
        #[source]
        source: SecretError,
    },

    /// The pipeline aborted.
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("failed to render output: {0}")]
    Output(#[from] SnapshotError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] TracingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_errors_display_unchanged() {
        let err: CliError = SyncError::auth("token refresh failed (401 Unauthorized)")
            .with_step("refresh_credentials")
            .into();
        assert_eq!(
            err.to_string(),
            "[refresh_credentials] auth_error: token refresh failed (401 Unauthorized)"
        );
    }

    #[test]
    fn invalid_log_filter_is_a_logging_error() {
        let err: CliError = cowgill_core::init_tracing(
            cowgill_core::TracingConfig::default().with_env_filter("cowgill=loud"),
        )
        .unwrap_err()
        .into();
        assert!(matches!(err, CliError::Logging(_)));
        assert!(err.to_string().starts_with("failed to initialize logging: "));
    }

    #[test]
    fn missing_input_names_both_sources() {
        let err = CliError::MissingInput {
            input: "GitHub token",
            env: "GH_TOKEN",
            key: "github.token",
        };
        assert_eq!(
            err.to_string(),
            "missing GitHub token: set GH_TOKEN or `github.token` in config.toml"
        );
    }
}
