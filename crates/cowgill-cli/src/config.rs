//! Job configuration.
//!
//! Everything has a default, so the job runs without a config file as long
//! as the secrets are in the environment. The optional file lives at
//! `~/.config/cowgill/config.toml` by default.
//!
//! Secret-valued settings (`client_id`, `client_secret`, `refresh_token`,
//! `token`) support `pass::` and `env::` references, see [`crate::secret`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cowgill_sync::{ClientCredentials, GITHUB_API_BASE, GithubRepo, STRAVA_API_BASE};
use serde::Deserialize;
use url::Url;

use crate::cli::SecretOverrides;
use crate::error::{CliError, CliResult};
use crate::secret::SecretRef;

// ---------------------------------------------------------------------------
// JobConfig (config.toml)
// ---------------------------------------------------------------------------

/// Configuration for one scheduled run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub strava: StravaSettings,
    pub github: GithubSettings,
    pub http: HttpSettings,
}

/// Fitness platform settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StravaSettings {
    /// OAuth application id.
    pub client_id: String,

    /// Club whose group events are published.
    pub club_id: u64,

    pub api_base: String,

    /// OAuth client secret. `STRAVA_CLIENT_SECRET` takes precedence.
    pub client_secret: Option<String>,

    /// Currently stored refresh token. `STRAVA_REFRESH_TOKEN` takes precedence.
    pub refresh_token: Option<String>,
}

impl Default for StravaSettings {
    fn default() -> Self {
        Self {
            client_id: "137765".to_string(),
            club_id: 470714,
            api_base: STRAVA_API_BASE.to_string(),
            client_secret: None,
            refresh_token: None,
        }
    }
}

/// Repository holding both the secret and the published listing.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    pub owner: String,
    pub repo: String,
    pub api_base: String,

    /// Access token. `GH_TOKEN` takes precedence.
    pub token: Option<String>,

    /// Actions secret that stores the refresh token.
    pub secret_name: String,

    /// Repository path of the published event listing.
    pub content_path: String,

    pub commit_message: String,

    /// Branch to read and write; the repository default when unset.
    pub branch: Option<String>,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            owner: "raymond-devries".to_string(),
            repo: "cowgill-bot".to_string(),
            api_base: GITHUB_API_BASE.to_string(),
            token: None,
            secret_name: "STRAVA_REFRESH_TOKEN".to_string(),
            content_path: "data/events.json".to_string(),
            commit_message: "Update upcoming events".to_string(),
            branch: None,
        }
    }
}

/// Transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl JobConfig {
    /// Loads configuration from the default path, or defaults if it does
    /// not exist.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cowgill")
    }

    /// Checks the non-secret settings.
    pub fn validate(&self) -> CliResult<()> {
        validate_api_base("strava.api_base", &self.strava.api_base)?;
        validate_api_base("github.api_base", &self.github.api_base)?;

        for (key, value) in [
            ("strava.client_id", &self.strava.client_id),
            ("github.owner", &self.github.owner),
            ("github.repo", &self.github.repo),
            ("github.content_path", &self.github.content_path),
            ("github.commit_message", &self.github.commit_message),
        ] {
            if value.trim().is_empty() {
                return Err(CliError::Config(format!("{} must not be empty", key)));
            }
        }

        validate_secret_name(&self.github.secret_name)?;

        if self.github.content_path.starts_with('/') {
            return Err(CliError::Config(
                "github.content_path must be relative to the repository root".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(CliError::Config(
                "http.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-request timeout, with the CLI value taking precedence.
    pub fn timeout(&self, cli_override: Option<u64>) -> Duration {
        Duration::from_secs(cli_override.unwrap_or(self.http.timeout_secs))
    }

    /// Resolves every secret input.
    ///
    /// Each input comes from the flag or environment variable if given,
    /// then from the config file (expanding references), else it is an
    /// error naming the missing input.
    pub fn resolve_inputs(&self, overrides: &SecretOverrides) -> CliResult<JobInputs> {
        Ok(JobInputs {
            client_id: resolve_ref("Strava client id", &self.strava.client_id)?,
            client_secret: resolve_input(
                Input::CLIENT_SECRET,
                &overrides.client_secret,
                &self.strava.client_secret,
            )?,
            refresh_token: resolve_input(
                Input::REFRESH_TOKEN,
                &overrides.refresh_token,
                &self.strava.refresh_token,
            )?,
            github_token: resolve_input(
                Input::GITHUB_TOKEN,
                &overrides.github_token,
                &self.github.token,
            )?,
        })
    }

    /// Describes where each secret input would be read from.
    pub fn input_sources(&self, overrides: &SecretOverrides) -> Vec<(&'static str, String)> {
        [
            (Input::CLIENT_SECRET, &overrides.client_secret, &self.strava.client_secret),
            (Input::REFRESH_TOKEN, &overrides.refresh_token, &self.strava.refresh_token),
            (Input::GITHUB_TOKEN, &overrides.github_token, &self.github.token),
        ]
        .into_iter()
        .map(|(input, given, configured)| {
            let source = match (given, configured) {
                (Some(_), _) => format!("${}", input.env),
                (None, Some(value)) => SecretRef::parse(value).to_string(),
                (None, None) => "missing".to_string(),
            };
            (input.name, source)
        })
        .collect()
    }

    /// The repository addressed by the `[github]` section.
    pub fn github_repo(&self, token: &str) -> GithubRepo {
        GithubRepo::new(
            &self.github.api_base,
            &self.github.owner,
            &self.github.repo,
            token,
        )
    }
}

impl fmt::Debug for StravaSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StravaSettings")
            .field("client_id", &SecretRef::parse(&self.client_id))
            .field("club_id", &self.club_id)
            .field("api_base", &self.api_base)
            .field("client_secret", &self.client_secret.as_deref().map(SecretRef::parse))
            .field("refresh_token", &self.refresh_token.as_deref().map(SecretRef::parse))
            .finish()
    }
}

impl fmt::Debug for GithubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubSettings")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_deref().map(SecretRef::parse))
            .field("secret_name", &self.secret_name)
            .field("content_path", &self.content_path)
            .field("commit_message", &self.commit_message)
            .field("branch", &self.branch)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Resolved inputs
// ---------------------------------------------------------------------------

/// Secret inputs of a run, fully resolved.
#[derive(Clone)]
pub struct JobInputs {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub github_token: String,
}

impl JobInputs {
    pub fn client_credentials(&self) -> ClientCredentials {
        ClientCredentials::new(&self.client_id, &self.client_secret)
    }
}

impl fmt::Debug for JobInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobInputs")
            .field("client_id", &"<redacted>")
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &cowgill_sync::fingerprint(&self.refresh_token))
            .field("github_token", &"<redacted>")
            .finish()
    }
}

struct Input {
    name: &'static str,
    env: &'static str,
    key: &'static str,
}

impl Input {
    const CLIENT_SECRET: Input = Input {
        name: "Strava client secret",
        env: "STRAVA_CLIENT_SECRET",
        key: "strava.client_secret",
    };
    const REFRESH_TOKEN: Input = Input {
        name: "Strava refresh token",
        env: "STRAVA_REFRESH_TOKEN",
        key: "strava.refresh_token",
    };
    const GITHUB_TOKEN: Input = Input {
        name: "GitHub token",
        env: "GH_TOKEN",
        key: "github.token",
    };
}

fn resolve_input(
    input: Input,
    given: &Option<String>,
    configured: &Option<String>,
) -> CliResult<String> {
    let value = match (given, configured) {
        (Some(value), _) => value.clone(),
        (None, Some(reference)) => resolve_ref(input.name, reference)?,
        (None, None) => String::new(),
    };
    if value.is_empty() {
        return Err(CliError::MissingInput {
            input: input.name,
            env: input.env,
            key: input.key,
        });
    }
    Ok(value)
}

fn resolve_ref(input: &'static str, reference: &str) -> CliResult<String> {
    SecretRef::parse(reference)
        .resolve()
        .map_err(|source| CliError::Secret { input, source })
}

fn validate_api_base(key: &str, value: &str) -> CliResult<()> {
    let url = Url::parse(value)
        .map_err(|e| CliError::Config(format!("{} is not a valid URL: {}", key, e)))?;
    match url.scheme() {
        "https" | "http" => Ok(()),
        scheme => Err(CliError::Config(format!(
            "{} must use http or https, not {}",
            key, scheme
        ))),
    }
}

/// Actions secret names are upper-case alphanumerics and underscores and
/// must not start with a digit or `GITHUB_`.
fn validate_secret_name(name: &str) -> CliResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && !name.starts_with("GITHUB_");
    if valid {
        Ok(())
    } else {
        Err(CliError::Config(format!(
            "github.secret_name `{}` is not a valid Actions secret name",
            name
        )))
    }
}
