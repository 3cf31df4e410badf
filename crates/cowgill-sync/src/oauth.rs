//! Refresh-token exchange against the fitness platform's OAuth endpoint.
//!
//! The platform rotates refresh tokens: every exchange may return a new
//! refresh token, and the old one stops working once the new one is used.
//! The returned [`Credential`] therefore has to be fed to the secret
//! publisher before the run ends.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::http::{self, BoxFuture};

/// Default platform API base URL.
pub const STRAVA_API_BASE: &str = "https://www.strava.com/api/v3";

/// OAuth application credentials.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Tokens obtained from one exchange. Lives for a single run.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token_type", &self.token_type)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &http::fingerprint(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Trades a refresh token for a fresh credential.
pub trait TokenExchange: Send + Sync {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, SyncResult<Credential>>;
}

/// OAuth client for the platform's `refresh_token` grant.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: ClientCredentials,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a client posting to `{api_base}/oauth/token`.
    pub fn new(
        credentials: ClientCredentials,
        api_base: &str,
        timeout: Duration,
    ) -> SyncResult<Self> {
        Ok(Self {
            credentials,
            token_url: format!("{}/oauth/token", api_base.trim_end_matches('/')),
            http_client: http::build_client(timeout, SyncError::auth)?,
        })
    }

    /// Exchanges `refresh_token` for a new credential.
    ///
    /// Any transport failure, non-success status or undecodable body is an
    /// auth error.
    pub async fn refresh_token(&self, refresh_token: &str) -> SyncResult<Credential> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];

        debug!(url = %self.token_url, "exchanging refresh token");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| SyncError::auth(format!("token refresh {}", http::describe(&e))))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::auth(format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            return Err(SyncError::auth(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            SyncError::auth(format!("invalid token response: {}", e)).with_source(e)
        })?;

        let credential = token_response.into_credential()?;
        info!(
            refresh_token = %http::fingerprint(&credential.refresh_token),
            expires_at = %credential.expires_at,
            "refreshed access token"
        );
        Ok(credential)
    }
}

impl TokenExchange for OAuthClient {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> BoxFuture<'a, SyncResult<Credential>> {
        Box::pin(self.refresh_token(refresh_token))
    }
}

/// Response from the platform's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
    refresh_token: String,
    /// Unix seconds.
    expires_at: i64,
}

impl TokenResponse {
    fn into_credential(self) -> SyncResult<Credential> {
        let expires_at = DateTime::from_timestamp(self.expires_at, 0).ok_or_else(|| {
            SyncError::auth(format!("token expiry out of range: {}", self.expires_at))
        })?;
        Ok(Credential {
            token_type: self.token_type,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorKind;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OAuthClient {
        OAuthClient::new(
            ClientCredentials::new("137765", "shh"),
            &server.uri(),
            http::DEFAULT_TIMEOUT,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn refresh_returns_rotated_credential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old-refresh"))
            .and(body_string_contains("client_id=137765"))
            .and(body_string_contains("client_secret=shh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "access_token": "access-1",
                "expires_at": 1_717_243_200,
                "expires_in": 21600,
                "refresh_token": "new-refresh"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = client(&server).refresh_token("old-refresh").await.unwrap();

        assert_eq!(credential.token_type, "Bearer");
        assert_eq!(credential.access_token, "access-1");
        assert_eq!(credential.refresh_token, "new-refresh");
        assert_eq!(credential.expires_at.timestamp(), 1_717_243_200);
    }

    #[tokio::test]
    async fn rejected_refresh_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"message":"Bad Request"}"#))
            .mount(&server)
            .await;

        let err = client(&server).refresh_token("revoked").await.unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Auth);
        assert!(err.message().contains("400"));
    }

    #[tokio::test]
    async fn undecodable_body_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = client(&server).refresh_token("token").await.unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Auth);
        assert!(err.message().contains("invalid token response"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_auth_error() {
        let client = OAuthClient::new(
            ClientCredentials::new("id", "secret"),
            "http://127.0.0.1:9",
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.refresh_token("token").await.unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Auth);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let credential = Credential {
            token_type: "Bearer".to_string(),
            access_token: "super-secret-access".to_string(),
            refresh_token: "super-secret-refresh".to_string(),
            expires_at: Utc::now(),
        };
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("super-secret"));

        let creds = format!("{:?}", ClientCredentials::new("id", "client-secret-value"));
        assert!(!creds.contains("client-secret-value"));
    }
}
