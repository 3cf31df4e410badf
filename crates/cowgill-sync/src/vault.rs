//! Propagation of the rotated refresh token into an encrypted secret vault.
//!
//! The vault (GitHub Actions repository secrets) only accepts values sealed
//! against its current public key. The key is fetched fresh on every
//! publish because the vault may rotate it; a [`SealedSecret`] is only
//! valid while its `key_id` is the vault's active key.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::github::{GithubClient, GithubRepo};
use crate::http::{self, BoxFuture};
use crate::seal;

/// The vault's current encryption key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublicKeyMaterial {
    pub key_id: String,
    /// Base64-encoded X25519 public key.
    pub key: String,
}

/// A secret value sealed against a specific vault key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SealedSecret {
    /// Base64-encoded sealed box.
    pub encrypted_value: String,
    pub key_id: String,
}

impl SealedSecret {
    /// Seals `plaintext` against `key`.
    pub fn seal(key: &PublicKeyMaterial, plaintext: &str) -> SyncResult<Self> {
        Ok(Self {
            encrypted_value: seal::seal_base64(&key.key, plaintext)?,
            key_id: key.key_id.clone(),
        })
    }
}

/// Remote store for sealed secrets.
pub trait SecretVault: Send + Sync {
    /// Fetches the key new secrets must be sealed against.
    fn public_key(&self) -> BoxFuture<'_, SyncResult<PublicKeyMaterial>>;

    /// Creates or replaces the secret `name`.
    fn put_secret<'a>(&'a self, name: &'a str, secret: &'a SealedSecret)
    -> BoxFuture<'a, SyncResult<()>>;
}

/// Repository secrets of GitHub Actions.
#[derive(Debug)]
pub struct GithubActionsVault {
    client: GithubClient,
}

impl GithubActionsVault {
    pub fn new(repo: GithubRepo, timeout: Duration) -> SyncResult<Self> {
        Ok(Self {
            client: GithubClient::new(repo, timeout, SyncError::vault)?,
        })
    }

    async fn fetch_public_key(&self) -> SyncResult<PublicKeyMaterial> {
        let response = self
            .client
            .request(Method::GET, "actions/secrets/public-key")
            .send()
            .await
            .map_err(|e| SyncError::vault(format!("public key {}", http::describe(&e))))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::vault(format!("failed to read public key response: {}", e)))?;

        if status != StatusCode::OK {
            return Err(SyncError::vault(format!(
                "public key fetch failed ({}): {}",
                status, body
            )));
        }

        let key: PublicKeyMaterial = serde_json::from_str(&body)
            .map_err(|e| SyncError::vault(format!("invalid public key response: {}", e)))?;
        debug!(key_id = %key.key_id, "fetched vault public key");
        Ok(key)
    }

    async fn upsert_secret(&self, name: &str, secret: &SealedSecret) -> SyncResult<()> {
        let response = self
            .client
            .request(Method::PUT, &format!("actions/secrets/{}", name))
            .json(secret)
            .send()
            .await
            .map_err(|e| SyncError::vault(format!("secret upsert {}", http::describe(&e))))?;

        let status = response.status();
        // 201: secret created, 204: secret updated.
        if status == StatusCode::CREATED || status == StatusCode::NO_CONTENT {
            debug!(secret = name, %status, "secret stored");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SyncError::vault(format!(
            "secret upsert for {} failed ({}): {}",
            name, status, body
        )))
    }
}

impl SecretVault for GithubActionsVault {
    fn public_key(&self) -> BoxFuture<'_, SyncResult<PublicKeyMaterial>> {
        Box::pin(self.fetch_public_key())
    }

    fn put_secret<'a>(
        &'a self,
        name: &'a str,
        secret: &'a SealedSecret,
    ) -> BoxFuture<'a, SyncResult<()>> {
        Box::pin(self.upsert_secret(name, secret))
    }
}

/// Result of a publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretOutcome {
    /// The stored token already matches; nothing was sent to the vault.
    UpToDate,
    /// The token was sealed against `key_id` and stored.
    Rotated { key_id: String },
}

/// Writes the refresh token to the vault when it changed.
pub struct SecretPublisher {
    vault: Box<dyn SecretVault>,
    secret_name: String,
}

impl SecretPublisher {
    pub fn new(vault: Box<dyn SecretVault>, secret_name: impl Into<String>) -> Self {
        Self {
            vault,
            secret_name: secret_name.into(),
        }
    }

    pub fn secret_name(&self) -> &str {
        &self.secret_name
    }

    /// Publishes `new_refresh_token` unless it equals `current_stored_token`.
    ///
    /// Unchanged tokens cause no vault traffic at all, so repeated calls are
    /// safe no-ops.
    pub async fn publish(
        &self,
        new_refresh_token: &str,
        current_stored_token: &str,
    ) -> SyncResult<SecretOutcome> {
        if new_refresh_token == current_stored_token {
            info!(secret = %self.secret_name, "refresh token already up to date");
            return Ok(SecretOutcome::UpToDate);
        }

        let key = self.vault.public_key().await?;
        let sealed = SealedSecret::seal(&key, new_refresh_token)?;
        self.vault.put_secret(&self.secret_name, &sealed).await?;

        info!(
            secret = %self.secret_name,
            key_id = %sealed.key_id,
            from = %http::fingerprint(current_stored_token),
            to = %http::fingerprint(new_refresh_token),
            "updated refresh token secret"
        );
        Ok(SecretOutcome::Rotated {
            key_id: sealed.key_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorKind;
    use crate::testing::RecordingVault;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use crypto_box::SecretKey;
    use crypto_box::aead::OsRng;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn recipient() -> (SecretKey, String) {
        let secret_key = SecretKey::generate(&mut OsRng);
        let encoded = STANDARD.encode(secret_key.public_key().as_bytes());
        (secret_key, encoded)
    }

    #[tokio::test]
    async fn unchanged_token_is_a_no_op() {
        let vault = RecordingVault::default();
        let publisher = SecretPublisher::new(Box::new(vault.clone()), "STRAVA_REFRESH_TOKEN");

        let outcome = publisher.publish("abc", "abc").await.unwrap();

        assert_eq!(outcome, SecretOutcome::UpToDate);
        assert_eq!(vault.key_fetch_count(), 0);
        assert_eq!(vault.write_count(), 0);
    }

    #[tokio::test]
    async fn changed_token_fetches_key_once_and_writes_once() {
        let (secret_key, key_b64) = recipient();
        let vault = RecordingVault::with_key("568250167242549743", &key_b64);
        let publisher = SecretPublisher::new(Box::new(vault.clone()), "STRAVA_REFRESH_TOKEN");

        let outcome = publisher.publish("xyz", "abc").await.unwrap();

        assert_eq!(
            outcome,
            SecretOutcome::Rotated {
                key_id: "568250167242549743".to_string()
            }
        );
        assert_eq!(vault.key_fetch_count(), 1);

        let writes = vault.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let (name, sealed) = &writes[0];
        assert_eq!(name, "STRAVA_REFRESH_TOKEN");
        assert_eq!(sealed.key_id, "568250167242549743");

        let ciphertext = STANDARD.decode(&sealed.encrypted_value).unwrap();
        assert_eq!(secret_key.unseal(&ciphertext).unwrap(), b"xyz");
    }

    #[tokio::test]
    async fn malformed_key_aborts_before_write() {
        let vault = RecordingVault::with_key("1", "c2hvcnQ=");
        let publisher = SecretPublisher::new(Box::new(vault.clone()), "S");

        let err = publisher.publish("xyz", "abc").await.unwrap_err();

        assert_eq!(err.kind(), SyncErrorKind::Encryption);
        assert_eq!(vault.write_count(), 0);
    }

    fn github_vault(server: &MockServer) -> GithubActionsVault {
        GithubActionsVault::new(
            GithubRepo::new(server.uri(), "raymond-devries", "cowgill-bot", "gh-token"),
            http::DEFAULT_TIMEOUT,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn github_vault_publishes_sealed_secret() {
        let (_, key_b64) = recipient();
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/repos/raymond-devries/cowgill-bot/actions/secrets/public-key"))
            .and(header("authorization", "Bearer gh-token"))
            .and(header("accept", "application/vnd.github+json"))
            .and(header("x-github-api-version", "2022-11-28"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "key_id": "key-7",
                "key": key_b64
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/repos/raymond-devries/cowgill-bot/actions/secrets/STRAVA_REFRESH_TOKEN"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let publisher =
            SecretPublisher::new(Box::new(github_vault(&server)), "STRAVA_REFRESH_TOKEN");
        let outcome = publisher.publish("new", "old").await.unwrap();
        assert_eq!(
            outcome,
            SecretOutcome::Rotated {
                key_id: "key-7".to_string()
            }
        );

        let requests = server.received_requests().await.unwrap();
        let put = requests
            .iter()
            .find(|r| r.method.as_str() == "PUT")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
        assert_eq!(body["key_id"], "key-7");
        assert!(body["encrypted_value"].as_str().unwrap().len() > 40);
    }

    #[tokio::test]
    async fn github_vault_accepts_created_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let sealed = SealedSecret {
            encrypted_value: "AAAA".to_string(),
            key_id: "k".to_string(),
        };
        github_vault(&server).put_secret("NEW", &sealed).await.unwrap();
    }

    #[tokio::test]
    async fn github_vault_rejects_other_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Resource not accessible"))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let vault = github_vault(&server);

        let err = vault.public_key().await.unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Vault);
        assert!(err.message().contains("403"));

        let sealed = SealedSecret {
            encrypted_value: "AAAA".to_string(),
            key_id: "k".to_string(),
        };
        let err = vault.put_secret("S", &sealed).await.unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Vault);
    }

    #[tokio::test]
    async fn github_vault_rejects_undecodable_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"unexpected\": true}"))
            .mount(&server)
            .await;

        let err = github_vault(&server).public_key().await.unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::Vault);
        assert!(err.message().contains("invalid public key response"));
    }
}
