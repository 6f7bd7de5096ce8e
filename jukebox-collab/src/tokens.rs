use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use log::warn;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::{CredentialData, Database, DatabaseError, NewCredential, ProviderConfig};

/// The provider permissions the jukebox asks for on the consent screen
const SCOPES: &str = "user-read-playback-state user-modify-playback-state user-read-currently-playing";

/// How long an outbound token exchange may take before it is abandoned
const EXCHANGE_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Persists and refreshes the OAuth2 credential of each host.
pub struct TokenStore<Db> {
    db: Arc<Db>,
    http: Client,
    config: ProviderConfig,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Db(#[from] DatabaseError),
    /// The token endpoint refused or mangled an exchange
    #[error("Token exchange failed: {0}")]
    Exchange(String),
    /// The stored credential has no refresh token and the provider sent none
    #[error("No refresh token available")]
    NoRefreshToken,
}

/// The provider's token endpoint response, for both grant types
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    /// The provider may omit this on a refresh, in which case the stored
    /// refresh token remains valid
    refresh_token: Option<String>,
}

impl<Db> TokenStore<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>, config: ProviderConfig) -> Self {
        Self {
            db: db.clone(),
            http: Client::builder()
                .timeout(EXCHANGE_TIMEOUT)
                .build()
                .expect("http client is initialized"),
            config,
        }
    }

    /// Returns the stored credential of an owner, if any
    pub async fn get(&self, owner: &str) -> Result<Option<CredentialData>, DatabaseError> {
        match self.db.credential_by_owner(owner).await {
            Ok(credential) => Ok(Some(credential)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replaces the owner's credential with a fresh token set.
    ///
    /// The relative `expires_in` is converted to an absolute instant before
    /// anything is stored. When the response omitted a refresh token, the
    /// previously stored one is carried over.
    pub async fn upsert(
        &self,
        owner: &str,
        access_token: String,
        token_type: String,
        expires_in_seconds: i64,
        refresh_token: Option<String>,
    ) -> Result<CredentialData, TokenError> {
        let existing = self.get(owner).await?;

        let refresh_token = refresh_token
            .or(existing.map(|c| c.refresh_token))
            .ok_or(TokenError::NoRefreshToken)?;

        let credential = self
            .db
            .upsert_credential(NewCredential {
                owner: owner.to_string(),
                access_token,
                refresh_token,
                token_type,
                expires_at: Utc::now() + Duration::seconds(expires_in_seconds),
            })
            .await?;

        Ok(credential)
    }

    /// Returns whether the owner has linked a provider account.
    ///
    /// An expired credential triggers a refresh attempt first, but the answer
    /// stays optimistically `true` even if that attempt fails. The next
    /// provider call will surface the auth failure instead.
    pub async fn is_valid(&self, owner: &str) -> Result<bool, DatabaseError> {
        let Some(credential) = self.get(owner).await? else {
            return Ok(false);
        };

        if credential.expires_at <= Utc::now() {
            if let Err(e) = self.refresh(owner).await {
                warn!("Failed to refresh credential for {owner}: {e}");
            }
        }

        Ok(true)
    }

    /// Exchanges the stored refresh token for a fresh access token.
    ///
    /// On failure the stale credential stays in place. There is no retry
    /// scheduling, the next expired call simply tries again.
    pub async fn refresh(&self, owner: &str) -> Result<(), TokenError> {
        let credential = self
            .get(owner)
            .await?
            .ok_or(DatabaseError::NotFound {
                resource: "credential",
                identifier: "owner",
            })?;

        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &credential.refresh_token),
            ])
            .await?;

        self.upsert(
            owner,
            response.access_token,
            response.token_type,
            response.expires_in,
            response.refresh_token,
        )
        .await?;

        Ok(())
    }

    /// Performs the authorization-code grant after the consent redirect
    pub async fn exchange_code(&self, owner: &str, code: &str) -> Result<(), TokenError> {
        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.config.redirect_uri),
            ])
            .await?;

        self.upsert(
            owner,
            response.access_token,
            response.token_type,
            response.expires_in,
            response.refresh_token,
        )
        .await?;

        Ok(())
    }

    /// Builds the provider consent URL the host is sent to
    pub fn authorize_url(&self) -> String {
        let mut url = Url::parse(&self.config.auth_url).expect("auth url is well-formed");

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", SCOPES)
            .append_pair("redirect_uri", &self.config.redirect_uri);

        url.to_string()
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, TokenError> {
        let form: Vec<(&str, &str)> = params
            .iter()
            .copied()
            .chain([
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .collect();

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| TokenError::Exchange(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Exchange(format!("{status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| TokenError::Exchange(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::Utc;

    use super::TokenStore;
    use crate::{Database, MemoryDatabase, ProviderConfig};

    fn store() -> TokenStore<MemoryDatabase> {
        let db = Arc::new(MemoryDatabase::default());

        TokenStore::new(
            &db,
            ProviderConfig::new(
                "client".to_string(),
                "secret".to_string(),
                "http://localhost/callback".to_string(),
            ),
        )
    }

    #[tokio::test]
    async fn upsert_stores_an_absolute_expiry() {
        let store = store();

        let credential = store
            .upsert(
                "host",
                "access".to_string(),
                "Bearer".to_string(),
                3600,
                Some("refresh".to_string()),
            )
            .await
            .unwrap();

        assert!(credential.expires_at > Utc::now());
        assert!(store.is_valid("host").await.unwrap());
    }

    #[tokio::test]
    async fn upsert_retains_the_previous_refresh_token() {
        let store = store();

        store
            .upsert(
                "host",
                "access".to_string(),
                "Bearer".to_string(),
                3600,
                Some("original-refresh".to_string()),
            )
            .await
            .unwrap();

        // A refresh response that omits the refresh token
        let credential = store
            .upsert("host", "newer-access".to_string(), "Bearer".to_string(), 3600, None)
            .await
            .unwrap();

        assert_eq!(credential.access_token, "newer-access");
        assert_eq!(credential.refresh_token, "original-refresh");
    }

    #[tokio::test]
    async fn upsert_without_any_refresh_token_fails() {
        let store = store();

        let result = store
            .upsert("host", "access".to_string(), "Bearer".to_string(), 3600, None)
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn missing_credential_is_not_valid() {
        let store = store();

        assert!(!store.is_valid("stranger").await.unwrap());
        assert!(store.get("stranger").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn credentials_are_exclusive_per_owner() {
        let db = Arc::new(MemoryDatabase::default());
        let store = TokenStore::new(
            &db,
            ProviderConfig::new(
                "client".to_string(),
                "secret".to_string(),
                "http://localhost/callback".to_string(),
            ),
        );

        store
            .upsert("a", "x".to_string(), "Bearer".to_string(), 10, Some("r1".to_string()))
            .await
            .unwrap();
        store
            .upsert("a", "y".to_string(), "Bearer".to_string(), 10, Some("r2".to_string()))
            .await
            .unwrap();

        let credential = db.credential_by_owner("a").await.unwrap();
        assert_eq!(credential.access_token, "y");
        assert_eq!(credential.refresh_token, "r2");
    }

    #[test]
    fn authorize_url_carries_the_oauth_parameters() {
        let url = store().authorize_url();

        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client"));
        assert!(url.contains("redirect_uri="));
    }
}
