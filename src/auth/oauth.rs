//! OAuth 2.0 refresh-token grant.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

use super::credential::{Credential, Scope};
use super::error::AuthError;
use super::refresh::CredentialRefresher;
use crate::config::OAuthSettings;

pub use crate::config::DEFAULT_TOKEN_URL;

/// Refreshes credentials against an OAuth token endpoint.
///
/// # Example
/// ```no_run
/// use planx::auth::oauth::OAuthRefresher;
///
/// let refresher = OAuthRefresher::new("client-id", "client-secret")
///     .with_token_url("https://oauth2.example.com/token");
/// ```
pub struct OAuthRefresher {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl OAuthRefresher {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Build from configured client settings.
    pub fn from_settings(settings: &OAuthSettings) -> Result<Self, AuthError> {
        let client_id = settings
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AuthError::NotConfigured("missing OAuth client id".to_string()))?;
        Ok(Self::new(client_id, settings.client_secret.clone().unwrap_or_default())
            .with_token_url(&settings.token_url))
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl CredentialRefresher for OAuthRefresher {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingRefreshToken)?;

        let resp = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body: TokenErrorResponse = resp.json().await.unwrap_or_default();
            if body.error.as_deref() == Some("invalid_grant") || status == StatusCode::UNAUTHORIZED {
                return Err(AuthError::ExpiredOrInvalidGrant);
            }
            return Err(AuthError::InvalidResponse(format!(
                "token refresh rejected: {}",
                body.error.unwrap_or_else(|| status.to_string())
            )));
        }
        if !status.is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "token refresh failed with status {status}"
            )));
        }

        let payload: TokenResponse = resp.json().await?;
        if payload.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "token response missing access_token".to_string(),
            ));
        }

        let mut renewed = credential.clone();
        renewed.access_token = payload.access_token;
        renewed.expires_at = payload
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(token) = payload.refresh_token.filter(|t| !t.is_empty()) {
            renewed.refresh_token = Some(token);
        }
        if let Some(scope) = payload.scope {
            renewed.scopes = scope.split_whitespace().map(Scope::from).collect();
        }
        renewed.last_refresh = Some(Utc::now());
        Ok(renewed)
    }
}

impl std::fmt::Debug for OAuthRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthRefresher")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
}
