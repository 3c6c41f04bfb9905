use thiserror::Error;

use crate::error::PlanxError;

/// Failures of the credential refresh exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Expired or invalid grant")]
    ExpiredOrInvalidGrant,
    #[error("Credential has no refresh token")]
    MissingRefreshToken,
    #[error("Refresh not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(feature = "oauth")]
impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for PlanxError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Network(message) => PlanxError::Network(message),
            other => PlanxError::CredentialUnavailable(other.to_string()),
        }
    }
}
