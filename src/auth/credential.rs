use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UserIdentity;

/// Gmail full-access scope.
pub const MAIL_SCOPE: &str = "https://mail.google.com/";
/// Google Calendar full-access scope.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// A named permission grant gating tool visibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(String);

impl Scope {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn mail() -> Self {
        Self::new(MAIL_SCOPE)
    }

    pub fn calendar() -> Self {
        Self::new(CALENDAR_SCOPE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// External-service credential bundle for one user.
///
/// At most one exists per [`UserIdentity`]; stores upsert on write.
///
/// # Example
/// ```
/// use planx::auth::{Credential, Scope};
/// use planx::types::UserIdentity;
///
/// let owner = UserIdentity::new("alice").unwrap();
/// let credential = Credential::new(owner, "access")
///     .with_refresh_token("refresh")
///     .with_scopes([Scope::mail()]);
/// assert!(credential.has_scope(&Scope::mail()));
/// assert!(!credential.is_expired());
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub owner: UserIdentity,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: BTreeSet<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(owner: UserIdentity, access_token: impl Into<String>) -> Self {
        Self {
            owner,
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            scopes: BTreeSet::new(),
            last_refresh: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = Scope>) -> Self {
        self.scopes.extend(scopes);
        self
    }

    /// A credential without an expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn has_scope(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("owner", &self.owner)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("last_refresh", &self.last_refresh)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn owner() -> UserIdentity {
        UserIdentity::new("alice").unwrap()
    }

    #[test]
    fn expiry_boundaries() {
        let now = Utc::now();
        let fresh = Credential::new(owner(), "a").with_expiry(now + Duration::minutes(5));
        let stale = Credential::new(owner(), "a").with_expiry(now - Duration::seconds(1));
        let forever = Credential::new(owner(), "a");

        assert!(!fresh.is_expired_at(now));
        assert!(stale.is_expired_at(now));
        assert!(!forever.is_expired_at(now));
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let credential = Credential::new(owner(), "secret-access").with_refresh_token("secret-refresh");
        let rendered = format!("{credential:?}");

        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn empty_refresh_token_cannot_refresh() {
        let credential = Credential::new(owner(), "a").with_refresh_token("");
        assert!(!credential.can_refresh());
    }
}
