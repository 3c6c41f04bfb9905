use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::credential::{Credential, Scope};
use super::store::CredentialStore;
use crate::error::PlanxError;
use crate::types::UserIdentity;

/// Connection state of a user's external-service grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected {
        scopes: BTreeSet<Scope>,
        expires_at: Option<DateTime<Utc>>,
    },
    /// Stored but expired; `refreshable` tells whether a refresh can be tried.
    Expired { refreshable: bool },
    NotConnected,
}

/// Contact point with the authorization flow.
///
/// The browser-redirect mechanics live outside the core; this service only
/// records the resulting credential or its revocation.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use planx::auth::{Credential, CredentialService, InMemoryCredentialStore};
/// use planx::types::UserIdentity;
///
/// # async fn example() -> planx::error::Result<()> {
/// let service = CredentialService::new(Arc::new(InMemoryCredentialStore::new()));
/// let user = UserIdentity::new("alice")?;
/// service.grant(&user, Credential::new(user.clone(), "token")).await?;
/// service.revoke(&user).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
}

impl CredentialService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Record a freshly granted credential (upsert).
    pub async fn grant(&self, user: &UserIdentity, credential: Credential) -> Result<(), PlanxError> {
        if &credential.owner != user {
            return Err(PlanxError::InvalidArgument(format!(
                "credential owner '{}' does not match user '{}'",
                credential.owner, user
            )));
        }
        if credential.access_token.trim().is_empty() {
            return Err(PlanxError::InvalidArgument(
                "access token must not be empty".to_string(),
            ));
        }
        self.store.upsert(user, &credential).await?;
        tracing::info!(user = %user, scopes = credential.scopes.len(), "credential granted");
        Ok(())
    }

    /// Forget the user's credential. Revoking twice is fine.
    pub async fn revoke(&self, user: &UserIdentity) -> Result<(), PlanxError> {
        self.store.delete(user).await?;
        tracing::info!(user = %user, "credential revoked");
        Ok(())
    }

    pub async fn status(&self, user: &UserIdentity) -> Result<ConnectionStatus, PlanxError> {
        let status = match self.store.get(user).await? {
            None => ConnectionStatus::NotConnected,
            Some(credential) if credential.is_expired() => ConnectionStatus::Expired {
                refreshable: credential.can_refresh(),
            },
            Some(credential) => ConnectionStatus::Connected {
                scopes: credential.scopes,
                expires_at: credential.expires_at,
            },
        };
        Ok(status)
    }

    /// The stored credential, or [`PlanxError::CredentialUnavailable`].
    pub async fn require(&self, user: &UserIdentity) -> Result<Credential, PlanxError> {
        self.store
            .get(user)
            .await?
            .ok_or_else(|| PlanxError::CredentialUnavailable(format!("no credential for {user}")))
    }
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::InMemoryCredentialStore;
    use chrono::Duration;

    fn service() -> CredentialService {
        CredentialService::new(Arc::new(InMemoryCredentialStore::new()))
    }

    fn user(name: &str) -> UserIdentity {
        UserIdentity::new(name).unwrap()
    }

    #[tokio::test]
    async fn grant_rejects_mismatched_owner() {
        let svc = service();
        let err = svc
            .grant(&user("alice"), Credential::new(user("bob"), "t"))
            .await
            .unwrap_err();
        assert!(matches!(err, PlanxError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn status_tracks_grant_expiry_and_revoke() {
        let svc = service();
        let alice = user("alice");
        assert_eq!(svc.status(&alice).await.unwrap(), ConnectionStatus::NotConnected);

        svc.grant(&alice, Credential::new(alice.clone(), "t").with_scopes([Scope::mail()]))
            .await
            .unwrap();
        assert!(matches!(
            svc.status(&alice).await.unwrap(),
            ConnectionStatus::Connected { ref scopes, .. } if scopes.contains(&Scope::mail())
        ));

        let stale = Credential::new(alice.clone(), "t")
            .with_expiry(Utc::now() - Duration::minutes(1))
            .with_refresh_token("r");
        svc.grant(&alice, stale).await.unwrap();
        assert_eq!(
            svc.status(&alice).await.unwrap(),
            ConnectionStatus::Expired { refreshable: true }
        );

        svc.revoke(&alice).await.unwrap();
        assert!(matches!(
            svc.require(&alice).await,
            Err(PlanxError::CredentialUnavailable(_))
        ));
    }
}
