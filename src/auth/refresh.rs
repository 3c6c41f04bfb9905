//! Refresh-if-expired credential resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::credential::{Credential, Scope};
use super::error::AuthError;
use super::store::CredentialStore;
use crate::error::PlanxError;
use crate::session::KeyedLocks;
use crate::types::UserIdentity;

/// Exchanges an expired credential's refresh token for a renewed credential.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError>;
}

/// Resolves a user's usable credential at the reasoning/tool boundary.
///
/// * no stored credential: `None`
/// * valid credential: returned as stored
/// * expired with a refresh token: refreshed and upserted; a failed refresh
///   degrades to `None` instead of failing the turn
/// * expired without a way to refresh: `None`
///
/// Store failures are always propagated as [`PlanxError::StoreUnavailable`].
///
/// Refreshes for one user are serialized across clones, so a rotating
/// refresh token is only ever spent once.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    refresher: Option<Arc<dyn CredentialRefresher>>,
    refreshing: Arc<KeyedLocks>,
}

impl CredentialResolver {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        refresher: Option<Arc<dyn CredentialRefresher>>,
    ) -> Self {
        Self {
            store,
            refresher,
            refreshing: Arc::new(KeyedLocks::new()),
        }
    }

    pub async fn resolve(&self, user: &UserIdentity) -> Result<Option<Credential>, PlanxError> {
        let Some(credential) = self.store.get(user).await? else {
            return Ok(None);
        };
        if !credential.is_expired() {
            return Ok(Some(credential));
        }

        let _guard = self.refreshing.acquire(&user.storage_key()).await;
        // Whoever held the guard before us may already have refreshed.
        let Some(credential) = self.store.get(user).await? else {
            return Ok(None);
        };
        if !credential.is_expired() {
            return Ok(Some(credential));
        }
        if !credential.can_refresh() {
            tracing::debug!(user = %user, "credential expired without refresh token");
            return Ok(None);
        }
        let Some(refresher) = &self.refresher else {
            tracing::debug!(user = %user, "credential expired and no refresher configured");
            return Ok(None);
        };

        match refresher.refresh(&credential).await {
            Ok(mut renewed) => {
                renewed.owner = user.clone();
                renewed.last_refresh = Some(Utc::now());
                self.store.upsert(user, &renewed).await?;
                tracing::info!(user = %user, expires_at = ?renewed.expires_at, "credential refreshed");
                Ok(Some(renewed))
            }
            Err(err) => {
                tracing::warn!(user = %user, error = %err, "credential refresh failed; hiding scoped tools");
                Ok(None)
            }
        }
    }

    /// Scopes granted by the user's usable credential (empty when absent).
    pub async fn granted_scopes(&self, user: &UserIdentity) -> Result<BTreeSet<Scope>, PlanxError> {
        Ok(self
            .resolve(user)
            .await?
            .map(|credential| credential.scopes)
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("refresher", &self.refresher.as_ref().map(|_| ".."))
            .finish()
    }
}
