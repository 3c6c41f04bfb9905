use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;

use super::credential::Credential;
use crate::error::StoreError;
use crate::session::lock::KeyedLocks;
use crate::types::UserIdentity;

const CREDENTIAL_FILE_VERSION: u32 = 1;

/// Storage abstraction for per-user credentials.
///
/// Implementations must be safe under concurrent access keyed by user and
/// must report backend failures as errors, never as a missing credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, user: &UserIdentity) -> Result<Option<Credential>, StoreError>;
    /// Insert or replace the user's single credential.
    async fn upsert(&self, user: &UserIdentity, credential: &Credential) -> Result<(), StoreError>;
    /// Remove the user's credential. Deleting a missing credential succeeds.
    async fn delete(&self, user: &UserIdentity) -> Result<(), StoreError>;
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<HashMap<UserIdentity, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, user: &UserIdentity) -> Result<Option<Credential>, StoreError> {
        Ok(self.credentials.read().await.get(user).cloned())
    }

    async fn upsert(&self, user: &UserIdentity, credential: &Credential) -> Result<(), StoreError> {
        self.credentials
            .write()
            .await
            .insert(user.clone(), credential.clone());
        Ok(())
    }

    async fn delete(&self, user: &UserIdentity) -> Result<(), StoreError> {
        self.credentials.write().await.remove(user);
        Ok(())
    }
}

/// File-backed credential store: one TOML file per user.
///
/// # Example
/// ```no_run
/// use planx::auth::{Credential, CredentialStore, FileCredentialStore};
/// use planx::types::UserIdentity;
///
/// # async fn example() -> Result<(), planx::error::StoreError> {
/// let store = FileCredentialStore::new("/var/lib/planx");
/// let user = UserIdentity::new("alice").unwrap();
/// store.upsert(&user, &Credential::new(user.clone(), "access")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FileCredentialStore {
    dir: PathBuf,
    locks: KeyedLocks,
}

impl FileCredentialStore {
    /// Store files under `<data_dir>/credentials`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("credentials"),
            locks: KeyedLocks::new(),
        }
    }

    fn credential_path(&self, user: &UserIdentity) -> PathBuf {
        self.dir.join(format!("{}.toml", user.storage_key()))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, user: &UserIdentity) -> Result<Option<Credential>, StoreError> {
        let key = user.storage_key();
        let _guard = self.locks.acquire(&key).await;
        let raw = match fs::read_to_string(self.credential_path(user)).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let file: CredentialFile = toml::from_str(&raw).map_err(|e| StoreError::Corrupt {
            key: key.clone(),
            message: e.to_string(),
        })?;
        if &file.credential.owner != user {
            return Err(StoreError::Corrupt {
                key,
                message: "credential owner does not match requested user".to_string(),
            });
        }
        Ok(Some(file.credential))
    }

    async fn upsert(&self, user: &UserIdentity, credential: &Credential) -> Result<(), StoreError> {
        let key = user.storage_key();
        let _guard = self.locks.acquire(&key).await;
        fs::create_dir_all(&self.dir).await?;
        let file = CredentialFile {
            version: CREDENTIAL_FILE_VERSION,
            saved_at: Utc::now(),
            credential: credential.clone(),
        };
        let serialized = toml::to_string(&file)?;

        let path = self.credential_path(user);
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, serialized).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, user: &UserIdentity) -> Result<(), StoreError> {
        let _guard = self.locks.acquire(&user.storage_key()).await;
        match fs::remove_file(self.credential_path(user)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialFile {
    version: u32,
    saved_at: DateTime<Utc>,
    credential: Credential,
}
