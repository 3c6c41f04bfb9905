//! Session persistence: per-user append-only message logs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::lock::KeyedLocks;
use crate::error::StoreError;
use crate::types::{Message, UserIdentity};

/// Storage abstraction for conversation logs.
///
/// Logs are append-only: messages are never rewritten or reordered. An
/// `append` of several messages is all-or-nothing from a reader's view.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The user's full log; empty when no session exists yet.
    async fn load(&self, user: &UserIdentity) -> Result<Vec<Message>, StoreError>;
    async fn append(&self, user: &UserIdentity, messages: &[Message]) -> Result<(), StoreError>;
    /// Drop the user's log. Clearing a missing session succeeds.
    async fn clear(&self, user: &UserIdentity) -> Result<(), StoreError>;
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserIdentity, Vec<Message>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identities with a stored log.
    pub async fn users(&self) -> Vec<UserIdentity> {
        let mut users: Vec<_> = self.sessions.read().await.keys().cloned().collect();
        users.sort();
        users
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, user: &UserIdentity) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(&self, user: &UserIdentity, messages: &[Message]) -> Result<(), StoreError> {
        if messages.is_empty() {
            return Ok(());
        }
        self.sessions
            .write()
            .await
            .entry(user.clone())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn clear(&self, user: &UserIdentity) -> Result<(), StoreError> {
        self.sessions.write().await.remove(user);
        Ok(())
    }
}

async fn truncate(path: &Path, len: u64) -> Result<(), StoreError> {
    let file = OpenOptions::new().write(true).open(path).await?;
    file.set_len(len).await?;
    file.sync_data().await?;
    Ok(())
}

/// File-backed session store: one JSON-lines file per user.
#[derive(Debug)]
pub struct FileSessionStore {
    dir: PathBuf,
    locks: KeyedLocks,
}

impl FileSessionStore {
    /// Store logs under `<data_dir>/sessions`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("sessions"),
            locks: KeyedLocks::new(),
        }
    }

    fn session_path(&self, user: &UserIdentity) -> PathBuf {
        self.dir.join(format!("{}.jsonl", user.storage_key()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, user: &UserIdentity) -> Result<Vec<Message>, StoreError> {
        let key = user.storage_key();
        let _guard = self.locks.acquire(&key).await;
        let path = self.session_path(user);
        let raw = match fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        // Every append ends with a newline; an unterminated tail is an
        // append that never finished.
        let complete = match raw.rfind('\n') {
            Some(end) => &raw[..=end],
            None => "",
        };
        if complete.len() < raw.len() {
            tracing::warn!(
                user = %user,
                dropped_bytes = raw.len() - complete.len(),
                "discarding unfinished session append"
            );
            truncate(&path, complete.len() as u64).await?;
        }

        complete
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str::<Message>(line).map_err(|e| StoreError::Corrupt {
                    key: key.clone(),
                    message: format!("line {}: {e}", n + 1),
                })
            })
            .collect()
    }

    async fn append(&self, user: &UserIdentity, messages: &[Message]) -> Result<(), StoreError> {
        if messages.is_empty() {
            return Ok(());
        }
        let mut buffer = String::new();
        for message in messages {
            buffer.push_str(&serde_json::to_string(message)?);
            buffer.push('\n');
        }

        let _guard = self.locks.acquire(&user.storage_key()).await;
        fs::create_dir_all(&self.dir).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.session_path(user))
            .await?;
        let start = file.metadata().await?.len();

        let written = async {
            file.write_all(buffer.as_bytes()).await?;
            file.sync_data().await
        }
        .await;
        if let Err(err) = written {
            // Roll the log back so a failed append leaves no partial line.
            if let Err(rollback) = file.set_len(start).await {
                tracing::error!(user = %user, error = %rollback, "failed to roll back session append");
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn clear(&self, user: &UserIdentity) -> Result<(), StoreError> {
        let _guard = self.locks.acquire(&user.storage_key()).await;
        match fs::remove_file(self.session_path(user)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
