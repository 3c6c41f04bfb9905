//! Per-user external-service credentials: storage, refresh and grants.

pub mod credential;
pub mod error;
#[cfg(feature = "oauth")]
pub mod oauth;
pub mod refresh;
pub mod service;
pub mod store;

pub use credential::{Credential, Scope, CALENDAR_SCOPE, MAIL_SCOPE};
pub use error::AuthError;
pub use refresh::{CredentialRefresher, CredentialResolver};
pub use service::{ConnectionStatus, CredentialService};
pub use store::{CredentialStore, FileCredentialStore, InMemoryCredentialStore};
