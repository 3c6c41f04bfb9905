//! Tenant identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::PlanxError;

/// Opaque identifier of a tenant.
///
/// Keys both the credential store and the session store. Surrounding
/// whitespace is trimmed; an empty identity is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserIdentity(String);

impl UserIdentity {
    pub fn new(value: impl Into<String>) -> Result<Self, PlanxError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PlanxError::InvalidArgument(
                "user identity must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem-safe key derived from the identity (lowercase hex SHA-256).
    pub fn storage_key(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        digest.iter().map(|byte| format!("{byte:02x}")).collect()
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserIdentity {
    type Err = PlanxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for UserIdentity {
    type Error = PlanxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserIdentity> for String {
    fn from(value: UserIdentity) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_identity() {
        assert!(UserIdentity::new("   ").is_err());
        assert!("".parse::<UserIdentity>().is_err());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let user = UserIdentity::new("  alice@example.com ").unwrap();
        assert_eq!(user.as_str(), "alice@example.com");
    }

    #[test]
    fn storage_key_is_stable_hex_and_path_safe() {
        let user = UserIdentity::new("../../etc/passwd").unwrap();
        let key = user.storage_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, UserIdentity::new("../../etc/passwd").unwrap().storage_key());
    }
}
