//! Account store capability
//!
//! Durable mapping from a stable user identifier to username, password
//! hash, and claims. The store is the only component that touches
//! password material and the only point of shared-resource access;
//! username uniqueness is enforced here, not by callers.
//!
//! Two implementations: [`MongoAccountStore`] for production and
//! [`MemoryAccountStore`] for dev mode and tests. Any engine satisfying
//! [`AccountStore`] is interchangeable.

pub mod memory;
pub mod mongo;

pub use memory::MemoryAccountStore;
pub use mongo::{MongoAccountStore, MongoClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Identity;
use crate::types::Result;

/// A single key/value claim attached to an identity.
///
/// Claims are ordered and not unique-constrained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub key: String,
    pub value: String,
}

impl Claim {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Outcome of a credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordCheck {
    pub succeeded: bool,
    pub locked_out: bool,
}

/// Consecutive failed checks before an account locks.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// How long a lockout lasts once triggered.
pub const LOCKOUT_MINUTES: i64 = 5;

/// Capability contract for account storage.
///
/// Policy and uniqueness violations are reported as
/// [`Error::Rejected`](crate::Error::Rejected) carrying the first
/// reported reason; backend failures surface as
/// [`Error::Database`](crate::Error::Database).
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Provision an account for a candidate identity. The store hashes
    /// the password, assigns the internal key, and returns the identity
    /// with that key filled in.
    async fn create(&self, identity: Identity, password: &str) -> Result<Identity>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>>;

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Identity>>;

    /// Hard delete; frees the username for reuse.
    async fn delete(&self, identity: &Identity) -> Result<()>;

    async fn add_claims(&self, identity: &Identity, claims: Vec<Claim>) -> Result<()>;

    /// Claims in insertion order.
    async fn get_claims(&self, identity: &Identity) -> Result<Vec<Claim>>;

    /// Verify a credential, tracking failed attempts and lockout.
    /// A locked account reports `locked_out` without touching the counter.
    async fn check_password(&self, identity: &Identity, password: &str) -> Result<PasswordCheck>;
}

/// Password policy shared by all store implementations.
///
/// Returns every violated rule; the first entry is the reason a store
/// reports on rejection.
pub fn validate_password(password: &str) -> Vec<String> {
    let mut reasons = Vec::new();

    if password.chars().count() < 6 {
        reasons.push("Passwords must be at least 6 characters.".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        reasons.push("Passwords must have at least one digit ('0'-'9').".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        reasons.push("Passwords must have at least one lowercase ('a'-'z').".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        reasons.push("Passwords must have at least one uppercase ('A'-'Z').".to_string());
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        reasons.push("Passwords must have at least one non alphanumeric character.".to_string());
    }

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_compliant_password() {
        assert!(validate_password("Test-1234").is_empty());
    }

    #[test]
    fn test_length_violation_reported_first() {
        let reasons = validate_password("test");
        assert_eq!(reasons[0], "Passwords must be at least 6 characters.");
    }

    #[test]
    fn test_all_violations_collected() {
        // Too short, no digit, no uppercase, no symbol
        let reasons = validate_password("abc");
        assert_eq!(reasons.len(), 4);
    }

    #[test]
    fn test_missing_symbol_only() {
        let reasons = validate_password("Test1234");
        assert_eq!(
            reasons,
            vec!["Passwords must have at least one non alphanumeric character.".to_string()]
        );
    }
}
