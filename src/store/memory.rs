//! In-memory account store
//!
//! Backs dev mode and unit tests. Same policy, uniqueness, and lockout
//! behavior as the MongoDB store, held in a process-local map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::identity::Identity;
use crate::store::{
    validate_password, AccountStore, Claim, PasswordCheck, LOCKOUT_MINUTES, MAX_FAILED_ATTEMPTS,
};
use crate::types::{Error, Result};

struct StoredAccount {
    identity: Identity,
    password_hash: String,
    claims: Vec<Claim>,
    failed_attempts: u32,
    lockout_until: Option<DateTime<Utc>>,
}

/// Account store held entirely in memory, keyed by internal id.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, StoredAccount>>,
    next_id: AtomicU64,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of provisioned accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.read().map(|m| m.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, StoredAccount>>> {
        self.accounts
            .read()
            .map_err(|_| Error::Internal("account store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, StoredAccount>>> {
        self.accounts
            .write()
            .map_err(|_| Error::Internal("account store lock poisoned".into()))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, identity: Identity, password: &str) -> Result<Identity> {
        let reasons = validate_password(password);
        if let Some(reason) = reasons.into_iter().next() {
            return Err(Error::Rejected(reason));
        }

        // Hash outside the lock; argon2 is deliberately slow
        let password_hash = hash_password(password)?;

        let mut accounts = self.write()?;
        if accounts
            .values()
            .any(|a| a.identity.username == identity.username)
        {
            return Err(Error::Rejected(format!(
                "Username '{}' is already taken.",
                identity.username
            )));
        }

        let internal_id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        let identity = Identity {
            internal_id: internal_id.clone(),
            ..identity
        };

        accounts.insert(
            internal_id,
            StoredAccount {
                identity: identity.clone(),
                password_hash,
                claims: Vec::new(),
                failed_attempts: 0,
                lockout_until: None,
            },
        );

        Ok(identity)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
        let accounts = self.read()?;
        Ok(accounts
            .values()
            .find(|a| a.identity.username == username)
            .map(|a| a.identity.clone()))
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Identity>> {
        let accounts = self.read()?;
        Ok(accounts
            .values()
            .find(|a| a.identity.user_id == user_id)
            .map(|a| a.identity.clone()))
    }

    async fn delete(&self, identity: &Identity) -> Result<()> {
        let mut accounts = self.write()?;
        accounts.remove(&identity.internal_id);
        Ok(())
    }

    async fn add_claims(&self, identity: &Identity, claims: Vec<Claim>) -> Result<()> {
        let mut accounts = self.write()?;
        let account = accounts
            .get_mut(&identity.internal_id)
            .ok_or_else(|| Error::Database("account not found for claim assignment".into()))?;
        account.claims.extend(claims);
        Ok(())
    }

    async fn get_claims(&self, identity: &Identity) -> Result<Vec<Claim>> {
        let accounts = self.read()?;
        let account = accounts
            .get(&identity.internal_id)
            .ok_or_else(|| Error::Database("account not found for claim lookup".into()))?;
        Ok(account.claims.clone())
    }

    async fn check_password(&self, identity: &Identity, password: &str) -> Result<PasswordCheck> {
        let mut accounts = self.write()?;
        let account = match accounts.get_mut(&identity.internal_id) {
            Some(a) => a,
            None => {
                return Ok(PasswordCheck {
                    succeeded: false,
                    locked_out: false,
                })
            }
        };

        if let Some(until) = account.lockout_until {
            if until > Utc::now() {
                return Ok(PasswordCheck {
                    succeeded: false,
                    locked_out: true,
                });
            }
        }

        if verify_password(password, &account.password_hash)? {
            account.failed_attempts = 0;
            account.lockout_until = None;
            return Ok(PasswordCheck {
                succeeded: true,
                locked_out: false,
            });
        }

        account.failed_attempts += 1;
        if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
            account.lockout_until = Some(Utc::now() + Duration::minutes(LOCKOUT_MINUTES));
            account.failed_attempts = 0;
            return Ok(PasswordCheck {
                succeeded: false,
                locked_out: true,
            });
        }

        Ok(PasswordCheck {
            succeeded: false,
            locked_out: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(username: &str) -> Identity {
        Identity {
            internal_id: String::new(),
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: Utc::now(),
            created_by: "TEST".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_internal_id() {
        let store = MemoryAccountStore::new();
        let identity = store.create(candidate("Tester"), "Test-1234").await.unwrap();

        assert!(!identity.internal_id.is_empty());
        assert_eq!(store.account_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryAccountStore::new();
        store.create(candidate("Tester"), "Test-1234").await.unwrap();

        let err = store
            .create(candidate("Tester"), "Test-1234")
            .await
            .unwrap_err();
        match err {
            Error::Rejected(reason) => {
                assert_eq!(reason, "Username 'Tester' is already taken.")
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert_eq!(store.account_count(), 1);
    }

    #[tokio::test]
    async fn test_weak_password_rejected_with_first_reason() {
        let store = MemoryAccountStore::new();
        let err = store.create(candidate("Tester"), "test").await.unwrap_err();

        match err {
            Error::Rejected(reason) => {
                assert_eq!(reason, "Passwords must be at least 6 characters.")
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert_eq!(store.account_count(), 0);
    }

    #[tokio::test]
    async fn test_claims_preserve_insertion_order() {
        let store = MemoryAccountStore::new();
        let identity = store.create(candidate("Tester"), "Test-1234").await.unwrap();

        store
            .add_claims(
                &identity,
                vec![Claim::new("sub", "Tester"), Claim::new("uid", "abc")],
            )
            .await
            .unwrap();
        store
            .add_claims(&identity, vec![Claim::new("role", "User")])
            .await
            .unwrap();

        let claims = store.get_claims(&identity).await.unwrap();
        let keys: Vec<&str> = claims.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["sub", "uid", "role"]);
    }

    #[tokio::test]
    async fn test_delete_frees_username() {
        let store = MemoryAccountStore::new();
        let identity = store.create(candidate("Tester"), "Test-1234").await.unwrap();

        store.delete(&identity).await.unwrap();
        assert_eq!(store.account_count(), 0);

        // Username can be provisioned again
        store.create(candidate("Tester"), "Test-1234").await.unwrap();
    }

    #[tokio::test]
    async fn test_lockout_after_repeated_failures() {
        let store = MemoryAccountStore::new();
        let identity = store.create(candidate("Tester"), "Test-1234").await.unwrap();

        for _ in 0..(MAX_FAILED_ATTEMPTS - 1) {
            let check = store.check_password(&identity, "Wrong-999!").await.unwrap();
            assert!(!check.succeeded);
            assert!(!check.locked_out);
        }

        // The attempt that reaches the limit reports the lockout
        let check = store.check_password(&identity, "Wrong-999!").await.unwrap();
        assert!(check.locked_out);

        // Even the correct password is refused while locked
        let check = store.check_password(&identity, "Test-1234").await.unwrap();
        assert!(!check.succeeded);
        assert!(check.locked_out);
    }

    #[tokio::test]
    async fn test_successful_check_resets_counter() {
        let store = MemoryAccountStore::new();
        let identity = store.create(candidate("Tester"), "Test-1234").await.unwrap();

        for _ in 0..3 {
            store.check_password(&identity, "Wrong-999!").await.unwrap();
        }
        let check = store.check_password(&identity, "Test-1234").await.unwrap();
        assert!(check.succeeded);

        // Counter restarted; four more failures do not lock
        for _ in 0..(MAX_FAILED_ATTEMPTS - 1) {
            let check = store.check_password(&identity, "Wrong-999!").await.unwrap();
            assert!(!check.locked_out);
        }
    }
}
