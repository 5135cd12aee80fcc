//! Identity lifecycle
//!
//! Owns account creation (validate, provision, assign default claims,
//! with a compensating delete on partial failure) and credential
//! authorization. All mutation is delegated to the account store; the
//! manager itself holds no state between calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::store::{AccountStore, Claim};
use crate::types::{Error, Result};

/// Claim key carrying the store-internal key
pub const INTERNAL_ID_CLAIM: &str = "iid";
/// Claim key carrying the public user id
pub const USER_ID_CLAIM: &str = "uid";
/// Subject claim key
pub const SUBJECT_CLAIM: &str = "sub";
/// Role claim for the website domain
pub const WEBSITE_ROLE_CLAIM: &str = "systems:website:role";
/// Role claim for the game domain
pub const GAME_ROLE_CLAIM: &str = "systems:game:role";

/// Role level encoded in the per-domain role claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimLevel {
    User,
    Moderator,
    Admin,
}

impl ClaimLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Moderator => "Moderator",
            Self::Admin => "Admin",
        }
    }
}

/// One registered principal.
///
/// `internal_id` is the store's surrogate key; `user_id` is the stable
/// public identifier, generated once at creation and never derived from
/// the username. The password hash is owned by the store and never
/// appears here.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub internal_id: String,
    pub user_id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Public projection of an identity; the only shape that crosses the
/// caller boundary on creation and lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityView {
    pub user_id: Uuid,
    pub username: String,
}

impl From<&Identity> for IdentityView {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id,
            username: identity.username.clone(),
        }
    }
}

/// The claim set every new identity receives. Fixed; callers cannot
/// elevate roles at creation time.
fn default_claims(identity: &Identity) -> Vec<Claim> {
    vec![
        Claim::new(INTERNAL_ID_CLAIM, identity.internal_id.clone()),
        Claim::new(USER_ID_CLAIM, identity.user_id.to_string()),
        Claim::new(SUBJECT_CLAIM, identity.username.clone()),
        Claim::new(WEBSITE_ROLE_CLAIM, ClaimLevel::User.as_str()),
        Claim::new(GAME_ROLE_CLAIM, ClaimLevel::User.as_str()),
    ]
}

/// Minimum accepted username length.
const MIN_USERNAME_CHARS: usize = 6;

/// Identity manager: creation, lookup, credential authorization.
pub struct IdentityManager {
    store: Arc<dyn AccountStore>,
}

impl IdentityManager {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Create a fully provisioned identity.
    ///
    /// Either the account exists with its default claims afterwards, or
    /// nothing of it remains: a claim-assignment failure rolls back the
    /// account record before the error propagates.
    pub async fn create(
        &self,
        username: &str,
        password: &str,
        created_by: &str,
    ) -> Result<IdentityView> {
        if username.chars().count() < MIN_USERNAME_CHARS {
            return Err(Error::Validation("Invalid Username".into()));
        }

        let candidate = Identity {
            internal_id: String::new(),
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: Utc::now(),
            created_by: created_by.to_string(),
        };

        let identity = match self.store.create(candidate, password).await {
            Ok(identity) => identity,
            Err(Error::Rejected(reason)) => {
                error!(
                    "Failed to create Identity with username: {} because: {}",
                    username, reason
                );
                return Err(Error::Creation(format!(
                    "Failed to create Identity with username: {username} because: {reason}"
                )));
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self
            .store
            .add_claims(&identity, default_claims(&identity))
            .await
        {
            let reason = match e {
                Error::Rejected(reason) => reason,
                other => other.to_string(),
            };
            error!(
                "Failed while giving default claims to username: {} because: {}",
                username, reason
            );

            // Compensating rollback: the account must not survive
            // without its claims. A failed rollback leaves the store
            // inconsistent and is escalated, not swallowed.
            if let Err(rollback) = self.store.delete(&identity).await {
                error!(
                    "Rollback delete failed for username: {}; account left without claims: {}",
                    username, rollback
                );
                return Err(Error::Internal(format!(
                    "Rollback failed for username: {username}: {rollback}"
                )));
            }

            return Err(Error::Creation(format!(
                "Failed while giving default claims to username: {username} because: {reason}"
            )));
        }

        info!(
            "Successfully created Identity for {} with id: {} and userId {}",
            identity.username, identity.internal_id, identity.user_id
        );

        Ok(IdentityView::from(&identity))
    }

    /// Look up by the public user id.
    pub async fn get_by_user_id(&self, user_id: Uuid) -> Result<IdentityView> {
        match self.store.find_by_user_id(user_id).await? {
            Some(identity) => Ok(IdentityView::from(&identity)),
            None => {
                error!("Failed to retrieve user with userId {}", user_id);
                Err(Error::NotFound(format!(
                    "Failed to retrieve user with userId {user_id}"
                )))
            }
        }
    }

    /// Verify a credential pair.
    ///
    /// Returns the full internal identity so the token issuer can fetch
    /// claims by the store's native handle. Callers learn only
    /// success/failure; wrong password and other check failures are not
    /// distinguished.
    pub async fn authorize(&self, username: &str, password: &str) -> Result<Identity> {
        let identity = match self.store.find_by_username(username).await? {
            Some(identity) => identity,
            None => {
                error!("Failed to find user: {}", username);
                return Err(Error::NotFound(format!(
                    "Failed to find user with username: {username}"
                )));
            }
        };

        let check = self.store.check_password(&identity, password).await?;

        if check.locked_out {
            error!("{} is locked out!", username);
            return Err(Error::Auth(format!("{username} is locked out!")));
        }

        if !check.succeeded {
            return Err(Error::Auth("Login failed".into()));
        }

        Ok(identity)
    }
}
