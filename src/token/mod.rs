//! Session token issuance
//!
//! Mints HS256-signed JWTs carrying the identity's claims, read fresh
//! from the account store at issuance time so claim changes take effect
//! immediately. Tokens are never persisted; validity is signature plus
//! expiry, checked by downstream services.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::identity::Identity;
use crate::store::AccountStore;
use crate::types::{Error, Result};

/// Minimum secret length for HS256's security margin.
pub const MIN_SECRET_BYTES: usize = 32;

/// Immutable signing configuration, injected at startup.
#[derive(Debug, Clone)]
pub struct TokenOptions {
    secret: String,
    issuer: String,
    audience: String,
    lifetime_minutes: i64,
}

impl TokenOptions {
    /// Build signing options, enforcing the secret length floor.
    pub fn new(
        secret: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime_minutes: i64,
    ) -> Result<Self> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(Error::Config(format!(
                "token secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }
        if lifetime_minutes <= 0 {
            return Err(Error::Config(
                "token lifetime must be a positive number of minutes".into(),
            ));
        }

        Ok(Self {
            secret,
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime_minutes,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn lifetime_minutes(&self) -> i64 {
        self.lifetime_minutes
    }
}

/// Payload of a session token: registered claims plus the identity's
/// stored claims flattened into the object.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
    #[serde(flatten)]
    pub claims: BTreeMap<String, String>,
}

/// Mints signed session tokens for verified identities.
pub struct TokenIssuer {
    store: Arc<dyn AccountStore>,
    options: TokenOptions,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn AccountStore>, options: TokenOptions) -> Self {
        Self { store, options }
    }

    /// Mint a token for a just-authorized identity.
    ///
    /// A claim-fetch failure for a verified identity is unexpected and
    /// surfaces as an internal error rather than a panic.
    pub async fn create(&self, identity: &Identity) -> Result<String> {
        let stored = self.store.get_claims(identity).await.map_err(|e| {
            Error::Internal(format!(
                "Failed to fetch claims for {}: {}",
                identity.username, e
            ))
        })?;

        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.options.lifetime_minutes);

        let mut claims = BTreeMap::new();
        for claim in stored {
            claims.insert(claim.key, claim.value);
        }

        let payload = SessionClaims {
            iss: self.options.issuer.clone(),
            aud: self.options.audience.clone(),
            iat: now.timestamp() as u64,
            exp: expires_at.timestamp() as u64,
            claims,
        };

        let token = encode(
            &Header::default(),
            &payload,
            &EncodingKey::from_secret(self.options.secret.as_bytes()),
        )
        .map_err(|e| Error::Internal(format!("Failed to sign session token: {e}")))?;

        info!(
            "{} with id: {} successfully logged in!",
            identity.username, identity.internal_id
        );

        Ok(token)
    }
}
