//! MongoDB-backed account store
//!
//! One `accounts` collection with a unique index on `username` (the
//! uniqueness invariant lives here) and a lookup index on `user_id`.
//! Duplicate-key writes are reported as a rejection, not a backend
//! failure, so the identity manager can surface the reason.

use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password};
use crate::identity::Identity;
use crate::store::{
    validate_password, AccountStore, Claim, PasswordCheck, LOCKOUT_MINUTES, MAX_FAILED_ATTEMPTS,
};
use crate::types::{Error, Result};

/// Collection name for accounts
pub const ACCOUNT_COLLECTION: &str = "accounts";

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the connection with a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Bound server selection so an unreachable MongoDB fails fast
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| Error::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Liveness check for readiness probes
    pub async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| Error::Database(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Account document stored in MongoDB
///
/// The password hash never leaves this module.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AccountDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Public stable identifier, distinct from `_id`
    pub user_id: String,

    pub username: String,

    /// Argon2 PHC hash
    pub password_hash: String,

    pub created_at: DateTime,
    pub created_by: String,

    /// Claims in insertion order
    #[serde(default)]
    pub claims: Vec<Claim>,

    /// Consecutive failed credential checks
    #[serde(default)]
    pub failed_attempts: i32,

    /// Set while the account is locked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockout_until: Option<DateTime>,
}

impl AccountDoc {
    fn into_identity(self) -> Result<Identity> {
        let internal_id = self
            ._id
            .map(|oid| oid.to_hex())
            .ok_or_else(|| Error::Database("account document missing _id".into()))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| Error::Database(format!("malformed user_id in account document: {e}")))?;

        Ok(Identity {
            internal_id,
            user_id,
            username: self.username,
            created_at: self.created_at.to_chrono(),
            created_by: self.created_by,
        })
    }
}

/// Account store backed by MongoDB
#[derive(Clone)]
pub struct MongoAccountStore {
    collection: Collection<AccountDoc>,
}

impl MongoAccountStore {
    /// Open the accounts collection and apply its indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        let collection = client
            .inner()
            .database(client.db_name())
            .collection::<AccountDoc>(ACCOUNT_COLLECTION);

        let indices = vec![
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("username_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1 })
                .options(
                    IndexOptions::builder()
                        .name("user_id_index".to_string())
                        .build(),
                )
                .build(),
        ];

        collection
            .create_indexes(indices)
            .await
            .map_err(|e| Error::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(Self { collection })
    }

    fn object_id(identity: &Identity) -> Result<ObjectId> {
        ObjectId::parse_str(&identity.internal_id)
            .map_err(|e| Error::Database(format!("malformed internal id: {e}")))
    }

    async fn fetch(&self, identity: &Identity) -> Result<Option<AccountDoc>> {
        let oid = Self::object_id(identity)?;
        self.collection
            .find_one(doc! { "_id": oid })
            .await
            .map_err(|e| Error::Database(format!("Find failed: {}", e)))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == 11000
    )
}

#[async_trait]
impl AccountStore for MongoAccountStore {
    async fn create(&self, identity: Identity, password: &str) -> Result<Identity> {
        let reasons = validate_password(password);
        if let Some(reason) = reasons.into_iter().next() {
            return Err(Error::Rejected(reason));
        }

        let password_hash = hash_password(password)?;

        let document = AccountDoc {
            _id: None,
            user_id: identity.user_id.to_string(),
            username: identity.username.clone(),
            password_hash,
            created_at: DateTime::from_chrono(identity.created_at),
            created_by: identity.created_by.clone(),
            claims: Vec::new(),
            failed_attempts: 0,
            lockout_until: None,
        };

        let result = match self.collection.insert_one(document).await {
            Ok(r) => r,
            Err(e) if is_duplicate_key(&e) => {
                return Err(Error::Rejected(format!(
                    "Username '{}' is already taken.",
                    identity.username
                )))
            }
            Err(e) => return Err(Error::Database(format!("Insert failed: {}", e))),
        };

        let internal_id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| Error::Database("Failed to get inserted ID".into()))?
            .to_hex();

        Ok(Identity {
            internal_id,
            ..identity
        })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
        let doc = self
            .collection
            .find_one(doc! { "username": username })
            .await
            .map_err(|e| Error::Database(format!("Find failed: {}", e)))?;

        doc.map(AccountDoc::into_identity).transpose()
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Identity>> {
        let doc = self
            .collection
            .find_one(doc! { "user_id": user_id.to_string() })
            .await
            .map_err(|e| Error::Database(format!("Find failed: {}", e)))?;

        doc.map(AccountDoc::into_identity).transpose()
    }

    async fn delete(&self, identity: &Identity) -> Result<()> {
        let oid = Self::object_id(identity)?;
        self.collection
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(|e| Error::Database(format!("Delete failed: {}", e)))?;
        Ok(())
    }

    async fn add_claims(&self, identity: &Identity, claims: Vec<Claim>) -> Result<()> {
        let oid = Self::object_id(identity)?;
        let claims = bson::to_bson(&claims)
            .map_err(|e| Error::Database(format!("Failed to serialize claims: {}", e)))?;

        let result = self
            .collection
            .update_one(
                doc! { "_id": oid },
                doc! { "$push": { "claims": { "$each": claims } } },
            )
            .await
            .map_err(|e| Error::Database(format!("Update failed: {}", e)))?;

        if result.matched_count == 0 {
            return Err(Error::Database(
                "account not found for claim assignment".into(),
            ));
        }
        Ok(())
    }

    async fn get_claims(&self, identity: &Identity) -> Result<Vec<Claim>> {
        let doc = self
            .fetch(identity)
            .await?
            .ok_or_else(|| Error::Database("account not found for claim lookup".into()))?;
        Ok(doc.claims)
    }

    async fn check_password(&self, identity: &Identity, password: &str) -> Result<PasswordCheck> {
        let oid = Self::object_id(identity)?;
        let account = match self.fetch(identity).await? {
            Some(a) => a,
            None => {
                return Ok(PasswordCheck {
                    succeeded: false,
                    locked_out: false,
                })
            }
        };

        if let Some(until) = account.lockout_until {
            if until.to_chrono() > chrono::Utc::now() {
                return Ok(PasswordCheck {
                    succeeded: false,
                    locked_out: true,
                });
            }
        }

        if verify_password(password, &account.password_hash)? {
            self.collection
                .update_one(
                    doc! { "_id": oid },
                    doc! { "$set": { "failed_attempts": 0 }, "$unset": { "lockout_until": "" } },
                )
                .await
                .map_err(|e| Error::Database(format!("Update failed: {}", e)))?;
            return Ok(PasswordCheck {
                succeeded: true,
                locked_out: false,
            });
        }

        let failed = account.failed_attempts + 1;
        if failed >= MAX_FAILED_ATTEMPTS as i32 {
            let until = chrono::Utc::now() + chrono::Duration::minutes(LOCKOUT_MINUTES);
            self.collection
                .update_one(
                    doc! { "_id": oid },
                    doc! { "$set": {
                        "failed_attempts": 0,
                        "lockout_until": DateTime::from_chrono(until),
                    } },
                )
                .await
                .map_err(|e| Error::Database(format!("Update failed: {}", e)))?;
            return Ok(PasswordCheck {
                succeeded: false,
                locked_out: true,
            });
        }

        self.collection
            .update_one(
                doc! { "_id": oid },
                doc! { "$set": { "failed_attempts": failed } },
            )
            .await
            .map_err(|e| Error::Database(format!("Update failed: {}", e)))?;

        Ok(PasswordCheck {
            succeeded: false,
            locked_out: false,
        })
    }
}

#[cfg(test)]
mod tests {
    // Store behavior against a live MongoDB is covered by deployment
    // smoke tests; the document mapping is testable here.
    use super::*;

    #[test]
    fn test_account_doc_into_identity() {
        let oid = ObjectId::new();
        let user_id = Uuid::new_v4();
        let doc = AccountDoc {
            _id: Some(oid),
            user_id: user_id.to_string(),
            username: "Tester".into(),
            password_hash: "$argon2id$...".into(),
            created_at: DateTime::now(),
            created_by: "TEST".into(),
            claims: vec![Claim::new("sub", "Tester")],
            failed_attempts: 0,
            lockout_until: None,
        };

        let identity = doc.into_identity().unwrap();
        assert_eq!(identity.internal_id, oid.to_hex());
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.username, "Tester");
    }

    #[test]
    fn test_account_doc_rejects_malformed_user_id() {
        let doc = AccountDoc {
            _id: Some(ObjectId::new()),
            user_id: "not-a-uuid".into(),
            username: "Tester".into(),
            password_hash: "$argon2id$...".into(),
            created_at: DateTime::now(),
            created_by: "TEST".into(),
            claims: Vec::new(),
            failed_attempts: 0,
            lockout_until: None,
        };
        assert!(doc.into_identity().is_err());
    }

    #[test]
    fn test_serialized_doc_omits_empty_optionals() {
        let doc = AccountDoc {
            _id: None,
            user_id: Uuid::new_v4().to_string(),
            username: "Tester".into(),
            password_hash: "$argon2id$...".into(),
            created_at: DateTime::now(),
            created_by: "TEST".into(),
            claims: Vec::new(),
            failed_attempts: 0,
            lockout_until: None,
        };
        let bson_doc = bson::to_document(&doc).unwrap();
        assert!(!bson_doc.contains_key("_id"));
        assert!(!bson_doc.contains_key("lockout_until"));
    }
}
