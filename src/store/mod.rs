/// Persistence collaborator
///
/// The authentication core only talks to storage through these traits.
/// Implementations must make each single-record update atomic; the core has
/// no locking of its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::{Identity, Owned};
use crate::error::DatabaseError;

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Stored user with its credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Identity,
    pub email: String,
    /// bcrypt digest, never the plaintext
    pub password_digest: String,
    pub is_chirpy_red: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owned for UserRecord {
    fn owner(&self) -> Identity {
        self.id
    }
}

/// Stored refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    /// Lookup key: SHA-256 hex digest of the token handed to the client
    pub token: String,
    pub owner: Identity,
    pub expires_at: DateTime<Utc>,
    /// Set once on revocation, never cleared
    pub revoked_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create a user; `UniqueConstraintViolation` if the email is taken
    async fn insert_user(&self, email: &str, password_digest: &str)
        -> Result<UserRecord, DatabaseError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;

    async fn find_by_id(&self, id: Identity) -> Result<Option<UserRecord>, DatabaseError>;

    /// Replace email and password digest wholesale; `NotFound` if no such user
    async fn update_credential(
        &self,
        id: Identity,
        email: &str,
        password_digest: &str,
    ) -> Result<UserRecord, DatabaseError>;

    /// Mark the user as premium; `NotFound` if no such user
    async fn upgrade_user(&self, id: Identity) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DatabaseError>;

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError>;

    /// Set `revoked_at` if the token exists and is not revoked yet.
    /// Returns whether a record changed.
    async fn revoke(&self, token: &str, revoked_at: DateTime<Utc>) -> Result<bool, DatabaseError>;

    /// Revoke every not-yet-revoked token of `owner`, returning how many changed
    async fn revoke_all_for_user(
        &self,
        owner: Identity,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError>;
}
