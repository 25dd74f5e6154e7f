/// Refresh Token Management
///
/// Refresh tokens are:
/// - 32 cryptographically random bytes, hex-encoded (64 characters)
/// - Stored under their SHA-256 digest, never as plaintext
/// - Valid for a fixed window (60 days by default)
/// - Revocable; revocation is permanent and records are never deleted
///
/// An identity may hold several live tokens at once (one per device).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::auth::identity::Identity;
use crate::error::AuthError;
use crate::store::{RefreshTokenRecord, RefreshTokenStore};

pub const REFRESH_TOKEN_BYTES: usize = 32;
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 60;

/// Generate a new cryptographically secure refresh token
pub fn generate_refresh_token() -> String {
    let bytes: [u8; REFRESH_TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Storage key for a refresh token
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// A freshly created refresh token, as handed to the client
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub token: String,
    pub owner: Identity,
    pub expires_at: DateTime<Utc>,
}

/// Owns the refresh token lifecycle: create, validate, revoke.
///
/// The only component allowed to write `revoked_at`.
#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn RefreshTokenStore>,
    ttl: Duration,
}

impl RefreshTokenManager {
    pub fn new(store: Arc<dyn RefreshTokenStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Create and persist a new refresh token for `identity`
    ///
    /// # Errors
    /// `StorageUnavailable` if the record could not be persisted. Not retried.
    pub async fn create(&self, identity: Identity) -> Result<RefreshToken, AuthError> {
        self.create_at(identity, Utc::now()).await
    }

    pub async fn create_at(
        &self,
        identity: Identity,
        now: DateTime<Utc>,
    ) -> Result<RefreshToken, AuthError> {
        let token = generate_refresh_token();
        let expires_at = now + self.ttl;

        self.store
            .insert(RefreshTokenRecord {
                token: hash_token(&token),
                owner: identity,
                expires_at,
                revoked_at: None,
            })
            .await
            .map_err(AuthError::from_storage)?;

        tracing::info!(user_id = %identity, expires_at = %expires_at, "Refresh token created");

        Ok(RefreshToken {
            token,
            owner: identity,
            expires_at,
        })
    }

    /// Resolve a refresh token to its owner
    ///
    /// Checks, in order:
    /// 1. Token exists (`UnknownToken`)
    /// 2. Token has not expired (`ExpiredToken`)
    /// 3. Token has not been revoked (`RevokedToken`)
    pub async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        self.validate_at(token, Utc::now()).await
    }

    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let record = self
            .store
            .find(&hash_token(token))
            .await
            .map_err(AuthError::from_storage)?;

        let record = match record {
            Some(record) => record,
            None => {
                tracing::warn!("Refresh token not found");
                return Err(AuthError::UnknownToken);
            }
        };

        if now >= record.expires_at {
            tracing::info!(user_id = %record.owner, "Refresh token expired");
            return Err(AuthError::ExpiredToken);
        }

        if record.revoked_at.is_some() {
            tracing::warn!(user_id = %record.owner, "Attempt to use revoked refresh token");
            return Err(AuthError::RevokedToken);
        }

        Ok(record.owner)
    }

    /// Revoke a refresh token
    ///
    /// Unknown and already-revoked tokens are accepted silently so that
    /// logout always succeeds.
    ///
    /// # Errors
    /// Only `StorageUnavailable`
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let changed = self
            .store
            .revoke(&hash_token(token), Utc::now())
            .await
            .map_err(AuthError::from_storage)?;

        if changed {
            tracing::info!("Refresh token revoked");
        } else {
            tracing::debug!("Revocation of unknown or already revoked refresh token");
        }

        Ok(())
    }

    /// Revoke every live refresh token of `identity` (logout everywhere)
    pub async fn revoke_all(&self, identity: Identity) -> Result<u64, AuthError> {
        let revoked = self
            .store
            .revoke_all_for_user(identity, Utc::now())
            .await
            .map_err(AuthError::from_storage)?;

        tracing::info!(user_id = %identity, revoked = revoked, "All refresh tokens revoked for user");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseError;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    fn manager(store: Arc<InMemoryStore>) -> RefreshTokenManager {
        RefreshTokenManager::new(store, Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS))
    }

    struct UnavailableStore;

    #[async_trait]
    impl RefreshTokenStore for UnavailableStore {
        async fn insert(&self, _: RefreshTokenRecord) -> Result<(), DatabaseError> {
            Err(DatabaseError::ConnectionPool("connection refused".to_string()))
        }

        async fn find(&self, _: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
            Err(DatabaseError::ConnectionPool("connection refused".to_string()))
        }

        async fn revoke(&self, _: &str, _: DateTime<Utc>) -> Result<bool, DatabaseError> {
            Err(DatabaseError::ConnectionPool("connection refused".to_string()))
        }

        async fn revoke_all_for_user(
            &self,
            _: Identity,
            _: DateTime<Utc>,
        ) -> Result<u64, DatabaseError> {
            Err(DatabaseError::ConnectionPool("connection refused".to_string()))
        }
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token();

        assert_eq!(token.len(), 64);
        let decoded = hex::decode(&token).expect("token should be hex");
        assert_eq!(decoded.len(), REFRESH_TOKEN_BYTES);
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_refresh_token(), generate_refresh_token());
    }

    #[test]
    fn test_token_hashing() {
        let token = generate_refresh_token();

        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
        assert_eq!(hash_token(&token).len(), 64);
    }

    #[tokio::test]
    async fn create_then_validate_returns_owner() {
        let manager = manager(Arc::new(InMemoryStore::new()));
        let identity = Identity::generate();

        let created = manager.create(identity).await.unwrap();

        assert_eq!(created.owner, identity);
        assert_eq!(manager.validate(&created.token).await, Ok(identity));
    }

    #[tokio::test]
    async fn plaintext_token_is_not_stored() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(store.clone());

        let created = manager.create(Identity::generate()).await.unwrap();

        assert!(store.find(&created.token).await.unwrap().is_none());
        let stored = store.find(&hash_token(&created.token)).await.unwrap().unwrap();
        assert_eq!(stored.expires_at, created.expires_at);
        assert!(stored.revoked_at.is_none());
    }

    #[tokio::test]
    async fn expiry_is_sixty_days_out() {
        let manager = manager(Arc::new(InMemoryStore::new()));
        let now = Utc::now();

        let created = manager.create_at(Identity::generate(), now).await.unwrap();

        assert_eq!(created.expires_at, now + Duration::days(60));
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let manager = manager(Arc::new(InMemoryStore::new()));

        let result = manager.validate(&generate_refresh_token()).await;

        assert_eq!(result, Err(AuthError::UnknownToken));
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let manager = manager(Arc::new(InMemoryStore::new()));
        let created = manager.create(Identity::generate()).await.unwrap();

        manager.revoke(&created.token).await.unwrap();

        assert_eq!(
            manager.validate(&created.token).await,
            Err(AuthError::RevokedToken)
        );
    }

    #[tokio::test]
    async fn expired_token_is_rejected_without_revocation() {
        let manager = manager(Arc::new(InMemoryStore::new()));
        let created = manager.create(Identity::generate()).await.unwrap();

        let at_expiry = manager.validate_at(&created.token, created.expires_at).await;
        let before_expiry = manager
            .validate_at(&created.token, created.expires_at - Duration::seconds(1))
            .await;

        assert_eq!(at_expiry, Err(AuthError::ExpiredToken));
        assert_eq!(before_expiry, Ok(created.owner));
    }

    #[tokio::test]
    async fn token_created_in_the_past_expires() {
        let manager = manager(Arc::new(InMemoryStore::new()));
        let long_ago = Utc::now() - Duration::days(61);
        let created = manager.create_at(Identity::generate(), long_ago).await.unwrap();

        assert_eq!(
            manager.validate(&created.token).await,
            Err(AuthError::ExpiredToken)
        );
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let manager = manager(store.clone());
        let created = manager.create(Identity::generate()).await.unwrap();

        manager.revoke(&created.token).await.unwrap();
        let first = store.find(&hash_token(&created.token)).await.unwrap().unwrap();

        assert_eq!(manager.revoke(&created.token).await, Ok(()));
        let second = store.find(&hash_token(&created.token)).await.unwrap().unwrap();
        assert_eq!(first.revoked_at, second.revoked_at);
    }

    #[tokio::test]
    async fn revoking_unknown_token_succeeds() {
        let manager = manager(Arc::new(InMemoryStore::new()));

        assert_eq!(manager.revoke("never-issued").await, Ok(()));
    }

    #[tokio::test]
    async fn identity_may_hold_several_live_tokens() {
        let manager = manager(Arc::new(InMemoryStore::new()));
        let identity = Identity::generate();

        let phone = manager.create(identity).await.unwrap();
        let laptop = manager.create(identity).await.unwrap();

        assert_ne!(phone.token, laptop.token);
        assert_eq!(manager.validate(&phone.token).await, Ok(identity));
        assert_eq!(manager.validate(&laptop.token).await, Ok(identity));

        manager.revoke(&phone.token).await.unwrap();
        assert_eq!(manager.validate(&laptop.token).await, Ok(identity));
    }

    #[tokio::test]
    async fn revoke_all_ends_every_session() {
        let manager = manager(Arc::new(InMemoryStore::new()));
        let identity = Identity::generate();
        let bystander = manager.create(Identity::generate()).await.unwrap();
        let phone = manager.create(identity).await.unwrap();
        let laptop = manager.create(identity).await.unwrap();

        assert_eq!(manager.revoke_all(identity).await, Ok(2));

        assert_eq!(manager.validate(&phone.token).await, Err(AuthError::RevokedToken));
        assert_eq!(manager.validate(&laptop.token).await, Err(AuthError::RevokedToken));
        assert_eq!(manager.validate(&bystander.token).await, Ok(bystander.owner));
    }

    #[tokio::test]
    async fn storage_failures_surface_as_unavailable() {
        let manager = RefreshTokenManager::new(Arc::new(UnavailableStore), Duration::days(60));

        assert_eq!(
            manager.create(Identity::generate()).await.err(),
            Some(AuthError::StorageUnavailable)
        );
        assert_eq!(manager.validate("abc").await, Err(AuthError::StorageUnavailable));
        assert_eq!(manager.revoke("abc").await, Err(AuthError::StorageUnavailable));
    }
}
