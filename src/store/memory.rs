/// In-process store used by tests and `storage.backend = "memory"` runs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CredentialStore, RefreshTokenRecord, RefreshTokenStore, UserRecord};
use crate::auth::Identity;
use crate::error::DatabaseError;

#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<Identity, UserRecord>>,
    refresh_tokens: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, DatabaseError> {
    mutex
        .lock()
        .map_err(|_| DatabaseError::UnexpectedError("in-memory store lock poisoned".to_string()))
}

fn email_taken(users: &HashMap<Identity, UserRecord>, email: &str, except: Option<Identity>) -> bool {
    users
        .values()
        .any(|user| user.email == email && Some(user.id) != except)
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn insert_user(
        &self,
        email: &str,
        password_digest: &str,
    ) -> Result<UserRecord, DatabaseError> {
        let mut users = lock(&self.users)?;
        if email_taken(&users, email, None) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            ));
        }

        let now = Utc::now();
        let user = UserRecord {
            id: Identity::generate(),
            email: email.to_string(),
            password_digest: password_digest.to_string(),
            is_chirpy_red: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let users = lock(&self.users)?;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    async fn find_by_id(&self, id: Identity) -> Result<Option<UserRecord>, DatabaseError> {
        let users = lock(&self.users)?;
        Ok(users.get(&id).cloned())
    }

    async fn update_credential(
        &self,
        id: Identity,
        email: &str,
        password_digest: &str,
    ) -> Result<UserRecord, DatabaseError> {
        let mut users = lock(&self.users)?;
        if email_taken(&users, email, Some(id)) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            ));
        }

        let user = users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;
        user.email = email.to_string();
        user.password_digest = password_digest.to_string();
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn upgrade_user(&self, id: Identity) -> Result<(), DatabaseError> {
        let mut users = lock(&self.users)?;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;
        user.is_chirpy_red = true;
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DatabaseError> {
        let mut tokens = lock(&self.refresh_tokens)?;
        if tokens.contains_key(&record.token) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Refresh token already exists".to_string(),
            ));
        }
        tokens.insert(record.token.clone(), record);
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        let tokens = lock(&self.refresh_tokens)?;
        Ok(tokens.get(token).cloned())
    }

    async fn revoke(&self, token: &str, revoked_at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        let mut tokens = lock(&self.refresh_tokens)?;
        match tokens.get_mut(token) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(revoked_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(
        &self,
        owner: Identity,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let mut tokens = lock(&self.refresh_tokens)?;
        let mut revoked = 0;
        for record in tokens
            .values_mut()
            .filter(|record| record.owner == owner && record.revoked_at.is_none())
        {
            record.revoked_at = Some(revoked_at);
            revoked += 1;
        }
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(token: &str, owner: Identity) -> RefreshTokenRecord {
        RefreshTokenRecord {
            token: token.to_string(),
            owner,
            expires_at: Utc::now() + Duration::days(60),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        store.insert_user("a@b.co", "digest").await.unwrap();

        match store.insert_user("a@b.co", "other").await {
            Err(DatabaseError::UniqueConstraintViolation(_)) => (),
            other => panic!("Expected unique violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn update_replaces_credential() {
        let store = InMemoryStore::new();
        let user = store.insert_user("a@b.co", "old").await.unwrap();

        let updated = store.update_credential(user.id, "c@d.co", "new").await.unwrap();

        assert_eq!(updated.email, "c@d.co");
        assert_eq!(updated.password_digest, "new");
        assert!(store.find_by_email("a@b.co").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_not_found() {
        let store = InMemoryStore::new();

        match store.update_credential(Identity::generate(), "a@b.co", "x").await {
            Err(DatabaseError::NotFound(_)) => (),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn revoke_sets_timestamp_once() {
        let store = InMemoryStore::new();
        store.insert(record("t1", Identity::generate())).await.unwrap();
        let first = Utc::now();

        assert!(store.revoke("t1", first).await.unwrap());
        assert!(!store.revoke("t1", first + Duration::seconds(5)).await.unwrap());
        assert!(!store.revoke("missing", first).await.unwrap());

        let stored = store.find("t1").await.unwrap().unwrap();
        assert_eq!(stored.revoked_at, Some(first));
    }

    #[tokio::test]
    async fn revoke_all_only_touches_owner() {
        let store = InMemoryStore::new();
        let owner = Identity::generate();
        let other = Identity::generate();
        store.insert(record("a", owner)).await.unwrap();
        store.insert(record("b", owner)).await.unwrap();
        store.insert(record("c", other)).await.unwrap();

        let revoked = store.revoke_all_for_user(owner, Utc::now()).await.unwrap();

        assert_eq!(revoked, 2);
        assert!(store.find("c").await.unwrap().unwrap().revoked_at.is_none());
    }
}
