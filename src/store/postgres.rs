/// Postgres-backed store (schema in `migrations/`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, RefreshTokenRecord, RefreshTokenStore, UserRecord};
use crate::auth::Identity;
use crate::error::DatabaseError;

type UserRow = (Uuid, String, String, bool, DateTime<Utc>, DateTime<Utc>);
type RefreshTokenRow = (String, Uuid, DateTime<Utc>, Option<DateTime<Utc>>);

const USER_COLUMNS: &str = "id, email, hashed_password, is_chirpy_red, created_at, updated_at";

fn user_from_row(row: UserRow) -> UserRecord {
    let (id, email, password_digest, is_chirpy_red, created_at, updated_at) = row;
    UserRecord {
        id: Identity::from(id),
        email,
        password_digest,
        is_chirpy_red,
        created_at,
        updated_at,
    }
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PostgresStore {
    async fn insert_user(
        &self,
        email: &str,
        password_digest: &str,
    ) -> Result<UserRecord, DatabaseError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, email, hashed_password, is_chirpy_red, created_at, updated_at)
            VALUES ($1, $2, $3, false, $4, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_digest)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn find_by_id(&self, id: Identity) -> Result<Option<UserRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(user_from_row))
    }

    async fn update_credential(
        &self,
        id: Identity,
        email: &str,
        password_digest: &str,
    ) -> Result<UserRecord, DatabaseError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(email)
        .bind(password_digest)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;

        Ok(user_from_row(row))
    }

    async fn upgrade_user(&self, id: Identity) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE users SET is_chirpy_red = true, updated_at = $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for PostgresStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at, revoked_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(&record.token)
        .bind(record.owner.as_uuid())
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<RefreshTokenRecord>, DatabaseError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            "SELECT token, user_id, expires_at, revoked_at FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(token, owner, expires_at, revoked_at)| RefreshTokenRecord {
            token,
            owner: Identity::from(owner),
            expires_at,
            revoked_at,
        }))
    }

    async fn revoke(&self, token: &str, revoked_at: DateTime<Utc>) -> Result<bool, DatabaseError> {
        // The IS NULL guard keeps the first revocation time
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1, updated_at = $1
            WHERE token = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(revoked_at)
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(
        &self,
        owner: Identity,
        revoked_at: DateTime<Utc>,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1, updated_at = $1
            WHERE user_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(revoked_at)
        .bind(owner.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
