//! User storage.

use chrono::{DateTime, Utc};
use herd_id::UserId;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::error::{is_unique_violation, DbError};

/// A registered user. The password hash never leaves the store.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for UserRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("user_id")?;
        let id = UserId::parse(&id).map_err(|e| sqlx::Error::ColumnDecode {
            index: "user_id".to_string(),
            source: Box::new(e),
        })?;
        Ok(Self {
            id,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            email_verified: row.try_get("email_verified")?,
            image: row.try_get("image")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// User store handle.
#[derive(Clone)]
pub struct UserStore {
    pool: PgPool,
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers a user. Emails are stored lowercased.
    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRecord, DbError> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (user_id, name, email, password_hash)
            VALUES ($1, $2, lower($3), $4)
            RETURNING user_id, name, email, email_verified, image, created_at, updated_at
            "#,
        )
        .bind(UserId::new().to_string())
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DbError::EmailTaken
            } else {
                DbError::Query(e)
            }
        })
    }

    /// Looks up a user with their stored password hash.
    pub async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<(UserRecord, String)>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, name, email, email_verified, image, created_at, updated_at, password_hash
            FROM users
            WHERE email = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user = <UserRecord as sqlx::FromRow<PgRow>>::from_row(&row).map_err(DbError::Query)?;
        let hash: String = row.try_get("password_hash").map_err(DbError::Query)?;
        Ok(Some((user, hash)))
    }
}
