//! Session storage. Only token hashes are stored.

use chrono::{DateTime, Utc};
use herd_id::{SessionId, UserId};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::error::DbError;
use super::users::UserRecord;

/// An issued session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for SessionRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("session_id")?;
        let user_id: String = row.try_get("user_id")?;
        Ok(Self {
            id: SessionId::parse(&id).map_err(|e| sqlx::Error::ColumnDecode {
                index: "session_id".to_string(),
                source: Box::new(e),
            })?,
            user_id: UserId::parse(&user_id).map_err(|e| sqlx::Error::ColumnDecode {
                index: "user_id".to_string(),
                source: Box::new(e),
            })?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Session store handle.
#[derive(Clone)]
pub struct SessionStore {
    pool: PgPool,
}

impl SessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<SessionRecord, DbError> {
        sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO sessions (session_id, token_hash, user_id, ip_address, user_agent, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING session_id, user_id, expires_at, created_at
            "#,
        )
        .bind(SessionId::new().to_string())
        .bind(token_hash)
        .bind(user_id.to_string())
        .bind(ip_address)
        .bind(user_agent)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    /// Finds an unexpired, unrevoked session and its user.
    pub async fn find_active(
        &self,
        token_hash: &str,
    ) -> Result<Option<(SessionRecord, UserRecord)>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT s.session_id, s.user_id, s.expires_at, s.created_at AS session_created_at,
                   u.name, u.email, u.email_verified, u.image, u.created_at, u.updated_at
            FROM sessions s
            JOIN users u ON u.user_id = s.user_id
            WHERE s.token_hash = $1
              AND s.revoked_at IS NULL
              AND s.expires_at > now()
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let decode = |row: &PgRow| -> Result<(SessionRecord, UserRecord), sqlx::Error> {
            let session_id: String = row.try_get("session_id")?;
            let user_id: String = row.try_get("user_id")?;
            let user_id = UserId::parse(&user_id).map_err(|e| sqlx::Error::ColumnDecode {
                index: "user_id".to_string(),
                source: Box::new(e),
            })?;
            let session = SessionRecord {
                id: SessionId::parse(&session_id).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "session_id".to_string(),
                    source: Box::new(e),
                })?,
                user_id,
                expires_at: row.try_get("expires_at")?,
                created_at: row.try_get("session_created_at")?,
            };
            let user = UserRecord {
                id: user_id,
                name: row.try_get("name")?,
                email: row.try_get("email")?,
                email_verified: row.try_get("email_verified")?,
                image: row.try_get("image")?,
                created_at: row.try_get("created_at")?,
                updated_at: row.try_get("updated_at")?,
            };
            Ok((session, user))
        };

        decode(&row).map(Some).map_err(DbError::Query)
    }

    /// Revokes a session. Returns false when nothing active matched.
    pub async fn revoke(&self, token_hash: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET revoked_at = now(), updated_at = now()
            WHERE token_hash = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(result.rows_affected() > 0)
    }
}
