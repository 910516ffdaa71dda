//! Cattle storage.
//!
//! Tag uniqueness is guaranteed by the `UNIQUE` constraint on
//! `cattle.tag_number`; batch inserts re-check the computed tags inside the
//! insert transaction and abort the whole batch on any collision.

use chrono::{DateTime, Utc};
use herd_id::CattleId;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, warn};

use super::error::{is_unique_violation, DbError};

const CATTLE_COLUMNS: &str =
    "cattle_id, tag_number, gender, breed, mass, received_at, received_age";

/// Sex/class of an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Bul,
    Vers,
    Os,
    Koei,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Bul => "bul",
            Gender::Vers => "vers",
            Gender::Os => "os",
            Gender::Koei => "koei",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bul" => Some(Gender::Bul),
            "vers" => Some(Gender::Vers),
            "os" => Some(Gender::Os),
            "koei" => Some(Gender::Koei),
            _ => None,
        }
    }
}

/// A stored animal.
#[derive(Debug, Clone, Serialize)]
pub struct CattleRecord {
    pub id: CattleId,
    pub tag_number: String,
    pub gender: Gender,
    pub breed: String,
    pub mass: i32,
    pub received_at: DateTime<Utc>,
    /// Age in months on arrival.
    pub received_age: i32,
}

impl<'r> sqlx::FromRow<'r, PgRow> for CattleRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("cattle_id")?;
        let id = CattleId::parse(&id).map_err(|e| sqlx::Error::ColumnDecode {
            index: "cattle_id".to_string(),
            source: Box::new(e),
        })?;

        let gender: String = row.try_get("gender")?;
        let gender = Gender::parse(&gender).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "gender".to_string(),
            source: format!("unknown gender '{gender}'").into(),
        })?;

        Ok(Self {
            id,
            tag_number: row.try_get("tag_number")?,
            gender,
            breed: row.try_get("breed")?,
            mass: row.try_get("mass")?,
            received_at: row.try_get("received_at")?,
            received_age: row.try_get("received_age")?,
        })
    }
}

/// Attributes shared by every animal in one add request.
#[derive(Debug, Clone)]
pub struct NewCattle {
    pub gender: Gender,
    pub breed: String,
    pub mass: i32,
    pub received_at: DateTime<Utc>,
    pub received_age: i32,
}

/// Edit of an existing animal. Intake fields are only changed when present.
#[derive(Debug, Clone)]
pub struct CattleUpdate {
    pub gender: Gender,
    pub breed: String,
    pub mass: i32,
    pub received_at: Option<DateTime<Utc>>,
    pub received_age: Option<i32>,
}

/// Escapes `%`, `_` and `\` and wraps the term for a substring `ILIKE`.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Cattle store handle.
#[derive(Clone)]
pub struct CattleStore {
    pool: PgPool,
}

impl CattleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Every tag currently stored. This is the allocator's snapshot.
    pub async fn all_tags(&self) -> Result<Vec<String>, DbError> {
        sqlx::query_scalar("SELECT tag_number FROM cattle")
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    /// Stored tags out of `tags`.
    pub async fn existing_tags(&self, tags: &[String]) -> Result<Vec<String>, DbError> {
        sqlx::query_scalar(
            "SELECT tag_number FROM cattle WHERE tag_number = ANY($1) ORDER BY tag_number",
        )
        .bind(tags)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    /// Inserts one animal per tag, all sharing `attrs`.
    ///
    /// Either every tag is inserted or none is. Tags that are already stored,
    /// whether found by the pre-check or by the unique constraint during a
    /// concurrent insert, are reported as [`DbError::TagsExist`].
    pub async fn insert_batch(
        &self,
        attrs: &NewCattle,
        tags: &[String],
    ) -> Result<Vec<CattleRecord>, DbError> {
        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        let existing: Vec<String> = sqlx::query_scalar(
            "SELECT tag_number FROM cattle WHERE tag_number = ANY($1) ORDER BY tag_number",
        )
        .bind(tags)
        .fetch_all(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        if !existing.is_empty() {
            return Err(DbError::TagsExist(existing));
        }

        let insert = format!(
            r#"
            INSERT INTO cattle (cattle_id, tag_number, gender, breed, mass, received_at, received_age)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CATTLE_COLUMNS}
            "#
        );

        let mut records = Vec::with_capacity(tags.len());
        for tag in tags {
            let result = sqlx::query_as::<_, CattleRecord>(&insert)
                .bind(CattleId::new().to_string())
                .bind(tag)
                .bind(attrs.gender.as_str())
                .bind(&attrs.breed)
                .bind(attrs.mass)
                .bind(attrs.received_at)
                .bind(attrs.received_age)
                .fetch_one(&mut *tx)
                .await;

            match result {
                Ok(record) => records.push(record),
                Err(e) if is_unique_violation(&e) => {
                    drop(tx);
                    warn!(tag = %tag, "Tag taken by a concurrent insert");
                    let existing = self.existing_tags(tags).await?;
                    let existing = if existing.is_empty() {
                        vec![tag.clone()]
                    } else {
                        existing
                    };
                    return Err(DbError::TagsExist(existing));
                }
                Err(e) => return Err(DbError::Query(e)),
            }
        }

        tx.commit().await.map_err(DbError::Query)?;
        debug!(count = records.len(), "Inserted cattle batch");

        Ok(records)
    }

    /// Number of animals whose tag contains `search` (case-insensitive).
    pub async fn count(&self, search: Option<&str>) -> Result<i64, DbError> {
        let pattern = search.map(contains_pattern);
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM cattle
            WHERE ($1::text IS NULL OR tag_number ILIKE $1 ESCAPE '\')
            "#,
        )
        .bind(pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    /// One page of animals, ordered by tag prefix (in allocation order) then
    /// tag number. Tags that are not `<prefix><number>` sort last.
    pub async fn page(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CattleRecord>, DbError> {
        let pattern = search.map(contains_pattern);
        let query = format!(
            r#"
            SELECT {CATTLE_COLUMNS}
            FROM cattle
            WHERE ($1::text IS NULL OR tag_number ILIKE $1 ESCAPE '\')
            ORDER BY
                char_length(substring(tag_number FROM '^([A-Z]+)[0-9]{{1,3}}$')) NULLS LAST,
                substring(tag_number FROM '^([A-Z]+)[0-9]{{1,3}}$') COLLATE "C",
                substring(tag_number FROM '^[A-Z]+([0-9]{{1,3}})$')::int,
                tag_number COLLATE "C"
            LIMIT $2 OFFSET $3
            "#
        );

        sqlx::query_as::<_, CattleRecord>(&query)
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    pub async fn find_by_tag(&self, tag: &str) -> Result<Option<CattleRecord>, DbError> {
        let query = format!("SELECT {CATTLE_COLUMNS} FROM cattle WHERE tag_number = $1");
        sqlx::query_as::<_, CattleRecord>(&query)
            .bind(tag)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    pub async fn update_by_tag(
        &self,
        tag: &str,
        update: &CattleUpdate,
    ) -> Result<Option<CattleRecord>, DbError> {
        let query = format!(
            r#"
            UPDATE cattle
            SET gender = $2,
                breed = $3,
                mass = $4,
                received_at = COALESCE($5, received_at),
                received_age = COALESCE($6, received_age)
            WHERE tag_number = $1
            RETURNING {CATTLE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, CattleRecord>(&query)
            .bind(tag)
            .bind(update.gender.as_str())
            .bind(&update.breed)
            .bind(update.mass)
            .bind(update.received_at)
            .bind(update.received_age)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    /// Deletes one animal; its treatments go with it.
    pub async fn delete_by_tag(&self, tag: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM cattle WHERE tag_number = $1")
            .bind(tag)
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_many(&self, ids: &[CattleId]) -> Result<u64, DbError> {
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let result = sqlx::query("DELETE FROM cattle WHERE cattle_id = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(result.rows_affected())
    }

    /// Distinct non-empty breeds, for form suggestions.
    pub async fn breeds(&self) -> Result<Vec<String>, DbError> {
        sqlx::query_scalar(
            "SELECT DISTINCT breed FROM cattle WHERE breed <> '' ORDER BY breed",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_roundtrip() {
        for gender in [Gender::Bul, Gender::Vers, Gender::Os, Gender::Koei] {
            assert_eq!(Gender::parse(gender.as_str()), Some(gender));
        }
        assert_eq!(Gender::parse("Bul"), None);
    }

    #[test]
    fn test_gender_json_matches_db_labels() {
        let json = serde_json::to_string(&Gender::Koei).unwrap();
        assert_eq!(json, "\"koei\"");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("a1"), "%a1%");
        assert_eq!(contains_pattern("5%_"), "%5\\%\\_%");
        assert_eq!(contains_pattern("\\"), "%\\\\%");
    }
}
