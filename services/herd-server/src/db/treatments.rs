//! Treatment storage.

use chrono::{DateTime, Utc};
use herd_id::{CattleId, TreatmentId};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::error::DbError;

const TREATMENT_COLUMNS: &str = "treatment_id, cattle_id, treatment, date, follow_up, completed";

/// A treatment logged against one animal.
#[derive(Debug, Clone, Serialize)]
pub struct TreatmentRecord {
    pub id: TreatmentId,
    pub cattle_id: CattleId,
    pub treatment: String,
    pub date: DateTime<Utc>,
    pub follow_up: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl TreatmentRecord {
    /// True when this treatment is still open and its follow-up falls within
    /// `window` from `now`.
    pub fn follow_up_due(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        if self.completed {
            return false;
        }
        self.follow_up
            .is_some_and(|at| at >= now && at <= now + window)
    }
}

fn decode_id<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr<Err = herd_id::IdError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: herd_id::IdError| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl<'r> sqlx::FromRow<'r, PgRow> for TreatmentRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: decode_id(row, "treatment_id")?,
            cattle_id: decode_id(row, "cattle_id")?,
            treatment: row.try_get("treatment")?,
            date: row.try_get("date")?,
            follow_up: row.try_get("follow_up")?,
            completed: row.try_get("completed")?,
        })
    }
}

/// A treatment to log; `date` defaults to now at the API layer.
#[derive(Debug, Clone)]
pub struct NewTreatment {
    pub treatment: String,
    pub date: DateTime<Utc>,
    pub follow_up: Option<DateTime<Utc>>,
}

/// Treatment store handle.
#[derive(Clone)]
pub struct TreatmentStore {
    pool: PgPool,
}

impl TreatmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Treatments for one animal, newest first.
    pub async fn for_cattle(&self, cattle_id: &CattleId) -> Result<Vec<TreatmentRecord>, DbError> {
        let query = format!(
            "SELECT {TREATMENT_COLUMNS} FROM treatments WHERE cattle_id = $1 ORDER BY date DESC, treatment_id"
        );
        sqlx::query_as::<_, TreatmentRecord>(&query)
            .bind(cattle_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    /// Treatments for a set of animals, newest first.
    pub async fn for_cattle_many(
        &self,
        cattle_ids: &[CattleId],
    ) -> Result<Vec<TreatmentRecord>, DbError> {
        if cattle_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = cattle_ids.iter().map(ToString::to_string).collect();
        let query = format!(
            "SELECT {TREATMENT_COLUMNS} FROM treatments WHERE cattle_id = ANY($1) ORDER BY date DESC, treatment_id"
        );
        sqlx::query_as::<_, TreatmentRecord>(&query)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    pub async fn insert(
        &self,
        cattle_id: &CattleId,
        new: &NewTreatment,
    ) -> Result<TreatmentRecord, DbError> {
        let query = format!(
            r#"
            INSERT INTO treatments (treatment_id, cattle_id, treatment, date, follow_up, completed)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING {TREATMENT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TreatmentRecord>(&query)
            .bind(TreatmentId::new().to_string())
            .bind(cattle_id.to_string())
            .bind(&new.treatment)
            .bind(new.date)
            .bind(new.follow_up)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    /// Logs the same treatment against every listed animal that still exists.
    ///
    /// Runs in one transaction; ids with no matching animal are skipped.
    pub async fn insert_bulk(
        &self,
        cattle_ids: &[CattleId],
        new: &NewTreatment,
    ) -> Result<Vec<TreatmentRecord>, DbError> {
        let ids: Vec<String> = cattle_ids.iter().map(ToString::to_string).collect();
        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        // Lock the rows so a concurrent delete cannot break the foreign key.
        let present: Vec<String> = sqlx::query_scalar(
            "SELECT cattle_id FROM cattle WHERE cattle_id = ANY($1) ORDER BY cattle_id FOR SHARE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(DbError::Query)?;

        let query = format!(
            r#"
            INSERT INTO treatments (treatment_id, cattle_id, treatment, date, follow_up, completed)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING {TREATMENT_COLUMNS}
            "#
        );

        let mut records = Vec::with_capacity(present.len());
        for cattle_id in &present {
            let record = sqlx::query_as::<_, TreatmentRecord>(&query)
                .bind(TreatmentId::new().to_string())
                .bind(cattle_id)
                .bind(&new.treatment)
                .bind(new.date)
                .bind(new.follow_up)
                .fetch_one(&mut *tx)
                .await
                .map_err(DbError::Query)?;
            records.push(record);
        }

        tx.commit().await.map_err(DbError::Query)?;
        Ok(records)
    }

    /// Marks a treatment completed. Returns the updated row, if any.
    pub async fn complete(
        &self,
        treatment_id: &TreatmentId,
    ) -> Result<Option<TreatmentRecord>, DbError> {
        let query = format!(
            "UPDATE treatments SET completed = TRUE WHERE treatment_id = $1 RETURNING {TREATMENT_COLUMNS}"
        );
        sqlx::query_as::<_, TreatmentRecord>(&query)
            .bind(treatment_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::Query)
    }

    /// Distinct treatment names, for form suggestions.
    pub async fn names(&self) -> Result<Vec<String>, DbError> {
        sqlx::query_scalar(
            "SELECT DISTINCT treatment FROM treatments WHERE treatment <> '' ORDER BY treatment",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }
}
