//! Database error types.

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// Failed to execute a query.
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),

    /// Migration directory not found in the current environment.
    #[error("migration directory not found; tried {tried}. Last error: {last_error}. Run from repo root or services/herd-server.")]
    MigrationDirNotFound { tried: String, last_error: String },

    /// One or more tags in a batch are already stored. Nothing was inserted.
    #[error("Tag number(s) already exist: {}", .0.join(", "))]
    TagsExist(Vec<String>),

    /// A user with this email is already registered.
    #[error("email already registered")]
    EmailTaken,
}

/// Returns true if `err` is a Postgres unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_exist_message_lists_tags() {
        let err = DbError::TagsExist(vec!["A1".to_string(), "A2".to_string()]);
        assert_eq!(err.to_string(), "Tag number(s) already exist: A1, A2");
    }

    #[test]
    fn test_email_taken_message() {
        assert_eq!(DbError::EmailTaken.to_string(), "email already registered");
    }
}
