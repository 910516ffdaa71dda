//! Database layer for the herd server.
//!
//! This module provides:
//! - Connection pool management
//! - Cattle and treatment stores
//! - User and session stores for sign-in
//!
//! The database layer uses SQLx with Postgres.

mod cattle;
mod error;
mod sessions;
mod treatments;
mod users;

pub use cattle::{CattleRecord, CattleStore, CattleUpdate, Gender, NewCattle};
pub use error::DbError;
pub use sessions::{SessionRecord, SessionStore};
pub use treatments::{NewTreatment, TreatmentRecord, TreatmentStore};
pub use users::{UserRecord, UserStore};

use anyhow::{bail, Context};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection.
    pub max_lifetime: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/herd".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from `lookup`, which returns a variable's value if set.
    ///
    /// Unparseable pool sizes and a minimum above the maximum are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").unwrap_or(defaults.database_url.clone());

        let pool_size = |name: &str, default: u32| -> anyhow::Result<u32> {
            match lookup(name) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{name} must be a non-negative integer, got '{raw}'")),
                None => Ok(default),
            }
        };

        let max_connections = pool_size("DB_MAX_CONNECTIONS", defaults.max_connections)?;
        let min_connections = pool_size("DB_MIN_CONNECTIONS", defaults.min_connections)?;

        if max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if min_connections > max_connections {
            bail!(
                "DB_MIN_CONNECTIONS ({min_connections}) cannot exceed DB_MAX_CONNECTIONS ({max_connections})"
            );
        }

        Ok(Self {
            database_url,
            max_connections,
            min_connections,
            ..defaults
        })
    }
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.database_url)
            .await
            .map_err(DbError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database is reachable.
    pub async fn health_check(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DbError::Query)?;
        Ok(())
    }

    /// Run pending migrations.
    ///
    /// Migrations are loaded at runtime from the first directory that exists.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        let candidates = vec![
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/herd-server/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Loaded migrations");
                    migrator.run(&self.pool).await.map_err(DbError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(DbError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }

    /// Get a cattle store handle.
    pub fn cattle_store(&self) -> CattleStore {
        CattleStore::new(self.pool.clone())
    }

    /// Get a treatment store handle.
    pub fn treatment_store(&self) -> TreatmentStore {
        TreatmentStore::new(self.pool.clone())
    }

    /// Get a user store handle.
    pub fn user_store(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    /// Get a session store handle.
    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
        assert!(config.database_url.ends_with("/herd"));
    }

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_db_config_from_env_values() {
        let config = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://herd@db/herd"),
            ("DB_MAX_CONNECTIONS", "20"),
            ("DB_MIN_CONNECTIONS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.database_url, "postgres://herd@db/herd");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 4);
    }

    #[test]
    fn test_db_config_unset_uses_defaults() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_db_config_rejects_bad_pool_sizes() {
        let err = DbConfig::from_lookup(lookup(&[("DB_MAX_CONNECTIONS", "ten")])).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));

        let err = DbConfig::from_lookup(lookup(&[
            ("DB_MAX_CONNECTIONS", "10"),
            ("DB_MIN_CONNECTIONS", "50"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("cannot exceed"));

        assert!(DbConfig::from_lookup(lookup(&[("DB_MAX_CONNECTIONS", "0")])).is_err());
        assert!(DbConfig::from_lookup(lookup(&[("DB_MIN_CONNECTIONS", "-1")])).is_err());
    }
}
