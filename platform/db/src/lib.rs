//! Database primitives shared by the server binary and the HR core.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (set {0})")]
    MissingUrl(String),
    #[error("failed to connect to database: {0}")]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_url_key")]
    env_key: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_url_key() -> String {
    "DATABASE_URL".to_string()
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self::new(default_url_key())
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            max_connections: default_max_connections(),
            sqlx_logging: false,
        }
    }

    /// Reads `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS` and `DATABASE_LOG`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(max) = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|max| *max > 0)
        {
            settings.max_connections = max;
        }
        settings.sqlx_logging = std::env::var("DATABASE_LOG")
            .ok()
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        settings
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl(self.env_key.clone()))
    }

    pub fn connect_options(&self, url: impl Into<String>) -> ConnectOptions {
        let mut options = ConnectOptions::new(url.into());
        options
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(self.sqlx_logging);
        options
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    let pool = Database::connect(settings.connect_options(url)).await?;
    info!(max_connections = settings.max_connections, "database pool ready");
    Ok(pool)
}

/// True when the error is a unique-key violation, the backstop for
/// duplicate-period and duplicate-day races.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

    #[test]
    fn missing_url_names_the_variable() {
        let settings = DatabaseSettings::new("CLINIC_TEST_DB_URL_THAT_IS_NOT_SET");
        let err = settings.database_url().unwrap_err();
        assert_eq!(
            err.to_string(),
            "database url missing (set CLINIC_TEST_DB_URL_THAT_IS_NOT_SET)"
        );
    }

    #[test]
    fn not_found_is_not_a_unique_violation() {
        assert!(!is_unique_violation(&DbErr::RecordNotFound("x".into())));
    }

    #[tokio::test]
    async fn detects_sqlite_unique_violation() {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1);
        let db = Database::connect(options).await.unwrap();
        db.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "CREATE TABLE t (k TEXT NOT NULL UNIQUE)",
        ))
        .await
        .unwrap();
        db.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "INSERT INTO t (k) VALUES ('a')",
        ))
        .await
        .unwrap();
        let err = db
            .execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                "INSERT INTO t (k) VALUES ('a')",
            ))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
