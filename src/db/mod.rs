use std::{str::FromStr, time::Duration};

use sqlx::{
    migrate::{MigrateError, Migrator},
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error, SqlitePool,
};
use thiserror::Error;

pub mod accounts;
pub mod medicines;
pub mod models;
pub mod orders;
pub mod seed;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Invalid database URL: {0}")]
    UrlParse(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] Error),
    #[error("Failed to apply migrations: {0}")]
    Migrate(#[from] MigrateError),
}

/// Opens the pool and brings the schema up to date.
///
/// `sqlite::memory:` URLs get a single connection that is never recycled, since every
/// new connection to an in-memory database would see an empty schema.
pub async fn init_db(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    let in_memory = database_url.contains(":memory:");

    let mut options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DatabaseError::UrlParse(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;

    MIGRATOR.run(&pool).await?;
    log::info!("Database ready at {}", database_url);

    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    init_db("sqlite::memory:")
        .await
        .expect("in-memory database should initialise")
}
