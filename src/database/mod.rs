//! Persistence Layer
//!
//! SQLite-backed storage for the character pool, avatars and their
//! memories, stories and chapters, phase logs, and score reports.
//! Entity families get their own extension trait over the shared
//! [`Database`] pool wrapper.

pub mod avatars;
pub mod characters;
pub mod migrations;
pub mod models;
pub mod phase_logs;
pub mod reports;
pub mod stories;

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Shared handle to the SQLite pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file and run migrations.
    pub async fn open(path: &Path) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        migrations::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory database for tests. Restricted to one connection;
    /// each SQLite `:memory:` connection is its own database.
    pub async fn open_in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        migrations::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Wrap a serde failure on a JSON column as a sqlx decode error.
pub(crate) fn decode_err(err: serde_json::Error) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
