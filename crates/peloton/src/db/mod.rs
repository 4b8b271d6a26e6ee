//! SQLite connection pool and schema migrations.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Constraint failures a write can hit, split out from everything else.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the row. Holds the offending column.
    #[error("duplicate value for column {0}")]
    Duplicate(String),

    /// A foreign key rejected the write.
    #[error("foreign key constraint failed")]
    ForeignKey,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Classify a failed write, wrapping anything unexpected with `context`.
    pub fn from_write(err: sqlx::Error, context: &'static str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::Duplicate(violated_column(db_err.message()));
            }
            if db_err.is_foreign_key_violation() {
                return Self::ForeignKey;
            }
        }
        Self::Other(anyhow::Error::new(err).context(context))
    }
}

/// Column named by a SQLite unique constraint message, e.g.
/// `UNIQUE constraint failed: teams.email` gives `email`.
fn violated_column(message: &str) -> String {
    message
        .rsplit(": ")
        .next()
        .and_then(|columns| columns.split(',').next())
        .and_then(|column| column.trim().rsplit('.').next())
        .unwrap_or_default()
        .to_string()
}

/// Database connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory: {}", parent.display()))?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .context("parsing database URL")?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("connecting to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Create an in-memory database (for testing).
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("parsing in-memory database URL")?
            .foreign_keys(true);

        // A single connection, every new connection would see an empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("connecting to in-memory database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("running database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
