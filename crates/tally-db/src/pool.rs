//! # Store Handle
//!
//! Opens the SQLite file, applies the schema and hands out the repositories,
//! the ledger engine and the backup controller.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::from_env()   TALLY_DB_PATH, else <data dir>/tally.db        │
//! │  DbConfig::new(path)    explicit file                                   │
//! │  DbConfig::in_memory()  one private connection, gone on close          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new ── open pool ── migrations ──► Database                 │
//! │                                                  │                      │
//! │         products() customers() suppliers() ... ◄─┤ per-table reads     │
//! │         settings()                             ◄─┤ store settings      │
//! │         ledger()                               ◄─┤ business events     │
//! │         backup()                               ◄─┘ export / restore    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Files are opened in WAL mode, so reads keep going while a ledger event
//! holds the write lock.

use directories::ProjectDirs;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tally_core::{CashboxTransaction, Category, Customer, Expense, Product, Purchase, Sale, Supplier};
use tracing::{debug, info};

use crate::backup::BackupController;
use crate::error::{DbError, DbResult};
use crate::ledger::LedgerEngine;
use crate::migrations;
use crate::repository::{Record, SettingsRepository, TableRepository};

/// Environment variable overriding the database location.
pub const DB_PATH_ENV: &str = "TALLY_DB_PATH";

const DB_FILE_NAME: &str = "tally.db";

// =============================================================================
// Configuration
// =============================================================================

/// Where the store lives and how the pool is sized.
///
/// ```rust,ignore
/// let config = DbConfig::new("/srv/shop/tally.db").max_connections(4);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Upper bound on open connections (5).
    pub max_connections: u32,

    /// Connections kept open while idle (1).
    pub min_connections: u32,

    /// How long to wait for a free connection (30s).
    pub connect_timeout: Duration,

    /// Idle connections above the minimum close after this (10 min).
    pub idle_timeout: Duration,

    /// Apply pending migrations in [`Database::new`] (on).
    pub run_migrations: bool,
}

impl DbConfig {
    /// A file-backed store at `path`, created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Uses `TALLY_DB_PATH` when set, otherwise `tally.db` in the platform
    /// data directory (`ProjectDirs` for `com.tally.ledger`), creating that
    /// directory if needed.
    pub fn from_env() -> DbResult<Self> {
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            debug!(path = %path, "Database path from environment");
            return Ok(DbConfig::new(path));
        }

        let proj_dirs = ProjectDirs::from("com", "tally", "ledger").ok_or_else(|| {
            DbError::ConnectionFailed("no data directory for this platform".to_string())
        })?;
        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(DbConfig::new(data_dir.join(DB_FILE_NAME)))
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// A throwaway store for tests.
    ///
    /// Every `:memory:` connection is its own database, so the pool is
    /// pinned to a single connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// An open store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the store described by `config`.
    ///
    /// Connections use WAL journaling, `synchronous = NORMAL` and foreign
    /// keys. Migrations run before the handle is returned unless
    /// `run_migrations` is off.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening store");

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Applies any migration not yet recorded. A no-op on an up-to-date store.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Generic access to any stored entity.
    ///
    /// ```rust,ignore
    /// let categories = db.table::<Category>().get_all().await?;
    /// ```
    pub fn table<R: Record>(&self) -> TableRepository<R> {
        TableRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> TableRepository<Product> {
        self.table()
    }

    pub fn categories(&self) -> TableRepository<Category> {
        self.table()
    }

    pub fn customers(&self) -> TableRepository<Customer> {
        self.table()
    }

    pub fn suppliers(&self) -> TableRepository<Supplier> {
        self.table()
    }

    pub fn sales(&self) -> TableRepository<Sale> {
        self.table()
    }

    /// Received purchases, written by [`LedgerEngine::record_purchase`].
    pub fn purchases(&self) -> TableRepository<Purchase> {
        self.table()
    }

    /// Recorded expenses, written by [`LedgerEngine::record_expense`].
    pub fn expenses(&self) -> TableRepository<Expense> {
        self.table()
    }

    /// Cashbox rows. Write through [`Database::ledger`] so balances stay in step.
    pub fn cashbox(&self) -> TableRepository<CashboxTransaction> {
        self.table()
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    pub fn ledger(&self) -> LedgerEngine {
        LedgerEngine::new(self.pool.clone())
    }

    pub fn backup(&self) -> BackupController {
        BackupController::new(self.pool.clone())
    }

    /// Waits for open connections to finish, then closes the pool.
    pub async fn close(&self) {
        info!("Closing store");
        self.pool.close().await;
    }

    /// `true` when a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        assert_eq!(db.products().count().await.unwrap(), 0);
        assert_eq!(db.purchases().count().await.unwrap(), 0);
        assert_eq!(db.expenses().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/tally-test.db")
            .max_connections(10)
            .min_connections(2)
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.run_migrations);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.run_migrations().await.unwrap();

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(applied, total);
    }
}
