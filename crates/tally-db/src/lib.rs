//! # tally-db: Store, Ledger Engine and Backups for Tally
//!
//! This crate owns every side effect of the retail ledger. It keeps the
//! entities in SQLite through sqlx, applies business events atomically and
//! exports or restores the whole store.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  Screen / CLI (checkout, returns, cashbox, backup)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ LedgerEngine  │    │  Repositories │    │   Backup     │  │   │
//! │  │   │  (ledger.rs)  │    │ (repository/) │    │ (backup.rs)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ one tx per    │───►│ Table<R>      │◄───│ export_all   │  │   │
//! │  │   │ event         │    │ Settings      │    │ import_all   │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │ plans              │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │      tally-core          Database (pool.rs) + migrations       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   $TALLY_DB_PATH or the platform data directory (tally.db)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table document access
//! - [`ledger`] - Sales, returns, purchases, expenses, payments, cashbox
//! - [`backup`] - Snapshot export and atomic restore
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let outcome = db.ledger().record_sale(sale).await?;
//! let balance = db.ledger().compute_cashbox_balance().await?;
//!
//! let blob = db.backup().export_snapshot().await?;
//! let report = db.backup().restore_snapshot(&blob).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backup;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use backup::{BackupController, RestoreReport, Snapshot, BACKUP_FORMAT_VERSION};
pub use error::{DbError, DbResult};
pub use ledger::{LedgerEngine, LedgerOutcome};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{Record, SettingsRepository, Table, TableRepository};

use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tally=debug,sqlx=warn";

/// Initializes the tracing subscriber for the binaries.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - every store call
/// - `RUST_LOG=info` - committed business events (default)
/// - `RUST_LOG=warn` - clamps and normalizations only
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
