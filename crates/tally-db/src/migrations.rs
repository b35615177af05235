//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied by [`run_migrations`] when a [`crate::Database`] opens.
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_initial_schema.sql       products … users, one (id, body) table each
//! └── 002_purchases_expenses.sql   purchases, expenses
//! ```
//!
//! sqlx records each applied file with its checksum in `_sqlx_migrations`.
//! Editing a file that has already shipped makes existing stores refuse to
//! open, so schema changes always go in a new `NNN_name.sql`. A new table
//! also needs a `repository::Table` variant and a place in the backup
//! snapshot.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded, in file order.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;

    info!(migrations = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
