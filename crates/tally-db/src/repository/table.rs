//! # Table Repository
//!
//! Generic document storage shared by every entity table.
//!
//! The free functions take a `&mut SqliteConnection` so the same code runs
//! on a pooled connection or inside an open transaction:
//!
//! ```rust,ignore
//! let mut tx = db.pool().begin().await?;
//! let product = table::fetch_one::<Product>(&mut tx, "p-1").await?;
//! table::upsert(&mut tx, &product).await?;
//! tx.commit().await?;
//! ```

use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use std::marker::PhantomData;
use tracing::debug;

use super::{Record, Table};
use crate::error::{DbError, DbResult};

// =============================================================================
// Connection-level Operations
// =============================================================================

fn decode<R: Record>(body: &str) -> DbResult<R> {
    Ok(serde_json::from_str(body)?)
}

/// All records of a table in insertion order.
pub async fn fetch_all<R: Record>(conn: &mut SqliteConnection) -> DbResult<Vec<R>> {
    let sql = format!("SELECT body FROM {} ORDER BY rowid", R::TABLE.name());
    let bodies: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&mut *conn).await?;

    debug!(table = %R::TABLE, rows = bodies.len(), "Fetched table");

    bodies.iter().map(|body| decode(body)).collect()
}

pub async fn fetch_one<R: Record>(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<R>> {
    let sql = format!("SELECT body FROM {} WHERE id = ?1", R::TABLE.name());
    let body: Option<String> = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    body.as_deref().map(decode).transpose()
}

/// Like [`fetch_one`] but a missing record is an error.
pub async fn require<R: Record>(conn: &mut SqliteConnection, id: &str) -> DbResult<R> {
    fetch_one(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found(R::TABLE.entity(), id))
}

/// Inserts a new record. Fails with `DuplicateKey` if the id is taken.
pub async fn insert<R: Record>(conn: &mut SqliteConnection, record: &R) -> DbResult<()> {
    let id = record.record_id();
    let body = serde_json::to_string(record)?;
    let sql = format!("INSERT INTO {} (id, body) VALUES (?1, ?2)", R::TABLE.name());

    debug!(table = %R::TABLE, id = %id, "Inserting record");

    sqlx::query(&sql)
        .bind(id)
        .bind(body)
        .execute(&mut *conn)
        .await
        .map_err(|err| {
            // SQLite reports primary key clashes as "UNIQUE constraint failed: <table>.id"
            let duplicate = err.as_database_error().is_some_and(|db_err| {
                db_err.is_unique_violation() || db_err.message().contains("UNIQUE constraint failed")
            });
            if duplicate {
                DbError::duplicate(R::TABLE.name(), id)
            } else {
                DbError::from(err)
            }
        })?;

    Ok(())
}

/// Inserts or replaces a record. An existing row keeps its position.
pub async fn upsert<R: Record>(conn: &mut SqliteConnection, record: &R) -> DbResult<()> {
    let id = record.record_id();
    let body = serde_json::to_string(record)?;
    let sql = format!(
        "INSERT INTO {} (id, body) VALUES (?1, ?2) \
         ON CONFLICT(id) DO UPDATE SET body = excluded.body",
        R::TABLE.name()
    );

    debug!(table = %R::TABLE, id = %id, "Upserting record");

    sqlx::query(&sql).bind(id).bind(body).execute(&mut *conn).await?;
    Ok(())
}

/// Deletes a record. Returns whether a row was removed.
pub async fn remove<R: Record>(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE.name());
    let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;

    debug!(table = %R::TABLE, id = %id, removed = result.rows_affected(), "Deleted record");
    Ok(result.rows_affected() > 0)
}

pub async fn count_rows(conn: &mut SqliteConnection, table: Table) -> DbResult<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(&mut *conn).await?;
    Ok(count)
}

/// Removes every row of a table.
pub async fn clear(conn: &mut SqliteConnection, table: Table) -> DbResult<u64> {
    let sql = format!("DELETE FROM {}", table.name());
    let result = sqlx::query(&sql).execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

// =============================================================================
// Repository
// =============================================================================

/// Standalone CRUD for one table. Each call runs on its own pooled connection.
#[derive(Debug, Clone)]
pub struct TableRepository<R> {
    pool: SqlitePool,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> TableRepository<R> {
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository {
            pool,
            _record: PhantomData,
        }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_all(&self) -> DbResult<Vec<R>> {
        let mut conn = self.pool.acquire().await?;
        fetch_all(&mut conn).await
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<R>> {
        let mut conn = self.pool.acquire().await?;
        fetch_one(&mut conn, id).await
    }

    /// Adds a new record; `DuplicateKey` if the id exists.
    pub async fn add(&self, record: &R) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, record).await
    }

    /// Inserts or replaces a record.
    pub async fn put(&self, record: &R) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert(&mut conn, record).await
    }

    /// Replaces an existing record; `NotFound` if the id is unknown.
    pub async fn update(&self, record: &R) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        require::<R>(&mut conn, record.record_id()).await?;
        upsert(&mut conn, record).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        remove::<R>(&mut conn, id).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        count_rows(&mut conn, R::TABLE).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
