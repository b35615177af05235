//! # Backup & Restore
//!
//! Whole-store export to a JSON snapshot, and destructive restore from one.
//!
//! ## Snapshot Format
//! ```text
//! {
//!   "products":            [ Product, .. ],            required
//!   "customers":           [ Customer, .. ],
//!   "suppliers":           [ Supplier, .. ],
//!   "sales":               [ Sale, .. ],
//!   "categories":          [ Category, .. ],           required
//!   "cashboxTransactions": [ CashboxTransaction, .. ],
//!   "settings":            [ Settings ],               required, exactly one
//!   "users":               [ User, .. ],
//!   "purchases":           [ Purchase, .. ],
//!   "expenses":            [ Expense, .. ],
//!   "exportDate":          "2024-03-05T08:15:00Z",
//!   "version":             "1.0.0"
//! }
//! ```
//!
//! ## Restore Pipeline
//! ```text
//! blob ──► parse ──► shape check ──► rehydrate dates ──► typed decode
//!            │            │                                    │
//!       ParseError   InvalidBackupFormat               InvalidBackupFormat
//!                    (not an object, missing or non-array table,
//!                     wrong major version, settings count != 1)
//!                                                               │
//!                                                               ▼
//!                              BEGIN ─ clear every table ─ insert all ─ COMMIT
//!                                                               │
//!                                                               ▼
//!                                                         RestoreReport
//! ```
//!
//! Restore replaces the store; it never merges. If any step fails the
//! previous contents are untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;
use tally_core::rehydrate::rehydrate;
use tally_core::{
    CashboxTransaction, Category, Customer, Expense, Product, Purchase, Sale, Settings, Supplier, User,
};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{settings, table, Record, Table};

/// Snapshot format written by [`BackupController::export_snapshot`].
pub const BACKUP_FORMAT_VERSION: &str = "1.0.0";

/// Arrays a snapshot must carry to be restorable.
const REQUIRED_ARRAYS: [&str; 3] = ["products", "categories", "settings"];

/// Arrays that may be absent (read as empty) but must be arrays when present.
const OPTIONAL_ARRAYS: [&str; 7] = [
    "customers",
    "suppliers",
    "sales",
    "cashboxTransactions",
    "users",
    "purchases",
    "expenses",
];

// =============================================================================
// Snapshot
// =============================================================================

/// Every table of the store at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub products: Vec<Product>,
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    pub categories: Vec<Category>,
    #[serde(default)]
    pub cashbox_transactions: Vec<CashboxTransaction>,
    pub settings: Vec<Settings>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub purchases: Vec<Purchase>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default = "Utc::now")]
    pub export_date: DateTime<Utc>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    BACKUP_FORMAT_VERSION.to_string()
}

/// Rows written per table by a restore.
///
/// Callers treat a report as the signal to reload anything they display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub products: usize,
    pub customers: usize,
    pub suppliers: usize,
    pub sales: usize,
    pub categories: usize,
    pub cashbox_transactions: usize,
    pub settings: usize,
    pub users: usize,
    pub purchases: usize,
    pub expenses: usize,
}

impl RestoreReport {
    pub fn total(&self) -> usize {
        self.products
            + self.customers
            + self.suppliers
            + self.sales
            + self.categories
            + self.cashbox_transactions
            + self.settings
            + self.users
            + self.purchases
            + self.expenses
    }
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Debug, Clone)]
pub struct BackupController {
    pool: SqlitePool,
}

impl BackupController {
    pub fn new(pool: SqlitePool) -> Self {
        BackupController { pool }
    }

    /// Reads every table inside one transaction, so the snapshot is
    /// consistent even with writers waiting.
    ///
    /// A store that never saved settings exports the defaults.
    pub async fn export_all(&self) -> DbResult<Snapshot> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let snapshot = Snapshot {
            products: table::fetch_all(&mut tx).await?,
            customers: table::fetch_all(&mut tx).await?,
            suppliers: table::fetch_all(&mut tx).await?,
            sales: table::fetch_all(&mut tx).await?,
            categories: table::fetch_all(&mut tx).await?,
            cashbox_transactions: table::fetch_all(&mut tx).await?,
            settings: vec![settings::load(&mut tx).await?],
            users: table::fetch_all(&mut tx).await?,
            purchases: table::fetch_all(&mut tx).await?,
            expenses: table::fetch_all(&mut tx).await?,
            export_date: Utc::now(),
            version: BACKUP_FORMAT_VERSION.to_string(),
        };

        tx.rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            products = snapshot.products.len(),
            sales = snapshot.sales.len(),
            cashbox = snapshot.cashbox_transactions.len(),
            "Store exported"
        );
        Ok(snapshot)
    }

    /// Pretty-printed JSON snapshot of the whole store.
    pub async fn export_snapshot(&self) -> DbResult<String> {
        let snapshot = self.export_all().await?;
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Replaces the whole store with `snapshot` in one transaction.
    ///
    /// The snapshot must carry exactly one settings record; without it the
    /// invoice counter would silently restart.
    pub async fn import_all(&self, snapshot: &Snapshot) -> DbResult<RestoreReport> {
        let [restored_settings] = snapshot.settings.as_slice() else {
            return Err(settings_count_error(snapshot.settings.len()));
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for t in Table::ALL {
            let removed = table::clear(&mut tx, t).await?;
            debug!(table = %t, removed, "Table cleared");
        }

        let report = RestoreReport {
            products: insert_all(&mut tx, &snapshot.products).await?,
            customers: insert_all(&mut tx, &snapshot.customers).await?,
            suppliers: insert_all(&mut tx, &snapshot.suppliers).await?,
            sales: insert_all(&mut tx, &snapshot.sales).await?,
            categories: insert_all(&mut tx, &snapshot.categories).await?,
            cashbox_transactions: insert_all(&mut tx, &snapshot.cashbox_transactions).await?,
            users: insert_all(&mut tx, &snapshot.users).await?,
            purchases: insert_all(&mut tx, &snapshot.purchases).await?,
            expenses: insert_all(&mut tx, &snapshot.expenses).await?,
            settings: 1,
        };

        settings::store(&mut tx, restored_settings).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            records = report.total(),
            products = report.products,
            sales = report.sales,
            version = %snapshot.version,
            "Store restored"
        );
        Ok(report)
    }

    /// Validates, decodes and restores a JSON snapshot.
    ///
    /// ## Errors
    /// - `ParseError` when the blob is not JSON
    /// - `InvalidBackupFormat` when the blob is not a JSON object, a required
    ///   table is missing or not an array, the major version differs, the
    ///   settings array does not hold exactly one record, or a record does
    ///   not decode
    /// - any insert error (e.g. `DuplicateKey`), after rolling back
    pub async fn restore_snapshot(&self, blob: &str) -> DbResult<RestoreReport> {
        let value: Value =
            serde_json::from_str(blob).map_err(|e| DbError::ParseError(e.to_string()))?;

        let object = value
            .as_object()
            .ok_or_else(|| DbError::InvalidBackupFormat("backup is not a JSON object".to_string()))?;

        for key in REQUIRED_ARRAYS {
            match object.get(key) {
                Some(Value::Array(_)) => {}
                Some(_) => return Err(DbError::InvalidBackupFormat(format!("`{}` is not an array", key))),
                None => return Err(DbError::InvalidBackupFormat(format!("missing `{}`", key))),
            }
        }
        for key in OPTIONAL_ARRAYS {
            if let Some(found) = object.get(key) {
                if !found.is_array() && !found.is_null() {
                    return Err(DbError::InvalidBackupFormat(format!("`{}` is not an array", key)));
                }
            }
        }

        if let Some(version) = object.get("version") {
            check_version(version)?;
        }

        let settings_count = object
            .get("settings")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if settings_count != 1 {
            return Err(settings_count_error(settings_count));
        }

        let snapshot: Snapshot = serde_json::from_value(strip_nulls(rehydrate(value)))
            .map_err(|e| DbError::InvalidBackupFormat(e.to_string()))?;

        self.import_all(&snapshot).await
    }

    /// Writes a snapshot to `path`, replacing any existing file.
    pub async fn export_to_file(&self, path: impl AsRef<Path>) -> DbResult<usize> {
        let path = path.as_ref();
        let blob = self.export_snapshot().await?;
        tokio::fs::write(path, blob.as_bytes()).await?;

        info!(path = %path.display(), bytes = blob.len(), "Backup written");
        Ok(blob.len())
    }

    /// Restores from a snapshot file written by [`BackupController::export_to_file`].
    pub async fn restore_from_file(&self, path: impl AsRef<Path>) -> DbResult<RestoreReport> {
        let path = path.as_ref();
        let blob = tokio::fs::read_to_string(path).await?;

        info!(path = %path.display(), bytes = blob.len(), "Restoring backup");
        self.restore_snapshot(&blob).await
    }
}

async fn insert_all<R: Record>(conn: &mut sqlx::SqliteConnection, records: &[R]) -> DbResult<usize> {
    for record in records {
        table::insert(&mut *conn, record).await?;
    }
    Ok(records.len())
}

fn settings_count_error(found: usize) -> DbError {
    DbError::InvalidBackupFormat(format!("expected one settings record, found {}", found))
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

fn check_version(version: &Value) -> DbResult<()> {
    let version = version
        .as_str()
        .ok_or_else(|| DbError::InvalidBackupFormat("`version` is not a string".to_string()))?;

    if major(version) != major(BACKUP_FORMAT_VERSION) {
        return Err(DbError::InvalidBackupFormat(format!(
            "unsupported backup version {} (expected {})",
            version, BACKUP_FORMAT_VERSION
        )));
    }
    if version != BACKUP_FORMAT_VERSION {
        warn!(version, "Restoring backup with a different minor version");
    }
    Ok(())
}

/// Drops top-level `null` tables so they read as empty.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
