//! # Settings Repository
//!
//! The settings table holds a single record under `SETTINGS_KEY`. A store
//! that has never saved settings reads as `Settings::default()`.

use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tally_core::validation::{validate_invoice_prefix, validate_tax_rate_bps};
use tally_core::{CoreError, Settings, SETTINGS_KEY};
use tracing::{debug, info};

use super::table;
use crate::error::DbResult;

/// Reads the settings record through an open connection or transaction.
pub async fn load(conn: &mut SqliteConnection) -> DbResult<Settings> {
    Ok(table::fetch_one::<Settings>(conn, SETTINGS_KEY)
        .await?
        .unwrap_or_default())
}

/// Writes the settings record, always under the fixed key.
pub async fn store(conn: &mut SqliteConnection, settings: &Settings) -> DbResult<()> {
    if settings.id == SETTINGS_KEY {
        return table::upsert(conn, settings).await;
    }
    let keyed = Settings {
        id: SETTINGS_KEY.to_string(),
        ..settings.clone()
    };
    table::upsert(conn, &keyed).await
}

/// Repository for the settings singleton.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self) -> DbResult<Settings> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn).await
    }

    /// Validates and saves the settings.
    ///
    /// The invoice counter can be moved forward here (e.g. to continue a
    /// paper invoice book) but never below 1.
    pub async fn save(&self, settings: &Settings) -> DbResult<Settings> {
        validate_tax_rate_bps(settings.tax_rate_bps).map_err(CoreError::from)?;
        validate_invoice_prefix(&settings.invoice_prefix).map_err(CoreError::from)?;
        if settings.next_invoice_number == 0 {
            return Err(CoreError::invalid_amount("next invoice number must be at least 1").into());
        }

        let mut saved = settings.clone();
        saved.id = SETTINGS_KEY.to_string();

        debug!(tax_rate_bps = saved.tax_rate_bps, "Saving settings");
        let mut conn = self.pool.acquire().await?;
        store(&mut conn, &saved).await?;
        info!("Settings saved");

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig, DbError};
    use tally_core::{Settings, SETTINGS_KEY};

    #[tokio::test]
    async fn test_missing_settings_read_as_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let settings = db.settings().get().await.unwrap();

        assert_eq!(settings, Settings::default());
        assert!(settings.auto_add_sales_to_cashbox);
        assert_eq!(settings.next_invoice_number, 1);
    }

    #[tokio::test]
    async fn test_save_forces_fixed_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let custom = Settings {
            id: "something-else".to_string(),
            tax_rate_bps: 1500,
            currency_symbol: "€".to_string(),
            ..Settings::default()
        };

        let saved = db.settings().save(&custom).await.unwrap();
        assert_eq!(saved.id, SETTINGS_KEY);

        let all = db.table::<Settings>().get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tax_rate_bps, 1500);
    }

    #[tokio::test]
    async fn test_save_rejects_bad_rate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bad = Settings {
            tax_rate_bps: 20_000,
            ..Settings::default()
        };
        assert!(matches!(
            db.settings().save(&bad).await,
            Err(DbError::Core(_))
        ));
    }
}
