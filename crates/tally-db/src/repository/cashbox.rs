//! # Cashbox Queries
//!
//! Audit lookups over the cashbox ledger rows.

use tally_core::{CashboxSource, CashboxTransaction};

use super::table::TableRepository;
use crate::error::{DbError, DbResult};

impl TableRepository<CashboxTransaction> {
    /// Every posting that points back at `reference_id` (a sale, purchase,
    /// expense, customer or supplier id), oldest first.
    ///
    /// A recorded and returned sale has exactly two: the `add` and the
    /// refund `subtract`.
    pub async fn by_reference(&self, reference_id: &str) -> DbResult<Vec<CashboxTransaction>> {
        let bodies: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM cashbox_transactions
            WHERE json_extract(body, '$.referenceId') = ?1
            ORDER BY rowid
            "#,
        )
        .bind(reference_id)
        .fetch_all(self.pool())
        .await?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(DbError::from))
            .collect()
    }

    /// Postings from one source, oldest first.
    pub async fn by_source(&self, source: CashboxSource) -> DbResult<Vec<CashboxTransaction>> {
        let bodies: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM cashbox_transactions
            WHERE json_extract(body, '$.source') = ?1
            ORDER BY rowid
            "#,
        )
        .bind(source.as_str())
        .fetch_all(self.pool())
        .await?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(DbError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use chrono::Utc;
    use tally_core::{CashboxSource, Customer, Money, TransactionType};

    #[tokio::test]
    async fn test_by_source_filters_postings() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.customers()
            .add(&Customer::new("c-1", "Rana", Money::from_cents(5_000), Utc::now()))
            .await
            .unwrap();

        let ledger = db.ledger();
        ledger
            .post_manual_transaction(TransactionType::Add, Money::from_cents(10_000), "float", true)
            .await
            .unwrap();
        ledger
            .pay_customer_debt("c-1", Money::from_cents(2_000))
            .await
            .unwrap();
        ledger
            .post_manual_transaction(TransactionType::Subtract, Money::from_cents(500), "tip jar", true)
            .await
            .unwrap();

        let manual = db.cashbox().by_source(CashboxSource::Manual).await.unwrap();
        assert_eq!(manual.len(), 2);
        assert_eq!(manual[0].description, "float");
        assert_eq!(manual[1].description, "tip jar");

        let customer = db.cashbox().by_source(CashboxSource::Customer).await.unwrap();
        assert_eq!(customer.len(), 1);
        assert_eq!(customer[0].reference_id.as_deref(), Some("c-1"));

        assert!(db.cashbox().by_source(CashboxSource::Sale).await.unwrap().is_empty());
    }
}
