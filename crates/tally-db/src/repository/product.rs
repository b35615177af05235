//! # Product Queries
//!
//! Product-specific reads on top of the generic table repository.

use tally_core::Product;
use tracing::debug;

use super::table::TableRepository;
use crate::error::{DbError, DbResult};

impl TableRepository<Product> {
    /// Products whose stock is at or below their alert threshold, in
    /// insertion order.
    ///
    /// ## Example
    /// ```rust,ignore
    /// for product in db.products().low_stock().await? {
    ///     println!("{}: {} left", product.name, product.stock);
    /// }
    /// ```
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let bodies: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM products
            WHERE json_extract(body, '$.stock') <= json_extract(body, '$.minStock')
            ORDER BY rowid
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        debug!(count = bodies.len(), "Low-stock products");

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(DbError::from))
            .collect()
    }

    /// Looks a product up by its barcode.
    pub async fn find_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let body: Option<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM products
            WHERE json_extract(body, '$.barcode') = ?1
            ORDER BY rowid
            LIMIT 1
            "#,
        )
        .bind(barcode)
        .fetch_optional(self.pool())
        .await?;

        Ok(body.as_deref().map(serde_json::from_str).transpose()?)
    }
}
