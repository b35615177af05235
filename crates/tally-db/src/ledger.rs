//! # Ledger Engine
//!
//! Applies business events to the store, one SQLite transaction per event.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  record_sale(sale)                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN ─────────────────────────────────────────────────────────────┐  │
//! │  │  load settings, assign invoice number                            │  │
//! │  │  plan effects (tally-core, pure)                                 │  │
//! │  │  INSERT sale            ── DuplicateKey? ──► ROLLBACK            │  │
//! │  │  UPDATE products        ── missing?      ──► ROLLBACK            │  │
//! │  │  UPDATE customer        ── missing?      ──► ROLLBACK            │  │
//! │  │  INSERT cashbox posting                                          │  │
//! │  │  UPDATE settings (nextInvoiceNumber + 1)                         │  │
//! │  └─ COMMIT ─────────────────────────────────────────────────────────┘  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerOutcome { sale, products, customer, transaction, settings }      │
//! │                                                                         │
//! │  Any error drops the transaction, which rolls it back: either every    │
//! │  mutation of the event is visible or none is.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every read an event needs goes through its own transaction. The pool is
//! never touched while a transaction is open, so a single-connection pool
//! (in-memory tests) cannot deadlock.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{Sqlite, SqliteConnection};
use sqlx::{SqlitePool, Transaction};
use tally_core::ledger::{
    self, apply_opening_balance, edit_manual, ensure_manual, manual_transaction, normalize_sale,
    plan_debt_payment, plan_expense, plan_purchase, plan_return, plan_sale, CashboxSummary,
    LedgerEffects, ManualEdit,
};
use tally_core::validation::validate_name;
use tally_core::{
    CashboxTransaction, CoreError, Customer, Expense, Money, Party, PartyKind, Product, Purchase,
    Sale, Settings, Supplier, TransactionType,
};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{settings, table, Record};

// =============================================================================
// Outcome
// =============================================================================

/// The entities an event changed, as committed.
///
/// Callers refresh whatever they display from this instead of patching
/// their own copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerOutcome {
    pub sale: Option<Sale>,
    pub products: Vec<Product>,
    pub customer: Option<Customer>,
    pub supplier: Option<Supplier>,
    pub transaction: Option<CashboxTransaction>,
    pub settings: Option<Settings>,
}

impl LedgerOutcome {
    fn record_product(&mut self, product: Product) {
        match self.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Entry point for every balance-, stock- or cashbox-affecting operation.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    pool: SqlitePool,
}

impl LedgerEngine {
    pub fn new(pool: SqlitePool) -> Self {
        LedgerEngine { pool }
    }

    async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    async fn commit(tx: Transaction<'static, Sqlite>) -> DbResult<()> {
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    // -------------------------------------------------------------------------
    // Sales
    // -------------------------------------------------------------------------

    /// Records a priced sale.
    ///
    /// ## Errors
    /// - `EmptyCart` when the sale has no lines
    /// - `DuplicateKey` when the sale id was already recorded
    /// - `ProductNotFound` / `CustomerNotFound` for dangling references
    /// - `Validation` for a credit or partly paid sale without a customer
    pub async fn record_sale(&self, mut sale: Sale) -> DbResult<LedgerOutcome> {
        let normalization = normalize_sale(&mut sale);
        if normalization.dropped_credit_payment.is_positive() {
            warn!(
                sale_id = %sale.id,
                dropped = %normalization.dropped_credit_payment,
                "Credit sale carried a payment; recorded as full credit"
            );
        }
        if normalization.overpayment.is_positive() {
            debug!(sale_id = %sale.id, change = %normalization.overpayment, "Overpayment moved to change");
        }

        let now = Utc::now();
        let mut tx = self.begin().await?;

        let mut settings = settings::load(&mut tx).await?;
        sale.invoice_number = settings.next_invoice();
        let effects = plan_sale(&sale, &settings)?;

        table::insert(&mut tx, &sale).await?;

        let mut outcome = LedgerOutcome::default();
        apply_effects(&mut tx, &effects, now, &mut outcome).await?;

        if effects.advance_invoice {
            settings.next_invoice_number += 1;
            settings::store(&mut tx, &settings).await?;
            outcome.settings = Some(settings);
        }

        Self::commit(tx).await?;

        info!(
            sale_id = %sale.id,
            invoice = %sale.invoice_number,
            total = %sale.total(),
            paid = %sale.paid(),
            method = ?sale.payment_method,
            "Sale recorded"
        );

        outcome.sale = Some(sale);
        Ok(outcome)
    }

    /// Returns a sale: stock back on the shelf, debt and cash reversed.
    ///
    /// A sale can be returned once; a second attempt is `AlreadyReturned`.
    pub async fn return_sale(&self, sale_id: &str) -> DbResult<LedgerOutcome> {
        let now = Utc::now();
        let mut tx = self.begin().await?;

        let mut sale: Sale = table::fetch_one(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        let effects = plan_return(&sale)?;
        sale.mark_returned(now);
        table::upsert(&mut tx, &sale).await?;

        let mut outcome = LedgerOutcome::default();
        apply_effects(&mut tx, &effects, now, &mut outcome).await?;

        Self::commit(tx).await?;

        info!(sale_id = %sale.id, invoice = %sale.invoice_number, refund = %sale.paid(), "Sale returned");

        outcome.sale = Some(sale);
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Purchases & Expenses
    // -------------------------------------------------------------------------

    /// Receives goods: stock up, supplier debt for the unpaid part, cash out
    /// for the paid part.
    ///
    /// The purchase itself is stored, so replaying the same id fails with
    /// `DuplicateKey` and changes nothing.
    pub async fn record_purchase(&self, purchase: Purchase) -> DbResult<LedgerOutcome> {
        let now = Utc::now();
        let mut tx = self.begin().await?;

        let settings = settings::load(&mut tx).await?;
        let effects = plan_purchase(&purchase, &settings)?;

        table::insert(&mut tx, &purchase).await?;

        let mut outcome = LedgerOutcome::default();
        apply_effects(&mut tx, &effects, now, &mut outcome).await?;

        Self::commit(tx).await?;

        info!(
            purchase_id = %purchase.id,
            total = %purchase.total(),
            paid = %purchase.paid(),
            lines = purchase.items.len(),
            "Purchase recorded"
        );
        Ok(outcome)
    }

    /// Posts an expense to the cashbox when auto-deduction is enabled.
    ///
    /// Stored like a purchase; a second call with the same id is `DuplicateKey`.
    pub async fn record_expense(&self, expense: Expense) -> DbResult<LedgerOutcome> {
        let now = Utc::now();
        let mut tx = self.begin().await?;

        let settings = settings::load(&mut tx).await?;
        let effects = plan_expense(&expense, &settings)?;

        table::insert(&mut tx, &expense).await?;

        let mut outcome = LedgerOutcome::default();
        apply_effects(&mut tx, &effects, now, &mut outcome).await?;

        Self::commit(tx).await?;

        info!(
            expense_id = %expense.id,
            amount = %expense.amount(),
            posted = outcome.transaction.is_some(),
            "Expense recorded"
        );
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Debt Payments
    // -------------------------------------------------------------------------

    /// A customer pays (part of) what they owe. Cash comes in.
    pub async fn pay_customer_debt(&self, customer_id: &str, amount: Money) -> DbResult<LedgerOutcome> {
        self.pay_debt::<Customer>(customer_id, amount).await
    }

    /// The store pays (part of) what it owes a supplier. Cash goes out.
    pub async fn pay_supplier_debt(&self, supplier_id: &str, amount: Money) -> DbResult<LedgerOutcome> {
        self.pay_debt::<Supplier>(supplier_id, amount).await
    }

    async fn pay_debt<P: Party + Record>(&self, party_id: &str, amount: Money) -> DbResult<LedgerOutcome> {
        let now = Utc::now();
        let mut tx = self.begin().await?;

        let party: P = table::fetch_one(&mut tx, party_id)
            .await?
            .ok_or_else(|| party_not_found(P::KIND, party_id))?;
        let effects = plan_debt_payment(&party, amount)?;

        let mut outcome = LedgerOutcome::default();
        apply_effects(&mut tx, &effects, now, &mut outcome).await?;

        Self::commit(tx).await?;

        info!(kind = %P::KIND, party_id = %party_id, amount = %amount, "Debt payment recorded");
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Opening Balances & Profiles
    // -------------------------------------------------------------------------

    /// Moves a party's opening balance; the current balance shifts by the
    /// same delta.
    pub async fn update_opening_balance(
        &self,
        kind: PartyKind,
        party_id: &str,
        new_opening: Money,
    ) -> DbResult<LedgerOutcome> {
        let mut outcome = LedgerOutcome::default();
        match kind {
            PartyKind::Customer => {
                outcome.customer = Some(self.shift_opening::<Customer>(party_id, new_opening).await?);
            }
            PartyKind::Supplier => {
                outcome.supplier = Some(self.shift_opening::<Supplier>(party_id, new_opening).await?);
            }
        }
        Ok(outcome)
    }

    async fn shift_opening<P: Party + Record>(&self, party_id: &str, new_opening: Money) -> DbResult<P> {
        let now = Utc::now();
        let mut tx = self.begin().await?;

        let mut party: P = table::fetch_one(&mut tx, party_id)
            .await?
            .ok_or_else(|| party_not_found(P::KIND, party_id))?;
        let delta = apply_opening_balance(&mut party, new_opening, now);
        table::upsert(&mut tx, &party).await?;

        Self::commit(tx).await?;

        info!(kind = %P::KIND, party_id = %party_id, delta = %delta, "Opening balance updated");
        Ok(party)
    }

    /// Saves edits to a customer's contact details.
    ///
    /// Balances are taken from the stored record; a changed opening balance
    /// goes through the opening-balance path.
    pub async fn update_customer_profile(&self, customer: Customer) -> DbResult<Customer> {
        self.update_profile(customer).await
    }

    /// Supplier counterpart of [`LedgerEngine::update_customer_profile`].
    pub async fn update_supplier_profile(&self, supplier: Supplier) -> DbResult<Supplier> {
        self.update_profile(supplier).await
    }

    async fn update_profile<P: Party + Record>(&self, mut incoming: P) -> DbResult<P> {
        validate_name("name", incoming.name()).map_err(CoreError::from)?;

        let now = Utc::now();
        let mut tx = self.begin().await?;

        let id = incoming.id().to_string();
        let stored: P = table::fetch_one(&mut tx, &id)
            .await?
            .ok_or_else(|| party_not_found(P::KIND, &id))?;

        let requested_opening = incoming.balance().opening;
        incoming.set_balance(stored.balance(), now);
        if requested_opening != stored.balance().opening {
            let delta = apply_opening_balance(&mut incoming, requested_opening, now);
            debug!(kind = %P::KIND, party_id = %id, delta = %delta, "Profile edit moved opening balance");
        }

        table::upsert(&mut tx, &incoming).await?;
        Self::commit(tx).await?;

        info!(kind = %P::KIND, party_id = %id, "Profile updated");
        Ok(incoming)
    }

    // -------------------------------------------------------------------------
    // Manual Cashbox Entries
    // -------------------------------------------------------------------------

    /// Posts a hand-entered cashbox row. No other entity is touched.
    pub async fn post_manual_transaction(
        &self,
        kind: TransactionType,
        amount: Money,
        description: &str,
        is_active: bool,
    ) -> DbResult<CashboxTransaction> {
        let row = manual_transaction(kind, amount, description, is_active, Utc::now())?;

        let mut conn = self.pool.acquire().await?;
        table::insert(&mut conn, &row).await?;

        info!(id = %row.id, kind = ?row.kind, amount = %amount, "Manual cashbox entry posted");
        Ok(row)
    }

    /// Edits a manual row. Rows posted by sales, purchases, expenses or
    /// payments are `NotManualTransaction`.
    pub async fn update_manual_transaction(&self, id: &str, edit: ManualEdit) -> DbResult<CashboxTransaction> {
        let mut tx = self.begin().await?;

        let mut row: CashboxTransaction = table::fetch_one(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        edit_manual(&mut row, edit)?;
        table::upsert(&mut tx, &row).await?;

        Self::commit(tx).await?;

        info!(id = %row.id, active = row.is_active, "Manual cashbox entry updated");
        Ok(row)
    }

    /// Deletes a manual row and returns it.
    pub async fn delete_manual_transaction(&self, id: &str) -> DbResult<CashboxTransaction> {
        let mut tx = self.begin().await?;

        let row: CashboxTransaction = table::fetch_one(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()))?;
        ensure_manual(&row)?;
        table::remove::<CashboxTransaction>(&mut tx, id).await?;

        Self::commit(tx).await?;

        info!(id = %row.id, "Manual cashbox entry deleted");
        Ok(row)
    }

    // -------------------------------------------------------------------------
    // Balance & Summaries
    // -------------------------------------------------------------------------

    /// Folds every stored cashbox row. Always read fresh from the store.
    pub async fn compute_cashbox_balance(&self) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<CashboxTransaction> = table::fetch_all(&mut conn).await?;
        Ok(ledger::cashbox_balance(&rows))
    }

    /// Cash in and out by source over `[from, to)`.
    pub async fn cashbox_summary(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<CashboxSummary> {
        let mut conn = self.pool.acquire().await?;
        let rows: Vec<CashboxTransaction> = table::fetch_all(&mut conn).await?;
        Ok(ledger::summarize(&rows, from, to))
    }
}

// =============================================================================
// Effect Application
// =============================================================================

fn party_not_found(kind: PartyKind, id: &str) -> CoreError {
    match kind {
        PartyKind::Customer => CoreError::CustomerNotFound(id.to_string()),
        PartyKind::Supplier => CoreError::SupplierNotFound(id.to_string()),
    }
}

/// Writes planned effects through the open transaction.
async fn apply_effects(
    conn: &mut SqliteConnection,
    effects: &LedgerEffects,
    now: DateTime<Utc>,
    outcome: &mut LedgerOutcome,
) -> DbResult<()> {
    for delta in &effects.stock {
        let mut product: Product = table::fetch_one(&mut *conn, &delta.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(delta.product_id.clone()))?;
        delta.apply_to(&mut product, now);
        table::upsert(&mut *conn, &product).await?;

        debug!(product_id = %product.id, delta = delta.delta, stock = product.stock, "Stock adjusted");
        outcome.record_product(product);
    }

    if let Some(adjustment) = &effects.party {
        match adjustment.kind {
            PartyKind::Customer => {
                let mut customer: Customer = table::fetch_one(&mut *conn, &adjustment.party_id)
                    .await?
                    .ok_or_else(|| party_not_found(PartyKind::Customer, &adjustment.party_id))?;
                if adjustment.clamps(&customer) {
                    warn!(customer_id = %customer.id, "Balance reduction clamped at zero");
                }
                adjustment.apply_to(&mut customer, now);
                table::upsert(&mut *conn, &customer).await?;
                outcome.customer = Some(customer);
            }
            PartyKind::Supplier => {
                let mut supplier: Supplier = table::fetch_one(&mut *conn, &adjustment.party_id)
                    .await?
                    .ok_or_else(|| party_not_found(PartyKind::Supplier, &adjustment.party_id))?;
                if adjustment.clamps(&supplier) {
                    warn!(supplier_id = %supplier.id, "Balance reduction clamped at zero");
                }
                adjustment.apply_to(&mut supplier, now);
                table::upsert(&mut *conn, &supplier).await?;
                outcome.supplier = Some(supplier);
            }
        }
    }

    if let Some(posting) = &effects.cashbox {
        let row = posting.clone().into_transaction(now);
        table::insert(&mut *conn, &row).await?;

        debug!(id = %row.id, source = %row.source, amount = %row.amount(), "Cashbox posting");
        outcome.transaction = Some(row);
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;
    use tally_core::checkout::Checkout;
    use tally_core::{CashboxSource, PaymentMethod, PurchaseItem, SaleStatus};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, id: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            barcode: None,
            category_id: None,
            price_cents,
            cost_cents: price_cents / 2,
            stock,
            min_stock: 0,
            tax_rate_bps: 0,
            created_at: now,
            updated_at: now,
        };
        db.products().add(&product).await.unwrap();
        product
    }

    async fn seed_customer(db: &Database, id: &str, opening_cents: i64) -> Customer {
        let customer = Customer::new(id, "Amal", Money::from_cents(opening_cents), Utc::now());
        db.customers().add(&customer).await.unwrap();
        customer
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_credit_sale_accounting() {
        let db = setup().await;
        let settings = db
            .settings()
            .save(&Settings {
                tax_rate_bps: 1500,
                ..Settings::default()
            })
            .await
            .unwrap();
        let product = seed_product(&db, "p-1", 10_000, 5).await;
        seed_customer(&db, "c-1", 0).await;

        let sale = Checkout::new(PaymentMethod::Credit)
            .product(&product, 1)
            .customer("c-1")
            .build(&settings, Utc::now())
            .unwrap();
        let outcome = db.ledger().record_sale(sale).await.unwrap();

        let sale = outcome.sale.unwrap();
        assert_eq!(sale.total_cents, 11_500);
        assert_eq!(sale.paid_amount_cents, 0);
        assert_eq!(sale.remaining_amount_cents, 11_500);
        assert_eq!(sale.invoice_number, "INV-000001");

        let customer = db.customers().get("c-1").await.unwrap().unwrap();
        assert_eq!(customer.current_balance_cents, 11_500);
        assert_eq!(customer.total_purchases_cents, 11_500);
        assert_eq!(outcome.customer, Some(customer));

        assert_eq!(stock_of(&db, "p-1").await, 4);
        assert_eq!(db.settings().get().await.unwrap().next_invoice_number, 2);
        assert_eq!(db.cashbox().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential() {
        let db = setup().await;
        let product = seed_product(&db, "p-1", 500, 10).await;
        let settings = db.settings().get().await.unwrap();

        for expected in ["INV-000001", "INV-000002", "INV-000003"] {
            let sale = Checkout::new(PaymentMethod::Cash)
                .product(&product, 1)
                .build(&settings, Utc::now())
                .unwrap();
            let outcome = db.ledger().record_sale(sale).await.unwrap();
            assert_eq!(outcome.sale.unwrap().invoice_number, expected);
        }
        assert_eq!(db.settings().get().await.unwrap().next_invoice_number, 4);
    }

    #[tokio::test]
    async fn test_sale_then_return_conserves_stock() {
        let db = setup().await;
        let product = seed_product(&db, "p-1", 1_000, 10).await;

        let sale = Checkout::new(PaymentMethod::Cash)
            .product(&product, 3)
            .build(&Settings::default(), Utc::now())
            .unwrap();
        let sale_id = sale.id.clone();

        db.ledger().record_sale(sale).await.unwrap();
        assert_eq!(stock_of(&db, "p-1").await, 7);
        assert_eq!(db.ledger().compute_cashbox_balance().await.unwrap().cents(), 3_000);

        let outcome = db.ledger().return_sale(&sale_id).await.unwrap();
        let returned = outcome.sale.unwrap();
        assert_eq!(returned.status, SaleStatus::Returned);
        assert!(returned.returned_at.is_some());
        assert_eq!(stock_of(&db, "p-1").await, 10);
        assert!(db.ledger().compute_cashbox_balance().await.unwrap().is_zero());

        let err = db.ledger().return_sale(&sale_id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::AlreadyReturned { .. })));
        assert_eq!(stock_of(&db, "p-1").await, 10);

        let trail = db.cashbox().by_reference(&sale_id).await.unwrap();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].kind, TransactionType::Add);
        assert_eq!(trail[1].kind, TransactionType::Subtract);
    }

    #[tokio::test]
    async fn test_duplicate_sale_id_changes_nothing() {
        let db = setup().await;
        let product = seed_product(&db, "p-1", 1_000, 10).await;

        let sale = Checkout::new(PaymentMethod::Cash)
            .sale_id("s-1")
            .product(&product, 2)
            .build(&Settings::default(), Utc::now())
            .unwrap();

        db.ledger().record_sale(sale.clone()).await.unwrap();
        let err = db.ledger().record_sale(sale).await.unwrap_err();

        assert!(matches!(err, DbError::DuplicateKey { .. }));
        assert_eq!(stock_of(&db, "p-1").await, 8);
        assert_eq!(db.cashbox().count().await.unwrap(), 1);
        assert_eq!(db.settings().get().await.unwrap().next_invoice_number, 2);
    }

    #[tokio::test]
    async fn test_missing_product_rolls_back_whole_sale() {
        let db = setup().await;
        let product = seed_product(&db, "p-1", 1_000, 10).await;
        let ghost = Product {
            id: "ghost".to_string(),
            ..product.clone()
        };

        let sale = Checkout::new(PaymentMethod::Cash)
            .product(&product, 1)
            .product(&ghost, 1)
            .build(&Settings::default(), Utc::now())
            .unwrap();
        let sale_id = sale.id.clone();

        let err = db.ledger().record_sale(sale).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(ref id)) if id == "ghost"));

        assert_eq!(stock_of(&db, "p-1").await, 10);
        assert!(db.sales().get(&sale_id).await.unwrap().is_none());
        assert_eq!(db.cashbox().count().await.unwrap(), 0);
        assert_eq!(db.settings().get().await.unwrap().next_invoice_number, 1);
    }

    #[tokio::test]
    async fn test_partial_payment_splits_cash_and_debt() {
        let db = setup().await;
        let product = seed_product(&db, "p-1", 1_000, 10).await;
        seed_customer(&db, "c-1", 0).await;

        let sale = Checkout::new(PaymentMethod::Cash)
            .product(&product, 1)
            .customer("c-1")
            .tendered(Money::from_cents(600))
            .build(&Settings::default(), Utc::now())
            .unwrap();
        let outcome = db.ledger().record_sale(sale).await.unwrap();

        assert_eq!(outcome.transaction.unwrap().amount_cents, 600);
        let customer = outcome.customer.unwrap();
        assert_eq!(customer.current_balance_cents, 400);
        assert_eq!(customer.total_purchases_cents, 1_000);
    }

    #[tokio::test]
    async fn test_returning_credit_sale_clears_debt() {
        let db = setup().await;
        let product = seed_product(&db, "p-1", 2_000, 3).await;
        seed_customer(&db, "c-1", 0).await;

        let sale = Checkout::new(PaymentMethod::Credit)
            .product(&product, 1)
            .customer("c-1")
            .build(&Settings::default(), Utc::now())
            .unwrap();
        let sale_id = sale.id.clone();
        db.ledger().record_sale(sale).await.unwrap();

        let outcome = db.ledger().return_sale(&sale_id).await.unwrap();
        let customer = outcome.customer.unwrap();
        assert_eq!(customer.current_balance_cents, 0);
        assert_eq!(customer.total_purchases_cents, 0);
        assert!(outcome.transaction.is_none());
    }

    #[tokio::test]
    async fn test_credit_sale_needs_existing_customer() {
        let db = setup().await;
        let product = seed_product(&db, "p-1", 2_000, 3).await;

        let sale = Checkout::new(PaymentMethod::Credit)
            .product(&product, 1)
            .customer("nobody")
            .build(&Settings::default(), Utc::now())
            .unwrap();
        let err = db.ledger().record_sale(sale).await.unwrap_err();

        assert!(matches!(err, DbError::Core(CoreError::CustomerNotFound(_))));
        assert_eq!(stock_of(&db, "p-1").await, 3);
    }

    #[tokio::test]
    async fn test_debt_payment_clamp() {
        let db = setup().await;
        seed_customer(&db, "c-1", 500).await;

        let err = db
            .ledger()
            .pay_customer_debt("c-1", Money::from_cents(501))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InvalidAmount { .. })));
        assert_eq!(db.cashbox().count().await.unwrap(), 0);

        let outcome = db
            .ledger()
            .pay_customer_debt("c-1", Money::from_cents(500))
            .await
            .unwrap();
        assert_eq!(outcome.customer.unwrap().current_balance_cents, 0);

        let rows = db.cashbox().get_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, TransactionType::Add);
        assert_eq!(rows[0].amount_cents, 500);
        assert_eq!(rows[0].source, CashboxSource::Customer);
        assert_eq!(rows[0].reference_id.as_deref(), Some("c-1"));
    }

    #[tokio::test]
    async fn test_purchase_and_supplier_payment() {
        let db = setup().await;
        seed_product(&db, "p-1", 300, 2).await;
        db.suppliers()
            .add(&Supplier::new("sup-1", "Wholesale Co", Money::zero(), Utc::now()))
            .await
            .unwrap();

        let purchase = Purchase {
            id: tally_core::new_id(),
            supplier_id: Some("sup-1".to_string()),
            items: vec![PurchaseItem {
                product_id: "p-1".to_string(),
                quantity: 20,
                unit_cost_cents: 150,
            }],
            total_cents: 3_000,
            paid_amount_cents: 1_000,
            notes: None,
            created_at: Utc::now(),
        };
        let outcome = db.ledger().record_purchase(purchase).await.unwrap();

        assert_eq!(outcome.products[0].stock, 22);
        let supplier = outcome.supplier.unwrap();
        assert_eq!(supplier.current_balance_cents, 2_000);
        assert_eq!(supplier.total_orders_cents, 3_000);
        assert_eq!(db.ledger().compute_cashbox_balance().await.unwrap().cents(), -1_000);

        let outcome = db
            .ledger()
            .pay_supplier_debt("sup-1", Money::from_cents(2_000))
            .await
            .unwrap();
        assert_eq!(outcome.supplier.unwrap().current_balance_cents, 0);
        assert_eq!(outcome.transaction.unwrap().source, CashboxSource::Supplier);
        assert_eq!(db.ledger().compute_cashbox_balance().await.unwrap().cents(), -3_000);
    }

    #[tokio::test]
    async fn test_expense_gating() {
        let db = setup().await;
        db.ledger()
            .post_manual_transaction(TransactionType::Add, Money::from_cents(10_000), "float", true)
            .await
            .unwrap();
        db.settings()
            .save(&Settings {
                auto_deduct_expenses_from_cashbox: false,
                ..Settings::default()
            })
            .await
            .unwrap();

        let expense = Expense {
            id: tally_core::new_id(),
            category: "Utilities".to_string(),
            description: "Electricity".to_string(),
            amount_cents: 4_200,
            created_at: Utc::now(),
        };
        let outcome = db.ledger().record_expense(expense).await.unwrap();

        assert!(outcome.transaction.is_none());
        assert_eq!(db.cashbox().count().await.unwrap(), 1);
        assert_eq!(db.ledger().compute_cashbox_balance().await.unwrap().cents(), 10_000);
    }

    fn restock(id: &str, quantity: i64, paid_cents: i64) -> Purchase {
        Purchase {
            id: id.to_string(),
            supplier_id: None,
            items: vec![PurchaseItem {
                product_id: "p-1".to_string(),
                quantity,
                unit_cost_cents: 100,
            }],
            total_cents: quantity * 100,
            paid_amount_cents: paid_cents,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_same_purchase_twice_is_rejected() {
        let db = setup().await;
        seed_product(&db, "p-1", 300, 0).await;

        db.ledger().record_purchase(restock("po-1", 5, 250)).await.unwrap();
        let err = db.ledger().record_purchase(restock("po-1", 5, 250)).await.unwrap_err();

        assert!(matches!(err, DbError::DuplicateKey { .. }));
        assert_eq!(stock_of(&db, "p-1").await, 5);
        assert_eq!(db.cashbox().by_reference("po-1").await.unwrap().len(), 1);
        assert_eq!(db.ledger().compute_cashbox_balance().await.unwrap().cents(), -250);
        assert_eq!(db.purchases().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unpaid_purchase_twice_is_rejected() {
        let db = setup().await;
        seed_product(&db, "p-1", 300, 1).await;

        let outcome = db.ledger().record_purchase(restock("po-2", 4, 0)).await.unwrap();
        assert!(outcome.transaction.is_none());

        let err = db.ledger().record_purchase(restock("po-2", 4, 0)).await.unwrap_err();

        assert!(matches!(err, DbError::DuplicateKey { .. }));
        assert_eq!(stock_of(&db, "p-1").await, 5);
        assert_eq!(db.cashbox().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_same_expense_twice_is_rejected() {
        let db = setup().await;
        let expense = Expense {
            id: "e-1".to_string(),
            category: "Supplies".to_string(),
            description: "Receipt paper".to_string(),
            amount_cents: 100,
            created_at: Utc::now(),
        };

        db.ledger().record_expense(expense.clone()).await.unwrap();
        let err = db.ledger().record_expense(expense).await.unwrap_err();

        assert!(matches!(err, DbError::DuplicateKey { .. }));
        assert_eq!(db.cashbox().by_reference("e-1").await.unwrap().len(), 1);
        assert_eq!(db.ledger().compute_cashbox_balance().await.unwrap().cents(), -100);
        assert_eq!(db.expenses().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_manual_entries_edit_and_delete() {
        let db = setup().await;
        let ledger = db.ledger();

        let row = ledger
            .post_manual_transaction(TransactionType::Subtract, Money::from_cents(800), "petty cash", true)
            .await
            .unwrap();
        assert_eq!(ledger.compute_cashbox_balance().await.unwrap().cents(), -800);

        let row = ledger
            .update_manual_transaction(
                &row.id,
                ManualEdit {
                    is_active: Some(false),
                    ..ManualEdit::default()
                },
            )
            .await
            .unwrap();
        assert!(!row.is_active);
        assert!(ledger.compute_cashbox_balance().await.unwrap().is_zero());

        ledger.delete_manual_transaction(&row.id).await.unwrap();
        assert_eq!(db.cashbox().count().await.unwrap(), 0);

        let err = ledger.delete_manual_transaction(&row.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::TransactionNotFound(_))));
    }

    #[tokio::test]
    async fn test_system_postings_are_not_editable() {
        let db = setup().await;
        seed_customer(&db, "c-1", 900).await;
        let outcome = db
            .ledger()
            .pay_customer_debt("c-1", Money::from_cents(900))
            .await
            .unwrap();
        let posting = outcome.transaction.unwrap();

        let err = db
            .ledger()
            .delete_manual_transaction(&posting.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NotManualTransaction { .. })));
        assert_eq!(db.cashbox().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_opening_balance_update_keeps_accrued_debt() {
        let db = setup().await;
        let product = seed_product(&db, "p-1", 500, 5).await;
        seed_customer(&db, "c-1", 1_000).await;

        let sale = Checkout::new(PaymentMethod::Credit)
            .product(&product, 1)
            .customer("c-1")
            .build(&Settings::default(), Utc::now())
            .unwrap();
        db.ledger().record_sale(sale).await.unwrap();

        let outcome = db
            .ledger()
            .update_opening_balance(PartyKind::Customer, "c-1", Money::from_cents(200))
            .await
            .unwrap();
        let customer = outcome.customer.unwrap();
        assert_eq!(customer.opening_balance_cents, 200);
        assert_eq!(customer.current_balance_cents, 700);
    }

    #[tokio::test]
    async fn test_profile_edit_cannot_touch_current_balance() {
        let db = setup().await;
        let mut customer = seed_customer(&db, "c-1", 300).await;

        customer.phone = Some("555-0199".to_string());
        customer.current_balance_cents = 0;
        customer.total_purchases_cents = 99_999;
        let saved = db.ledger().update_customer_profile(customer).await.unwrap();

        assert_eq!(saved.phone.as_deref(), Some("555-0199"));
        assert_eq!(saved.current_balance_cents, 300);
        assert_eq!(saved.total_purchases_cents, 0);
        assert_eq!(db.customers().get("c-1").await.unwrap().unwrap(), saved);
    }

    #[tokio::test]
    async fn test_cashbox_summary_by_source() {
        let db = setup().await;
        let product = seed_product(&db, "p-1", 1_500, 5).await;
        let sale = Checkout::new(PaymentMethod::Cash)
            .product(&product, 2)
            .build(&Settings::default(), Utc::now())
            .unwrap();
        db.ledger().record_sale(sale).await.unwrap();
        db.ledger()
            .post_manual_transaction(TransactionType::Subtract, Money::from_cents(500), "bank", true)
            .await
            .unwrap();

        let now = Utc::now();
        let summary = db
            .ledger()
            .cashbox_summary(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(summary.total_in.cents(), 3_000);
        assert_eq!(summary.total_out.cents(), 500);
        assert_eq!(summary.net.cents(), 2_500);
        assert_eq!(summary.by_source[&CashboxSource::Sale].count, 1);
        assert_eq!(summary.by_source[&CashboxSource::Manual].subtracted.cents(), 500);
    }
}
