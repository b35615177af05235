//! # Domain Types
//!
//! Every entity the ledger keeps consistent, plus the two event inputs
//! (purchases and expenses) that touch the ledger without being stored.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Stored Entities                                 │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────────┐  │
//! │  │   Product    │  │  Customer    │  │      CashboxTransaction      │  │
//! │  │  stock       │  │  Supplier    │  │  type: add | subtract        │  │
//! │  │  min_stock   │  │  opening /   │  │  source: manual | sale | ... │  │
//! │  │  price/cost  │  │  current bal │  │  reference_id, is_active     │  │
//! │  └──────────────┘  └──────────────┘  └──────────────────────────────┘  │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐ ┌────────────┐   │
//! │  │    Sale      │  │   Settings   │  │   Category   │ │    User    │   │
//! │  │  items       │  │  (singleton) │  │              │ │   (stub)   │   │
//! │  │  paid/remain │  │  invoice no. │  │              │ │            │   │
//! │  └──────────────┘  └──────────────┘  └──────────────┘ └────────────┘   │
//! │                                                                         │
//! │  Event inputs (not stored): Purchase, Expense                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All amounts are cents, all rates are basis points, all timestamps are UTC.
//! Field names serialize as camelCase, which is also the backup file format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

/// Fixed key of the singleton settings record.
pub const SETTINGS_KEY: &str = "app-settings";

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1500 = 15%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage as typed on the settings screen.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product on the shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub barcode: Option<String>,
    pub category_id: Option<String>,
    pub price_cents: i64,
    pub cost_cents: i64,
    /// Units on hand. Expected to stay ≥ 0 but not enforced: a sale is never
    /// blocked because the shelf count is wrong.
    pub stock: i64,
    /// Low-stock alert threshold.
    pub min_stock: i64,
    pub tax_rate_bps: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// True when stock has fallen to or below the alert threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Applies a signed stock change.
    pub fn adjust_stock(&mut self, delta: i64, now: DateTime<Utc>) {
        self.stock += delta;
        self.updated_at = now;
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Parties (Customers & Suppliers)
// =============================================================================

/// Which side of the counter a party sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyKind::Customer => f.write_str("customer"),
            PartyKind::Supplier => f.write_str("supplier"),
        }
    }
}

/// The three running figures kept for every customer and supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartyBalance {
    /// Debt (positive) or credit (negative) carried over when the party was created.
    pub opening: Money,
    /// What the party owes right now, signed.
    pub current: Money,
    /// Lifetime purchases (customer) or orders (supplier).
    pub cumulative: Money,
}

/// Common view over customers and suppliers used by the ledger.
pub trait Party {
    const KIND: PartyKind;

    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn balance(&self) -> PartyBalance;

    fn set_balance(&mut self, balance: PartyBalance, now: DateTime<Utc>);
}

/// A customer who may buy on credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub opening_balance_cents: i64,
    pub current_balance_cents: i64,
    pub total_purchases_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer whose current balance starts at the opening balance.
    pub fn new(id: impl Into<String>, name: impl Into<String>, opening: Money, now: DateTime<Utc>) -> Self {
        Customer {
            id: id.into(),
            name: name.into(),
            phone: None,
            email: None,
            address: None,
            opening_balance_cents: opening.cents(),
            current_balance_cents: opening.cents(),
            total_purchases_cents: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Party for Customer {
    const KIND: PartyKind = PartyKind::Customer;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn balance(&self) -> PartyBalance {
        PartyBalance {
            opening: Money::from_cents(self.opening_balance_cents),
            current: Money::from_cents(self.current_balance_cents),
            cumulative: Money::from_cents(self.total_purchases_cents),
        }
    }

    fn set_balance(&mut self, balance: PartyBalance, now: DateTime<Utc>) {
        self.opening_balance_cents = balance.opening.cents();
        self.current_balance_cents = balance.current.cents();
        self.total_purchases_cents = balance.cumulative.cents();
        self.updated_at = now;
    }
}

/// A supplier the store buys from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub opening_balance_cents: i64,
    /// What the store owes this supplier.
    pub current_balance_cents: i64,
    pub total_orders_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Supplier {
    pub fn new(id: impl Into<String>, name: impl Into<String>, opening: Money, now: DateTime<Utc>) -> Self {
        Supplier {
            id: id.into(),
            name: name.into(),
            phone: None,
            email: None,
            address: None,
            opening_balance_cents: opening.cents(),
            current_balance_cents: opening.cents(),
            total_orders_cents: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Party for Supplier {
    const KIND: PartyKind = PartyKind::Supplier;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn balance(&self) -> PartyBalance {
        PartyBalance {
            opening: Money::from_cents(self.opening_balance_cents),
            current: Money::from_cents(self.current_balance_cents),
            cumulative: Money::from_cents(self.total_orders_cents),
        }
    }

    fn set_balance(&mut self, balance: PartyBalance, now: DateTime<Utc>) {
        self.opening_balance_cents = balance.opening.cents();
        self.current_balance_cents = balance.current.cents();
        self.total_orders_cents = balance.cumulative.cents();
        self.updated_at = now;
    }
}

// =============================================================================
// Sales
// =============================================================================

/// Lifecycle of a sale.
///
/// `Returned` is terminal: a returned sale can never change status again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    Pending,
    Cancelled,
    Returned,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

/// How the customer settled at the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    /// Whole amount deferred to the customer's debt.
    Credit,
}

/// A line on an invoice. Name and price are frozen at the time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

/// An invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub invoice_number: String,
    pub customer_id: Option<String>,
    pub items: Vec<SaleItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    /// Amount applied to the invoice (never more than the total).
    pub paid_amount_cents: i64,
    pub remaining_amount_cents: i64,
    /// Cash handed back when the customer tendered more than the total.
    pub change_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub returned_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_amount_cents)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.remaining_amount_cents)
    }

    #[inline]
    pub fn is_credit(&self) -> bool {
        self.payment_method == PaymentMethod::Credit
    }

    #[inline]
    pub fn is_returned(&self) -> bool {
        self.status == SaleStatus::Returned
    }

    /// Moves the sale to its terminal `Returned` state.
    pub fn mark_returned(&mut self, now: DateTime<Utc>) {
        self.status = SaleStatus::Returned;
        self.returned_at = Some(now);
    }
}

// =============================================================================
// Cashbox
// =============================================================================

/// Direction of a cashbox posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Add,
    Subtract,
}

/// The business event that produced a cashbox posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CashboxSource {
    Manual,
    Sale,
    Purchase,
    Expense,
    Customer,
    Supplier,
}

impl CashboxSource {
    /// All sources in display order.
    pub const ALL: [CashboxSource; 6] = [
        CashboxSource::Manual,
        CashboxSource::Sale,
        CashboxSource::Purchase,
        CashboxSource::Expense,
        CashboxSource::Customer,
        CashboxSource::Supplier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CashboxSource::Manual => "manual",
            CashboxSource::Sale => "sale",
            CashboxSource::Purchase => "purchase",
            CashboxSource::Expense => "expense",
            CashboxSource::Customer => "customer",
            CashboxSource::Supplier => "supplier",
        }
    }
}

impl fmt::Display for CashboxSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the cashbox ledger.
///
/// Only `is_active` and `description` change after creation (and, for
/// manual rows, the amount). Inactive rows stay in the table for the audit
/// trail but do not count towards the balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashboxTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount_cents: i64,
    pub source: CashboxSource,
    pub reference_id: Option<String>,
    pub description: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashboxTransaction {
    /// Creates an active posting with a fresh id.
    pub fn new(
        kind: TransactionType,
        amount: Money,
        source: CashboxSource,
        reference_id: Option<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        CashboxTransaction {
            id: crate::new_id(),
            kind,
            amount_cents: amount.cents(),
            source,
            reference_id,
            description: description.into(),
            is_active: true,
            created_at: now,
        }
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Contribution of this row to the cashbox balance.
    pub fn signed_amount(&self) -> Money {
        if !self.is_active {
            return Money::zero();
        }
        match self.kind {
            TransactionType::Add => self.amount(),
            TransactionType::Subtract => -self.amount(),
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Store-wide settings, stored as a single record under [`SETTINGS_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: String,
    pub store_name: String,
    pub tax_rate_bps: u32,
    pub currency_symbol: String,
    pub invoice_prefix: String,
    /// Number the next recorded sale receives. Starts at 1.
    pub next_invoice_number: u64,
    pub auto_add_sales_to_cashbox: bool,
    pub auto_deduct_purchases_from_cashbox: bool,
    pub auto_deduct_expenses_from_cashbox: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            id: SETTINGS_KEY.to_string(),
            store_name: "My Store".to_string(),
            tax_rate_bps: 0,
            currency_symbol: "$".to_string(),
            invoice_prefix: "INV-".to_string(),
            next_invoice_number: 1,
            auto_add_sales_to_cashbox: true,
            auto_deduct_purchases_from_cashbox: true,
            auto_deduct_expenses_from_cashbox: true,
        }
    }
}

impl Settings {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Invoice number the next sale will carry, e.g. `INV-000042`.
    pub fn next_invoice(&self) -> String {
        format!("{}{:06}", self.invoice_prefix, self.next_invoice_number)
    }

    /// Formats an amount with the configured currency symbol.
    pub fn format_amount(&self, amount: Money) -> String {
        amount.format_with_symbol(&self.currency_symbol)
    }
}

// =============================================================================
// Users (stub)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Cashier,
}

/// A login. Authentication lives outside the core; users are carried so
/// that backups restore them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Event Inputs
// =============================================================================

/// A line on a purchase order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// Goods received from a supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub supplier_id: Option<String>,
    pub items: Vec<PurchaseItem>,
    pub total_cents: i64,
    pub paid_amount_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_amount_cents)
    }
}

/// Money leaving the store that is not tied to goods (rent, cleaning, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub category: String,
    pub description: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Expense {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
