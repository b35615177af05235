//! # tally-core: Pure Business Logic for the Tally ledger
//!
//! This crate holds every rule that keeps the cashbox, customer and supplier
//! balances, product stock and invoice state consistent with each other. It
//! performs no I/O: the database crate loads entities, asks this crate what
//! a business event does to them, and writes the answer back in one
//! transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Screens (POS, inventory, cashbox, backups)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  types   │ │ checkout │ │  ledger  │ │    rehydrate     │  │   │
//! │  │   │ Product  │ │  pricing │ │ effects  │ │ ISO strings →    │  │   │
//! │  │   │ Sale ... │ │  totals  │ │ balance  │ │ dates            │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │     tally-db: SQLite store, Ledger Engine, Backup/Restore       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Product, Customer, Sale, CashboxTransaction, ...)
//! - [`money`] - Integer-cent `Money`
//! - [`checkout`] - Turns a cart into a fully priced `Sale`
//! - [`ledger`] - Effect planning for every business event and the balance fold
//! - [`rehydrate`] - Restores date values inside deserialized JSON
//! - [`validation`] - Input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::ledger::cashbox_balance;
//! use tally_core::{CashboxSource, CashboxTransaction, Money, TransactionType};
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let txs = vec![
//!     CashboxTransaction::new(TransactionType::Add, Money::from_cents(5000),
//!         CashboxSource::Manual, None, "float", now),
//!     CashboxTransaction::new(TransactionType::Subtract, Money::from_cents(1200),
//!         CashboxSource::Expense, None, "cleaning", now),
//! ];
//!
//! assert_eq!(cashbox_balance(&txs).cents(), 3800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod ledger;
pub mod money;
pub mod rehydrate;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typos like 1000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Largest single amount accepted anywhere (10 billion in major units).
///
/// A full cart at this price and `MAX_ITEM_QUANTITY` still fits in `i64` cents.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000;

/// Generates a new entity identifier (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
