//! # Repository Module
//!
//! Per-table access to the stored entities.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Table per Entity                                 │
//! │                                                                         │
//! │  products              ┌──────────────┬───────────────────────────┐    │
//! │  customers             │ id (PK)      │ body (JSON document)      │    │
//! │  suppliers             ├──────────────┼───────────────────────────┤    │
//! │  categories            │ "p-1"        │ {"id":"p-1","stock":4,..} │    │
//! │  sales                 │ "p-2"        │ {"id":"p-2","stock":0,..} │    │
//! │  cashbox_transactions  └──────────────┴───────────────────────────┘    │
//! │  settings                                                              │
//! │  users                 rowid order = insertion order                   │
//! │  purchases                                                             │
//! │  expenses              one row per recorded event, so replays fail     │
//! │                                                                         │
//! │  db.table::<Product>().get_all()       ← standalone reads/writes       │
//! │  table::fetch_one::<Product>(&mut tx)  ← inside a ledger transaction   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`TableRepository`] - get_all / get / add / put / update / delete / count for any [`Record`]
//! - [`SettingsRepository`] - the singleton settings record
//! - `TableRepository<Product>::low_stock` - low-stock listing
//! - `TableRepository<CashboxTransaction>::by_reference` - audit trail of one event
//! - `TableRepository<CashboxTransaction>::by_source` - postings from one source

pub mod cashbox;
pub mod product;
pub mod settings;
pub mod table;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tally_core::{
    CashboxTransaction, Category, Customer, Expense, Product, Purchase, Sale, Settings, Supplier, User,
};

pub use settings::SettingsRepository;
pub use table::TableRepository;

// =============================================================================
// Tables
// =============================================================================

/// Every table in the store, in backup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Products,
    Customers,
    Suppliers,
    Categories,
    Sales,
    CashboxTransactions,
    Settings,
    Users,
    Purchases,
    Expenses,
}

impl Table {
    pub const ALL: [Table; 10] = [
        Table::Products,
        Table::Customers,
        Table::Suppliers,
        Table::Categories,
        Table::Sales,
        Table::CashboxTransactions,
        Table::Settings,
        Table::Users,
        Table::Purchases,
        Table::Expenses,
    ];

    /// SQL table name.
    pub const fn name(&self) -> &'static str {
        match self {
            Table::Products => "products",
            Table::Customers => "customers",
            Table::Suppliers => "suppliers",
            Table::Categories => "categories",
            Table::Sales => "sales",
            Table::CashboxTransactions => "cashbox_transactions",
            Table::Settings => "settings",
            Table::Users => "users",
            Table::Purchases => "purchases",
            Table::Expenses => "expenses",
        }
    }

    /// Entity name used in `NotFound` errors.
    pub const fn entity(&self) -> &'static str {
        match self {
            Table::Products => "Product",
            Table::Customers => "Customer",
            Table::Suppliers => "Supplier",
            Table::Categories => "Category",
            Table::Sales => "Sale",
            Table::CashboxTransactions => "Cashbox transaction",
            Table::Settings => "Settings",
            Table::Users => "User",
            Table::Purchases => "Purchase",
            Table::Expenses => "Expense",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Records
// =============================================================================

/// An entity stored as a JSON document in its own table.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + Unpin {
    const TABLE: Table;

    fn record_id(&self) -> &str;
}

macro_rules! impl_record {
    ($($ty:ty => $table:expr),* $(,)?) => {
        $(
            impl Record for $ty {
                const TABLE: Table = $table;

                fn record_id(&self) -> &str {
                    &self.id
                }
            }
        )*
    };
}

impl_record! {
    Product => Table::Products,
    Customer => Table::Customers,
    Supplier => Table::Suppliers,
    Category => Table::Categories,
    Sale => Table::Sales,
    CashboxTransaction => Table::CashboxTransactions,
    Settings => Table::Settings,
    User => Table::Users,
    Purchase => Table::Purchases,
    Expense => Table::Expenses,
}
