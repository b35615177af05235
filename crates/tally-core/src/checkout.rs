//! # Checkout
//!
//! Turns a cart into a fully priced [`Sale`] ready for the ledger.
//!
//! ## Pricing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► subtotal = Σ unit price × qty                                │
//! │              │                                                          │
//! │              ▼                                                          │
//! │          − discount  (0 ≤ discount ≤ subtotal)                          │
//! │              │                                                          │
//! │              ▼                                                          │
//! │          + tax       (settings rate on the discounted amount)           │
//! │              │                                                          │
//! │              ▼                                                          │
//! │            total ──► credit?  paid = 0, remaining = total               │
//! │                      else     paid = min(tendered, total)               │
//! │                               change = tendered − paid                  │
//! │                               remaining = total − paid                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices are frozen when a line is added: a product edited afterwards does
//! not change an open cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, Product, Sale, SaleItem, SaleStatus, Settings};
use crate::validation::{validate_amount_cents, validate_cart_size, validate_quantity};

/// A cart line with the product name and price frozen at the time it was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl CartLine {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
        }
    }

    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    fn into_item(self) -> SaleItem {
        let line_total_cents = self.line_total().cents();
        SaleItem {
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            line_total_cents,
        }
    }
}

/// Builder for a sale.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use tally_core::checkout::{CartLine, Checkout};
/// use tally_core::{Money, PaymentMethod, Settings};
///
/// let line = CartLine {
///     product_id: "p-1".into(),
///     product_name: "Tea".into(),
///     unit_price_cents: 1_000,
///     quantity: 3,
/// };
///
/// let sale = Checkout::new(PaymentMethod::Cash)
///     .line(line)
///     .tendered(Money::from_cents(5_000))
///     .build(&Settings::default(), Utc::now())
///     .unwrap();
///
/// assert_eq!(sale.total_cents, 3_000);
/// assert_eq!(sale.paid_amount_cents, 3_000);
/// assert_eq!(sale.change_cents, 2_000);
/// assert_eq!(sale.remaining_amount_cents, 0);
/// ```
#[derive(Debug, Clone)]
pub struct Checkout {
    sale_id: Option<String>,
    method: PaymentMethod,
    lines: Vec<CartLine>,
    customer_id: Option<String>,
    discount: Money,
    tendered: Option<Money>,
    notes: Option<String>,
}

impl Checkout {
    pub fn new(method: PaymentMethod) -> Self {
        Checkout {
            sale_id: None,
            method,
            lines: Vec::new(),
            customer_id: None,
            discount: Money::zero(),
            tendered: None,
            notes: None,
        }
    }

    /// Uses a caller-chosen id instead of a fresh UUID.
    pub fn sale_id(mut self, id: impl Into<String>) -> Self {
        self.sale_id = Some(id.into());
        self
    }

    /// Appends a line. A product already in the cart has its quantity increased.
    pub fn line(mut self, line: CartLine) -> Self {
        match self.lines.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => self.lines.push(line),
        }
        self
    }

    pub fn product(self, product: &Product, quantity: i64) -> Self {
        self.line(CartLine::from_product(product, quantity))
    }

    pub fn customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    /// Amount handed over at the counter. Defaults to the total for
    /// non-credit methods.
    pub fn tendered(mut self, amount: Money) -> Self {
        self.tendered = Some(amount);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Prices the cart and produces a sale.
    ///
    /// The invoice number is a preview taken from `settings`; the ledger
    /// assigns the final number when the sale is recorded.
    pub fn build(self, settings: &Settings, now: DateTime<Utc>) -> CoreResult<Sale> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        validate_cart_size(self.lines.len())?;
        for line in &self.lines {
            validate_quantity(line.quantity)?;
            validate_amount_cents("unit price", line.unit_price_cents)?;
        }
        validate_amount_cents("discount", self.discount.cents())?;

        let subtotal: Money = self.lines.iter().map(CartLine::line_total).sum();
        if self.discount > subtotal {
            return Err(CoreError::invalid_amount(format!(
                "discount {} exceeds subtotal {}",
                self.discount, subtotal
            )));
        }

        let taxable = subtotal - self.discount;
        let tax = taxable.calculate_tax(settings.tax_rate());
        let total = taxable + tax;

        let (paid, change) = match self.method {
            PaymentMethod::Credit => (Money::zero(), Money::zero()),
            _ => {
                let tendered = self.tendered.unwrap_or(total);
                validate_amount_cents("amount tendered", tendered.cents())?;
                let paid = tendered.min(total);
                (paid, tendered - paid)
            }
        };
        let remaining = (total - paid).non_negative();

        if self.customer_id.is_none() && (self.method == PaymentMethod::Credit || remaining.is_positive()) {
            return Err(ValidationError::required("customer").into());
        }

        Ok(Sale {
            id: self.sale_id.unwrap_or_else(crate::new_id),
            invoice_number: settings.next_invoice(),
            customer_id: self.customer_id,
            items: self.lines.into_iter().map(CartLine::into_item).collect(),
            subtotal_cents: subtotal.cents(),
            discount_cents: self.discount.cents(),
            tax_cents: tax.cents(),
            total_cents: total.cents(),
            paid_amount_cents: paid.cents(),
            remaining_amount_cents: remaining.cents(),
            change_cents: change.cents(),
            payment_method: self.method,
            status: SaleStatus::Completed,
            notes: self.notes,
            created_at: now,
            returned_at: None,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
