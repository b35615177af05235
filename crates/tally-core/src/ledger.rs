//! # Ledger
//!
//! Effect planning for every business event, and the cashbox balance fold.
//!
//! Nothing here touches storage. The database crate loads the entities an
//! event touches, calls one of the `plan_*` functions, applies the returned
//! [`LedgerEffects`] and commits everything in a single transaction.
//!
//! ## Event → Effects
//! ```text
//! ┌──────────────────┬──────────────┬───────────────────────┬────────────────────────┐
//! │ Event            │ Stock        │ Party                 │ Cashbox (≤ 1 posting)  │
//! ├──────────────────┼──────────────┼───────────────────────┼────────────────────────┤
//! │ sale             │ − qty / line │ credit: +total        │ add min(paid, total)   │
//! │                  │              │ partial: +remaining   │ (if auto-add enabled)  │
//! │                  │              │ always: purchases+tot │                        │
//! │ sale return      │ + qty / line │ −remaining, −total    │ subtract paid          │
//! │                  │              │ (floored)             │                        │
//! │ purchase         │ + qty / line │ supplier: +unpaid,    │ subtract paid          │
//! │                  │              │ orders+total          │ (if auto-deduct)       │
//! │ expense          │      -       │          -            │ subtract amount        │
//! │                  │              │                       │ (if auto-deduct)       │
//! │ customer payment │      -       │ −amount               │ add amount             │
//! │ supplier payment │      -       │ −amount               │ subtract amount        │
//! │ manual entry     │      -       │          -            │ as entered             │
//! └──────────────────┴──────────────┴───────────────────────┴────────────────────────┘
//! ```
//!
//! ## Credit Sales With a Payment
//! A sale marked `credit` that also carries a paid amount is contradictory.
//! The credit branch wins: [`normalize_sale`] resets the payment to zero and
//! the whole total goes to the customer's debt. No cash is posted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    CashboxSource, CashboxTransaction, Expense, Party, PartyBalance, PartyKind, PaymentMethod,
    Product, Purchase, Sale, Settings, TransactionType,
};
use crate::validation::{
    validate_amount_cents, validate_cart_size, validate_id, validate_payment_amount, validate_quantity,
};

// =============================================================================
// Balance Fold
// =============================================================================

/// Cashbox balance: Σ active `add` − Σ active `subtract`.
///
/// Order independent; inactive rows contribute nothing.
///
/// ```rust
/// use chrono::Utc;
/// use tally_core::ledger::cashbox_balance;
/// use tally_core::{CashboxSource, CashboxTransaction, Money, TransactionType};
///
/// let now = Utc::now();
/// let mut voided = CashboxTransaction::new(TransactionType::Add, Money::from_cents(999),
///     CashboxSource::Manual, None, "typo", now);
/// voided.is_active = false;
///
/// let txs = vec![
///     CashboxTransaction::new(TransactionType::Add, Money::from_cents(1000),
///         CashboxSource::Sale, Some("s-1".into()), "sale", now),
///     voided,
/// ];
/// assert_eq!(cashbox_balance(&txs).cents(), 1000);
/// ```
pub fn cashbox_balance<'a, I>(transactions: I) -> Money
where
    I: IntoIterator<Item = &'a CashboxTransaction>,
{
    transactions
        .into_iter()
        .map(CashboxTransaction::signed_amount)
        .sum()
}

// =============================================================================
// Effects
// =============================================================================

/// Signed change to one product's stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: String,
    pub delta: i64,
}

impl StockDelta {
    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) {
        product.adjust_stock(self.delta, now);
    }
}

/// Change to a customer's or supplier's running figures.
///
/// Reductions are floored: they never take a figure below zero, and never
/// move a figure that is already negative (a credit balance) further down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyAdjustment {
    pub kind: PartyKind,
    pub party_id: String,
    pub current_delta: Money,
    pub cumulative_delta: Money,
}

impl PartyAdjustment {
    pub fn apply_to<P: Party>(&self, party: &mut P, now: DateTime<Utc>) {
        let balance = party.balance();
        let updated = PartyBalance {
            opening: balance.opening,
            current: apply_floored(balance.current, self.current_delta),
            cumulative: apply_floored(balance.cumulative, self.cumulative_delta),
        };
        party.set_balance(updated, now);
    }

    /// True when applying the reduction would have to be clamped.
    pub fn clamps<P: Party>(&self, party: &P) -> bool {
        let balance = party.balance();
        let raw = balance.current + self.current_delta;
        apply_floored(balance.current, self.current_delta) != raw
    }
}

fn apply_floored(current: Money, delta: Money) -> Money {
    if delta.is_negative() {
        (current + delta).max(current.min(Money::zero()))
    } else {
        current + delta
    }
}

/// A cashbox row to be created by the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashboxPosting {
    pub kind: TransactionType,
    pub amount: Money,
    pub source: CashboxSource,
    pub reference_id: String,
    pub description: String,
}

impl CashboxPosting {
    pub fn into_transaction(self, now: DateTime<Utc>) -> CashboxTransaction {
        CashboxTransaction::new(
            self.kind,
            self.amount,
            self.source,
            Some(self.reference_id),
            self.description,
            now,
        )
    }
}

/// Everything one business event does to the stored state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerEffects {
    pub stock: Vec<StockDelta>,
    pub party: Option<PartyAdjustment>,
    pub cashbox: Option<CashboxPosting>,
    /// Whether the settings invoice counter moves forward by one.
    pub advance_invoice: bool,
}

// =============================================================================
// Sales
// =============================================================================

/// What [`normalize_sale`] had to change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaleNormalization {
    /// Payment discarded because the sale is on credit.
    pub dropped_credit_payment: Money,
    /// Payment above the total, moved to change.
    pub overpayment: Money,
}

/// Brings the payment fields of a sale in line with its method and total.
///
/// - credit: `paid = 0`, `remaining = total`, `change = 0`
/// - otherwise: `paid ≤ total` (any excess moves to change),
///   `remaining = max(0, total − paid)`
pub fn normalize_sale(sale: &mut Sale) -> SaleNormalization {
    let mut report = SaleNormalization::default();
    let total = sale.total();

    if sale.payment_method == PaymentMethod::Credit {
        report.dropped_credit_payment = sale.paid();
        sale.paid_amount_cents = 0;
        sale.change_cents = 0;
        sale.remaining_amount_cents = total.cents();
        return report;
    }

    if sale.paid() > total {
        report.overpayment = sale.paid() - total;
        sale.change_cents += report.overpayment.cents();
        sale.paid_amount_cents = total.cents();
    }
    sale.remaining_amount_cents = (total - sale.paid()).non_negative().cents();
    report
}

/// Plans the effects of recording a (normalized) sale.
pub fn plan_sale(sale: &Sale, settings: &Settings) -> CoreResult<LedgerEffects> {
    if sale.items.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    validate_id(&sale.id)?;
    validate_cart_size(sale.items.len())?;
    for item in &sale.items {
        validate_quantity(item.quantity)?;
    }
    validate_amount_cents("total", sale.total_cents)?;
    validate_amount_cents("paid amount", sale.paid_amount_cents)?;

    let total = sale.total();
    let paid = sale.paid();

    let party = match &sale.customer_id {
        Some(customer_id) => {
            let current_delta = if sale.is_credit() {
                total
            } else {
                sale.remaining()
            };
            Some(PartyAdjustment {
                kind: PartyKind::Customer,
                party_id: customer_id.clone(),
                current_delta,
                cumulative_delta: total,
            })
        }
        None if sale.is_credit() || sale.remaining().is_positive() => {
            return Err(ValidationError::required("customer").into());
        }
        None => None,
    };

    let cashbox = (paid.is_positive() && settings.auto_add_sales_to_cashbox).then(|| CashboxPosting {
        kind: TransactionType::Add,
        amount: paid.min(total),
        source: CashboxSource::Sale,
        reference_id: sale.id.clone(),
        description: format!("Sale {}", sale.invoice_number),
    });

    Ok(LedgerEffects {
        stock: sale
            .items
            .iter()
            .map(|item| StockDelta {
                product_id: item.product_id.clone(),
                delta: -item.quantity,
            })
            .collect(),
        party,
        cashbox,
        advance_invoice: true,
    })
}

/// Plans the effects of returning a sale.
///
/// The refund is posted whether or not the original sale was auto-posted.
pub fn plan_return(sale: &Sale) -> CoreResult<LedgerEffects> {
    if sale.is_returned() {
        return Err(CoreError::AlreadyReturned {
            sale_id: sale.id.clone(),
        });
    }

    let party = sale.customer_id.as_ref().map(|customer_id| PartyAdjustment {
        kind: PartyKind::Customer,
        party_id: customer_id.clone(),
        current_delta: -sale.remaining(),
        cumulative_delta: -sale.total(),
    });

    let cashbox = sale.paid().is_positive().then(|| CashboxPosting {
        kind: TransactionType::Subtract,
        amount: sale.paid(),
        source: CashboxSource::Sale,
        reference_id: sale.id.clone(),
        description: format!("Return of {}", sale.invoice_number),
    });

    Ok(LedgerEffects {
        stock: sale
            .items
            .iter()
            .map(|item| StockDelta {
                product_id: item.product_id.clone(),
                delta: item.quantity,
            })
            .collect(),
        party,
        cashbox,
        advance_invoice: false,
    })
}

// =============================================================================
// Purchases & Expenses
// =============================================================================

/// Plans the effects of receiving a purchase.
///
/// Stock always goes up, paid or not.
pub fn plan_purchase(purchase: &Purchase, settings: &Settings) -> CoreResult<LedgerEffects> {
    if purchase.items.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    validate_id(&purchase.id)?;
    validate_cart_size(purchase.items.len())?;
    for item in &purchase.items {
        validate_quantity(item.quantity)?;
        validate_amount_cents("unit cost", item.unit_cost_cents)?;
    }
    if purchase.total_cents < 0 || purchase.paid_amount_cents < 0 {
        return Err(CoreError::invalid_amount("purchase amounts must not be negative"));
    }
    validate_amount_cents("total", purchase.total_cents)?;
    validate_amount_cents("paid amount", purchase.paid_amount_cents)?;

    let total = purchase.total();
    let paid = purchase.paid();

    let party = purchase.supplier_id.as_ref().map(|supplier_id| PartyAdjustment {
        kind: PartyKind::Supplier,
        party_id: supplier_id.clone(),
        current_delta: (total - paid).non_negative(),
        cumulative_delta: total,
    });

    let cashbox = (paid.is_positive() && settings.auto_deduct_purchases_from_cashbox).then(|| {
        CashboxPosting {
            kind: TransactionType::Subtract,
            amount: paid,
            source: CashboxSource::Purchase,
            reference_id: purchase.id.clone(),
            description: "Purchase".to_string(),
        }
    });

    Ok(LedgerEffects {
        stock: purchase
            .items
            .iter()
            .map(|item| StockDelta {
                product_id: item.product_id.clone(),
                delta: item.quantity,
            })
            .collect(),
        party,
        cashbox,
        advance_invoice: false,
    })
}

pub fn plan_expense(expense: &Expense, settings: &Settings) -> CoreResult<LedgerEffects> {
    validate_id(&expense.id)?;
    if expense.amount().is_negative() {
        return Err(CoreError::invalid_amount("expense amount must not be negative"));
    }
    validate_amount_cents("amount", expense.amount_cents)?;

    let cashbox = (expense.amount().is_positive() && settings.auto_deduct_expenses_from_cashbox)
        .then(|| CashboxPosting {
            kind: TransactionType::Subtract,
            amount: expense.amount(),
            source: CashboxSource::Expense,
            reference_id: expense.id.clone(),
            description: format!("{}: {}", expense.category, expense.description),
        });

    Ok(LedgerEffects {
        cashbox,
        ..LedgerEffects::default()
    })
}

// =============================================================================
// Debt Payments
// =============================================================================

/// Plans a debt payment by a customer, or to a supplier.
///
/// Fails with `InvalidAmount` when the amount is not positive or exceeds
/// what is currently owed.
pub fn plan_debt_payment<P: Party>(party: &P, amount: Money) -> CoreResult<LedgerEffects> {
    if validate_payment_amount(amount.cents()).is_err() {
        return Err(CoreError::invalid_amount("payment must be greater than zero"));
    }

    let owed = party.balance().current;
    if amount > owed {
        return Err(CoreError::invalid_amount(format!(
            "payment {} exceeds balance {}",
            amount, owed
        )));
    }

    let (kind, source, description) = match P::KIND {
        PartyKind::Customer => (
            TransactionType::Add,
            CashboxSource::Customer,
            "Customer debt payment",
        ),
        PartyKind::Supplier => (
            TransactionType::Subtract,
            CashboxSource::Supplier,
            "Supplier debt payment",
        ),
    };

    Ok(LedgerEffects {
        party: Some(PartyAdjustment {
            kind: P::KIND,
            party_id: party.id().to_string(),
            current_delta: -amount,
            cumulative_delta: Money::zero(),
        }),
        cashbox: Some(CashboxPosting {
            kind,
            amount,
            source,
            reference_id: party.id().to_string(),
            description: description.to_string(),
        }),
        ..LedgerEffects::default()
    })
}

// =============================================================================
// Opening Balance
// =============================================================================

/// Moves a party's opening balance and shifts the current balance by the
/// same delta, so debt accrued since the opening figure is preserved.
///
/// Returns the delta applied.
pub fn apply_opening_balance<P: Party>(party: &mut P, new_opening: Money, now: DateTime<Utc>) -> Money {
    let balance = party.balance();
    let delta = new_opening - balance.opening;
    party.set_balance(
        PartyBalance {
            opening: new_opening,
            current: balance.current + delta,
            cumulative: balance.cumulative,
        },
        now,
    );
    delta
}

// =============================================================================
// Manual Entries
// =============================================================================

/// Creates a manual cashbox entry.
pub fn manual_transaction(
    kind: TransactionType,
    amount: Money,
    description: impl Into<String>,
    is_active: bool,
    now: DateTime<Utc>,
) -> CoreResult<CashboxTransaction> {
    if amount.is_negative() {
        return Err(CoreError::invalid_amount("manual amount must not be negative"));
    }
    let mut tx = CashboxTransaction::new(kind, amount, CashboxSource::Manual, None, description, now);
    tx.is_active = is_active;
    Ok(tx)
}

/// Fields of a manual entry that may be edited. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEdit {
    pub kind: Option<TransactionType>,
    pub amount_cents: Option<i64>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Fails unless the row was entered by hand.
pub fn ensure_manual(tx: &CashboxTransaction) -> CoreResult<()> {
    if tx.source != CashboxSource::Manual {
        return Err(CoreError::NotManualTransaction {
            id: tx.id.clone(),
            origin: tx.source.to_string(),
        });
    }
    Ok(())
}

/// Applies an edit to a manual entry.
pub fn edit_manual(tx: &mut CashboxTransaction, edit: ManualEdit) -> CoreResult<()> {
    ensure_manual(tx)?;

    if let Some(cents) = edit.amount_cents {
        if cents < 0 {
            return Err(CoreError::invalid_amount("manual amount must not be negative"));
        }
        tx.amount_cents = cents;
    }
    if let Some(kind) = edit.kind {
        tx.kind = kind;
    }
    if let Some(description) = edit.description {
        tx.description = description;
    }
    if let Some(is_active) = edit.is_active {
        tx.is_active = is_active;
    }
    Ok(())
}

// =============================================================================
// Summaries
// =============================================================================

/// Totals for one source within a summary window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTotals {
    pub added: Money,
    pub subtracted: Money,
    pub count: usize,
}

/// Cash in and out over `[from, to)`, active rows only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashboxSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_in: Money,
    pub total_out: Money,
    pub net: Money,
    pub by_source: BTreeMap<CashboxSource, SourceTotals>,
}

pub fn summarize<'a, I>(transactions: I, from: DateTime<Utc>, to: DateTime<Utc>) -> CashboxSummary
where
    I: IntoIterator<Item = &'a CashboxTransaction>,
{
    let mut summary = CashboxSummary {
        from,
        to,
        total_in: Money::zero(),
        total_out: Money::zero(),
        net: Money::zero(),
        by_source: BTreeMap::new(),
    };

    for tx in transactions
        .into_iter()
        .filter(|tx| tx.is_active && tx.created_at >= from && tx.created_at < to)
    {
        let totals = summary.by_source.entry(tx.source).or_default();
        totals.count += 1;
        match tx.kind {
            TransactionType::Add => {
                totals.added += tx.amount();
                summary.total_in += tx.amount();
            }
            TransactionType::Subtract => {
                totals.subtracted += tx.amount();
                summary.total_out += tx.amount();
            }
        }
    }

    summary.net = summary.total_in - summary.total_out;
    summary
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Customer, SaleItem, SaleStatus, Supplier};
    use chrono::Duration;

    fn sale(method: PaymentMethod, total: i64, paid: i64, customer: Option<&str>) -> Sale {
        Sale {
            id: "s-1".to_string(),
            invoice_number: "INV-000001".to_string(),
            customer_id: customer.map(str::to_string),
            items: vec![SaleItem {
                product_id: "p-1".to_string(),
                product_name: "Tea".to_string(),
                quantity: 2,
                unit_price_cents: total / 2,
                line_total_cents: total,
            }],
            subtotal_cents: total,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: total,
            paid_amount_cents: paid,
            remaining_amount_cents: (total - paid).max(0),
            change_cents: 0,
            payment_method: method,
            status: SaleStatus::Completed,
            notes: None,
            created_at: Utc::now(),
            returned_at: None,
        }
    }

    fn tx(kind: TransactionType, cents: i64, active: bool) -> CashboxTransaction {
        let mut tx = CashboxTransaction::new(
            kind,
            Money::from_cents(cents),
            CashboxSource::Manual,
            None,
            "test",
            Utc::now(),
        );
        tx.is_active = active;
        tx
    }

    #[test]
    fn test_balance_is_order_independent() {
        let mut txs = vec![
            tx(TransactionType::Add, 5_000, true),
            tx(TransactionType::Subtract, 1_200, true),
            tx(TransactionType::Add, 300, false),
            tx(TransactionType::Subtract, 50, true),
        ];
        let forward = cashbox_balance(&txs);
        txs.reverse();
        assert_eq!(forward, cashbox_balance(&txs));
        assert_eq!(forward.cents(), 3_750);
    }

    #[test]
    fn test_credit_sale_goes_to_debt() {
        let mut s = sale(PaymentMethod::Credit, 11_500, 0, Some("c-1"));
        normalize_sale(&mut s);
        let effects = plan_sale(&s, &Settings::default()).unwrap();

        let party = effects.party.unwrap();
        assert_eq!(party.current_delta.cents(), 11_500);
        assert_eq!(party.cumulative_delta.cents(), 11_500);
        assert!(effects.cashbox.is_none());
        assert_eq!(effects.stock[0].delta, -2);
        assert!(effects.advance_invoice);
    }

    #[test]
    fn test_credit_with_payment_normalizes_to_credit() {
        let mut s = sale(PaymentMethod::Credit, 1_000, 400, Some("c-1"));
        let report = normalize_sale(&mut s);

        assert_eq!(report.dropped_credit_payment.cents(), 400);
        assert_eq!(s.paid_amount_cents, 0);
        assert_eq!(s.remaining_amount_cents, 1_000);

        let effects = plan_sale(&s, &Settings::default()).unwrap();
        assert!(effects.cashbox.is_none());
        assert_eq!(effects.party.unwrap().current_delta.cents(), 1_000);
    }

    #[test]
    fn test_overpayment_moves_to_change() {
        let mut s = sale(PaymentMethod::Cash, 1_000, 1_500, None);
        let report = normalize_sale(&mut s);

        assert_eq!(report.overpayment.cents(), 500);
        assert_eq!(s.paid_amount_cents, 1_000);
        assert_eq!(s.change_cents, 500);
        assert_eq!(s.remaining_amount_cents, 0);
    }

    #[test]
    fn test_partial_payment_posts_paid_and_records_remaining() {
        let s = sale(PaymentMethod::Cash, 1_000, 600, Some("c-1"));
        let effects = plan_sale(&s, &Settings::default()).unwrap();

        let posting = effects.cashbox.unwrap();
        assert_eq!(posting.kind, TransactionType::Add);
        assert_eq!(posting.amount.cents(), 600);
        assert_eq!(posting.reference_id, "s-1");

        let party = effects.party.unwrap();
        assert_eq!(party.current_delta.cents(), 400);
        assert_eq!(party.cumulative_delta.cents(), 1_000);
    }

    #[test]
    fn test_sale_posting_respects_auto_add_flag() {
        let settings = Settings {
            auto_add_sales_to_cashbox: false,
            ..Settings::default()
        };
        let s = sale(PaymentMethod::Cash, 1_000, 1_000, None);
        let effects = plan_sale(&s, &settings).unwrap();
        assert!(effects.cashbox.is_none());
        assert!(effects.party.is_none());
    }

    #[test]
    fn test_sale_without_items_is_empty_cart() {
        let mut s = sale(PaymentMethod::Cash, 1_000, 1_000, None);
        s.items.clear();
        assert!(matches!(
            plan_sale(&s, &Settings::default()),
            Err(CoreError::EmptyCart)
        ));
    }

    #[test]
    fn test_return_reverses_sale() {
        let s = sale(PaymentMethod::Cash, 1_000, 600, Some("c-1"));
        let effects = plan_return(&s).unwrap();

        assert_eq!(effects.stock[0].delta, 2);
        let party = effects.party.unwrap();
        assert_eq!(party.current_delta.cents(), -400);
        assert_eq!(party.cumulative_delta.cents(), -1_000);
        let posting = effects.cashbox.unwrap();
        assert_eq!(posting.kind, TransactionType::Subtract);
        assert_eq!(posting.amount.cents(), 600);
    }

    #[test]
    fn test_second_return_rejected() {
        let mut s = sale(PaymentMethod::Cash, 1_000, 1_000, None);
        s.mark_returned(Utc::now());
        assert!(matches!(
            plan_return(&s),
            Err(CoreError::AlreadyReturned { .. })
        ));
    }

    #[test]
    fn test_return_reduction_is_floored() {
        let now = Utc::now();
        let mut customer = Customer::new("c-1", "Amal", Money::zero(), now);
        customer.current_balance_cents = 300;
        customer.total_purchases_cents = 500;

        let adjustment = PartyAdjustment {
            kind: PartyKind::Customer,
            party_id: "c-1".to_string(),
            current_delta: Money::from_cents(-1_000),
            cumulative_delta: Money::from_cents(-1_000),
        };
        assert!(adjustment.clamps(&customer));
        adjustment.apply_to(&mut customer, now);

        assert_eq!(customer.current_balance_cents, 0);
        assert_eq!(customer.total_purchases_cents, 0);
    }

    #[test]
    fn test_floor_keeps_existing_credit_balance() {
        let now = Utc::now();
        let mut customer = Customer::new("c-1", "Amal", Money::from_cents(-200), now);
        let adjustment = PartyAdjustment {
            kind: PartyKind::Customer,
            party_id: "c-1".to_string(),
            current_delta: Money::from_cents(-100),
            cumulative_delta: Money::zero(),
        };
        adjustment.apply_to(&mut customer, now);
        assert_eq!(customer.current_balance_cents, -200);
    }

    #[test]
    fn test_debt_payment_bounds() {
        let now = Utc::now();
        let customer = Customer::new("c-1", "Amal", Money::from_cents(500), now);

        assert!(matches!(
            plan_debt_payment(&customer, Money::from_cents(501)),
            Err(CoreError::InvalidAmount { .. })
        ));
        assert!(matches!(
            plan_debt_payment(&customer, Money::zero()),
            Err(CoreError::InvalidAmount { .. })
        ));

        let effects = plan_debt_payment(&customer, Money::from_cents(500)).unwrap();
        let posting = effects.cashbox.unwrap();
        assert_eq!(posting.kind, TransactionType::Add);
        assert_eq!(posting.source, CashboxSource::Customer);
        assert_eq!(posting.reference_id, "c-1");
    }

    #[test]
    fn test_supplier_payment_takes_cash_out() {
        let supplier = Supplier::new("sup-1", "Wholesale Co", Money::from_cents(2_000), Utc::now());
        let effects = plan_debt_payment(&supplier, Money::from_cents(750)).unwrap();

        let posting = effects.cashbox.unwrap();
        assert_eq!(posting.kind, TransactionType::Subtract);
        assert_eq!(posting.source, CashboxSource::Supplier);
        assert_eq!(effects.party.unwrap().kind, PartyKind::Supplier);
    }

    #[test]
    fn test_purchase_effects() {
        let purchase = Purchase {
            id: "po-1".to_string(),
            supplier_id: Some("sup-1".to_string()),
            items: vec![crate::types::PurchaseItem {
                product_id: "p-1".to_string(),
                quantity: 10,
                unit_cost_cents: 100,
            }],
            total_cents: 1_000,
            paid_amount_cents: 400,
            notes: None,
            created_at: Utc::now(),
        };

        let effects = plan_purchase(&purchase, &Settings::default()).unwrap();
        assert_eq!(effects.stock[0].delta, 10);
        assert_eq!(effects.party.as_ref().unwrap().current_delta.cents(), 600);
        assert_eq!(effects.cashbox.unwrap().amount.cents(), 400);

        let settings = Settings {
            auto_deduct_purchases_from_cashbox: false,
            ..Settings::default()
        };
        let effects = plan_purchase(&purchase, &settings).unwrap();
        assert_eq!(effects.stock[0].delta, 10);
        assert!(effects.cashbox.is_none());
    }

    #[test]
    fn test_expense_gating() {
        let expense = Expense {
            id: "e-1".to_string(),
            category: "Utilities".to_string(),
            description: "Electricity".to_string(),
            amount_cents: 4_200,
            created_at: Utc::now(),
        };

        let effects = plan_expense(&expense, &Settings::default()).unwrap();
        assert_eq!(effects.cashbox.unwrap().amount.cents(), 4_200);

        let settings = Settings {
            auto_deduct_expenses_from_cashbox: false,
            ..Settings::default()
        };
        assert_eq!(plan_expense(&expense, &settings).unwrap(), LedgerEffects::default());
    }

    #[test]
    fn test_opening_balance_shift_preserves_accrued_debt() {
        let now = Utc::now();
        let mut customer = Customer::new("c-1", "Amal", Money::from_cents(1_000), now);
        customer.current_balance_cents = 1_800;

        let delta = apply_opening_balance(&mut customer, Money::from_cents(400), now);

        assert_eq!(delta.cents(), -600);
        assert_eq!(customer.opening_balance_cents, 400);
        assert_eq!(customer.current_balance_cents, 1_200);
    }

    #[test]
    fn test_manual_edit_rejects_system_rows() {
        let mut sale_tx = CashboxTransaction::new(
            TransactionType::Add,
            Money::from_cents(100),
            CashboxSource::Sale,
            Some("s-1".to_string()),
            "Sale",
            Utc::now(),
        );
        let err = edit_manual(&mut sale_tx, ManualEdit::default()).unwrap_err();
        assert!(matches!(err, CoreError::NotManualTransaction { .. }));

        let mut manual = manual_transaction(TransactionType::Add, Money::from_cents(100), "float", true, Utc::now())
            .unwrap();
        edit_manual(
            &mut manual,
            ManualEdit {
                amount_cents: Some(250),
                is_active: Some(false),
                ..ManualEdit::default()
            },
        )
        .unwrap();
        assert_eq!(manual.amount_cents, 250);
        assert!(!manual.is_active);
    }

    #[test]
    fn test_negative_manual_amount_rejected() {
        let err = manual_transaction(TransactionType::Add, Money::from_cents(-1), "oops", true, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_summary_window_and_sources() {
        let now = Utc::now();
        let mut old = tx(TransactionType::Add, 9_999, true);
        old.created_at = now - Duration::days(2);
        let mut sale_in = tx(TransactionType::Add, 1_000, true);
        sale_in.source = CashboxSource::Sale;
        let mut expense_out = tx(TransactionType::Subtract, 300, true);
        expense_out.source = CashboxSource::Expense;
        let voided = tx(TransactionType::Add, 50, false);

        let txs = [old, sale_in, expense_out, voided];
        let summary = summarize(&txs, now - Duration::hours(1), now + Duration::hours(1));

        assert_eq!(summary.total_in.cents(), 1_000);
        assert_eq!(summary.total_out.cents(), 300);
        assert_eq!(summary.net.cents(), 700);
        assert_eq!(summary.by_source[&CashboxSource::Sale].count, 1);
        assert!(!summary.by_source.contains_key(&CashboxSource::Manual));
    }
}
