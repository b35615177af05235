//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Store, backup and persistence failures         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → alert on screen          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is recoverable: the screen shows a localized alert and
//! the store is left exactly as it was before the failed operation.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised while planning a ledger event.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale was submitted without line items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The sale has already been returned.
    ///
    /// ## When This Occurs
    /// - The return button is pressed twice
    /// - A restored backup already contains the returned sale
    ///
    /// Returning is terminal; allowing a second return would put the stock
    /// back twice and refund the cash twice.
    #[error("Sale {sale_id} has already been returned")]
    AlreadyReturned { sale_id: String },

    /// A monetary amount is outside the range the operation accepts.
    ///
    /// ## When This Occurs
    /// - Paying zero or a negative amount against a debt
    /// - Paying more than the party currently owes
    /// - A negative manual cashbox entry or discount
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Supplier not found: {0}")]
    SupplierNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Cashbox transaction not found: {0}")]
    TransactionNotFound(String),

    /// Only manually entered cashbox rows can be edited or deleted.
    #[error("Cashbox transaction {id} was posted by {origin} and cannot be edited")]
    NotManualTransaction { id: String, origin: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidAmount error.
    pub fn invalid_amount(reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (whitespace in an id, malformed prefix, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::AlreadyReturned {
            sale_id: "s-1".to_string(),
        };
        assert_eq!(err.to_string(), "Sale s-1 has already been returned");

        let err = CoreError::invalid_amount("payment exceeds balance");
        assert_eq!(err.to_string(), "Invalid amount: payment exceeds balance");

        assert_eq!(CoreError::EmptyCart.to_string(), "Cart is empty");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("customer").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.to_string(), "Validation error: customer is required");
    }
}
