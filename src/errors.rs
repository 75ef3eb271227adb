//! Unified error types for the storefront.
//!
//! Stock errors carry enough detail (product id, requested and maximum
//! satisfiable quantity) for a caller to correct the request without
//! re-querying inventory.

use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;

/// `SQLITE_BUSY` primary result code
const SQLITE_BUSY: i64 = 5;
/// `SQLITE_LOCKED` primary result code
const SQLITE_LOCKED: i64 = 6;

/// Every failure the storefront core can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// An order was submitted without any line items
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// A referenced product does not exist
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// The missing product id
        id: i64,
    },

    /// The requested quantity exceeds the available stock
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, at most {max_available} available"
    )]
    InsufficientStock {
        /// Product the reservation targeted
        product_id: i64,
        /// Quantity that was asked for
        requested: i32,
        /// Largest quantity that would have been accepted
        max_available: i32,
    },

    /// The reservation would leave less than the product's minimum reserve
    #[error(
        "Reserve floor violated for product {product_id}: requested {requested}, at most {max_available} available"
    )]
    ReserveFloorViolation {
        /// Product the reservation targeted
        product_id: i64,
        /// Quantity that was asked for
        requested: i32,
        /// Largest quantity that would have been accepted
        max_available: i32,
    },

    /// A quantity argument or the resulting stock level is out of range
    #[error("Invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity {
        /// Product the change targeted
        product_id: i64,
        /// The offending quantity
        quantity: i64,
    },

    /// A price is negative
    #[error("Invalid price: {price}")]
    InvalidPrice {
        /// The offending price
        price: rust_decimal::Decimal,
    },

    /// The caller lacks the admin role
    #[error("Access forbidden for user {tg_id}: admins only")]
    Forbidden {
        /// External id of the caller
        tg_id: i64,
    },

    /// Storage failure (connection, query or commit). Transient.
    #[error("Storage failure: {0}")]
    Storage(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Whether retrying the same request unchanged may succeed.
    ///
    /// Only storage failures are transient; stock and validation errors need
    /// new input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Whether the database refused the work because another writer holds
    /// the lock (`SQLITE_BUSY` / `SQLITE_LOCKED`, including extended codes).
    ///
    /// Nothing was applied in that case; the whole unit of work can be
    /// started again.
    #[must_use]
    pub fn is_contention(&self) -> bool {
        let Self::Storage(DbErr::Conn(err) | DbErr::Exec(err) | DbErr::Query(err)) = self else {
            return false;
        };
        let RuntimeErr::SqlxError(err) = err else {
            return false;
        };
        err.as_database_error()
            .and_then(|db_err| db_err.code())
            .and_then(|code| code.parse::<i64>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_storage_errors_are_retryable() {
        let storage = Error::Storage(DbErr::Custom("locked".to_string()));
        assert!(storage.is_retryable());

        let stock = Error::InsufficientStock {
            product_id: 1,
            requested: 3,
            max_available: 2,
        };
        assert!(!stock.is_retryable());
        assert!(!Error::EmptyOrder.is_retryable());
    }

    #[test]
    fn test_contention_only_matches_lock_errors() {
        assert!(!Error::Storage(DbErr::Custom("database is locked".to_string())).is_contention());
        assert!(!Error::Storage(DbErr::RecordNotFound("order".to_string())).is_contention());
        assert!(!Error::EmptyOrder.is_contention());
    }

    #[test]
    fn test_stock_error_message_reports_limits() {
        let err = Error::ReserveFloorViolation {
            product_id: 7,
            requested: 1,
            max_available: 0,
        };
        assert_eq!(
            err.to_string(),
            "Reserve floor violated for product 7: requested 1, at most 0 available"
        );
    }
}
