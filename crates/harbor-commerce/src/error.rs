//! Commerce error types.
//!
//! Every expected failure mode is a value. The taxonomy separates
//! invariant violations, not-found lookups, and concurrency conflicts so
//! callers can tell "you asked for something illegal" apart from "someone
//! beat you to the write, retry".

use thiserror::Error;

/// Errors that can occur in commerce operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommerceError {
    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Variant not found.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// Cart not found.
    #[error("Cart not found: {0}")]
    CartNotFound(String),

    /// Illegal order status transition.
    #[error("Illegal order transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Stock mutation would drive the quantity negative.
    #[error("Insufficient stock for {variant_id}: requested change {requested}, current {current}")]
    InsufficientStock {
        variant_id: String,
        requested: i64,
        current: i64,
    },

    /// Quantity must be positive.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Low-stock threshold must be non-negative.
    #[error("Invalid low-stock threshold: {0}")]
    InvalidThreshold(i64),

    /// Bulk batch exceeds the per-request cap.
    #[error("Batch of {size} items exceeds maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// The aggregate was modified since it was read.
    ///
    /// Distinct from invariant violations: the request may be perfectly
    /// legal against fresh state, so callers can re-read and retry.
    #[error("Stale write on {entity} {id}: version {expected} is no longer current")]
    StaleWrite {
        entity: &'static str,
        id: String,
        expected: u64,
    },

    /// Order total would be negative.
    #[error("Order total would be negative: {0} minor units")]
    NegativeTotal(i64),

    /// Currency mismatch in a monetary calculation.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CommerceError {
    /// Whether this error is a concurrency conflict worth retrying.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CommerceError::StaleWrite { .. })
    }
}

impl From<harbor_store::StoreError> for CommerceError {
    fn from(e: harbor_store::StoreError) -> Self {
        match e {
            harbor_store::StoreError::VersionConflict { key, expected, .. } => {
                CommerceError::StaleWrite {
                    entity: "entry",
                    id: key,
                    expected,
                }
            }
            other => CommerceError::Storage(other.to_string()),
        }
    }
}
