//! Per-variant inventory record.

use crate::error::CommerceError;
use crate::ids::VariantId;
use serde::{Deserialize, Serialize};

/// Stock level for a product variant.
///
/// Only the current quantity and the low-stock threshold are stored.
/// "Low stock" and "out of stock" are derived predicates, never persisted
/// flags, so they cannot drift from the quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRecord {
    /// Variant this record tracks.
    pub variant_id: VariantId,
    /// Current quantity in stock; never negative.
    pub quantity: i64,
    /// Quantity at or below which the variant counts as low stock.
    pub low_stock_threshold: i64,
    /// Whether the variant is sellable at all.
    pub active: bool,
    /// Unix timestamp of last change.
    pub updated_at: i64,
}

impl InventoryRecord {
    /// Create a record with the given starting quantity.
    pub fn new(variant_id: VariantId, quantity: i64) -> Self {
        Self {
            variant_id,
            quantity: quantity.max(0),
            low_stock_threshold: 0,
            active: true,
            updated_at: current_timestamp(),
        }
    }

    /// Check if stock is at or below the low-stock threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }

    /// Check if the variant is out of stock.
    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    /// Produce a copy with `delta` applied to the quantity.
    ///
    /// Rejects the change outright if it would drive the quantity
    /// negative, reporting the current quantity for caller display.
    pub fn with_adjustment(&self, delta: i64) -> Result<Self, CommerceError> {
        let next = self
            .quantity
            .checked_add(delta)
            .ok_or(CommerceError::Overflow)?;
        if next < 0 {
            return Err(CommerceError::InsufficientStock {
                variant_id: self.variant_id.to_string(),
                requested: delta,
                current: self.quantity,
            });
        }
        Ok(Self {
            quantity: next,
            updated_at: current_timestamp(),
            ..self.clone()
        })
    }

    /// Produce a copy with the quantity set to an absolute value.
    pub fn with_quantity(&self, quantity: i64) -> Result<Self, CommerceError> {
        if quantity < 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        Ok(Self {
            quantity,
            updated_at: current_timestamp(),
            ..self.clone()
        })
    }

    /// Produce a copy with a new low-stock threshold.
    pub fn with_threshold(&self, threshold: i64) -> Result<Self, CommerceError> {
        if threshold < 0 {
            return Err(CommerceError::InvalidThreshold(threshold));
        }
        Ok(Self {
            low_stock_threshold: threshold,
            updated_at: current_timestamp(),
            ..self.clone()
        })
    }
}

/// Reason attached to a stock adjustment, for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjustmentReason {
    /// Sold to a customer.
    Sale,
    /// Returned by a customer.
    Return,
    /// Restocked from a supplier.
    Restock,
    /// Manual correction.
    Correction,
    /// Damaged or lost.
    Shrinkage,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::Sale => "sale",
            AdjustmentReason::Return => "return",
            AdjustmentReason::Restock => "restock",
            AdjustmentReason::Correction => "correction",
            AdjustmentReason::Shrinkage => "shrinkage",
        }
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
