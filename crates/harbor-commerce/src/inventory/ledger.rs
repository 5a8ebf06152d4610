//! The inventory ledger: all stock mutation goes through here.

use crate::error::CommerceError;
use crate::ids::VariantId;
use crate::inventory::{AdjustmentReason, InventoryRecord};
use crate::store::InventoryStore;
use serde::{Deserialize, Serialize};

/// Maximum number of items accepted in one bulk adjustment.
pub const MAX_BULK_ITEMS: usize = 100;

/// One item of a bulk adjustment: an absolute target quantity.
///
/// Bulk takes absolute quantities while the single adjustment takes a
/// delta. The asymmetry is intentional: bulk uploads state "the shelf now
/// holds N", single adjustments state "N were sold/returned".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockLevelUpdate {
    /// Variant to update.
    pub variant_id: VariantId,
    /// Absolute quantity to set.
    pub new_quantity: i64,
}

/// A failed item within a bulk adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkStockError {
    /// Variant that failed.
    pub variant_id: VariantId,
    /// Why it failed.
    pub message: String,
}

/// Outcome of a bulk adjustment: always a structured partial-success
/// report, never a total failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BulkStockReport {
    /// Items updated.
    pub success_count: usize,
    /// Items that failed.
    pub failure_count: usize,
    /// Per-item failures.
    pub errors: Vec<BulkStockError>,
}

/// Stock mutation engine over an [`InventoryStore`].
///
/// Every mutation is a single atomic compare-and-update at the storage
/// layer; the non-negativity check happens inside the critical section,
/// so no concurrent adjustment can race it.
#[derive(Debug)]
pub struct InventoryLedger<S> {
    store: S,
}

impl<S: InventoryStore> InventoryLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Apply a signed delta to a variant's stock.
    ///
    /// Rejects the whole change with [`CommerceError::InsufficientStock`]
    /// (carrying the current quantity for display) if it would drive the
    /// quantity negative.
    pub fn adjust_stock(
        &self,
        variant_id: &VariantId,
        delta: i64,
        reason: AdjustmentReason,
    ) -> Result<InventoryRecord, CommerceError> {
        let record = self.store.update(variant_id, |r| r.with_adjustment(delta))?;
        tracing::info!(
            variant = %variant_id,
            delta,
            quantity = record.quantity,
            reason = reason.as_str(),
            "stock adjusted"
        );
        if record.is_low_stock() {
            tracing::warn!(
                variant = %variant_id,
                quantity = record.quantity,
                threshold = record.low_stock_threshold,
                "variant is low on stock"
            );
        }
        Ok(record)
    }

    /// Set absolute stock quantities for up to [`MAX_BULK_ITEMS`] variants.
    ///
    /// Batches above the cap are rejected outright before touching any
    /// record. Within the batch every item is attempted independently:
    /// one bad SKU does not block the rest, and the report accounts for
    /// every item either way.
    pub fn bulk_set_stock(
        &self,
        updates: &[StockLevelUpdate],
        reason: AdjustmentReason,
    ) -> Result<BulkStockReport, CommerceError> {
        if updates.len() > MAX_BULK_ITEMS {
            return Err(CommerceError::BatchTooLarge {
                size: updates.len(),
                max: MAX_BULK_ITEMS,
            });
        }

        let mut report = BulkStockReport::default();
        for update in updates {
            match self
                .store
                .update(&update.variant_id, |r| r.with_quantity(update.new_quantity))
            {
                Ok(_) => report.success_count += 1,
                Err(e) => {
                    report.failure_count += 1;
                    report.errors.push(BulkStockError {
                        variant_id: update.variant_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            total = updates.len(),
            succeeded = report.success_count,
            failed = report.failure_count,
            reason = reason.as_str(),
            "bulk stock adjustment finished"
        );
        Ok(report)
    }

    /// Reserve stock for a checkout: decrement every `(variant, quantity)`
    /// line, stopping at the first failure.
    ///
    /// On failure the decrements already applied are compensated back
    /// before the error is returned, so a rejected checkout never leaks
    /// reserved stock.
    pub fn reserve_for_checkout(
        &self,
        lines: &[(VariantId, i64)],
    ) -> Result<(), CommerceError> {
        let mut reserved: Vec<(&VariantId, i64)> = Vec::new();
        for (variant_id, quantity) in lines {
            let result = if *quantity <= 0 {
                Err(CommerceError::InvalidQuantity(*quantity))
            } else {
                self.adjust_stock(variant_id, -*quantity, AdjustmentReason::Sale)
                    .map(|_| ())
            };
            if let Err(e) = result {
                self.release(&reserved);
                return Err(e);
            }
            reserved.push((variant_id, *quantity));
        }
        Ok(())
    }

    /// Compensate decrements already applied for a failed reservation.
    fn release(&self, reserved: &[(&VariantId, i64)]) {
        for &(variant_id, quantity) in reserved {
            let restored = self.adjust_stock(variant_id, quantity, AdjustmentReason::Correction);
            if let Err(e) = restored {
                tracing::warn!(
                    variant = %variant_id,
                    quantity,
                    error = %e,
                    "failed to release reserved stock"
                );
            }
        }
    }

    /// Set a variant's low-stock threshold. Independent of quantity.
    pub fn set_low_stock_threshold(
        &self,
        variant_id: &VariantId,
        threshold: i64,
    ) -> Result<InventoryRecord, CommerceError> {
        self.store.update(variant_id, |r| r.with_threshold(threshold))
    }

    /// Read a variant's current record.
    pub fn level(&self, variant_id: &VariantId) -> Result<InventoryRecord, CommerceError> {
        self.store
            .get(variant_id)
            .ok_or_else(|| CommerceError::VariantNotFound(variant_id.to_string()))
    }
}
