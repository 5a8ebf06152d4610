//! Inventory ledger: per-variant stock with a non-negativity invariant.

mod ledger;
mod record;

pub use ledger::{
    BulkStockError, BulkStockReport, InventoryLedger, StockLevelUpdate, MAX_BULK_ITEMS,
};
pub use record::{AdjustmentReason, InventoryRecord};
