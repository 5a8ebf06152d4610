//! Order lifecycle and inventory consistency engine for Harbor Commerce.
//!
//! This crate owns the parts of a commerce backend where correctness is
//! genuinely hard:
//!
//! - **Orders**: a guarded order status state machine with an append-only
//!   audit log. There is no raw status setter; every transition validates
//!   its legal predecessors.
//! - **Payments**: idempotent reconciliation of asynchronous payment
//!   processor notifications against orders, tolerating duplicate,
//!   retried, and out-of-order delivery.
//! - **Inventory**: per-variant stock mutation with a hard non-negativity
//!   invariant and partial-success bulk adjustment.
//! - **Cart**: one-shot merge of a guest cart into a user cart at login.
//! - **Checkout**: the order-creation/stock-reservation boundary.
//!
//! # Example
//!
//! ```rust,ignore
//! use harbor_commerce::prelude::*;
//!
//! let stores = MemoryStores::new();
//! let reconciler = Reconciler::new(stores.orders.clone());
//!
//! // A duplicate "succeeded" webhook is acknowledged without a second
//! // state change or audit event.
//! let note = PaymentNotification::succeeded(PaymentIntentId::new("pi_123"));
//! reconciler.reconcile(&note)?;
//! reconciler.reconcile(&note)?;
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod checkout;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod store;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Orders
    pub use crate::orders::{
        Order, OrderEvent, OrderNumberGenerator, OrderStatus, OrderTotals, TransitionOutcome,
    };

    // Payments
    pub use crate::payments::{
        PaymentEventType, PaymentNotification, ReconcileOutcome, Reconciler,
    };

    // Inventory
    pub use crate::inventory::{
        AdjustmentReason, BulkStockReport, InventoryLedger, InventoryRecord, StockLevelUpdate,
    };

    // Cart
    pub use crate::cart::{Cart, CartItem, CartMerger, CartOwner, MergeAdjustment, MergeReport};

    // Checkout
    pub use crate::checkout::{Checkout, CheckoutLine, CheckoutPricing};

    // Storage
    pub use crate::store::memory::MemoryStores;
    pub use crate::store::{CartStore, InventoryStore, OrderStore};
}
