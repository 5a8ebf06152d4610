//! Repository traits and the in-memory reference implementation.
//!
//! Aggregates are stored arena-style, keyed by id; nothing holds an
//! object reference to anything else. The traits capture exactly the
//! concurrency contract the engines need:
//!
//! - order and cart writes are optimistic: the caller hands back the
//!   version it read, and a stale version fails with
//!   [`CommerceError::StaleWrite`] instead of clobbering;
//! - inventory writes are closure-based atomic read-modify-writes,
//!   serialized per variant, so the non-negativity check and the write
//!   are one step;
//! - the cart merge commit spans both carts atomically.

pub mod memory;

use crate::cart::Cart;
use crate::error::CommerceError;
use crate::ids::{CartId, OrderId, PaymentIntentId, SessionId, UserId, VariantId};
use crate::inventory::InventoryRecord;
use crate::orders::Order;
use std::sync::Arc;

/// Persistence for order aggregates.
pub trait OrderStore {
    /// Insert a new order. Returns the stored copy at version 1.
    fn insert(&self, order: Order) -> Result<Order, CommerceError>;

    /// Read an order by id.
    fn get(&self, id: &OrderId) -> Option<Order>;

    /// Read an order by its external payment-intent reference.
    fn find_by_payment_intent(&self, payment_intent_id: &PaymentIntentId) -> Option<Order>;

    /// Write an order back, using the version it was read at.
    ///
    /// Fails with [`CommerceError::StaleWrite`] if a concurrent writer got
    /// there first; the caller should re-read and retry or give up
    /// explicitly.
    fn update(&self, order: Order) -> Result<Order, CommerceError>;
}

/// Persistence for inventory records.
pub trait InventoryStore {
    /// Insert a record for a new variant.
    fn insert(&self, record: InventoryRecord) -> Result<(), CommerceError>;

    /// Read a variant's record.
    fn get(&self, variant_id: &VariantId) -> Option<InventoryRecord>;

    /// Atomically read, transform, and write a variant's record.
    ///
    /// The closure runs inside the store's per-variant critical section,
    /// so the invariant check and the write are a single step. Returning
    /// an error from the closure rejects the mutation and leaves the
    /// record untouched.
    fn update<F>(&self, variant_id: &VariantId, f: F) -> Result<InventoryRecord, CommerceError>
    where
        F: FnOnce(&InventoryRecord) -> Result<InventoryRecord, CommerceError>;
}

/// Persistence for carts.
pub trait CartStore {
    /// Insert a new cart. Returns the stored copy at version 1.
    fn insert(&self, cart: Cart) -> Result<Cart, CommerceError>;

    /// Read a cart by id.
    fn get(&self, id: &CartId) -> Option<Cart>;

    /// Find the cart owned by an anonymous session.
    fn find_by_session(&self, session_id: &SessionId) -> Option<Cart>;

    /// Find the cart owned by an authenticated user.
    fn find_by_user(&self, user_id: &UserId) -> Option<Cart>;

    /// Write a cart back, using the version it was read at.
    fn update(&self, cart: Cart) -> Result<Cart, CommerceError>;

    /// Commit a merge: write the merged cart and delete the source cart
    /// in one atomic step, verifying both versions.
    ///
    /// A concurrent add-to-cart on either side since the merge read
    /// surfaces as [`CommerceError::StaleWrite`].
    fn commit_merge(
        &self,
        merged: Cart,
        source_id: &CartId,
        source_version: u64,
    ) -> Result<Cart, CommerceError>;
}

impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    fn insert(&self, order: Order) -> Result<Order, CommerceError> {
        (**self).insert(order)
    }

    fn get(&self, id: &OrderId) -> Option<Order> {
        (**self).get(id)
    }

    fn find_by_payment_intent(&self, payment_intent_id: &PaymentIntentId) -> Option<Order> {
        (**self).find_by_payment_intent(payment_intent_id)
    }

    fn update(&self, order: Order) -> Result<Order, CommerceError> {
        (**self).update(order)
    }
}

impl<T: InventoryStore + ?Sized> InventoryStore for Arc<T> {
    fn insert(&self, record: InventoryRecord) -> Result<(), CommerceError> {
        (**self).insert(record)
    }

    fn get(&self, variant_id: &VariantId) -> Option<InventoryRecord> {
        (**self).get(variant_id)
    }

    fn update<F>(&self, variant_id: &VariantId, f: F) -> Result<InventoryRecord, CommerceError>
    where
        F: FnOnce(&InventoryRecord) -> Result<InventoryRecord, CommerceError>,
    {
        (**self).update(variant_id, f)
    }
}

impl<T: CartStore + ?Sized> CartStore for Arc<T> {
    fn insert(&self, cart: Cart) -> Result<Cart, CommerceError> {
        (**self).insert(cart)
    }

    fn get(&self, id: &CartId) -> Option<Cart> {
        (**self).get(id)
    }

    fn find_by_session(&self, session_id: &SessionId) -> Option<Cart> {
        (**self).find_by_session(session_id)
    }

    fn find_by_user(&self, user_id: &UserId) -> Option<Cart> {
        (**self).find_by_user(user_id)
    }

    fn update(&self, cart: Cart) -> Result<Cart, CommerceError> {
        (**self).update(cart)
    }

    fn commit_merge(
        &self,
        merged: Cart,
        source_id: &CartId,
        source_version: u64,
    ) -> Result<Cart, CommerceError> {
        (**self).commit_merge(merged, source_id, source_version)
    }
}
