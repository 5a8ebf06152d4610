//! In-memory reference stores built on the `harbor-store` arena.

use crate::cart::{Cart, CartOwner};
use crate::error::CommerceError;
use crate::ids::{CartId, OrderId, PaymentIntentId, SessionId, UserId, VariantId};
use crate::inventory::InventoryRecord;
use crate::orders::Order;
use crate::store::{CartStore, InventoryStore, OrderStore};
use harbor_store::{Arena, StoreError, UpdateError};
use std::sync::Arc;

fn stale(entity: &'static str, err: StoreError) -> CommerceError {
    match err {
        StoreError::VersionConflict { key, expected, .. } => CommerceError::StaleWrite {
            entity,
            id: key,
            expected,
        },
        other => CommerceError::Storage(other.to_string()),
    }
}

/// In-memory [`OrderStore`].
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    arena: Arena<Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    /// Snapshot all orders, unordered. Backs admin listings.
    pub fn all(&self) -> Vec<Order> {
        self.arena
            .snapshot()
            .into_iter()
            .map(|(_, entry)| {
                let mut order = entry.value;
                order.version = entry.version;
                order
            })
            .collect()
    }
}

impl OrderStore for MemoryOrderStore {
    fn insert(&self, mut order: Order) -> Result<Order, CommerceError> {
        order.version = 1;
        self.arena
            .insert(order.id.as_str(), order.clone())
            .map_err(|e| CommerceError::Storage(e.to_string()))?;
        Ok(order)
    }

    fn get(&self, id: &OrderId) -> Option<Order> {
        let entry = self.arena.get(id.as_str())?;
        let mut order = entry.value;
        order.version = entry.version;
        Some(order)
    }

    fn find_by_payment_intent(&self, payment_intent_id: &PaymentIntentId) -> Option<Order> {
        let (_, entry) = self
            .arena
            .find(|o| o.payment_intent_id() == Some(payment_intent_id))?;
        let mut order = entry.value;
        order.version = entry.version;
        Some(order)
    }

    fn update(&self, mut order: Order) -> Result<Order, CommerceError> {
        let expected = order.version;
        let new_version = self
            .arena
            .compare_and_swap(order.id.as_str(), expected, order.clone())
            .map_err(|e| match e {
                StoreError::NotFound(id) => CommerceError::OrderNotFound(id),
                other => stale("order", other),
            })?;
        order.version = new_version;
        Ok(order)
    }
}

/// In-memory [`InventoryStore`].
#[derive(Debug, Default)]
pub struct MemoryInventoryStore {
    arena: Arena<InventoryRecord>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }
}

impl InventoryStore for MemoryInventoryStore {
    fn insert(&self, record: InventoryRecord) -> Result<(), CommerceError> {
        self.arena
            .insert(record.variant_id.as_str(), record.clone())
            .map_err(|e| CommerceError::Storage(e.to_string()))?;
        Ok(())
    }

    fn get(&self, variant_id: &VariantId) -> Option<InventoryRecord> {
        self.arena.get(variant_id.as_str()).map(|e| e.value)
    }

    fn update<F>(&self, variant_id: &VariantId, f: F) -> Result<InventoryRecord, CommerceError>
    where
        F: FnOnce(&InventoryRecord) -> Result<InventoryRecord, CommerceError>,
    {
        match self.arena.update(variant_id.as_str(), f) {
            Ok(entry) => Ok(entry.value),
            Err(UpdateError::NotFound(id)) => Err(CommerceError::VariantNotFound(id)),
            Err(UpdateError::Rejected(e)) => Err(e),
        }
    }
}

/// In-memory [`CartStore`].
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    arena: Arena<Cart>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }
}

impl CartStore for MemoryCartStore {
    fn insert(&self, mut cart: Cart) -> Result<Cart, CommerceError> {
        cart.version = 1;
        self.arena
            .insert(cart.id.as_str(), cart.clone())
            .map_err(|e| CommerceError::Storage(e.to_string()))?;
        Ok(cart)
    }

    fn get(&self, id: &CartId) -> Option<Cart> {
        let entry = self.arena.get(id.as_str())?;
        let mut cart = entry.value;
        cart.version = entry.version;
        Some(cart)
    }

    fn find_by_session(&self, session_id: &SessionId) -> Option<Cart> {
        let (_, entry) = self
            .arena
            .find(|c| matches!(&c.owner, CartOwner::Session(s) if s == session_id))?;
        let mut cart = entry.value;
        cart.version = entry.version;
        Some(cart)
    }

    fn find_by_user(&self, user_id: &UserId) -> Option<Cart> {
        let (_, entry) = self
            .arena
            .find(|c| matches!(&c.owner, CartOwner::User(u) if u == user_id))?;
        let mut cart = entry.value;
        cart.version = entry.version;
        Some(cart)
    }

    fn update(&self, mut cart: Cart) -> Result<Cart, CommerceError> {
        let expected = cart.version;
        let new_version = self
            .arena
            .compare_and_swap(cart.id.as_str(), expected, cart.clone())
            .map_err(|e| match e {
                StoreError::NotFound(id) => CommerceError::CartNotFound(id),
                other => stale("cart", other),
            })?;
        cart.version = new_version;
        Ok(cart)
    }

    fn commit_merge(
        &self,
        mut merged: Cart,
        source_id: &CartId,
        source_version: u64,
    ) -> Result<Cart, CommerceError> {
        let expected = merged.version;
        let new_version = self
            .arena
            .replace_and_remove(
                merged.id.as_str(),
                expected,
                merged.clone(),
                source_id.as_str(),
                source_version,
            )
            .map_err(|e| match e {
                StoreError::NotFound(id) => CommerceError::CartNotFound(id),
                other => stale("cart", other),
            })?;
        merged.version = new_version;
        Ok(merged)
    }
}

/// The three in-memory stores, ready to share across engines.
#[derive(Debug, Clone, Default)]
pub struct MemoryStores {
    pub orders: Arc<MemoryOrderStore>,
    pub inventory: Arc<MemoryInventoryStore>,
    pub carts: Arc<MemoryCartStore>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }
}
