//! Cart and cart item types.

use crate::error::CommerceError;
use crate::ids::{CartId, CartItemId, ProductId, SessionId, UserId, VariantId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Who a cart belongs to. Exactly one owner at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CartOwner {
    /// Anonymous session.
    Session(SessionId),
    /// Authenticated user.
    User(UserId),
}

/// A shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    /// Unique cart identifier.
    pub id: CartId,
    /// Current owner.
    pub owner: CartOwner,
    /// Items in the cart.
    pub items: Vec<CartItem>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last change.
    pub updated_at: i64,
    /// Version of the stored cart this copy was read at.
    pub version: u64,
}

impl Cart {
    /// Create an empty cart for an anonymous session.
    pub fn for_session(session_id: SessionId) -> Self {
        Self::new(CartOwner::Session(session_id))
    }

    /// Create an empty cart for an authenticated user.
    pub fn for_user(user_id: UserId) -> Self {
        Self::new(CartOwner::User(user_id))
    }

    fn new(owner: CartOwner) -> Self {
        let now = current_timestamp();
        Self {
            id: CartId::generate(),
            owner,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Add an item, folding it into an existing line for the same
    /// `(product_id, variant_id)` pair.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        variant_id: VariantId,
        quantity: i64,
        unit_price: Money,
    ) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if let Some(line) = self.line_mut(&product_id, &variant_id) {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CommerceError::Overflow)?;
        } else {
            self.items.push(CartItem {
                id: CartItemId::generate(),
                product_id,
                variant_id,
                quantity,
                unit_price,
            });
        }
        self.updated_at = current_timestamp();
        Ok(())
    }

    /// Remove the line for a `(product_id, variant_id)` pair.
    pub fn remove_item(&mut self, product_id: &ProductId, variant_id: &VariantId) -> bool {
        let before = self.items.len();
        self.items
            .retain(|i| !(&i.product_id == product_id && &i.variant_id == variant_id));
        let removed = self.items.len() < before;
        if removed {
            self.updated_at = current_timestamp();
        }
        removed
    }

    /// Look up a line by `(product_id, variant_id)`.
    pub fn line(&self, product_id: &ProductId, variant_id: &VariantId) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|i| &i.product_id == product_id && &i.variant_id == variant_id)
    }

    pub(crate) fn line_mut(
        &mut self,
        product_id: &ProductId,
        variant_id: &VariantId,
    ) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|i| &i.product_id == product_id && &i.variant_id == variant_id)
    }

    /// Total item count (sum of quantities).
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A line in a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Unique line identifier.
    pub id: CartItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Variant being purchased.
    pub variant_id: VariantId,
    /// Quantity.
    pub quantity: i64,
    /// Price snapshot at the time the item was added.
    pub unit_price: Money,
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    #[test]
    fn test_add_item_merges_matching_lines() {
        let mut cart = Cart::for_session(SessionId::new("sess-1"));
        cart.add_item(ProductId::new("p1"), VariantId::new("v1"), 2, usd(1000))
            .unwrap();
        cart.add_item(ProductId::new("p1"), VariantId::new("v1"), 3, usd(1000))
            .unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_lines_are_keyed_by_product_and_variant() {
        let mut cart = Cart::for_session(SessionId::new("sess-1"));
        cart.add_item(ProductId::new("p1"), VariantId::new("v1"), 1, usd(1000))
            .unwrap();
        cart.add_item(ProductId::new("p1"), VariantId::new("v2"), 1, usd(1200))
            .unwrap();

        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_quantity_must_be_positive() {
        let mut cart = Cart::for_session(SessionId::new("sess-1"));
        let result = cart.add_item(ProductId::new("p1"), VariantId::new("v1"), 0, usd(1000));
        assert_eq!(result, Err(CommerceError::InvalidQuantity(0)));
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::for_session(SessionId::new("sess-1"));
        cart.add_item(ProductId::new("p1"), VariantId::new("v1"), 1, usd(1000))
            .unwrap();

        assert!(cart.remove_item(&ProductId::new("p1"), &VariantId::new("v1")));
        assert!(cart.is_empty());
        assert!(!cart.remove_item(&ProductId::new("p1"), &VariantId::new("v1")));
    }
}
