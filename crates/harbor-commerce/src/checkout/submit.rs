//! Checkout submission.
//!
//! Submission creates the order first, then reserves stock line by line.
//! This engine does not span a full checkout saga: if any line cannot be
//! reserved, the decrements already applied are compensated back, the
//! order is cancelled, and the stock failure is returned to the caller.

use crate::error::CommerceError;
use crate::ids::{OrderId, PaymentIntentId, ProductId, UserId, VariantId};
use crate::inventory::InventoryLedger;
use crate::money::Money;
use crate::orders::{Order, OrderNumberGenerator, OrderTotals};
use crate::store::{InventoryStore, OrderStore};
use serde::{Deserialize, Serialize};

/// One line of a submitted checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutLine {
    /// Product being bought.
    pub product_id: ProductId,
    /// Variant being bought.
    pub variant_id: VariantId,
    /// Quantity to reserve.
    pub quantity: i64,
}

/// Monetary breakdown computed by the (external) pricing step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CheckoutPricing {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
}

impl CheckoutPricing {
    /// Derive the order totals, validating currency and sign.
    pub fn totals(&self) -> Result<OrderTotals, CommerceError> {
        OrderTotals::new(self.subtotal, self.shipping, self.tax, self.discount)
    }
}

/// The checkout-to-order/inventory boundary.
#[derive(Debug)]
pub struct Checkout<O, I> {
    orders: O,
    inventory: InventoryLedger<I>,
    numbers: OrderNumberGenerator,
}

impl<O: OrderStore, I: InventoryStore> Checkout<O, I> {
    pub fn new(orders: O, inventory: I) -> Self {
        Self {
            orders,
            inventory: InventoryLedger::new(inventory),
            numbers: OrderNumberGenerator::new(),
        }
    }

    /// Submit a checkout: create a pending order and decrement stock for
    /// every line.
    ///
    /// On a stock failure the order is cancelled, earlier decrements are
    /// compensated back, and the failure is returned so the caller can
    /// show the customer which line ran dry.
    pub fn submit(
        &self,
        user_id: Option<UserId>,
        lines: &[CheckoutLine],
        pricing: CheckoutPricing,
    ) -> Result<Order, CommerceError> {
        let totals = pricing.totals()?;
        let order = Order::new(self.numbers.next(), user_id, totals);
        let mut order = self.orders.insert(order)?;

        let reservation: Vec<(VariantId, i64)> = lines
            .iter()
            .map(|line| (line.variant_id.clone(), line.quantity))
            .collect();
        if let Err(e) = self.inventory.reserve_for_checkout(&reservation) {
            order.cancel("insufficient stock at checkout")?;
            tracing::warn!(
                order = %order.id,
                error = %e,
                "checkout submission failed, order cancelled"
            );
            self.orders.update(order)?;
            return Err(e);
        }

        tracing::info!(
            order = %order.id,
            order_number = %order.order_number,
            lines = lines.len(),
            "checkout submitted"
        );
        Ok(order)
    }

    /// Record the external payment-intent id on an order before webhook
    /// traffic for it arrives.
    pub fn attach_payment_intent(
        &self,
        order_id: &OrderId,
        payment_intent_id: PaymentIntentId,
    ) -> Result<Order, CommerceError> {
        let mut order = self
            .orders
            .get(order_id)
            .ok_or_else(|| CommerceError::OrderNotFound(order_id.to_string()))?;
        order.set_payment_intent(payment_intent_id);
        self.orders.update(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryRecord;
    use crate::money::Currency;
    use crate::orders::OrderStatus;
    use crate::store::memory::{MemoryInventoryStore, MemoryOrderStore};
    use std::sync::Arc;

    fn usd(cents: i64) -> Money {
        Money::new(cents, Currency::USD)
    }

    fn pricing() -> CheckoutPricing {
        CheckoutPricing {
            subtotal: usd(3000),
            shipping: usd(500),
            tax: usd(250),
            discount: usd(0),
        }
    }

    fn setup(
        levels: &[(&str, i64)],
    ) -> (
        Arc<MemoryOrderStore>,
        Arc<MemoryInventoryStore>,
        Checkout<Arc<MemoryOrderStore>, Arc<MemoryInventoryStore>>,
    ) {
        let orders = Arc::new(MemoryOrderStore::new());
        let inventory = Arc::new(MemoryInventoryStore::new());
        for (id, quantity) in levels {
            inventory
                .insert(InventoryRecord::new(VariantId::new(*id), *quantity))
                .unwrap();
        }
        let checkout = Checkout::new(Arc::clone(&orders), Arc::clone(&inventory));
        (orders, inventory, checkout)
    }

    fn line(variant: &str, quantity: i64) -> CheckoutLine {
        CheckoutLine {
            product_id: ProductId::new(format!("p-{}", variant)),
            variant_id: VariantId::new(variant),
            quantity,
        }
    }

    #[test]
    fn test_submit_creates_pending_order_and_decrements_stock() {
        let (orders, inventory, checkout) = setup(&[("v1", 10), ("v2", 5)]);

        let order = checkout
            .submit(None, &[line("v1", 2), line("v2", 1)], pricing())
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.order_number.starts_with("ORD-"));
        assert_eq!(order.totals.total().minor_units, 3750);
        assert_eq!(inventory.get(&VariantId::new("v1")).unwrap().quantity, 8);
        assert_eq!(inventory.get(&VariantId::new("v2")).unwrap().quantity, 4);
        assert!(orders.get(&order.id).is_some());
    }

    #[test]
    fn test_failed_line_cancels_order_and_releases_stock() {
        let (orders, inventory, checkout) = setup(&[("v1", 10), ("v2", 1)]);

        let err = checkout
            .submit(None, &[line("v1", 2), line("v2", 5)], pricing())
            .unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { .. }));

        // First line's decrement was compensated back.
        assert_eq!(inventory.get(&VariantId::new("v1")).unwrap().quantity, 10);
        assert_eq!(inventory.get(&VariantId::new("v2")).unwrap().quantity, 1);

        // The partially created order ends Cancelled, not dangling Pending.
        let all = orders.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_attach_payment_intent() {
        let (orders, _, checkout) = setup(&[("v1", 10)]);
        let order = checkout.submit(None, &[line("v1", 1)], pricing()).unwrap();

        let updated = checkout
            .attach_payment_intent(&order.id, PaymentIntentId::new("pi_42"))
            .unwrap();
        assert_eq!(
            updated.payment_intent_id(),
            Some(&PaymentIntentId::new("pi_42"))
        );
        assert_eq!(
            orders
                .find_by_payment_intent(&PaymentIntentId::new("pi_42"))
                .unwrap()
                .id,
            order.id
        );
    }

    #[test]
    fn test_distinct_order_numbers_across_submissions() {
        let (_, _, checkout) = setup(&[("v1", 10)]);
        let a = checkout.submit(None, &[line("v1", 1)], pricing()).unwrap();
        let b = checkout.submit(None, &[line("v1", 1)], pricing()).unwrap();
        assert_ne!(a.order_number, b.order_number);
    }
}
