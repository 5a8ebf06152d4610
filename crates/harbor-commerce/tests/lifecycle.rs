//! End-to-end flows across checkout, payments, inventory, and carts.

use harbor_commerce::prelude::*;
use std::sync::Arc;
use std::thread;

fn usd(cents: i64) -> Money {
    Money::new(cents, Currency::USD)
}

fn pricing() -> CheckoutPricing {
    CheckoutPricing {
        subtotal: usd(5000),
        shipping: usd(500),
        tax: usd(450),
        discount: usd(1000),
    }
}

fn seed_variant(stores: &MemoryStores, variant: &str, quantity: i64) {
    stores
        .inventory
        .insert(InventoryRecord::new(VariantId::new(variant), quantity))
        .unwrap();
}

fn checkout_line(variant: &str, quantity: i64) -> CheckoutLine {
    CheckoutLine {
        product_id: ProductId::new(format!("p-{}", variant)),
        variant_id: VariantId::new(variant),
        quantity,
    }
}

#[test]
fn paid_order_via_checkout_and_webhook() {
    let stores = MemoryStores::new();
    seed_variant(&stores, "v1", 10);

    let checkout = Checkout::new(stores.orders.clone(), stores.inventory.clone());
    let order = checkout
        .submit(Some(UserId::new("user-1")), &[checkout_line("v1", 2)], pricing())
        .unwrap();
    checkout
        .attach_payment_intent(&order.id, PaymentIntentId::new("pi_123"))
        .unwrap();

    let reconciler = Reconciler::new(stores.orders.clone());
    let outcome = reconciler
        .reconcile(&PaymentNotification::succeeded(PaymentIntentId::new("pi_123")))
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Updated(OrderStatus::Paid));

    let saved = stores.orders.get(&order.id).unwrap();
    assert_eq!(saved.status(), OrderStatus::Paid);
    // total = subtotal + shipping + tax - discount
    assert_eq!(saved.totals.total().minor_units, 5000 + 500 + 450 - 1000);
    assert_eq!(stores.inventory.get(&VariantId::new("v1")).unwrap().quantity, 8);
}

#[test]
fn duplicate_webhook_delivery_is_idempotent() {
    let stores = MemoryStores::new();
    seed_variant(&stores, "v1", 5);

    let checkout = Checkout::new(stores.orders.clone(), stores.inventory.clone());
    let order = checkout.submit(None, &[checkout_line("v1", 1)], pricing()).unwrap();
    checkout
        .attach_payment_intent(&order.id, PaymentIntentId::new("pi_dup"))
        .unwrap();

    let reconciler = Reconciler::new(stores.orders.clone());
    let note = PaymentNotification::succeeded(PaymentIntentId::new("pi_dup"));
    reconciler.reconcile(&note).unwrap();
    reconciler.reconcile(&note).unwrap();

    let saved = stores.orders.get(&order.id).unwrap();
    let paid_events: Vec<_> = saved
        .events()
        .iter()
        .filter(|e| e.status == OrderStatus::Paid)
        .collect();
    assert_eq!(paid_events.len(), 1);
    assert!(saved.paid_at.is_some());
}

#[test]
fn concurrent_duplicate_webhooks_apply_exactly_once() {
    let stores = MemoryStores::new();
    seed_variant(&stores, "v1", 5);

    let checkout = Checkout::new(stores.orders.clone(), stores.inventory.clone());
    let order = checkout.submit(None, &[checkout_line("v1", 1)], pricing()).unwrap();
    checkout
        .attach_payment_intent(&order.id, PaymentIntentId::new("pi_race"))
        .unwrap();

    let reconciler = Arc::new(Reconciler::new(stores.orders.clone()));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let reconciler = Arc::clone(&reconciler);
        handles.push(thread::spawn(move || {
            reconciler
                .reconcile(&PaymentNotification::succeeded(PaymentIntentId::new("pi_race")))
                .unwrap()
        }));
    }
    let outcomes: Vec<ReconcileOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let applied = outcomes
        .iter()
        .filter(|o| matches!(o, ReconcileOutcome::Updated(_)))
        .count();
    assert_eq!(applied, 1, "exactly one delivery may apply the transition");

    let saved = stores.orders.get(&order.id).unwrap();
    assert_eq!(saved.status(), OrderStatus::Paid);
    let paid_events = saved
        .events()
        .iter()
        .filter(|e| e.status == OrderStatus::Paid)
        .count();
    assert_eq!(paid_events, 1);
}

#[test]
fn out_of_order_refund_then_success() {
    let stores = MemoryStores::new();
    seed_variant(&stores, "v1", 5);

    let checkout = Checkout::new(stores.orders.clone(), stores.inventory.clone());
    let order = checkout.submit(None, &[checkout_line("v1", 1)], pricing()).unwrap();
    checkout
        .attach_payment_intent(&order.id, PaymentIntentId::new("pi_ooo"))
        .unwrap();

    let reconciler = Reconciler::new(stores.orders.clone());

    // Refund arrives before the success it refunds: acknowledged, no-op.
    let outcome = reconciler
        .reconcile(&PaymentNotification::refunded(PaymentIntentId::new("pi_ooo"), 4950))
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::AlreadyConsistent);
    assert_eq!(
        stores.orders.get(&order.id).unwrap().status(),
        OrderStatus::Pending
    );

    // Success lands, then the redelivered refund applies.
    reconciler
        .reconcile(&PaymentNotification::succeeded(PaymentIntentId::new("pi_ooo")))
        .unwrap();
    let outcome = reconciler
        .reconcile(&PaymentNotification::refunded(PaymentIntentId::new("pi_ooo"), 4950))
        .unwrap();
    assert_eq!(outcome, ReconcileOutcome::Updated(OrderStatus::Refunded));
}

#[test]
fn admin_write_and_webhook_linearize() {
    let stores = MemoryStores::new();
    seed_variant(&stores, "v1", 5);

    let checkout = Checkout::new(stores.orders.clone(), stores.inventory.clone());
    let order = checkout.submit(None, &[checkout_line("v1", 1)], pricing()).unwrap();
    checkout
        .attach_payment_intent(&order.id, PaymentIntentId::new("pi_admin"))
        .unwrap();

    // Admin holds a stale copy while the webhook pays the order.
    let stale_admin_copy = stores.orders.get(&order.id).unwrap();

    let reconciler = Reconciler::new(stores.orders.clone());
    reconciler
        .reconcile(&PaymentNotification::succeeded(PaymentIntentId::new("pi_admin")))
        .unwrap();

    // The admin's write loses and is told so, instead of silently
    // un-paying the order.
    let mut cancelled = stale_admin_copy;
    cancelled.cancel("manual cleanup").unwrap();
    let err = stores.orders.update(cancelled).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(stores.orders.get(&order.id).unwrap().status(), OrderStatus::Paid);
}

#[test]
fn guest_cart_merges_into_user_cart_at_login() {
    let stores = MemoryStores::new();
    seed_variant(&stores, "A", 10);
    seed_variant(&stores, "B", 4);
    seed_variant(&stores, "C", 10);

    let mut guest = Cart::for_session(SessionId::new("sess-9"));
    guest
        .add_item(ProductId::new("pA"), VariantId::new("A"), 2, usd(1000))
        .unwrap();
    guest
        .add_item(ProductId::new("pB"), VariantId::new("B"), 1, usd(2000))
        .unwrap();
    stores.carts.insert(guest).unwrap();

    let mut user_cart = Cart::for_user(UserId::new("user-9"));
    user_cart
        .add_item(ProductId::new("pB"), VariantId::new("B"), 3, usd(2000))
        .unwrap();
    user_cart
        .add_item(ProductId::new("pC"), VariantId::new("C"), 1, usd(500))
        .unwrap();
    stores.carts.insert(user_cart).unwrap();

    let merger = CartMerger::new(stores.carts.clone(), stores.inventory.clone());
    let report = merger
        .merge_on_login(&SessionId::new("sess-9"), &UserId::new("user-9"))
        .unwrap();

    assert_eq!(report.cart.item_count(), 2 + 4 + 1);
    assert!(stores.carts.find_by_session(&SessionId::new("sess-9")).is_none());
}

#[test]
fn bulk_restock_reports_partial_failure() {
    let stores = MemoryStores::new();
    seed_variant(&stores, "v1", 0);
    seed_variant(&stores, "v2", 0);

    let ledger = InventoryLedger::new(stores.inventory.clone());
    let report = ledger
        .bulk_set_stock(
            &[
                StockLevelUpdate {
                    variant_id: VariantId::new("v1"),
                    new_quantity: 40,
                },
                StockLevelUpdate {
                    variant_id: VariantId::new("unknown-sku"),
                    new_quantity: 15,
                },
                StockLevelUpdate {
                    variant_id: VariantId::new("v2"),
                    new_quantity: 25,
                },
            ],
            AdjustmentReason::Restock,
        )
        .unwrap();

    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 1);
    assert_eq!(report.errors[0].variant_id, VariantId::new("unknown-sku"));
    assert_eq!(stores.inventory.get(&VariantId::new("v1")).unwrap().quantity, 40);
    assert_eq!(stores.inventory.get(&VariantId::new("v2")).unwrap().quantity, 25);
}
