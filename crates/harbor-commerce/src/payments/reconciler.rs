//! Idempotent reconciliation of payment notifications against orders.
//!
//! Webhook delivery is at-least-once and unordered: the same event can
//! arrive twice, logically redundant events can arrive under fresh event
//! ids, and a failure can land after the success it lost a race to.
//! Idempotency here is therefore state-based: each notification is
//! compared against the order's current state, and only a transition that
//! actually changes state is persisted.

use crate::error::CommerceError;
use crate::orders::OrderStatus;
use crate::payments::{PaymentEventType, PaymentNotification};
use crate::store::OrderStore;

/// How many times a lost optimistic write is retried with a fresh read
/// before the conflict is surfaced to the transport for redelivery.
const MAX_WRITE_ATTEMPTS: usize = 5;

/// What a notification ended up doing.
///
/// Every variant is a success from the transport's point of view; the
/// caller acknowledges receipt regardless, so the sender stops retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order transitioned; one audit event was appended.
    Updated(OrderStatus),
    /// The order was already consistent with the notification; nothing
    /// was written.
    AlreadyConsistent,
    /// No order carries this payment-intent id. Legitimate: test-mode
    /// traffic, archived orders, or an order that does not exist yet.
    OrderNotFound,
    /// Event type this engine does not handle.
    IgnoredEventType,
}

/// Translates payment notifications into at most one order transition
/// each.
#[derive(Debug)]
pub struct Reconciler<S> {
    orders: S,
}

impl<S: OrderStore> Reconciler<S> {
    pub fn new(orders: S) -> Self {
        Self { orders }
    }

    /// Reconcile one notification.
    ///
    /// Returns `Ok` for every expected outcome, including "no matching
    /// order" and "nothing to do" — those are acknowledgements, not
    /// failures. The only errors escaping here are storage faults and a
    /// write conflict that persisted through all retries.
    pub fn reconcile(
        &self,
        notification: &PaymentNotification,
    ) -> Result<ReconcileOutcome, CommerceError> {
        let kind = notification.kind();
        if kind == PaymentEventType::Unrecognized {
            tracing::debug!(
                event_type = %notification.event_type,
                "ignoring unhandled payment event type"
            );
            return Ok(ReconcileOutcome::IgnoredEventType);
        }

        let mut last_conflict = None;
        for attempt in 0..MAX_WRITE_ATTEMPTS {
            let Some(mut order) = self
                .orders
                .find_by_payment_intent(&notification.payment_intent_id)
            else {
                tracing::debug!(
                    payment_intent = %notification.payment_intent_id,
                    "no order for payment intent, acknowledging"
                );
                return Ok(ReconcileOutcome::OrderNotFound);
            };

            let transition = match kind {
                PaymentEventType::Succeeded => order.mark_paid(),
                PaymentEventType::Failed => {
                    order.mark_payment_failed(notification.failure_message.clone())
                }
                PaymentEventType::Refunded => order.mark_refunded(),
                PaymentEventType::Unrecognized => {
                    return Ok(ReconcileOutcome::IgnoredEventType)
                }
            };

            match transition {
                Ok(outcome) if outcome.is_applied() => match self.orders.update(order) {
                    Ok(saved) => {
                        tracing::info!(
                            order = %saved.id,
                            status = saved.status().as_str(),
                            payment_intent = %notification.payment_intent_id,
                            "payment notification applied"
                        );
                        return Ok(ReconcileOutcome::Updated(saved.status()));
                    }
                    Err(e) if e.is_conflict() => {
                        tracing::debug!(
                            attempt,
                            payment_intent = %notification.payment_intent_id,
                            "lost write race, re-reading order"
                        );
                        last_conflict = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                },
                Ok(_) => {
                    tracing::debug!(
                        order = %order.id,
                        status = order.status().as_str(),
                        "order already consistent with notification"
                    );
                    return Ok(ReconcileOutcome::AlreadyConsistent);
                }
                Err(CommerceError::InvalidTransition { from, to }) => {
                    // E.g. a success notification for a cancelled order.
                    // Acknowledged without action; the order's state wins.
                    tracing::warn!(
                        order = %order.id,
                        %from,
                        %to,
                        "notification maps to an illegal transition, acknowledging"
                    );
                    return Ok(ReconcileOutcome::AlreadyConsistent);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_conflict.unwrap_or(CommerceError::Storage(
            "reconcile retries exhausted".to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PaymentIntentId;
    use crate::money::Currency;
    use crate::orders::{Order, OrderTotals};
    use crate::store::memory::MemoryOrderStore;
    use std::sync::Arc;

    fn setup(payment_intent: &str) -> (Arc<MemoryOrderStore>, Reconciler<Arc<MemoryOrderStore>>, Order) {
        let store = Arc::new(MemoryOrderStore::new());
        let mut order = Order::new("ORD-1", None, OrderTotals::zero(Currency::USD));
        order.set_payment_intent(PaymentIntentId::new(payment_intent));
        let stored = store.insert(order).unwrap();
        let reconciler = Reconciler::new(Arc::clone(&store));
        (store, reconciler, stored)
    }

    #[test]
    fn test_succeeded_marks_order_paid() {
        let (store, reconciler, order) = setup("pi_123");
        let note = PaymentNotification::succeeded(PaymentIntentId::new("pi_123"));

        let outcome = reconciler.reconcile(&note).unwrap();
        assert_eq!(outcome, ReconcileOutcome::Updated(OrderStatus::Paid));

        let saved = store.get(&order.id).unwrap();
        assert_eq!(saved.status(), OrderStatus::Paid);
        assert!(saved.paid_at.is_some());
    }

    #[test]
    fn test_duplicate_delivery_applies_once() {
        let (store, reconciler, order) = setup("pi_123");
        let note = PaymentNotification::succeeded(PaymentIntentId::new("pi_123"));

        assert_eq!(
            reconciler.reconcile(&note).unwrap(),
            ReconcileOutcome::Updated(OrderStatus::Paid)
        );
        let after_first = store.get(&order.id).unwrap();

        assert_eq!(
            reconciler.reconcile(&note).unwrap(),
            ReconcileOutcome::AlreadyConsistent
        );
        let after_second = store.get(&order.id).unwrap();

        // Exactly one paid_at, one paid event, and no extra write.
        assert_eq!(after_second.paid_at, after_first.paid_at);
        assert_eq!(after_second.events().len(), after_first.events().len());
        assert_eq!(after_second.version, after_first.version);
    }

    #[test]
    fn test_late_failure_never_regresses_paid_order() {
        let (store, reconciler, order) = setup("pi_123");
        reconciler
            .reconcile(&PaymentNotification::succeeded(PaymentIntentId::new("pi_123")))
            .unwrap();

        let outcome = reconciler
            .reconcile(&PaymentNotification::failed(
                PaymentIntentId::new("pi_123"),
                "card declined",
            ))
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::AlreadyConsistent);
        assert_eq!(store.get(&order.id).unwrap().status(), OrderStatus::Paid);
    }

    #[test]
    fn test_failure_then_success_recovers() {
        let (store, reconciler, order) = setup("pi_123");
        reconciler
            .reconcile(&PaymentNotification::failed(
                PaymentIntentId::new("pi_123"),
                "card declined",
            ))
            .unwrap();
        assert_eq!(
            store.get(&order.id).unwrap().status(),
            OrderStatus::PaymentFailed
        );

        reconciler
            .reconcile(&PaymentNotification::succeeded(PaymentIntentId::new("pi_123")))
            .unwrap();
        assert_eq!(store.get(&order.id).unwrap().status(), OrderStatus::Paid);
    }

    #[test]
    fn test_refund_of_pending_order_is_acknowledged_noop() {
        let (store, reconciler, order) = setup("pi_123");
        let outcome = reconciler
            .reconcile(&PaymentNotification::refunded(
                PaymentIntentId::new("pi_123"),
                1000,
            ))
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::AlreadyConsistent);
        assert_eq!(store.get(&order.id).unwrap().status(), OrderStatus::Pending);
    }

    #[test]
    fn test_unknown_payment_intent_is_acknowledged() {
        let (_, reconciler, _) = setup("pi_123");
        let outcome = reconciler
            .reconcile(&PaymentNotification::succeeded(PaymentIntentId::new(
                "pi_staging_999",
            )))
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::OrderNotFound);
    }

    #[test]
    fn test_unhandled_event_type_is_acknowledged() {
        let (store, reconciler, order) = setup("pi_123");
        let note = PaymentNotification {
            event_type: "customer.subscription.created".to_string(),
            payment_intent_id: PaymentIntentId::new("pi_123"),
            failure_message: None,
            charge_id: None,
            amount_refunded: None,
        };
        assert_eq!(
            reconciler.reconcile(&note).unwrap(),
            ReconcileOutcome::IgnoredEventType
        );
        assert_eq!(store.get(&order.id).unwrap().status(), OrderStatus::Pending);
    }

    #[test]
    fn test_success_for_cancelled_order_is_acknowledged_without_change() {
        let (store, reconciler, order) = setup("pi_123");
        let mut cancelled = store.get(&order.id).unwrap();
        cancelled.cancel("customer request").unwrap();
        store.update(cancelled).unwrap();

        let outcome = reconciler
            .reconcile(&PaymentNotification::succeeded(PaymentIntentId::new("pi_123")))
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::AlreadyConsistent);
        assert_eq!(
            store.get(&order.id).unwrap().status(),
            OrderStatus::Cancelled
        );
    }
}
