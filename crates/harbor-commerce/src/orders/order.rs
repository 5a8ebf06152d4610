//! The order aggregate and its guarded status state machine.
//!
//! There is deliberately no `set_status`: every change goes through a
//! named transition that validates its legal predecessors, appends an
//! audit event when it actually changes state, and reports no-ops as
//! no-ops so callers never persist or log a change that didn't happen.

use crate::error::CommerceError;
use crate::ids::{OrderId, PaymentIntentId, UserId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Order status.
///
/// Legal transitions:
/// `Pending -> {PaymentFailed, Paid, Cancelled}`,
/// `PaymentFailed -> {Paid, Cancelled}`,
/// `Paid -> {Processing, Refunded, Cancelled}`,
/// `Processing -> {Shipped, Refunded, Cancelled}`,
/// `Shipped -> {Delivered, Returned}`.
/// `Delivered`, `Refunded`, `Cancelled`, and `Returned` accept no further
/// payment transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order placed, awaiting payment.
    #[default]
    Pending,
    /// Payment attempt failed; retry or cancellation possible.
    PaymentFailed,
    /// Payment captured.
    Paid,
    /// Order being prepared for shipment.
    Processing,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
    /// Payment refunded.
    Refunded,
    /// Order returned after shipment.
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentFailed => "payment_failed",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Returned => "returned",
        }
    }

    /// Check if no further payment transition is legal from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered
                | OrderStatus::Cancelled
                | OrderStatus::Refunded
                | OrderStatus::Returned
        )
    }

    /// Check if payment has succeeded at some point on the way here.
    pub fn is_post_payment(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid
                | OrderStatus::Processing
                | OrderStatus::Shipped
                | OrderStatus::Delivered
                | OrderStatus::Returned
        )
    }
}

/// One entry in an order's append-only audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderEvent {
    /// Status the order moved to.
    pub status: OrderStatus,
    /// Human-readable description of the transition.
    pub description: String,
    /// Unix timestamp of the transition.
    pub timestamp: i64,
}

/// Monetary breakdown of an order.
///
/// The total is derived at construction (`subtotal + shipping + tax -
/// discount`) and is never independently settable; it is stored
/// denormalized so reads never recompute it from line items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OrderTotals {
    /// Sum of line item prices before shipping, tax, and discounts.
    pub subtotal: Money,
    /// Shipping cost.
    pub shipping: Money,
    /// Tax amount.
    pub tax: Money,
    /// Discount amount.
    pub discount: Money,
    total: Money,
}

impl OrderTotals {
    /// Build a breakdown, deriving the total.
    ///
    /// Fails on currency mixes, arithmetic overflow, or a negative total.
    pub fn new(
        subtotal: Money,
        shipping: Money,
        tax: Money,
        discount: Money,
    ) -> Result<Self, CommerceError> {
        let gross = subtotal
            .try_add(&shipping)
            .and_then(|m| m.try_add(&tax))
            .ok_or_else(|| mismatch_or_overflow(&subtotal, &[&shipping, &tax]))?;
        let total = gross
            .try_subtract(&discount)
            .ok_or_else(|| mismatch_or_overflow(&subtotal, &[&discount]))?;
        if total.is_negative() {
            return Err(CommerceError::NegativeTotal(total.minor_units));
        }
        Ok(Self {
            subtotal,
            shipping,
            tax,
            discount,
            total,
        })
    }

    /// All-zero breakdown in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            subtotal: Money::zero(currency),
            shipping: Money::zero(currency),
            tax: Money::zero(currency),
            discount: Money::zero(currency),
            total: Money::zero(currency),
        }
    }

    /// The derived grand total.
    pub fn total(&self) -> Money {
        self.total
    }
}

fn mismatch_or_overflow(base: &Money, others: &[&Money]) -> CommerceError {
    for other in others {
        if other.currency != base.currency {
            return CommerceError::CurrencyMismatch {
                expected: base.currency.code().to_string(),
                got: other.currency.code().to_string(),
            };
        }
    }
    CommerceError::Overflow
}

/// Result of a state-machine transition.
///
/// `Noop` means the order was already where the transition would have
/// taken it: no field changed, no event was appended, and callers must
/// not persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// State changed; one audit event was appended.
    Applied,
    /// Already in the requested state; nothing changed.
    Noop,
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied)
    }
}

/// An order and its append-only transition history, one consistency
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Human-presentable order number; immutable once assigned.
    pub order_number: String,
    /// Customer user ID (None for guest checkout).
    pub user_id: Option<UserId>,
    status: OrderStatus,
    /// Monetary breakdown with derived total.
    pub totals: OrderTotals,
    payment_intent_id: Option<PaymentIntentId>,
    payment_failure_reason: Option<String>,
    events: Vec<OrderEvent>,
    /// Unix timestamp when payment was captured.
    pub paid_at: Option<i64>,
    /// Unix timestamp when shipped.
    pub shipped_at: Option<i64>,
    /// Unix timestamp when delivered.
    pub delivered_at: Option<i64>,
    /// Unix timestamp when cancelled.
    pub cancelled_at: Option<i64>,
    /// Unix timestamp when refunded.
    pub refunded_at: Option<i64>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last change.
    pub updated_at: i64,
    /// Version of the stored aggregate this copy was read at; used for
    /// optimistic writes.
    pub version: u64,
}

impl Order {
    /// Create a new pending order.
    pub fn new(order_number: impl Into<String>, user_id: Option<UserId>, totals: OrderTotals) -> Self {
        let now = current_timestamp();
        Self {
            id: OrderId::generate(),
            order_number: order_number.into(),
            user_id,
            status: OrderStatus::Pending,
            totals,
            payment_intent_id: None,
            payment_failure_reason: None,
            events: vec![OrderEvent {
                status: OrderStatus::Pending,
                description: "order created".to_string(),
                timestamp: now,
            }],
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// The append-only audit log, oldest first.
    pub fn events(&self) -> &[OrderEvent] {
        &self.events
    }

    /// External payment-intent reference, if checkout has reached the
    /// payment step.
    pub fn payment_intent_id(&self) -> Option<&PaymentIntentId> {
        self.payment_intent_id.as_ref()
    }

    /// Most recent payment failure reason, if any.
    pub fn payment_failure_reason(&self) -> Option<&str> {
        self.payment_failure_reason.as_deref()
    }

    /// Record the external payment-intent id for this order.
    pub fn set_payment_intent(&mut self, payment_intent_id: PaymentIntentId) {
        self.payment_intent_id = Some(payment_intent_id);
        self.updated_at = current_timestamp();
    }

    /// Mark the order paid.
    ///
    /// Legal from `Pending` and `PaymentFailed`. Idempotent: an order
    /// that is already `Paid` is a no-op success and keeps its original
    /// `paid_at` and audit log.
    pub fn mark_paid(&mut self) -> Result<TransitionOutcome, CommerceError> {
        match self.status {
            OrderStatus::Paid => Ok(TransitionOutcome::Noop),
            OrderStatus::Pending | OrderStatus::PaymentFailed => {
                self.paid_at = Some(current_timestamp());
                self.apply(OrderStatus::Paid, "payment captured");
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(self.illegal(OrderStatus::Paid)),
        }
    }

    /// Mark a payment attempt failed.
    ///
    /// Legal from `Pending`. A failure notification arriving after the
    /// order is paid never regresses it (success outranks a late
    /// failure); repeating the same or an absent reason while already
    /// `PaymentFailed` is a no-op, while a new reason is recorded.
    pub fn mark_payment_failed(
        &mut self,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, CommerceError> {
        match self.status {
            OrderStatus::Pending => {
                let description = match &reason {
                    Some(r) => format!("payment failed: {}", r),
                    None => "payment failed".to_string(),
                };
                self.payment_failure_reason = reason;
                self.apply(OrderStatus::PaymentFailed, &description);
                Ok(TransitionOutcome::Applied)
            }
            OrderStatus::PaymentFailed => match reason {
                None => Ok(TransitionOutcome::Noop),
                Some(r) if self.payment_failure_reason.as_deref() == Some(r.as_str()) => {
                    Ok(TransitionOutcome::Noop)
                }
                Some(r) => {
                    let description = format!("payment failed: {}", r);
                    self.payment_failure_reason = Some(r);
                    self.apply(OrderStatus::PaymentFailed, &description);
                    Ok(TransitionOutcome::Applied)
                }
            },
            s if s.is_post_payment() => Ok(TransitionOutcome::Noop),
            _ => Err(self.illegal(OrderStatus::PaymentFailed)),
        }
    }

    /// Mark the order refunded.
    ///
    /// Legal from `Paid` and `Processing`. A refund notification for an
    /// order that was never paid has nothing to undo and is a no-op, as
    /// is a repeat refund.
    pub fn mark_refunded(&mut self) -> Result<TransitionOutcome, CommerceError> {
        match self.status {
            OrderStatus::Refunded => Ok(TransitionOutcome::Noop),
            OrderStatus::Pending | OrderStatus::PaymentFailed => Ok(TransitionOutcome::Noop),
            OrderStatus::Paid | OrderStatus::Processing => {
                self.refunded_at = Some(current_timestamp());
                self.apply(OrderStatus::Refunded, "payment refunded");
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(self.illegal(OrderStatus::Refunded)),
        }
    }

    /// Cancel the order.
    ///
    /// Legal from any state before shipment.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<TransitionOutcome, CommerceError> {
        match self.status {
            OrderStatus::Cancelled => Ok(TransitionOutcome::Noop),
            OrderStatus::Pending
            | OrderStatus::PaymentFailed
            | OrderStatus::Paid
            | OrderStatus::Processing => {
                self.cancelled_at = Some(current_timestamp());
                let description = format!("cancelled: {}", reason.into());
                self.apply(OrderStatus::Cancelled, &description);
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(self.illegal(OrderStatus::Cancelled)),
        }
    }

    /// Begin fulfillment. Legal from `Paid`.
    pub fn start_processing(&mut self) -> Result<TransitionOutcome, CommerceError> {
        match self.status {
            OrderStatus::Processing => Ok(TransitionOutcome::Noop),
            OrderStatus::Paid => {
                self.apply(OrderStatus::Processing, "fulfillment started");
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(self.illegal(OrderStatus::Processing)),
        }
    }

    /// Mark the order shipped. Legal from `Processing`.
    pub fn ship(&mut self) -> Result<TransitionOutcome, CommerceError> {
        match self.status {
            OrderStatus::Shipped => Ok(TransitionOutcome::Noop),
            OrderStatus::Processing => {
                self.shipped_at = Some(current_timestamp());
                self.apply(OrderStatus::Shipped, "order shipped");
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(self.illegal(OrderStatus::Shipped)),
        }
    }

    /// Mark the order delivered. Legal from `Shipped`.
    pub fn deliver(&mut self) -> Result<TransitionOutcome, CommerceError> {
        match self.status {
            OrderStatus::Delivered => Ok(TransitionOutcome::Noop),
            OrderStatus::Shipped => {
                self.delivered_at = Some(current_timestamp());
                self.apply(OrderStatus::Delivered, "order delivered");
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(self.illegal(OrderStatus::Delivered)),
        }
    }

    /// Mark the order returned. Legal from `Shipped`.
    pub fn mark_returned(&mut self) -> Result<TransitionOutcome, CommerceError> {
        match self.status {
            OrderStatus::Returned => Ok(TransitionOutcome::Noop),
            OrderStatus::Shipped => {
                self.apply(OrderStatus::Returned, "order returned");
                Ok(TransitionOutcome::Applied)
            }
            _ => Err(self.illegal(OrderStatus::Returned)),
        }
    }

    fn apply(&mut self, status: OrderStatus, description: &str) {
        let now = current_timestamp();
        self.status = status;
        self.events.push(OrderEvent {
            status,
            description: description.to_string(),
            timestamp: now,
        });
        self.updated_at = now;
    }

    fn illegal(&self, to: OrderStatus) -> CommerceError {
        CommerceError::InvalidTransition {
            from: self.status.as_str().to_string(),
            to: to.as_str().to_string(),
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
