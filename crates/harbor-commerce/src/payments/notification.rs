//! Inbound payment processor notifications.
//!
//! A notification is a trigger, not an aggregate: it is never persisted.
//! By the time it reaches this crate the transport has already verified
//! the signature and deserialized the body.

use crate::ids::PaymentIntentId;
use serde::{Deserialize, Serialize};

/// An event notification from the payment processor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentNotification {
    /// Processor event type, e.g. `payment_intent.succeeded`.
    pub event_type: String,
    /// External payment-intent id the event refers to.
    pub payment_intent_id: PaymentIntentId,
    /// Failure reason, on failure events.
    #[serde(default)]
    pub failure_message: Option<String>,
    /// Processor charge id, when present.
    #[serde(default)]
    pub charge_id: Option<String>,
    /// Refunded amount in minor units, on refund events.
    #[serde(default)]
    pub amount_refunded: Option<i64>,
}

impl PaymentNotification {
    /// A payment-succeeded notification.
    pub fn succeeded(payment_intent_id: PaymentIntentId) -> Self {
        Self {
            event_type: "payment_intent.succeeded".to_string(),
            payment_intent_id,
            failure_message: None,
            charge_id: None,
            amount_refunded: None,
        }
    }

    /// A payment-failed notification.
    pub fn failed(payment_intent_id: PaymentIntentId, reason: impl Into<String>) -> Self {
        Self {
            event_type: "payment_intent.payment_failed".to_string(),
            payment_intent_id,
            failure_message: Some(reason.into()),
            charge_id: None,
            amount_refunded: None,
        }
    }

    /// A refund notification.
    pub fn refunded(payment_intent_id: PaymentIntentId, amount_refunded: i64) -> Self {
        Self {
            event_type: "charge.refunded".to_string(),
            payment_intent_id,
            failure_message: None,
            charge_id: None,
            amount_refunded: Some(amount_refunded),
        }
    }

    /// The recognized event type, if any.
    pub fn kind(&self) -> PaymentEventType {
        PaymentEventType::parse(&self.event_type)
    }
}

/// Payment event types this engine acts on.
///
/// Unrecognized types are deliberately not an error: the processor ships
/// event types faster than anyone handles them, and acknowledging them
/// keeps its retry queue quiet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentEventType {
    /// Payment captured.
    Succeeded,
    /// Payment attempt failed.
    Failed,
    /// Payment refunded.
    Refunded,
    /// Anything this engine does not handle.
    Unrecognized,
}

impl PaymentEventType {
    /// Map a processor event-type string, accepting both bare and
    /// processor-prefixed spellings.
    pub fn parse(event_type: &str) -> Self {
        match event_type {
            "succeeded" | "payment_intent.succeeded" => PaymentEventType::Succeeded,
            "payment_failed" | "payment_intent.payment_failed" => PaymentEventType::Failed,
            "refunded" | "charge.refunded" => PaymentEventType::Refunded,
            _ => PaymentEventType::Unrecognized,
        }
    }
}
