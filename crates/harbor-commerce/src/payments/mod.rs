//! Payment notification intake and idempotent reconciliation.

mod notification;
mod reconciler;

pub use notification::{PaymentEventType, PaymentNotification};
pub use reconciler::{ReconcileOutcome, Reconciler};
