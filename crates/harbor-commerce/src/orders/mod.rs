//! Order aggregate: status state machine, audit log, order numbers.

mod number;
mod order;

pub use number::OrderNumberGenerator;
pub use order::{Order, OrderEvent, OrderStatus, OrderTotals, TransitionOutcome};
