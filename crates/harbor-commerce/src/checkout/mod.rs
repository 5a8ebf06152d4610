//! Checkout submission: order creation plus stock reservation.

mod submit;

pub use submit::{Checkout, CheckoutLine, CheckoutPricing};
