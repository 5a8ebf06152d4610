//! Carts and the one-shot guest-to-user merge.

mod cart;
mod merge;

pub use cart::{Cart, CartItem, CartOwner};
pub use merge::{CartMerger, MergeAdjustment, MergeReport};
