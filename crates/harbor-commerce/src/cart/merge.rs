//! One-shot merge of a guest cart into a user cart at login.

use crate::cart::{Cart, CartItem, CartOwner};
use crate::error::CommerceError;
use crate::ids::{CartItemId, ProductId, SessionId, UserId, VariantId};
use crate::store::{CartStore, InventoryStore};
use serde::{Deserialize, Serialize};

/// A merged line whose quantity had to be reduced to fit current stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeAdjustment {
    /// Product of the reduced line.
    pub product_id: ProductId,
    /// Variant of the reduced line.
    pub variant_id: VariantId,
    /// Quantity the summed lines asked for.
    pub requested: i64,
    /// Quantity actually kept.
    pub kept: i64,
}

/// Result of a merge: the surviving cart plus the reductions the UI
/// should tell the customer about.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    /// The user's cart after the merge.
    pub cart: Cart,
    /// Lines whose quantity was clamped to stock.
    pub adjustments: Vec<MergeAdjustment>,
}

/// Resolves an anonymous session's cart into the authenticated user's
/// cart, once, at login.
#[derive(Debug)]
pub struct CartMerger<C, I> {
    carts: C,
    inventory: I,
}

impl<C: CartStore, I: InventoryStore> CartMerger<C, I> {
    pub fn new(carts: C, inventory: I) -> Self {
        Self { carts, inventory }
    }

    /// Merge the session's guest cart into the user's cart.
    ///
    /// - No guest cart: the user's cart is returned untouched.
    /// - No user cart: the guest cart is re-owned to the user.
    /// - Both: lines union by `(product_id, variant_id)`; matching lines
    ///   sum quantities clamped to current stock, with every reduction
    ///   reported; non-matching guest lines are copied across. The commit
    ///   writes the merged cart and deletes the guest cart atomically, so
    ///   a concurrent add-to-cart on either side surfaces as a
    ///   [`CommerceError::StaleWrite`] instead of being interleaved.
    pub fn merge_on_login(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
    ) -> Result<MergeReport, CommerceError> {
        let guest = self.carts.find_by_session(session_id);
        let existing = self.carts.find_by_user(user_id);

        let (guest, existing) = match (guest, existing) {
            (None, None) => {
                return Err(CommerceError::CartNotFound(format!(
                    "no cart for session {} or user {}",
                    session_id, user_id
                )))
            }
            (None, Some(cart)) => {
                return Ok(MergeReport {
                    cart,
                    adjustments: Vec::new(),
                })
            }
            (Some(mut guest), None) => {
                // Re-own the guest cart; nothing to union.
                guest.owner = CartOwner::User(user_id.clone());
                guest.updated_at = current_timestamp();
                let cart = self.carts.update(guest)?;
                tracing::info!(cart = %cart.id, user = %user_id, "guest cart re-owned");
                return Ok(MergeReport {
                    cart,
                    adjustments: Vec::new(),
                });
            }
            (Some(guest), Some(existing)) => (guest, existing),
        };

        let mut merged = existing;
        let mut adjustments = Vec::new();

        for item in &guest.items {
            match merged.line_mut(&item.product_id, &item.variant_id) {
                Some(line) => {
                    let requested = line.quantity.saturating_add(item.quantity);
                    let kept = self.clamp_to_stock(&item.variant_id, line.quantity, requested);
                    line.quantity = kept;
                    if kept < requested {
                        adjustments.push(MergeAdjustment {
                            product_id: item.product_id.clone(),
                            variant_id: item.variant_id.clone(),
                            requested,
                            kept,
                        });
                    }
                }
                None => {
                    merged.items.push(CartItem {
                        id: CartItemId::generate(),
                        ..item.clone()
                    });
                }
            }
        }
        merged.updated_at = current_timestamp();

        let cart = self.carts.commit_merge(merged, &guest.id, guest.version)?;
        tracing::info!(
            cart = %cart.id,
            user = %user_id,
            reduced_lines = adjustments.len(),
            "guest cart merged"
        );
        Ok(MergeReport { cart, adjustments })
    }

    /// Clamp a summed line to current stock, never below the quantity the
    /// user's cart already held.
    fn clamp_to_stock(&self, variant_id: &VariantId, already_held: i64, requested: i64) -> i64 {
        match self.inventory.get(variant_id) {
            Some(record) => requested.min(record.quantity).max(already_held),
            // Untracked variant: nothing to clamp against.
            None => requested,
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
