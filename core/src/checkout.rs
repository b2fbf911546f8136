// cart_sync/src/checkout.rs

//! Hands the cart to the external order service and empties it once the order is placed.

use crate::controller::CartController;
use crate::core::cart_item::CartItem;
use crate::core::totals::CartTotals;
use crate::error::{CartSyncError, SyncResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{event, instrument, Level};

/// What the order service is asked to charge for: the cart lines exactly as captured when
/// they were added, and the totals computed from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
  pub items: Vec<CartItem>,
  pub totals: CartTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
  pub order_id: String,
  /// Amount charged, in minor units.
  pub total: i64,
}

/// The external order-placement operation.
#[async_trait]
pub trait OrderPlacement: Send + Sync {
  async fn place_order(&self, request: OrderRequest) -> anyhow::Result<OrderReceipt>;
}

/// Places an order for the current cart contents and clears the cart on success.
///
/// An empty cart is rejected before the order service is called. If placement fails the
/// cart is left exactly as it was.
#[instrument(name = "checkout::place_order", skip_all, err(Display))]
pub async fn place_order(controller: &CartController, placement: &dyn OrderPlacement) -> SyncResult<OrderReceipt> {
  let request = {
    let state = controller.state();
    let cart = state.read();
    OrderRequest {
      items: cart.items().to_vec(),
      totals: cart.totals(controller.config().tax_rate),
    }
  };
  if request.items.is_empty() {
    event!(Level::WARN, "Checkout attempted with an empty cart.");
    return Err(CartSyncError::EmptyCart);
  }

  let lines = request.items.len();
  let total = request.totals.total;
  event!(Level::INFO, lines, total, "Submitting order.");

  let receipt = placement
    .place_order(request)
    .await
    .map_err(|source| CartSyncError::OrderPlacement { source })?;

  event!(Level::INFO, order_id = %receipt.order_id, total = receipt.total, "Order placed; clearing cart.");
  controller.clear();
  Ok(receipt)
}
