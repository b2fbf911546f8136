// cart_sync/src/core/cart.rs

//! The in-memory cart: an ordered list of line items, unique by product id.

use crate::core::cart_item::{CartItem, Product};
use crate::core::totals::{self, CartTotals, TaxRate};
use serde::{Deserialize, Serialize};
use tracing::{event, Level};

/// Ordered line items, at most one per `product_id`, each with `qty >= 1`.
///
/// Every mutating method preserves both invariants. Items coming from outside the process
/// go through [`Cart::from_items`], which restores them if the source broke them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
  items: Vec<CartItem>,
}

impl Cart {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builds a cart from externally supplied items, normalizing them.
  pub fn from_items(items: Vec<CartItem>) -> Self {
    Cart {
      items: normalize_items(items),
    }
  }

  pub fn items(&self) -> &[CartItem] {
    &self.items
  }

  pub fn into_items(self) -> Vec<CartItem> {
    self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn find(&self, product_id: &str) -> Option<&CartItem> {
    self.items.iter().find(|item| item.product_id == product_id)
  }

  /// Adds `qty` units of `product` (at least one).
  ///
  /// An existing line for the same product only has its quantity increased; its name,
  /// image and price keep the values captured when it was first added.
  pub fn add(&mut self, product: &Product, qty: u32) {
    let qty = qty.max(1);
    if let Some(existing) = self.items.iter_mut().find(|item| item.product_id == product.id) {
      existing.qty = existing.qty.saturating_add(qty);
      return;
    }
    self.items.push(CartItem::from_product(product, qty));
  }

  /// Removes the line for `product_id`. Returns whether anything was removed.
  pub fn remove(&mut self, product_id: &str) -> bool {
    let before = self.items.len();
    self.items.retain(|item| item.product_id != product_id);
    before != self.items.len()
  }

  /// Sets the quantity of an existing line, clamped to a minimum of one.
  ///
  /// Zero and negative values do not remove the line. Returns whether the line exists.
  pub fn set_qty(&mut self, product_id: &str, qty: i64) -> bool {
    let clamped = u32::try_from(qty.max(1)).unwrap_or(u32::MAX);
    match self.items.iter_mut().find(|item| item.product_id == product_id) {
      Some(item) => {
        item.qty = clamped;
        true
      }
      None => false,
    }
  }

  pub fn clear(&mut self) {
    self.items.clear();
  }

  /// Replaces every line with `items` (normalized). Used for remote deliveries.
  pub fn replace(&mut self, items: Vec<CartItem>) {
    self.items = normalize_items(items);
  }

  pub fn count(&self) -> u64 {
    totals::item_count(&self.items)
  }

  pub fn subtotal(&self) -> i64 {
    totals::subtotal(&self.items)
  }

  pub fn totals(&self, rate: TaxRate) -> CartTotals {
    CartTotals::compute(&self.items, rate)
  }
}

impl From<Vec<CartItem>> for Cart {
  fn from(items: Vec<CartItem>) -> Self {
    Cart::from_items(items)
  }
}

/// Restores the cart invariants on items read from a remote document.
///
/// - lines with an empty `product_id` are dropped
/// - `qty` of 0 becomes 1
/// - a repeated `product_id` is folded into its first occurrence, summing quantities
pub fn normalize_items(items: Vec<CartItem>) -> Vec<CartItem> {
  let incoming = items.len();
  let mut out: Vec<CartItem> = Vec::with_capacity(incoming);
  for mut item in items {
    if item.product_id.trim().is_empty() {
      continue;
    }
    item.qty = item.qty.max(1);
    match out.iter_mut().find(|seen| seen.product_id == item.product_id) {
      Some(seen) => seen.qty = seen.qty.saturating_add(item.qty),
      None => out.push(item),
    }
  }
  if out.len() != incoming {
    event!(Level::DEBUG, incoming, kept = out.len(), "Normalized cart items.");
  }
  out
}
