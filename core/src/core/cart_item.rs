// cart_sync/src/core/cart_item.rs

//! The persisted line-item shape and the catalog snapshot it is built from.

use serde::{Deserialize, Deserializer, Serialize};

/// A catalog record as supplied by the catalog service. Consumed read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub image: String,
  /// Price in minor currency units (cents).
  pub price: i64,
}

impl Product {
  pub fn new(id: impl Into<String>, name: impl Into<String>, price: i64) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      image: String::new(),
      price,
    }
  }

  pub fn with_image(mut self, image: impl Into<String>) -> Self {
    self.image = image.into();
    self
  }
}

/// One line of a cart.
///
/// `name`, `image` and `price` are copied from the catalog when the product is first added
/// and are never refreshed afterwards; checkout charges the price the shopper saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub product_id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub image: String,
  pub price: i64,
  /// Always >= 1 while the item is in a cart.
  #[serde(default = "one", deserialize_with = "qty_at_least_one")]
  pub qty: u32,
}

impl CartItem {
  /// Snapshots `product` into a new line with `qty` units (at least one).
  pub fn from_product(product: &Product, qty: u32) -> Self {
    Self {
      product_id: product.id.clone(),
      name: product.name.clone(),
      image: product.image.clone(),
      price: product.price,
      qty: qty.max(1),
    }
  }

  /// `price * qty`, in minor units.
  pub fn line_total(&self) -> i64 {
    self.price.saturating_mul(i64::from(self.qty))
  }
}

fn one() -> u32 {
  1
}

// Remote documents are written by other clients too; a zero, negative or fractional qty
// must not fail the whole decode.
fn qty_at_least_one<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = f64::deserialize(deserializer)?;
  if !raw.is_finite() || raw < 1.0 {
    return Ok(1);
  }
  Ok(raw.min(f64::from(u32::MAX)) as u32)
}
