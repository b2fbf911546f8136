// demos/storefront/src/services/catalog_mock.rs
use crate::errors::{AppError, Result as AppResult};
use cart_sync::Product;

/// Fixed in-memory product listing standing in for the storefront's catalog query.
#[derive(Debug, Clone)]
pub struct MockCatalog {
  products: Vec<Product>,
}

impl Default for MockCatalog {
  fn default() -> Self {
    Self {
      products: vec![
        Product::new("glenfiddich-12", "Glenfiddich 12 Year", 5499).with_image("/img/glenfiddich-12.png"),
        Product::new("hendricks-gin", "Hendrick's Gin", 3899).with_image("/img/hendricks.png"),
        Product::new("casamigos-blanco", "Casamigos Blanco", 4999).with_image("/img/casamigos.png"),
        Product::new("tonic-4pk", "Fever-Tree Tonic 4pk", 699),
        Product::new("lime-bag", "Fresh Limes (1 lb)", 249),
      ],
    }
  }
}

impl MockCatalog {
  pub fn products(&self) -> &[Product] {
    &self.products
  }

  pub fn find(&self, product_id: &str) -> AppResult<&Product> {
    self
      .products
      .iter()
      .find(|p| p.id == product_id)
      .ok_or_else(|| AppError::NotFound(format!("Product '{}'", product_id)))
  }
}

/// Formats minor units as `12.34 USD`.
pub fn format_amount(cents: i64, currency: &str) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let abs = cents.unsigned_abs();
  format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency)
}
