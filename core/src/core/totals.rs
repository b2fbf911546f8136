// cart_sync/src/core/totals.rs

//! Values derived from cart items. None of these are ever stored; they are recomputed
//! from the items on demand.

use crate::core::cart_item::CartItem;
use serde::{Deserialize, Serialize};

/// A tax rate in basis points (1/100 of a percent). `TaxRate(500)` is 5%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
  pub const ZERO: TaxRate = TaxRate(0);

  pub const fn from_basis_points(bps: u32) -> Self {
    TaxRate(bps)
  }

  pub const fn from_percent(percent: u32) -> Self {
    TaxRate(percent.saturating_mul(100))
  }

  pub const fn basis_points(self) -> u32 {
    self.0
  }

  /// Tax owed on `subtotal`, rounded half away from zero to the nearest minor unit.
  pub fn tax_on(self, subtotal: i64) -> i64 {
    let scaled = i128::from(subtotal) * i128::from(self.0);
    let half = 5_000_i128;
    let rounded = if scaled >= 0 {
      (scaled + half) / 10_000
    } else {
      (scaled - half) / 10_000
    };
    i64::try_from(rounded).unwrap_or(if rounded > 0 { i64::MAX } else { i64::MIN })
  }
}

impl Default for TaxRate {
  fn default() -> Self {
    TaxRate::from_percent(5)
  }
}

impl std::fmt::Display for TaxRate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
  }
}

/// Badge count and money figures for a cart, all in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
  /// Sum of `qty` over all items.
  pub count: u64,
  /// Sum of `price * qty`.
  pub subtotal: i64,
  pub tax: i64,
  /// `subtotal + tax`.
  pub total: i64,
}

impl CartTotals {
  pub fn compute(items: &[CartItem], rate: TaxRate) -> Self {
    let count = item_count(items);
    let subtotal = subtotal(items);
    let tax = rate.tax_on(subtotal);
    CartTotals {
      count,
      subtotal,
      tax,
      total: subtotal.saturating_add(tax),
    }
  }
}

pub fn item_count(items: &[CartItem]) -> u64 {
  items.iter().map(|item| u64::from(item.qty)).sum()
}

pub fn subtotal(items: &[CartItem]) -> i64 {
  items.iter().fold(0_i64, |acc, item| acc.saturating_add(item.line_total()))
}
