// cart_sync/src/config.rs

use crate::core::totals::TaxRate;
use std::time::Duration;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(350);
pub const DEFAULT_NAMESPACE: &str = "users";

/// Knobs for a [`CartController`](crate::CartController) and its adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
  /// Quiet period before a mutation is written remotely. Each new mutation restarts it.
  pub debounce: Duration,
  pub tax_rate: TaxRate,
  /// Collection holding the per-identity documents (`{namespace}/{identity}`).
  pub namespace: String,
  /// Whether a save still waiting out its quiet period at unmount is allowed to run.
  /// When false, unmount discards it.
  pub save_on_unmount: bool,
}

impl Default for CartConfig {
  fn default() -> Self {
    Self {
      debounce: DEFAULT_DEBOUNCE,
      tax_rate: TaxRate::default(),
      namespace: DEFAULT_NAMESPACE.to_string(),
      save_on_unmount: true,
    }
  }
}

impl CartConfig {
  pub fn with_debounce(mut self, debounce: Duration) -> Self {
    self.debounce = debounce;
    self
  }

  pub fn with_tax_rate(mut self, tax_rate: TaxRate) -> Self {
    self.tax_rate = tax_rate;
    self
  }

  pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
    self.namespace = namespace.into();
    self
  }

  pub fn with_save_on_unmount(mut self, save_on_unmount: bool) -> Self {
    self.save_on_unmount = save_on_unmount;
    self
  }
}
