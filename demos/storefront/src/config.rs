// demos/storefront/src/config.rs

use crate::errors::{AppError, Result};
use cart_sync::{CartConfig, TaxRate};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub cart_debounce: Duration,
  pub tax_rate: TaxRate,
  /// Document collection holding one cart document per identity.
  pub cart_namespace: String,
  /// ISO currency code used when formatting amounts and placing orders.
  pub currency: String,
  /// Signs the demo in as this user instead of creating an anonymous identity.
  pub demo_user_id: Option<String>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. Unset and blank variables take defaults.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let debounce_ms = match get_env("CART_DEBOUNCE_MS") {
      Some(raw) => raw
        .parse::<u64>()
        .map_err(|e| AppError::Config(format!("Invalid CART_DEBOUNCE_MS '{}': {}", raw, e)))?,
      None => cart_sync::config::DEFAULT_DEBOUNCE.as_millis() as u64,
    };

    let tax_rate = match get_env("CART_TAX_BPS") {
      Some(raw) => {
        let bps = raw
          .parse::<u32>()
          .map_err(|e| AppError::Config(format!("Invalid CART_TAX_BPS '{}': {}", raw, e)))?;
        if bps > 10_000 {
          return Err(AppError::Config(format!("CART_TAX_BPS must be at most 10000, got {}", bps)));
        }
        TaxRate::from_basis_points(bps)
      }
      None => TaxRate::default(),
    };

    let cart_namespace = get_env("CART_NAMESPACE").unwrap_or_else(|| cart_sync::config::DEFAULT_NAMESPACE.to_string());
    if cart_namespace.contains('/') {
      return Err(AppError::Config(format!(
        "CART_NAMESPACE must be a single path segment, got '{}'",
        cart_namespace
      )));
    }

    let currency = get_env("STORE_CURRENCY").unwrap_or_else(|| "USD".to_string()).to_uppercase();
    let demo_user_id = get_env("DEMO_USER_ID");

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      cart_debounce: Duration::from_millis(debounce_ms),
      tax_rate,
      cart_namespace,
      currency,
      demo_user_id,
    })
  }

  pub fn cart_config(&self) -> CartConfig {
    CartConfig::default()
      .with_debounce(self.cart_debounce)
      .with_tax_rate(self.tax_rate)
      .with_namespace(self.cart_namespace.clone())
  }
}
