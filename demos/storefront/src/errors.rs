// demos/storefront/src/errors.rs

use cart_sync::CartSyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Cart Sync Error: {source}")]
  Cart {
    #[from]
    source: CartSyncError,
  },

  #[error("Internal Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<CartSyncError>() {
      Ok(source) => AppError::Cart { source },
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl AppError {
  /// Process exit code for the demo binary.
  pub fn exit_code(&self) -> i32 {
    match self {
      AppError::Config(_) => 2,
      AppError::NotFound(_) => 3,
      AppError::Cart { .. } | AppError::Internal(_) => 1,
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
