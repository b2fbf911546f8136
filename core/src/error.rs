// cart_sync/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartSyncError {
  #[error("Could not establish a session identity. Source: {source}")]
  IdentityResolution {
    #[source]
    source: AnyhowError,
  },

  #[error("Reading cart document '{key}' failed. Source: {source}")]
  RemoteRead {
    key: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Writing cart document '{key}' failed. Source: {source}")]
  RemoteWrite {
    key: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Subscribing to cart document '{key}' failed. Source: {source}")]
  Subscription {
    key: String,
    #[source]
    source: AnyhowError,
  },

  #[error("Cannot place an order for an empty cart")]
  EmptyCart,

  #[error("Order placement failed. Source: {source}")]
  OrderPlacement {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error: {message}")]
  Configuration { message: String },

  #[error("Internal cart sync error: {0}")]
  Internal(String),
}

impl From<AnyhowError> for CartSyncError {
  fn from(err: AnyhowError) -> Self {
    // An anyhow::Error that already carries one of ours keeps its message; everything
    // else is an opaque external failure.
    match err.downcast::<CartSyncError>() {
      Ok(inner) => inner,
      Err(other) => CartSyncError::Internal(format!("{:#}", other)),
    }
  }
}

impl CartSyncError {
  /// The document key involved, for errors raised by a remote operation.
  pub fn key(&self) -> Option<&str> {
    match self {
      CartSyncError::RemoteRead { key, .. }
      | CartSyncError::RemoteWrite { key, .. }
      | CartSyncError::Subscription { key, .. } => Some(key),
      _ => None,
    }
  }
}

pub type SyncResult<T, E = CartSyncError> = std::result::Result<T, E>;
