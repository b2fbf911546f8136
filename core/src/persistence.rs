// cart_sync/src/persistence.rs

//! Maps the cart to and from the `cart.items` field of a per-identity remote document.
//!
//! Persisted shape:
//!
//! ```text
//! users/{identity} = {
//!   ...unrelated fields...,
//!   "cart": { "items": [ {productId, name, image, price, qty}, ... ], "updatedAt": "<RFC 3339>" }
//! }
//! ```

use crate::config::CartConfig;
use crate::core::cart::normalize_items;
use crate::core::cart_item::CartItem;
use crate::error::{CartSyncError, SyncResult};
use crate::identity::Session;
use crate::store::document::{DocumentKey, DocumentSnapshot, DocumentStore};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Invoked with the full item list on every remote change.
pub type CartCallback = Arc<dyn Fn(Vec<CartItem>) + Send + Sync>;

/// Load / save / subscribe for one user's cart. The controller only talks to this trait.
#[async_trait]
pub trait CartAdapter: Send + Sync {
  /// The stored items, or an empty list when there is no stored cart.
  async fn load_cart(&self) -> SyncResult<Vec<CartItem>>;

  /// Writes `items` without touching other fields of the document.
  async fn save_cart(&self, items: &[CartItem]) -> SyncResult<()>;

  /// Calls `callback` with the stored items once before returning and then after every
  /// change to the document, the caller's own writes included. The callback is never
  /// invoked after the returned subscription is cancelled or dropped.
  async fn subscribe_cart(&self, callback: CartCallback) -> SyncResult<CartSubscription>;
}

/// Handle to a live cart subscription. Cancels on drop.
pub struct CartSubscription {
  key: String,
  cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl std::fmt::Debug for CartSubscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CartSubscription")
      .field("key", &self.key)
      .field("active", &self.is_active())
      .finish()
  }
}

impl CartSubscription {
  /// A subscription whose cancellation runs `cancel`.
  pub fn new(key: impl Into<String>, cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
    Self {
      key: key.into(),
      cancel: Some(Box::new(cancel)),
    }
  }

  /// A subscription backed by a forwarding task; cancelling aborts the task.
  pub fn from_task(key: impl Into<String>, task: tokio::task::JoinHandle<()>) -> Self {
    Self::new(key, move || task.abort())
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn is_active(&self) -> bool {
    self.cancel.is_some()
  }

  /// Stops delivery. Calling it again is a no-op.
  pub fn cancel(&mut self) {
    if let Some(cancel) = self.cancel.take() {
      cancel();
      event!(Level::DEBUG, key = %self.key, "Cart subscription cancelled.");
    }
  }
}

impl Drop for CartSubscription {
  fn drop(&mut self) {
    self.cancel();
  }
}

/// [`CartAdapter`] over a [`DocumentStore`], keyed by the [`Session`] identity.
pub struct RemoteCartAdapter {
  store: Arc<dyn DocumentStore>,
  session: Arc<Session>,
  namespace: String,
}

impl std::fmt::Debug for RemoteCartAdapter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RemoteCartAdapter")
      .field("session", &self.session)
      .field("namespace", &self.namespace)
      .finish_non_exhaustive()
  }
}

impl RemoteCartAdapter {
  pub fn new(store: Arc<dyn DocumentStore>, session: Arc<Session>, namespace: impl Into<String>) -> Self {
    Self {
      store,
      session,
      namespace: namespace.into(),
    }
  }

  /// An adapter writing under `config.namespace`.
  pub fn from_config(store: Arc<dyn DocumentStore>, session: Arc<Session>, config: &CartConfig) -> Self {
    Self::new(store, session, config.namespace.clone())
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  pub fn session(&self) -> &Arc<Session> {
    &self.session
  }

  async fn document_key(&self) -> SyncResult<DocumentKey> {
    let identity = self.session.ensure().await?;
    Ok(DocumentKey::new(self.namespace.clone(), identity.as_str()))
  }
}

/// Reads `cart.items` out of a document. An absent document, cart or item list is empty.
pub fn items_from_document(document: &DocumentSnapshot) -> Result<Vec<CartItem>, serde_json::Error> {
  match document.as_ref().and_then(|doc| doc.pointer("/cart/items")) {
    None | Some(Value::Null) => Ok(Vec::new()),
    Some(items) => serde_json::from_value::<Vec<CartItem>>(items.clone()).map(normalize_items),
  }
}

/// The merge patch `save_cart` writes.
pub fn cart_patch(items: &[CartItem]) -> SyncResult<Value> {
  let items = serde_json::to_value(items)
    .map_err(|e| CartSyncError::Internal(format!("Cart items failed to serialize: {}", e)))?;
  Ok(json!({
    "cart": {
      "items": items,
      "updatedAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }
  }))
}

fn deliver(key: &DocumentKey, snapshot: &DocumentSnapshot, callback: &CartCallback) {
  match items_from_document(snapshot) {
    Ok(items) => callback(items),
    Err(e) => {
      event!(Level::WARN, key = %key, error = %e, "Ignoring undecodable cart snapshot.");
    }
  }
}

#[async_trait]
impl CartAdapter for RemoteCartAdapter {
  #[instrument(name = "RemoteCartAdapter::load_cart", skip(self), err(Display))]
  async fn load_cart(&self) -> SyncResult<Vec<CartItem>> {
    let key = self.document_key().await?;
    let document = self.store.get(&key).await.map_err(|source| CartSyncError::RemoteRead {
      key: key.to_string(),
      source,
    })?;
    let items = items_from_document(&document).map_err(|e| CartSyncError::RemoteRead {
      key: key.to_string(),
      source: e.into(),
    })?;
    event!(Level::DEBUG, key = %key, lines = items.len(), "Cart loaded.");
    Ok(items)
  }

  #[instrument(name = "RemoteCartAdapter::save_cart", skip_all, fields(lines = items.len()), err(Display))]
  async fn save_cart(&self, items: &[CartItem]) -> SyncResult<()> {
    let key = self.document_key().await?;
    let patch = cart_patch(items)?;
    self
      .store
      .merge_patch(&key, patch)
      .await
      .map_err(|source| CartSyncError::RemoteWrite {
        key: key.to_string(),
        source,
      })?;
    event!(Level::DEBUG, key = %key, "Cart saved.");
    Ok(())
  }

  #[instrument(name = "RemoteCartAdapter::subscribe_cart", skip_all, err(Display))]
  async fn subscribe_cart(&self, callback: CartCallback) -> SyncResult<CartSubscription> {
    let key = self.document_key().await?;
    let mut watch = self.store.watch(&key).await.map_err(|source| CartSyncError::Subscription {
      key: key.to_string(),
      source,
    })?;

    // The current document is delivered before returning, so a caller that goes on to
    // mutate its cart cannot have those edits overwritten by a late initial snapshot.
    if let Some(initial) = watch.changed().await {
      deliver(&key, &initial, &callback);
    }

    let task_key = key.clone();
    let task = tokio::spawn(async move {
      while let Some(snapshot) = watch.changed().await {
        deliver(&task_key, &snapshot, &callback);
      }
      event!(Level::DEBUG, key = %task_key, "Cart change feed ended.");
    });

    event!(Level::DEBUG, key = %key, "Cart subscription attached.");
    Ok(CartSubscription::from_task(key.to_string(), task))
  }
}
