// cart_sync/src/store/document.rs

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{event, Level};

/// The full document as it stands after a change. `None` means the document does not exist.
pub type DocumentSnapshot = Option<Value>;

/// Address of a per-identity document: `{namespace}/{id}`, e.g. `users/anon-1f3c...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
  namespace: String,
  id: String,
}

impl DocumentKey {
  pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
    Self {
      namespace: namespace.into(),
      id: id.into(),
    }
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  pub fn id(&self) -> &str {
    &self.id
  }
}

impl std::fmt::Display for DocumentKey {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}/{}", self.namespace, self.id)
  }
}

/// A remote store of JSON documents addressed by [`DocumentKey`].
///
/// Implementations wrap a hosted database client constructed once at startup and handed
/// to the adapter; nothing in this crate keeps a global client.
#[async_trait]
pub trait DocumentStore: Send + Sync {
  /// Fetches a document. A missing document is `Ok(None)`, not an error.
  async fn get(&self, key: &DocumentKey) -> anyhow::Result<DocumentSnapshot>;

  /// Applies `patch` to the document as an RFC 7396 merge patch, creating the document if
  /// needed. Fields the patch does not mention are left untouched.
  async fn merge_patch(&self, key: &DocumentKey, patch: Value) -> anyhow::Result<()>;

  /// Starts watching a document. The watch yields the current document first and then
  /// the full document after every change, including changes made through this client.
  async fn watch(&self, key: &DocumentKey) -> anyhow::Result<DocumentWatch>;
}

/// A live feed of document snapshots.
#[derive(Debug)]
pub struct DocumentWatch {
  key: DocumentKey,
  initial: Option<DocumentSnapshot>,
  changes: broadcast::Receiver<DocumentSnapshot>,
}

impl DocumentWatch {
  pub fn new(key: DocumentKey, initial: DocumentSnapshot, changes: broadcast::Receiver<DocumentSnapshot>) -> Self {
    Self {
      key,
      initial: Some(initial),
      changes,
    }
  }

  pub fn key(&self) -> &DocumentKey {
    &self.key
  }

  /// Waits for the next snapshot. Returns `None` once the store side has gone away.
  ///
  /// If this watcher fell behind, intermediate snapshots are skipped: only the newest
  /// state matters to a last-writer-wins consumer.
  pub async fn changed(&mut self) -> Option<DocumentSnapshot> {
    if let Some(initial) = self.initial.take() {
      return Some(initial);
    }
    loop {
      match self.changes.recv().await {
        Ok(snapshot) => return Some(snapshot),
        Err(RecvError::Lagged(skipped)) => {
          event!(Level::DEBUG, key = %self.key, skipped, "Watcher lagged; skipping to newer snapshot.");
        }
        Err(RecvError::Closed) => return None,
      }
    }
  }
}

/// Applies `patch` to `target` following RFC 7396 JSON Merge Patch.
///
/// Objects merge key by key, `null` removes a key, and any other value (arrays included)
/// replaces what was there.
pub fn merge_patch(target: &mut Value, patch: &Value) {
  let Value::Object(patch_map) = patch else {
    *target = patch.clone();
    return;
  };
  if !target.is_object() {
    *target = Value::Object(Map::new());
  }
  if let Value::Object(target_map) = target {
    for (field, patch_value) in patch_map {
      if patch_value.is_null() {
        target_map.remove(field);
      } else {
        merge_patch(target_map.entry(field.clone()).or_insert(Value::Null), patch_value);
      }
    }
  }
}
