// cart_sync/src/store/memory.rs

//! In-process [`DocumentStore`] with a broadcast change feed per document.

use crate::store::document::{merge_patch, DocumentKey, DocumentSnapshot, DocumentStore, DocumentWatch};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tracing::{event, instrument, Level};

const FEED_CAPACITY: usize = 64;

#[derive(Debug)]
struct Slot {
  document: DocumentSnapshot,
  feed: broadcast::Sender<DocumentSnapshot>,
}

impl Slot {
  fn empty() -> Self {
    let (feed, _) = broadcast::channel(FEED_CAPACITY);
    Slot { document: None, feed }
  }
}

/// Documents held in a map behind a mutex. Writes are applied and broadcast under the
/// same lock, so every watcher observes writes in the order they were applied.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
  slots: Mutex<HashMap<DocumentKey, Slot>>,
  writes: AtomicUsize,
}

impl MemoryDocumentStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of successful `merge_patch` calls so far.
  pub fn write_count(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  /// Current contents of a document, without going through the async trait.
  pub fn document(&self, key: &DocumentKey) -> DocumentSnapshot {
    self.slots.lock().get(key).and_then(|slot| slot.document.clone())
  }

  /// Replaces a document wholesale, notifying watchers. Stands in for another client (or
  /// an admin tool) writing the same document.
  pub fn put(&self, key: &DocumentKey, document: Value) {
    self.publish(key, Some(document));
  }

  /// Deletes a document, notifying watchers with `None`.
  pub fn delete(&self, key: &DocumentKey) {
    self.publish(key, None);
  }

  fn publish(&self, key: &DocumentKey, document: DocumentSnapshot) {
    let mut slots = self.slots.lock();
    let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
    slot.document = document;
    // No receivers is fine: nobody is watching yet.
    let _ = slot.feed.send(slot.document.clone());
  }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
  async fn get(&self, key: &DocumentKey) -> anyhow::Result<DocumentSnapshot> {
    Ok(self.document(key))
  }

  #[instrument(name = "MemoryDocumentStore::merge_patch", skip(self, patch), fields(key = %key))]
  async fn merge_patch(&self, key: &DocumentKey, patch: Value) -> anyhow::Result<()> {
    let mut slots = self.slots.lock();
    let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
    let mut document = slot.document.take().unwrap_or(Value::Null);
    merge_patch(&mut document, &patch);
    slot.document = Some(document);
    let receivers = slot.feed.send(slot.document.clone()).unwrap_or(0);
    self.writes.fetch_add(1, Ordering::SeqCst);
    event!(Level::TRACE, receivers, "Document patched.");
    Ok(())
  }

  async fn watch(&self, key: &DocumentKey) -> anyhow::Result<DocumentWatch> {
    let mut slots = self.slots.lock();
    let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
    // Subscribe and read under one lock so no write falls between the initial snapshot
    // and the feed.
    let changes = slot.feed.subscribe();
    Ok(DocumentWatch::new(key.clone(), slot.document.clone(), changes))
  }
}
