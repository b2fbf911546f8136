// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset of these helpers

use async_trait::async_trait;
use cart_sync::store::DocumentSnapshot;
use cart_sync::{
  AnonymousIdentityProvider, CartAdapter, CartCallback, CartItem, CartSubscription, CartSyncError, DocumentKey,
  DocumentStore, DocumentWatch, Identity, IdentityProvider, MemoryDocumentStore, OrderPlacement, OrderReceipt,
  OrderRequest, Product, RemoteCartAdapter, Session, SyncResult,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

// --- Catalog fixtures ---
pub fn whisky() -> Product {
  Product::new("a", "Whisky", 1599).with_image("/img/whisky.png")
}

pub fn soda() -> Product {
  Product::new("b", "Soda", 500)
}

pub fn gin() -> Product {
  Product::new("c", "Gin", 2250)
}

pub fn item(product: &Product, qty: u32) -> CartItem {
  CartItem::from_product(product, qty)
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Lets spawned tasks (init, debounced saves, forwarding) run to their next await point.
pub async fn settle() {
  for _ in 0..10 {
    tokio::task::yield_now().await;
  }
}

// --- Scriptable CartAdapter ---

/// In-memory stand-in for the persistence adapter. Records every save, lets a test push
/// remote changes through the subscription callback, and can be told to fail.
#[derive(Default)]
pub struct ScriptedAdapter {
  pub remote: Mutex<Vec<CartItem>>,
  pub saves: Mutex<Vec<Vec<CartItem>>>,
  pub callback: Mutex<Option<CartCallback>>,
  pub subscription_active: Arc<AtomicBool>,
  pub cancellations: Arc<AtomicUsize>,
  pub fail_load: AtomicBool,
  pub fail_save: AtomicBool,
  pub fail_subscribe: AtomicBool,
  pub subscribe_delay: Mutex<Option<Duration>>,
  pub echo_saves: AtomicBool,
}

impl ScriptedAdapter {
  pub fn with_remote(items: Vec<CartItem>) -> Self {
    let adapter = Self::default();
    *adapter.remote.lock() = items;
    adapter
  }

  pub fn save_count(&self) -> usize {
    self.saves.lock().len()
  }

  pub fn last_save(&self) -> Option<Vec<CartItem>> {
    self.saves.lock().last().cloned()
  }

  /// Delivers `items` as a remote change, honouring cancellation like a real adapter.
  pub fn emit(&self, items: Vec<CartItem>) -> bool {
    if !self.subscription_active.load(Ordering::SeqCst) {
      return false;
    }
    self.emit_unchecked(items)
  }

  /// Delivers `items` even if the subscription was cancelled.
  pub fn emit_unchecked(&self, items: Vec<CartItem>) -> bool {
    let callback = self.callback.lock().clone();
    match callback {
      Some(callback) => {
        callback(items);
        true
      }
      None => false,
    }
  }
}

#[async_trait]
impl CartAdapter for ScriptedAdapter {
  async fn load_cart(&self) -> SyncResult<Vec<CartItem>> {
    if self.fail_load.load(Ordering::SeqCst) {
      return Err(CartSyncError::RemoteRead {
        key: "users/test".to_string(),
        source: anyhow::anyhow!("scripted load failure"),
      });
    }
    Ok(self.remote.lock().clone())
  }

  async fn save_cart(&self, items: &[CartItem]) -> SyncResult<()> {
    if self.fail_save.load(Ordering::SeqCst) {
      return Err(CartSyncError::RemoteWrite {
        key: "users/test".to_string(),
        source: anyhow::anyhow!("scripted save failure"),
      });
    }
    self.saves.lock().push(items.to_vec());
    *self.remote.lock() = items.to_vec();
    if self.echo_saves.load(Ordering::SeqCst) {
      self.emit(items.to_vec());
    }
    Ok(())
  }

  async fn subscribe_cart(&self, callback: CartCallback) -> SyncResult<CartSubscription> {
    let delay = *self.subscribe_delay.lock();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    if self.fail_subscribe.load(Ordering::SeqCst) {
      return Err(CartSyncError::Subscription {
        key: "users/test".to_string(),
        source: anyhow::anyhow!("scripted subscribe failure"),
      });
    }
    *self.callback.lock() = Some(callback);
    self.subscription_active.store(true, Ordering::SeqCst);
    let active = Arc::clone(&self.subscription_active);
    let cancellations = Arc::clone(&self.cancellations);
    Ok(CartSubscription::new("users/test", move || {
      active.store(false, Ordering::SeqCst);
      cancellations.fetch_add(1, Ordering::SeqCst);
    }))
  }
}

// --- Document store that can be made to fail ---

#[derive(Default)]
pub struct FlakyStore {
  pub inner: MemoryDocumentStore,
  pub fail_reads: AtomicBool,
  pub fail_writes: AtomicBool,
  pub fail_watch: AtomicBool,
}

#[async_trait]
impl DocumentStore for FlakyStore {
  async fn get(&self, key: &DocumentKey) -> anyhow::Result<DocumentSnapshot> {
    if self.fail_reads.load(Ordering::SeqCst) {
      anyhow::bail!("store unreachable");
    }
    self.inner.get(key).await
  }

  async fn merge_patch(&self, key: &DocumentKey, patch: Value) -> anyhow::Result<()> {
    if self.fail_writes.load(Ordering::SeqCst) {
      anyhow::bail!("permission denied");
    }
    self.inner.merge_patch(key, patch).await
  }

  async fn watch(&self, key: &DocumentKey) -> anyhow::Result<DocumentWatch> {
    if self.fail_watch.load(Ordering::SeqCst) {
      anyhow::bail!("listener rejected");
    }
    self.inner.watch(key).await
  }
}

// --- Document store with write latency ---

/// Delays each `merge_patch` before applying it: the first calls take the scripted
/// delays in order, later ones take `default_delay`.
pub struct LatencyStore {
  pub inner: MemoryDocumentStore,
  pub delays: Mutex<VecDeque<Duration>>,
  pub default_delay: Duration,
}

impl LatencyStore {
  pub fn new(delays: Vec<Duration>, default_delay: Duration) -> Self {
    Self {
      inner: MemoryDocumentStore::new(),
      delays: Mutex::new(delays.into()),
      default_delay,
    }
  }
}

#[async_trait]
impl DocumentStore for LatencyStore {
  async fn get(&self, key: &DocumentKey) -> anyhow::Result<DocumentSnapshot> {
    self.inner.get(key).await
  }

  async fn merge_patch(&self, key: &DocumentKey, patch: Value) -> anyhow::Result<()> {
    let delay = self.delays.lock().pop_front().unwrap_or(self.default_delay);
    tokio::time::sleep(delay).await;
    self.inner.merge_patch(key, patch).await
  }

  async fn watch(&self, key: &DocumentKey) -> anyhow::Result<DocumentWatch> {
    self.inner.watch(key).await
  }
}

/// A real adapter signed in as `user`, writing under the default namespace.
pub fn remote_adapter(store: Arc<dyn DocumentStore>, user: &str) -> Arc<RemoteCartAdapter> {
  let provider = Arc::new(AnonymousIdentityProvider::signed_in(Identity::new(user)));
  Arc::new(RemoteCartAdapter::new(store, Arc::new(Session::new(provider)), "users"))
}

// --- Identity providers ---

/// Counts sign-ins and takes a while to complete each one.
#[derive(Default)]
pub struct SlowIdentityProvider {
  pub sign_ins: AtomicUsize,
}

#[async_trait]
impl IdentityProvider for SlowIdentityProvider {
  async fn current(&self) -> anyhow::Result<Option<Identity>> {
    Ok(None)
  }

  async fn sign_in_anonymously(&self) -> anyhow::Result<Identity> {
    tokio::time::sleep(Duration::from_millis(20)).await;
    let n = self.sign_ins.fetch_add(1, Ordering::SeqCst);
    Ok(Identity::new(format!("anon-slow-{}", n)))
  }
}

pub struct BrokenIdentityProvider;

#[async_trait]
impl IdentityProvider for BrokenIdentityProvider {
  async fn current(&self) -> anyhow::Result<Option<Identity>> {
    Ok(None)
  }

  async fn sign_in_anonymously(&self) -> anyhow::Result<Identity> {
    anyhow::bail!("anonymous sign-in disabled")
  }
}

// --- Order service ---

#[derive(Default)]
pub struct RecordingOrders {
  pub requests: Mutex<Vec<OrderRequest>>,
  pub fail: AtomicBool,
}

#[async_trait]
impl OrderPlacement for RecordingOrders {
  async fn place_order(&self, request: OrderRequest) -> anyhow::Result<OrderReceipt> {
    if self.fail.load(Ordering::SeqCst) {
      anyhow::bail!("card declined");
    }
    let total = request.totals.total;
    let mut requests = self.requests.lock();
    requests.push(request);
    Ok(OrderReceipt {
      order_id: format!("order-{}", requests.len()),
      total,
    })
  }
}
