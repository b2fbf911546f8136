// tests/adapter_tests.rs
mod common;

use cart_sync::{
  AnonymousIdentityProvider, CartAdapter, CartCallback, CartConfig, CartItem, CartSyncError, DocumentKey, DocumentStore,
  Identity, MemoryDocumentStore, RemoteCartAdapter, Session,
};
use common::*;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn signed_in_adapter(store: Arc<dyn DocumentStore>, user: &str) -> RemoteCartAdapter {
  let provider = Arc::new(AnonymousIdentityProvider::signed_in(Identity::new(user)));
  RemoteCartAdapter::new(store, Arc::new(Session::new(provider)), "users")
}

fn channel_callback() -> (CartCallback, mpsc::UnboundedReceiver<Vec<CartItem>>) {
  let (tx, rx) = mpsc::unbounded_channel();
  let callback: CartCallback = Arc::new(move |items| {
    let _ = tx.send(items);
  });
  (callback, rx)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Vec<CartItem>>) -> Vec<CartItem> {
  tokio::time::timeout(Duration::from_secs(1), rx.recv())
    .await
    .expect("no cart delivery within 1s")
    .expect("cart feed closed")
}

#[tokio::test]
async fn test_save_then_load_round_trips() {
  setup_tracing();
  let store = Arc::new(MemoryDocumentStore::new());
  let adapter = signed_in_adapter(store.clone(), "user-1");

  let items = vec![item(&whisky(), 2), item(&soda(), 1)];
  adapter.save_cart(&items).await.unwrap();
  assert_eq!(adapter.load_cart().await.unwrap(), items);
}

#[tokio::test]
async fn test_load_without_document_is_empty() {
  setup_tracing();
  let adapter = signed_in_adapter(Arc::new(MemoryDocumentStore::new()), "fresh");
  assert!(adapter.load_cart().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_is_a_merge_patch() {
  setup_tracing();
  let store = Arc::new(MemoryDocumentStore::new());
  let key = DocumentKey::new("users", "user-2");
  store.put(&key, json!({"email": "shopper@example.com", "ageVerified": true}));

  let adapter = signed_in_adapter(store.clone(), "user-2");
  adapter.save_cart(&[item(&gin(), 1)]).await.unwrap();

  let doc = store.document(&key).unwrap();
  assert_eq!(doc["email"], json!("shopper@example.com"));
  assert_eq!(doc["ageVerified"], json!(true));
  assert_eq!(doc["cart"]["items"][0]["productId"], json!("c"));
  assert!(doc["cart"]["updatedAt"].is_string());
}

#[tokio::test]
async fn test_saving_same_items_twice_stores_same_cart() {
  setup_tracing();
  let store = Arc::new(MemoryDocumentStore::new());
  let key = DocumentKey::new("users", "user-3");
  let adapter = signed_in_adapter(store.clone(), "user-3");
  let items = vec![item(&whisky(), 1)];

  adapter.save_cart(&items).await.unwrap();
  let first = store.document(&key).unwrap();
  adapter.save_cart(&items).await.unwrap();
  let second = store.document(&key).unwrap();

  assert_eq!(first["cart"]["items"], second["cart"]["items"]);
  assert_eq!(first.as_object().unwrap().keys().collect::<Vec<_>>(), second.as_object().unwrap().keys().collect::<Vec<_>>());
  assert_eq!(adapter.load_cart().await.unwrap(), items);
}

#[tokio::test]
async fn test_load_normalizes_foreign_items() {
  setup_tracing();
  let store = Arc::new(MemoryDocumentStore::new());
  store.put(
    &DocumentKey::new("users", "user-4"),
    json!({"cart": {"items": [
      {"productId": "a", "name": "Whisky", "price": 1599, "qty": 0},
      {"productId": "a", "name": "Whisky", "price": 1599, "qty": 2},
      {"productId": "", "name": "Broken", "price": 1, "qty": 1}
    ]}}),
  );
  let adapter = signed_in_adapter(store, "user-4");
  let items = adapter.load_cart().await.unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0].qty, 3);
}

#[tokio::test]
async fn test_undecodable_items_are_a_read_error() {
  setup_tracing();
  let store = Arc::new(MemoryDocumentStore::new());
  store.put(&DocumentKey::new("users", "user-5"), json!({"cart": {"items": {"not": "a list"}}}));
  let adapter = signed_in_adapter(store, "user-5");
  match adapter.load_cart().await {
    Err(CartSyncError::RemoteRead { key, .. }) => assert_eq!(key, "users/user-5"),
    other => panic!("Expected RemoteRead, got {:?}", other),
  }
}

#[tokio::test]
async fn test_store_failures_map_to_error_kinds() {
  setup_tracing();
  let store = Arc::new(FlakyStore::default());
  let adapter = signed_in_adapter(store.clone(), "user-6");

  store.fail_reads.store(true, Ordering::SeqCst);
  assert!(matches!(adapter.load_cart().await, Err(CartSyncError::RemoteRead { .. })));

  store.fail_writes.store(true, Ordering::SeqCst);
  assert!(matches!(adapter.save_cart(&[]).await, Err(CartSyncError::RemoteWrite { .. })));

  store.fail_watch.store(true, Ordering::SeqCst);
  let (callback, _rx) = channel_callback();
  assert!(matches!(
    adapter.subscribe_cart(callback).await,
    Err(CartSyncError::Subscription { .. })
  ));
}

#[tokio::test]
async fn test_identity_failure_propagates_from_every_operation() {
  setup_tracing();
  let session = Arc::new(Session::new(Arc::new(BrokenIdentityProvider)));
  let adapter = RemoteCartAdapter::new(Arc::new(MemoryDocumentStore::new()), session, "users");

  assert!(matches!(adapter.load_cart().await, Err(CartSyncError::IdentityResolution { .. })));
  assert!(matches!(adapter.save_cart(&[]).await, Err(CartSyncError::IdentityResolution { .. })));
  let (callback, _rx) = channel_callback();
  assert!(matches!(
    adapter.subscribe_cart(callback).await,
    Err(CartSyncError::IdentityResolution { .. })
  ));
}

#[tokio::test]
async fn test_anonymous_identity_created_once_for_concurrent_callers() {
  setup_tracing();
  let provider = Arc::new(SlowIdentityProvider::default());
  let session = Arc::new(Session::new(provider.clone()));
  let store = Arc::new(MemoryDocumentStore::new());
  let adapter = Arc::new(RemoteCartAdapter::new(store.clone(), session.clone(), "users"));

  let (a, b, c) = tokio::join!(
    adapter.load_cart(),
    adapter.save_cart(&[]),
    session.ensure(),
  );
  a.unwrap();
  b.unwrap();
  let identity = c.unwrap();

  assert_eq!(provider.sign_ins.load(Ordering::SeqCst), 1);
  assert!(store.document(&DocumentKey::new("users", identity.as_str())).is_some());
}

#[tokio::test]
async fn test_subscription_delivers_current_state_and_own_echo() {
  setup_tracing();
  let store = Arc::new(MemoryDocumentStore::new());
  let adapter = signed_in_adapter(store.clone(), "user-7");
  adapter.save_cart(&[item(&soda(), 1)]).await.unwrap();

  let (callback, mut rx) = channel_callback();
  let _subscription = adapter.subscribe_cart(callback).await.unwrap();
  assert_eq!(next(&mut rx).await, vec![item(&soda(), 1)]);

  adapter.save_cart(&[item(&soda(), 4)]).await.unwrap();
  assert_eq!(next(&mut rx).await, vec![item(&soda(), 4)]);

  // Another writer clears the document entirely.
  store.delete(&DocumentKey::new("users", "user-7"));
  assert!(next(&mut rx).await.is_empty());
}

#[tokio::test]
async fn test_cancelled_subscription_stops_delivering() {
  setup_tracing();
  let store = Arc::new(MemoryDocumentStore::new());
  let adapter = signed_in_adapter(store.clone(), "user-8");

  let (callback, mut rx) = channel_callback();
  let mut subscription = adapter.subscribe_cart(callback).await.unwrap();
  assert!(next(&mut rx).await.is_empty()); // initial: no document yet
  assert_eq!(subscription.key(), "users/user-8");

  subscription.cancel();
  assert!(!subscription.is_active());
  tokio::task::yield_now().await;

  adapter.save_cart(&[item(&whisky(), 1)]).await.unwrap();
  // The forwarding task was aborted, so its sender is gone and nothing arrives.
  let outcome = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
  assert!(matches!(outcome, Ok(None) | Err(_)), "unexpected delivery: {:?}", outcome);
}

#[tokio::test]
async fn test_identities_do_not_share_carts() {
  setup_tracing();
  let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
  let alice = signed_in_adapter(store.clone(), "alice");
  let bob = signed_in_adapter(store.clone(), "bob");

  alice.save_cart(&[item(&gin(), 2)]).await.unwrap();
  assert!(bob.load_cart().await.unwrap().is_empty());
  assert_eq!(alice.load_cart().await.unwrap(), vec![item(&gin(), 2)]);
}

#[tokio::test]
async fn test_adapter_from_config_writes_under_configured_namespace() {
  setup_tracing();
  let store = Arc::new(MemoryDocumentStore::new());
  let provider = Arc::new(AnonymousIdentityProvider::signed_in(Identity::new("user-9")));
  let config = CartConfig::default().with_namespace("shoppers");
  let adapter = RemoteCartAdapter::from_config(store.clone(), Arc::new(Session::new(provider)), &config);
  assert_eq!(adapter.namespace(), "shoppers");

  adapter.save_cart(&[item(&soda(), 2)]).await.unwrap();
  assert!(store.document(&DocumentKey::new("shoppers", "user-9")).is_some());
  assert!(store.document(&DocumentKey::new("users", "user-9")).is_none());
}
