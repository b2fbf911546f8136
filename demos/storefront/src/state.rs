// demos/storefront/src/state.rs
use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::services::{catalog_mock::MockCatalog, order_mock::MockOrderService};
use cart_sync::{
  AnonymousIdentityProvider, CartController, DocumentKey, Identity, IdentityProvider, MemoryDocumentStore,
  RemoteCartAdapter, Session,
};
use std::sync::Arc;

/// Everything a storefront page needs, shared by every open tab of one browser session.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<MemoryDocumentStore>,
  pub session: Arc<Session>,
  pub catalog: Arc<MockCatalog>,
  pub orders: Arc<MockOrderService>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  pub fn new(config: Arc<AppConfig>) -> Self {
    let provider: Arc<dyn IdentityProvider> = match &config.demo_user_id {
      Some(user_id) => Arc::new(AnonymousIdentityProvider::signed_in(Identity::new(user_id.clone()))),
      None => Arc::new(AnonymousIdentityProvider::new()),
    };
    Self {
      store: Arc::new(MemoryDocumentStore::new()),
      session: Arc::new(Session::new(provider)),
      catalog: Arc::new(MockCatalog::default()),
      orders: Arc::new(MockOrderService::new(config.currency.clone())),
      config,
    }
  }

  /// Mounts a fresh cart controller, as a newly opened page would.
  pub fn open_tab(&self) -> AppResult<CartController> {
    let cart_config = self.config.cart_config();
    let adapter = RemoteCartAdapter::from_config(self.store.clone(), self.session.clone(), &cart_config);
    Ok(CartController::mount(Arc::new(adapter), cart_config)?)
  }

  /// Key of the signed-in user's document, once the session has resolved.
  pub fn cart_document_key(&self) -> Option<DocumentKey> {
    self
      .session
      .resolved()
      .map(|identity| DocumentKey::new(self.config.cart_namespace.clone(), identity.as_str()))
  }
}
