// cart_sync/src/core/state.rs
use crate::core::cart::Cart;
use crate::core::cart_item::CartItem;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared handle to the in-memory cart, using parking_lot::RwLock.
///
/// Clones point at the same cart. This is the local source of truth that UI consumers read.
///
/// IMPORTANT: Lock guards obtained from this struct are blocking and MUST NOT
/// be held across `.await` suspension points in asynchronous code.
#[derive(Debug, Default)]
pub struct CartState(Arc<RwLock<Cart>>);

impl CartState {
  pub fn new(cart: Cart) -> Self {
    CartState(Arc::new(RwLock::new(cart)))
  }

  /// The returned guard MUST be dropped before any `.await` point.
  pub fn read(&self) -> RwLockReadGuard<'_, Cart> {
    self.0.read()
  }

  /// The returned guard MUST be dropped before any `.await` point.
  pub fn write(&self) -> RwLockWriteGuard<'_, Cart> {
    self.0.write()
  }

  pub fn try_read(&self) -> Option<RwLockReadGuard<'_, Cart>> {
    self.0.try_read()
  }

  // e.g. state.map_read(|cart| cart.items())
  pub fn map_read<F, U: ?Sized>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&Cart) -> &U,
  {
    RwLockReadGuard::map(self.read(), f)
  }

  /// Applies `f` under the write lock and returns its result along with a copy of the
  /// items as they stand afterwards, taken under the same lock.
  pub fn update<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> (R, Vec<CartItem>) {
    let mut guard = self.write();
    let out = f(&mut guard);
    (out, guard.items().to_vec())
  }

  /// Overwrites the whole cart with `items` (normalized). Last writer wins.
  pub fn replace(&self, items: Vec<CartItem>) {
    self.write().replace(items);
  }

  pub fn snapshot(&self) -> Vec<CartItem> {
    self.read().items().to_vec()
  }
}

impl Clone for CartState {
  fn clone(&self) -> Self {
    CartState(Arc::clone(&self.0))
  }
}
