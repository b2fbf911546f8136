// cart_sync/src/controller.rs

//! The cart controller: owns the in-memory cart, applies UI mutations to it, and keeps it
//! in step with the remote copy.
//!
//! Flow: mutation -> local cart updated synchronously -> debounced save -> the store's
//! change feed echoes the write -> the echoed items replace the local cart. Whatever is
//! applied last wins, local or remote; concurrent edits from two tabs are not merged.
//!
//! Remote failures never reach callers. A failed load leaves the local cart as it is, a
//! failed save is logged and retried implicitly by the next mutation's save.

use crate::config::CartConfig;
use crate::core::cart_item::{CartItem, Product};
use crate::core::state::CartState;
use crate::core::totals::CartTotals;
use crate::debounce::Debouncer;
use crate::error::{CartSyncError, SyncResult};
use crate::persistence::{CartAdapter, CartCallback, CartSubscription};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{event, instrument, Level};

/// Debounce key for the one resource this controller writes.
const CART_SAVE: &str = "cart";

/// Where a controller is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
  /// Initial load / subscribe still in progress. The cart is usable meanwhile.
  Loading,
  /// Initialization finished (successfully or not) and the controller is mounted.
  Live,
  /// Unmounted. Mutations only change local state from here on.
  Closed,
}

impl std::fmt::Display for ControllerPhase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = match self {
      ControllerPhase::Loading => "loading",
      ControllerPhase::Live => "live",
      ControllerPhase::Closed => "closed",
    };
    f.write_str(label)
  }
}

struct Inner {
  state: CartState,
  adapter: Arc<dyn CartAdapter>,
  config: CartConfig,
  saves: Debouncer<&'static str>,
  /// Held across each remote write so saves land in the order they were scheduled.
  save_order: Arc<AsyncMutex<()>>,
  subscription: Mutex<Option<CartSubscription>>,
  closed: AtomicBool,
  phase: watch::Sender<ControllerPhase>,
}

/// Shared handle to a mounted cart. Clones refer to the same controller.
///
/// The controller is torn down by [`CartController::unmount`] or when the last clone is
/// dropped.
#[derive(Clone)]
pub struct CartController {
  inner: Arc<Inner>,
}

impl std::fmt::Debug for CartController {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CartController")
      .field("phase", &self.phase())
      .field("lines", &self.inner.state.read().len())
      .field("config", &self.inner.config)
      .finish_non_exhaustive()
  }
}

impl CartController {
  /// Mounts a controller with an empty cart and starts loading and subscribing in the
  /// background. Returns without waiting for any remote call.
  ///
  /// Must be called from within a Tokio runtime. Mutations may afterwards be issued from
  /// any thread.
  pub fn mount(adapter: Arc<dyn CartAdapter>, config: CartConfig) -> SyncResult<Self> {
    let runtime = Handle::try_current().map_err(|e| CartSyncError::Configuration {
      message: format!("CartController::mount needs a Tokio runtime: {}", e),
    })?;
    let (phase, _) = watch::channel(ControllerPhase::Loading);
    let inner = Arc::new(Inner {
      state: CartState::default(),
      saves: Debouncer::new(config.debounce, runtime.clone()),
      save_order: Arc::new(AsyncMutex::new(())),
      adapter,
      config,
      subscription: Mutex::new(None),
      closed: AtomicBool::new(false),
      phase,
    });

    runtime.spawn(initialize(Arc::downgrade(&inner)));
    event!(Level::DEBUG, "Cart controller mounted.");
    Ok(CartController { inner })
  }

  // --- Mutations ---

  /// Adds `qty` units (at least one) of `product`, snapshotting its name, image and price
  /// if it is not in the cart yet.
  pub fn add(&self, product: &Product, qty: u32) {
    let ((), items) = self.inner.state.update(|cart| cart.add(product, qty));
    event!(Level::DEBUG, product_id = %product.id, qty, "Cart add.");
    self.inner.schedule_save(items);
  }

  /// Removes the line for `product_id`. No-op (and no save) if it is not in the cart.
  pub fn remove(&self, product_id: &str) -> bool {
    let (removed, items) = self.inner.state.update(|cart| cart.remove(product_id));
    if removed {
      event!(Level::DEBUG, product_id, "Cart remove.");
      self.inner.schedule_save(items);
    }
    removed
  }

  /// Sets the quantity of a line to `max(1, qty)`. No-op (and no save) if the line is
  /// not in the cart.
  pub fn set_qty(&self, product_id: &str, qty: i64) -> bool {
    let (found, items) = self.inner.state.update(|cart| cart.set_qty(product_id, qty));
    if found {
      event!(Level::DEBUG, product_id, qty, "Cart set_qty.");
      self.inner.schedule_save(items);
    }
    found
  }

  /// Empties the cart, e.g. after an order has been placed.
  pub fn clear(&self) {
    let ((), items) = self.inner.state.update(|cart| cart.clear());
    event!(Level::DEBUG, "Cart cleared.");
    self.inner.schedule_save(items);
  }

  // --- Reads ---

  pub fn items(&self) -> Vec<CartItem> {
    self.inner.state.snapshot()
  }

  /// Shared handle to the in-memory cart for consumers that want to hold a read lock.
  pub fn state(&self) -> CartState {
    self.inner.state.clone()
  }

  pub fn count(&self) -> u64 {
    self.inner.state.read().count()
  }

  pub fn subtotal(&self) -> i64 {
    self.inner.state.read().subtotal()
  }

  pub fn tax(&self) -> i64 {
    self.totals().tax
  }

  pub fn total(&self) -> i64 {
    self.totals().total
  }

  pub fn totals(&self) -> CartTotals {
    self.inner.state.read().totals(self.inner.config.tax_rate)
  }

  pub fn config(&self) -> &CartConfig {
    &self.inner.config
  }

  // --- Lifecycle ---

  pub fn phase(&self) -> ControllerPhase {
    *self.inner.phase.borrow()
  }

  /// Whether a save is still waiting out its quiet period.
  pub fn has_pending_save(&self) -> bool {
    self.inner.saves.is_pending(&CART_SAVE)
  }

  /// Waits until the initial load and subscribe have finished (or the controller was
  /// unmounted first) and returns the phase reached.
  pub async fn ready(&self) -> ControllerPhase {
    let mut phase = self.inner.phase.subscribe();
    let reached = match phase.wait_for(|p| *p != ControllerPhase::Loading).await {
      Ok(reached) => *reached,
      Err(_) => ControllerPhase::Closed,
    };
    reached
  }

  /// Tears the controller down: the subscription is cancelled (also one that resolves
  /// after this call) and no remote change is applied afterwards. A save still waiting
  /// out its quiet period runs unless `save_on_unmount` is off. Idempotent.
  #[instrument(name = "CartController::unmount", skip(self))]
  pub fn unmount(&self) {
    self.inner.teardown();
  }
}

impl Inner {
  fn is_closed(&self) -> bool {
    self.closed.load(Ordering::SeqCst)
  }

  fn schedule_save(&self, items: Vec<CartItem>) {
    if self.is_closed() {
      event!(Level::DEBUG, "Controller unmounted; mutation kept local only.");
      return;
    }
    let adapter = Arc::clone(&self.adapter);
    let save_order = Arc::clone(&self.save_order);
    self.saves.schedule(CART_SAVE, async move {
      // A save whose quiet period ended while an earlier write is still in flight waits
      // for it, so an older cart can never land after a newer one.
      let _in_order = save_order.lock().await;
      match adapter.save_cart(&items).await {
        Ok(()) => event!(Level::DEBUG, lines = items.len(), "Debounced cart save written."),
        Err(e) => event!(Level::WARN, error = %e, "Cart save failed; local cart stays authoritative until the next save."),
      }
    });
  }

  /// Replaces the cart with remote items unless the controller is closed. The closed
  /// check happens under the cart lock, which `teardown` also takes.
  fn apply_remote(&self, items: Vec<CartItem>) -> bool {
    let mut cart = self.state.write();
    if self.is_closed() {
      return false;
    }
    event!(Level::DEBUG, lines = items.len(), "Applying remote cart.");
    cart.replace(items);
    true
  }

  fn teardown(&self) {
    if self.closed.swap(true, Ordering::SeqCst) {
      return;
    }
    if let Some(mut subscription) = self.subscription.lock().take() {
      subscription.cancel();
    }
    // Waits out a remote delivery already holding the cart lock; later ones see `closed`.
    drop(self.state.write());
    if !self.config.save_on_unmount {
      let dropped = self.saves.cancel_all();
      if dropped > 0 {
        event!(Level::DEBUG, dropped, "Discarded pending cart save on unmount.");
      }
    }
    self.phase.send_replace(ControllerPhase::Closed);
    event!(Level::DEBUG, "Cart controller unmounted.");
  }
}

impl Drop for Inner {
  fn drop(&mut self) {
    self.teardown();
  }
}

/// Mount-time sequence: load, then subscribe. Holds only a weak reference across awaits
/// so dropping every controller handle mid-initialization tears it down.
async fn initialize(weak: Weak<Inner>) {
  let Some(adapter) = weak.upgrade().map(|inner| Arc::clone(&inner.adapter)) else {
    return;
  };

  // 1. One-shot load.
  let loaded = adapter.load_cart().await;
  match weak.upgrade() {
    Some(inner) if !inner.is_closed() => match loaded {
      Ok(items) => {
        let lines = items.len();
        if inner.apply_remote(items) {
          event!(Level::INFO, lines, "Initial cart loaded.");
        }
      }
      Err(e) => {
        event!(Level::WARN, error = %e, "Initial cart load failed; continuing with local cart.");
      }
    },
    _ => return,
  }

  // 2. Live subscription.
  let callback: CartCallback = {
    let weak = weak.clone();
    Arc::new(move |items| {
      if let Some(inner) = weak.upgrade() {
        inner.apply_remote(items);
      }
    })
  };
  let subscribed = adapter.subscribe_cart(callback).await;

  let Some(inner) = weak.upgrade() else {
    // Dropping `subscribed` cancels it.
    return;
  };
  match subscribed {
    Ok(mut subscription) => {
      let mut slot = inner.subscription.lock();
      if inner.is_closed() {
        // Unmounted while the subscription was being established.
        subscription.cancel();
      } else {
        *slot = Some(subscription);
      }
    }
    Err(e) => {
      event!(Level::WARN, error = %e, "Cart subscription failed; remote changes will not be applied.");
    }
  }

  // Only Loading -> Live; a concurrent unmount may already have published Closed.
  inner.phase.send_if_modified(|phase| {
    if *phase == ControllerPhase::Loading {
      *phase = ControllerPhase::Live;
      true
    } else {
      false
    }
  });
}
