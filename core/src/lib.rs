// src/lib.rs

//! cart_sync: shopping cart state with debounced remote persistence.
//!
//! A storefront's cart lives in memory for instant UI updates and is mirrored to a
//! per-user document in a hosted document store:
//!  - Line items unique by product, quantities never below one.
//!  - Name, image and price snapshotted from the catalog when a product is first added.
//!  - Anonymous sessions established on demand, shared by concurrent callers.
//!  - Rapid edits coalesced into one remote write by a keyed debounce.
//!  - A live change feed applied last-writer-wins, echoes of our own writes included.
//!  - Remote failures logged, never surfaced: the local cart stays usable offline.

pub mod checkout;
pub mod config;
pub mod controller;
pub mod core;
pub mod debounce;
pub mod error;
pub mod identity;
pub mod persistence;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::core::{Cart, CartItem, CartState, CartTotals, Product, TaxRate};

pub use crate::controller::{CartController, ControllerPhase};
pub use crate::persistence::{CartAdapter, CartCallback, CartSubscription, RemoteCartAdapter};

pub use crate::identity::{AnonymousIdentityProvider, Identity, IdentityProvider, Session};
pub use crate::store::{DocumentKey, DocumentStore, DocumentWatch, MemoryDocumentStore};

pub use crate::checkout::{place_order, OrderPlacement, OrderReceipt, OrderRequest};
pub use crate::config::CartConfig;
pub use crate::debounce::Debouncer;
pub use crate::error::{CartSyncError, SyncResult};

/*
    Wiring:
    1. Construct the store client and identity provider once at startup.
    2. `Session::new(provider)` and `RemoteCartAdapter::from_config(store, session, &config)`.
    3. `CartController::mount(Arc::new(adapter), config)` returns at once;
       `ready().await` if the caller wants the initial load applied first.
    4. UI calls `add` / `remove` / `set_qty`; reads `items()` / `totals()`.
    5. Checkout: `place_order(&controller, &order_service).await` clears the cart on success.
    6. `unmount()` (or drop every handle) when the cart view goes away.
*/
