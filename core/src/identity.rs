// cart_sync/src/identity.rs

//! Session identity: who owns the cart document.
//!
//! Callers never observe a "no identity" state. [`Session::ensure`] returns the provider's
//! current identity, or signs in anonymously, and memoizes the result so concurrent
//! callers share one resolution instead of each minting a new anonymous account.

use crate::error::{CartSyncError, SyncResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{event, instrument, Level};
use uuid::Uuid;

/// A stable identity string, anonymous or authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
  pub fn new(id: impl Into<String>) -> Self {
    Identity(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for Identity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// The hosted authentication provider, reduced to what the cart needs.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
  /// The identity of an already established session, if any.
  async fn current(&self) -> anyhow::Result<Option<Identity>>;

  /// Establishes a new anonymous session and returns its identity.
  async fn sign_in_anonymously(&self) -> anyhow::Result<Identity>;
}

/// Memoized "ensure session" step shared by every adapter operation.
pub struct Session {
  provider: Arc<dyn IdentityProvider>,
  identity: OnceCell<Identity>,
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("identity", &self.identity.get())
      .finish_non_exhaustive()
  }
}

impl Session {
  pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
    Self {
      provider,
      identity: OnceCell::new(),
    }
  }

  /// Resolves the session identity, establishing an anonymous one if needed.
  ///
  /// Concurrent callers wait on the same in-flight resolution. A failed resolution is not
  /// cached; the next call tries again.
  #[instrument(name = "Session::ensure", skip(self), err(Display))]
  pub async fn ensure(&self) -> SyncResult<Identity> {
    let identity = self
      .identity
      .get_or_try_init(|| async {
        let current = self
          .provider
          .current()
          .await
          .map_err(|source| CartSyncError::IdentityResolution { source })?;
        if let Some(identity) = current {
          event!(Level::DEBUG, identity = %identity, "Using existing session identity.");
          return Ok(identity);
        }
        let identity = self
          .provider
          .sign_in_anonymously()
          .await
          .map_err(|source| CartSyncError::IdentityResolution { source })?;
        event!(Level::INFO, identity = %identity, "Established anonymous session.");
        Ok::<_, CartSyncError>(identity)
      })
      .await?;
    Ok(identity.clone())
  }

  /// The resolved identity, if resolution has already completed.
  pub fn resolved(&self) -> Option<&Identity> {
    self.identity.get()
  }
}

/// In-process identity provider that mints `anon-<uuid>` identities.
///
/// Construct with [`AnonymousIdentityProvider::signed_in`] to model an already
/// authenticated account.
#[derive(Debug, Default)]
pub struct AnonymousIdentityProvider {
  current: Mutex<Option<Identity>>,
  sign_ins: AtomicUsize,
}

impl AnonymousIdentityProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn signed_in(identity: Identity) -> Self {
    Self {
      current: Mutex::new(Some(identity)),
      sign_ins: AtomicUsize::new(0),
    }
  }

  /// How many anonymous sign-ins have been performed.
  pub fn sign_in_count(&self) -> usize {
    self.sign_ins.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl IdentityProvider for AnonymousIdentityProvider {
  async fn current(&self) -> anyhow::Result<Option<Identity>> {
    Ok(self.current.lock().clone())
  }

  async fn sign_in_anonymously(&self) -> anyhow::Result<Identity> {
    let identity = Identity::new(format!("anon-{}", Uuid::new_v4()));
    self.sign_ins.fetch_add(1, Ordering::SeqCst);
    *self.current.lock() = Some(identity.clone());
    Ok(identity)
  }
}
