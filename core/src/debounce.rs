// cart_sync/src/debounce.rs

//! Keyed cancel-and-reschedule delayed tasks.
//!
//! `schedule(key, action)` runs `action` once `delay` has passed without another
//! `schedule` for the same key. A burst of N calls within the window runs only the last
//! action. Once a task's quiet period has elapsed it detaches itself from the table, so
//! a later `schedule` starts a new window instead of aborting work already under way.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{event, Level};

#[derive(Debug)]
struct Pending {
  generation: u64,
  task: JoinHandle<()>,
}

pub struct Debouncer<K> {
  delay: Duration,
  runtime: Handle,
  pending: Arc<Mutex<HashMap<K, Pending>>>,
  generations: AtomicU64,
}

impl<K: std::fmt::Debug> std::fmt::Debug for Debouncer<K> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Debouncer")
      .field("delay", &self.delay)
      .field("pending", &self.pending.lock().keys().collect::<Vec<_>>())
      .finish()
  }
}

impl<K> Debouncer<K>
where
  K: Eq + Hash + Clone + Send + std::fmt::Debug + 'static,
{
  /// Tasks are spawned on `runtime`, so `schedule` may be called from threads that are
  /// not themselves inside the runtime.
  pub fn new(delay: Duration, runtime: Handle) -> Self {
    Self {
      delay,
      runtime,
      pending: Arc::new(Mutex::new(HashMap::new())),
      generations: AtomicU64::new(0),
    }
  }

  pub fn delay(&self) -> Duration {
    self.delay
  }

  /// Schedules `action` for `key`, replacing any action still waiting for that key.
  pub fn schedule<F>(&self, key: K, action: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let generation = self.generations.fetch_add(1, Ordering::Relaxed);
    let delay = self.delay;
    let table = Arc::clone(&self.pending);
    let task_key = key.clone();

    // Held until the new entry is inserted: the task cannot look itself up before it exists.
    let mut pending = self.pending.lock();
    let task = self.runtime.spawn(async move {
      tokio::time::sleep(delay).await;
      {
        let mut pending = table.lock();
        if pending.get(&task_key).map(|entry| entry.generation) != Some(generation) {
          // Superseded or cancelled between waking and taking the lock.
          return;
        }
        pending.remove(&task_key);
      }
      event!(Level::TRACE, key = ?task_key, "Debounce window elapsed; running action.");
      action.await;
    });

    if let Some(previous) = pending.insert(key, Pending { generation, task }) {
      previous.task.abort();
      event!(Level::TRACE, generation, "Rescheduled debounced action.");
    }
  }

  /// Drops the action waiting for `key`, if any. Returns whether one was waiting.
  pub fn cancel(&self, key: &K) -> bool {
    match self.pending.lock().remove(key) {
      Some(entry) => {
        entry.task.abort();
        true
      }
      None => false,
    }
  }

  /// Drops every waiting action. Actions already running are unaffected.
  pub fn cancel_all(&self) -> usize {
    let drained: Vec<Pending> = self.pending.lock().drain().map(|(_, entry)| entry).collect();
    for entry in &drained {
      entry.task.abort();
    }
    drained.len()
  }

  /// Whether an action for `key` is still inside its quiet period.
  pub fn is_pending(&self, key: &K) -> bool {
    self.pending.lock().contains_key(key)
  }

  pub fn pending_count(&self) -> usize {
    self.pending.lock().len()
  }
}
