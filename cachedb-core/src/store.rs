use dashmap::DashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::StoreConfig;
use crate::entry::Entry;

/// Internal shared state for the store
struct StoreInner {
    data: Arc<DashMap<String, Entry>>,
    /// Sender to signal shutdown to the sweep task
    shutdown_tx: watch::Sender<bool>,
    /// Handle of the sweep task, taken by the first `shutdown` call
    sweeper: Mutex<Option<JoinHandle<()>>>,
    shutdown_grace: Duration,
}

/// Thread-safe in-memory key-value store with per-entry TTL
///
/// Uses `DashMap` for concurrent access. Reads never block other reads,
/// and writes only block the shard holding the key being written.
///
/// Expiration is enforced twice. Every read checks the entry against the current
/// instant, so an expired entry is invisible the moment its TTL elapses. A background
/// task additionally sweeps the map at a fixed interval to reclaim memory.
///
/// Cloning a `Store` yields another handle to the same data.
///
/// # Example
///
/// ```rust,no_run
/// use cachedb_core::{Store, StoreConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let store = Store::with_config(
///         StoreConfig::default().with_sweep_interval(Duration::from_millis(500)),
///     );
///
///     store.put("user123", "JohnDoe", "SampleData", 300);
///     assert_eq!(store.get("user123").map(|e| e.username().to_owned()), Some("JohnDoe".into()));
///
///     store.shutdown().await;
/// }
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Creates a new store with default configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context. The store requires
    /// a runtime to spawn its background sweep task.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Creates a new store with custom configuration
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context, or if the sweep
    /// interval is zero.
    pub fn with_config(config: StoreConfig) -> Self {
        if tokio::runtime::Handle::try_current().is_err() {
            panic!(
                "cachedb_core::Store requires a Tokio runtime. \
                 Ensure you are calling Store::new() or Store::with_config() \
                 from within a #[tokio::main] or #[tokio::test] context, \
                 or from code running on a Tokio runtime."
            );
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let data = Arc::new(DashMap::new());

        // The task only sees the map, so dropping the last handle drops the sender and stops it.
        let sweeper = tokio::spawn(Self::sweep_task(
            Arc::clone(&data),
            config.sweep_interval,
            shutdown_rx,
        ));

        Self {
            inner: Arc::new(StoreInner {
                data,
                shutdown_tx,
                sweeper: Mutex::new(Some(sweeper)),
                shutdown_grace: config.shutdown_grace,
            }),
        }
    }

    /// Background task that periodically sweeps expired entries
    async fn sweep_task(
        data: Arc<DashMap<String, Entry>>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; the first sweep is one interval out.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = Self::sweep_map(&data, Instant::now());
                    if removed > 0 {
                        tracing::debug!(removed, "swept expired entries");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    }

    /// Removes everything that expired before `now`
    fn sweep_map(data: &DashMap<String, Entry>, now: Instant) -> usize {
        let mut removed = 0;

        data.retain(|_, entry| {
            if entry.is_expired_at(now) {
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    /// Stores an entry for `key` that expires `ttl_seconds` from now.
    ///
    /// Any previous entry under the same key is replaced wholesale. The TTL is not
    /// validated here; a non-positive TTL simply produces an entry that is already expired.
    pub fn put(
        &self,
        key: impl Into<String>,
        username: impl Into<String>,
        userdata: impl Into<String>,
        ttl_seconds: i64,
    ) {
        self.insert(key, Entry::new(username, userdata, ttl_seconds));
    }

    /// Stores a prebuilt entry, replacing whatever was under `key`
    pub fn insert(&self, key: impl Into<String>, entry: Entry) {
        self.inner.data.insert(key.into(), entry);
    }

    /// Retrieves the live entry for `key`
    ///
    /// Returns `None` if the key doesn't exist or has expired, whether or not the
    /// sweep got to it yet. Expired entries found here are removed.
    pub fn get(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let entry = self.inner.data.get(key)?;

        if entry.is_expired_at(now) {
            // Drop the read reference before removing
            drop(entry);
            // Re-check under the write lock so a fresh replacement is left alone.
            self.inner.data.remove_if(key, |_, e| e.is_expired_at(now));
            return None;
        }

        Some(entry.value().clone())
    }

    /// Deletes a key from the store
    ///
    /// Returns `true` if the key existed (regardless of expiration), `false` otherwise.
    #[must_use = "returns whether the key existed"]
    pub fn delete(&self, key: &str) -> bool {
        self.inner.data.remove(key).is_some()
    }

    /// Atomically removes and returns the live entry at `key` if `predicate` accepts it.
    ///
    /// Expired entries are never handed to the predicate.
    pub fn take_if<F>(&self, key: &str, predicate: F) -> Option<Entry>
    where
        F: FnOnce(&Entry) -> bool,
    {
        let now = Instant::now();
        self.inner
            .data
            .remove_if(key, |_, entry| !entry.is_expired_at(now) && predicate(entry))
            .map(|(_, entry)| entry)
    }

    /// Removes every entry that expired before `now`
    ///
    /// Returns the number of entries removed. The background task calls this once
    /// per interval with the instant the sweep started.
    pub fn sweep(&self, now: Instant) -> usize {
        Self::sweep_map(&self.inner.data, now)
    }

    /// Returns the number of entries in the store (including expired ones not yet swept)
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.data.len()
    }

    /// Returns `true` if the store holds no entries at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.data.is_empty()
    }

    /// Stops the background sweep.
    ///
    /// Waits up to the configured grace period for the task to finish and aborts it
    /// after that. Calling this more than once is harmless. Data stays readable.
    pub async fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(true);

        let handle = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut handle) = handle else {
            return;
        };

        match tokio::time::timeout(self.inner.shutdown_grace, &mut handle).await {
            Ok(_) => tracing::info!("store sweep task stopped"),
            Err(_) => {
                tracing::warn!(
                    grace = ?self.inner.shutdown_grace,
                    "sweep task did not stop in time, aborting"
                );
                handle.abort();
            }
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        // Signal the sweep task to stop when the last handle goes away
        let _ = self.shutdown_tx.send(true);
    }
}
