//! A small key/value cache with per-entry expiry.
//!
//! Unrelated to the pool: it shares no state with it. Expired entries are
//! invisible to readers right away and are physically removed either on the
//! read that finds them or by an optional periodic sweep.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Construction options for a [`TtlCache`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheConfig {
  /// Lifetime given to entries stored with [`TtlCache::set`]. Zero means
  /// they never expire.
  pub ttl: Duration,
  /// How often expired entries are swept. Zero disables the sweep.
  pub sweep_interval: Duration,
}

impl CacheConfig {
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
    self.sweep_interval = interval;
    self
  }
}

struct Entry<V> {
  value: V,
  expire_at: Option<Instant>,
}

impl<V> Entry<V> {
  fn is_expired(&self, now: Instant) -> bool {
    self.expire_at.is_some_and(|at| at < now)
  }
}

/// A concurrent map whose entries can expire.
pub struct TtlCache<K, V> {
  entries: Arc<DashMap<K, Entry<V>>>,
  ttl: Duration,
  sweeper: CancellationToken,
}

impl<K, V> TtlCache<K, V>
where
  K: Eq + Hash + Send + Sync + 'static,
  V: Clone + Send + Sync + 'static,
{
  /// Creates the cache and, if `sweep_interval` is non-zero, starts the
  /// sweep task. The sweep stops when the cache is dropped.
  ///
  /// # Panics
  /// With a non-zero sweep interval, if called outside a Tokio runtime.
  pub fn new(config: CacheConfig) -> Self {
    let entries = Arc::new(DashMap::new());
    let sweeper = CancellationToken::new();

    if !config.sweep_interval.is_zero() {
      tokio::spawn(Self::run_sweeper(
        Arc::clone(&entries),
        config.sweep_interval,
        sweeper.clone(),
      ));
    }

    Self {
      entries,
      ttl: config.ttl,
      sweeper,
    }
  }

  async fn run_sweeper(entries: Arc<DashMap<K, Entry<V>>>, interval: Duration, stop: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
      tokio::select! {
        biased;
        _ = stop.cancelled() => break,
        _ = ticker.tick() => {
          if entries.is_empty() {
            continue;
          }
          let now = Instant::now();
          let before = entries.len();
          entries.retain(|_, entry| !entry.is_expired(now));
          trace!(removed = before.saturating_sub(entries.len()), "Swept expired cache entries.");
        }
      }
    }
    trace!("Cache sweeper stopped.");
  }

  /// Stores `value` with the cache's default lifetime.
  pub fn set(&self, key: K, value: V) {
    self.set_ttl(key, value, self.ttl);
  }

  /// Stores `value` for `ttl`. A zero `ttl` stores it without expiry.
  pub fn set_ttl(&self, key: K, value: V, ttl: Duration) {
    let expire_at = if ttl.is_zero() {
      None
    } else {
      Instant::now().checked_add(ttl)
    };
    self.entries.insert(key, Entry { value, expire_at });
  }

  /// Stores `value` until `expire_at`.
  pub fn set_expire_at(&self, key: K, value: V, expire_at: Instant) {
    self.entries.insert(
      key,
      Entry {
        value,
        expire_at: Some(expire_at),
      },
    );
  }

  /// Returns a clone of the live value for `key`. An expired entry is
  /// removed and reported as missing.
  pub fn get(&self, key: &K) -> Option<V> {
    let now = Instant::now();
    match self.entries.get(key) {
      None => return None,
      Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
      Some(_) => {}
    }
    self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    None
  }

  /// Removes `key`, returning its value if it was still live.
  pub fn delete(&self, key: &K) -> Option<V> {
    let now = Instant::now();
    self
      .entries
      .remove(key)
      .and_then(|(_, entry)| (!entry.is_expired(now)).then_some(entry.value))
  }

  /// Returns the live value for `key`, or computes it with `load`, stores it
  /// with the default lifetime and returns it. A failed load stores nothing.
  ///
  /// # Errors
  /// Whatever `load` returns.
  pub fn get_or_try_insert_with<E, F>(&self, key: K, load: F) -> Result<V, E>
  where
    F: FnOnce(&K) -> Result<V, E>,
  {
    if let Some(value) = self.get(&key) {
      return Ok(value);
    }
    let value = load(&key)?;
    self.set(key, value.clone());
    Ok(value)
  }

  /// Number of stored entries, including expired ones not yet removed.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<K, V> Drop for TtlCache<K, V> {
  fn drop(&mut self) {
    self.sweeper.cancel();
  }
}

impl<K, V> fmt::Debug for TtlCache<K, V>
where
  K: Eq + Hash,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TtlCache")
      .field("len", &self.entries.len())
      .field("ttl", &self.ttl)
      .finish_non_exhaustive()
  }
}
