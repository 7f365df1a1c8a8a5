//! Ephemeral key-value state with per-entry expiry.
//!
//! Process-wide short-lived state (rate-limit windows, pending challenges)
//! lives behind [`ExpiringStore`] so it can be an in-process map in tests and
//! single-node deployments, and a shared store elsewhere.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Duration, Utc};

use crate::clock::{Clock, SystemClock};

pub trait ExpiringStore: Send + Sync {
  /// The live value for `key`, if any.
  fn get(&self, key: &str) -> Option<String>;

  /// Store `value` under `key` until `ttl` has elapsed, replacing any
  /// previous value and expiry.
  fn set(&self, key: &str, value: String, ttl: Duration);

  /// Increment the counter at `key` and return the new count. A missing or
  /// expired counter starts at 1 and expires after `ttl`; incrementing a live
  /// counter keeps its original expiry.
  fn increment(&self, key: &str, ttl: Duration) -> u64;

  /// Remove `key`; returns the live value it held.
  fn remove(&self, key: &str) -> Option<String>;
}

struct Entry {
  value:      String,
  expires_at: DateTime<Utc>,
}

/// A mutex-guarded map. Expired entries are dropped lazily on access and in
/// bulk by [`MemoryExpiringStore::purge_expired`].
pub struct MemoryExpiringStore {
  entries: Mutex<HashMap<String, Entry>>,
  clock:   Arc<dyn Clock>,
}

impl Default for MemoryExpiringStore {
  fn default() -> Self { Self::with_clock(Arc::new(SystemClock)) }
}

impl MemoryExpiringStore {
  pub fn new() -> Self { Self::default() }

  pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
    Self { entries: Mutex::new(HashMap::new()), clock }
  }

  /// Drop every expired entry; returns how many were removed.
  pub fn purge_expired(&self) -> usize {
    let now = self.clock.now();
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|_, e| e.expires_at > now);
    before - entries.len()
  }

  pub fn len(&self) -> usize { self.lock().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl ExpiringStore for MemoryExpiringStore {
  fn get(&self, key: &str) -> Option<String> {
    let now = self.clock.now();
    let mut entries = self.lock();
    let found = entries.get(key).map(|e| (e.expires_at > now, e.value.clone()));
    match found {
      Some((true, value)) => Some(value),
      Some((false, _)) => {
        entries.remove(key);
        None
      }
      None => None,
    }
  }

  fn set(&self, key: &str, value: String, ttl: Duration) {
    let expires_at = self.clock.now() + ttl;
    self.lock().insert(key.to_owned(), Entry { value, expires_at });
  }

  fn increment(&self, key: &str, ttl: Duration) -> u64 {
    let now = self.clock.now();
    let mut entries = self.lock();
    let entry = entries
      .entry(key.to_owned())
      .and_modify(|e| {
        if e.expires_at <= now {
          e.value = "0".to_owned();
          e.expires_at = now + ttl;
        }
      })
      .or_insert_with(|| Entry { value: "0".to_owned(), expires_at: now + ttl });

    let count = entry.value.parse::<u64>().unwrap_or(0) + 1;
    entry.value = count.to_string();
    count
  }

  fn remove(&self, key: &str) -> Option<String> {
    let now = self.clock.now();
    self
      .lock()
      .remove(key)
      .filter(|e| e.expires_at > now)
      .map(|e| e.value)
  }
}
