//! Per-subject serialization of alert-mutating operations.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// Idle entries are pruned once the map grows past this many subjects.
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per subject. Operations on different subjects never wait
/// on each other.
#[derive(Default)]
pub struct SubjectLocks {
  inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl SubjectLocks {
  pub fn new() -> Self { Self::default() }

  /// Wait for exclusive access to `subject_id`'s alert lifecycle.
  pub async fn lock(&self, subject_id: Uuid) -> OwnedMutexGuard<()> {
    let mutex = {
      let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
      if map.len() >= PRUNE_THRESHOLD {
        // Only the map holds a reference to an idle mutex.
        map.retain(|_, m| Arc::strong_count(m) > 1);
      }
      map.entry(subject_id).or_default().clone()
    };
    mutex.lock_owned().await
  }

  pub fn len(&self) -> usize {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
