//! Alert lifecycle events and the optional projection observer.
//!
//! An observer mirrors state transitions into a secondary read store (e.g. a
//! real-time dashboard). It runs after the transition has committed, its
//! errors are logged and dropped, and the system works the same without one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alert::{Alert, AlertLevel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertEventKind {
  Created,
  Escalated { from: AlertLevel },
  Resolved,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
  #[serde(flatten)]
  pub kind:  AlertEventKind,
  /// The alert as stored after the transition.
  pub alert: Alert,
  pub at:    DateTime<Utc>,
}

impl AlertEvent {
  pub fn new(kind: AlertEventKind, alert: Alert, at: DateTime<Utc>) -> Self {
    Self { kind, alert, at }
  }

  pub fn to_json(&self) -> crate::Result<serde_json::Value> {
    Ok(serde_json::to_value(self)?)
  }
}

#[derive(Debug, Error)]
#[error("observer error: {0}")]
pub struct ObserverError(pub String);

/// Receives every committed alert transition. Implementations must not block;
/// anything slow belongs on a spawned task.
pub trait AlertObserver: Send + Sync {
  fn on_event(&self, event: &AlertEvent) -> Result<(), ObserverError>;
}
