//! Check-ins: immutable records of a subject confirming they are fine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::alert::Alert;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CheckInMethod {
  Manual,
  Biometric,
  /// Detected from a check-in phrase in conversation.
  Conversation,
}

/// Written once, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
  pub check_in_id:  Uuid,
  pub subject_id:   Uuid,
  pub method:       CheckInMethod,
  pub performed_at: DateTime<Utc>,
}

/// Result of the atomic check-in unit: the new record, and the alert it
/// resolved if one was active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInOutcome {
  pub check_in: CheckIn,
  pub resolved: Option<Alert>,
}
