//! Alerts: one escalation episode for a subject.
//!
//! An alert is created at [`AlertLevel::L1`] when a subject becomes overdue,
//! climbs one level at a time up to [`AlertLevel::L4`], and ends in exactly
//! one of the terminal levels [`AlertLevel::Resolved`] (the subject checked
//! in) or [`AlertLevel::Cancelled`] (a human called it off).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Level ───────────────────────────────────────────────────────────────────

/// The severity of an alert. The string form (`"l1"`, ..., `"resolved"`) is
/// the value stored in the `level` column.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertLevel {
  L1,
  L2,
  L3,
  L4,
  Cancelled,
  Resolved,
}

impl AlertLevel {
  /// Every level that counts as "active".
  pub const ACTIVE: [AlertLevel; 4] =
    [AlertLevel::L1, AlertLevel::L2, AlertLevel::L3, AlertLevel::L4];

  /// The levels a scheduled escalation scan may still advance.
  pub const ESCALATABLE: [AlertLevel; 3] =
    [AlertLevel::L1, AlertLevel::L2, AlertLevel::L3];

  pub fn is_active(self) -> bool { !self.is_terminal() }

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Cancelled | Self::Resolved)
  }

  /// Whether `self -> to` is a legal transition: one step up the ladder, or
  /// from any active level into a terminal one.
  pub fn can_transition_to(self, to: AlertLevel) -> bool {
    if !self.is_active() {
      return false;
    }
    to.is_terminal() || crate::escalation::next_level(self) == Some(to)
  }
}

// ─── Alert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
  pub alert_id:          Uuid,
  pub subject_id:        Uuid,
  pub level:             AlertLevel,
  pub triggered_at:      DateTime<Utc>,
  /// Set every time the alert moves up a level; `None` while still at L1.
  pub last_escalated_at: Option<DateTime<Utc>>,
  pub resolved_at:       Option<DateTime<Utc>>,
  pub cancelled_at:      Option<DateTime<Utc>>,
  pub cancel_reason:     Option<String>,
}

impl Alert {
  pub fn is_active(&self) -> bool { self.level.is_active() }

  /// When the alert entered its current level.
  pub fn last_transition(&self) -> DateTime<Utc> {
    self.last_escalated_at.unwrap_or(self.triggered_at)
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn level_string_form_roundtrips() {
    for level in [
      AlertLevel::L1,
      AlertLevel::L2,
      AlertLevel::L3,
      AlertLevel::L4,
      AlertLevel::Cancelled,
      AlertLevel::Resolved,
    ] {
      assert_eq!(AlertLevel::from_str(level.as_ref()).unwrap(), level);
    }
    assert_eq!(AlertLevel::L3.as_ref(), "l3");
    assert!(AlertLevel::from_str("l5").is_err());
  }

  #[test]
  fn only_single_steps_and_terminations_are_legal() {
    assert!(AlertLevel::L1.can_transition_to(AlertLevel::L2));
    assert!(AlertLevel::L3.can_transition_to(AlertLevel::L4));
    assert!(AlertLevel::L2.can_transition_to(AlertLevel::Cancelled));
    assert!(AlertLevel::L4.can_transition_to(AlertLevel::Resolved));

    assert!(!AlertLevel::L1.can_transition_to(AlertLevel::L3));
    assert!(!AlertLevel::L2.can_transition_to(AlertLevel::L1));
    assert!(!AlertLevel::L4.can_transition_to(AlertLevel::L4));
    assert!(!AlertLevel::Resolved.can_transition_to(AlertLevel::Cancelled));
    assert!(!AlertLevel::Cancelled.can_transition_to(AlertLevel::L1));
  }
}
