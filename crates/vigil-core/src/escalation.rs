//! The escalation state machine.
//!
//! Pure decision logic: nothing here reads a clock or touches storage. The
//! engine re-derives every decision from stored state on each scan, which is
//! what makes a re-run after a partial batch safe.
//!
//! ```text
//! L1 --dwell--> L2 --dwell--> L3 --dwell--> L4
//!  \             \             \             \
//!   +-------------+-------------+-------------+--> RESOLVED | CANCELLED
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::{
  alert::{Alert, AlertLevel},
  profile::Profile,
  schedule::compute_next_due,
};

/// The level an alert moves to on its next escalation, if any.
pub fn next_level(current: AlertLevel) -> Option<AlertLevel> {
  match current {
    AlertLevel::L1 => Some(AlertLevel::L2),
    AlertLevel::L2 => Some(AlertLevel::L3),
    AlertLevel::L3 => Some(AlertLevel::L4),
    AlertLevel::L4 | AlertLevel::Cancelled | AlertLevel::Resolved => None,
  }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// How long an alert must dwell at each escalatable level before moving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
  pub l1: Duration,
  pub l2: Duration,
  pub l3: Duration,
}

impl Default for EscalationPolicy {
  fn default() -> Self { Self::uniform(Duration::hours(24)) }
}

impl EscalationPolicy {
  pub fn uniform(dwell: Duration) -> Self {
    Self { l1: dwell, l2: dwell, l3: dwell }
  }

  /// Build a policy from per-level hour counts.
  pub fn from_hours(l1: u32, l2: u32, l3: u32) -> Self {
    Self {
      l1: Duration::hours(l1.into()),
      l2: Duration::hours(l2.into()),
      l3: Duration::hours(l3.into()),
    }
  }

  /// Dwell time for `level`; `None` for levels that never escalate.
  pub fn dwell(&self, level: AlertLevel) -> Option<Duration> {
    match level {
      AlertLevel::L1 => Some(self.l1),
      AlertLevel::L2 => Some(self.l2),
      AlertLevel::L3 => Some(self.l3),
      AlertLevel::L4 | AlertLevel::Cancelled | AlertLevel::Resolved => None,
    }
  }
}

// ─── Decisions ───────────────────────────────────────────────────────────────

/// True iff the subject is overdue and has no active alert.
pub fn should_create_alert(
  profile: &Profile,
  alerts: &[Alert],
  now: DateTime<Utc>,
) -> bool {
  if alerts.iter().any(Alert::is_active) {
    return false;
  }
  compute_next_due(profile, now) <= now
}

/// True iff `alert` has dwelt at its current level for at least the policy's
/// threshold. Always false at L4 and at the terminal levels.
///
/// The clock starts at `last_escalated_at` once the alert has moved, so a
/// scan advances an alert by at most one level no matter how late it runs.
pub fn should_escalate(
  alert: &Alert,
  policy: &EscalationPolicy,
  now: DateTime<Utc>,
) -> bool {
  let Some(threshold) = policy.dwell(alert.level) else {
    return false;
  };
  now - alert.last_transition() >= threshold
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;

  fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap() }

  fn alert_at(level: AlertLevel) -> Alert {
    Alert {
      alert_id:          Uuid::new_v4(),
      subject_id:        Uuid::new_v4(),
      level,
      triggered_at:      t0(),
      last_escalated_at: None,
      resolved_at:       None,
      cancelled_at:      None,
      cancel_reason:     None,
    }
  }

  #[test]
  fn next_level_table() {
    assert_eq!(next_level(AlertLevel::L1), Some(AlertLevel::L2));
    assert_eq!(next_level(AlertLevel::L2), Some(AlertLevel::L3));
    assert_eq!(next_level(AlertLevel::L3), Some(AlertLevel::L4));
    assert_eq!(next_level(AlertLevel::L4), None);
    assert_eq!(next_level(AlertLevel::Cancelled), None);
    assert_eq!(next_level(AlertLevel::Resolved), None);
  }

  #[test]
  fn dwell_boundary_is_inclusive() {
    let policy = EscalationPolicy::default();
    let alert = alert_at(AlertLevel::L1);
    let threshold = Duration::hours(24);

    assert!(!should_escalate(&alert, &policy, t0() + threshold - Duration::seconds(1)));
    assert!(should_escalate(&alert, &policy, t0() + threshold));
  }

  #[test]
  fn dwell_restarts_from_last_escalation() {
    let policy = EscalationPolicy::default();
    let mut alert = alert_at(AlertLevel::L2);
    alert.last_escalated_at = Some(t0() + Duration::hours(30));

    // 48h after triggering, but only 18h at L2.
    assert!(!should_escalate(&alert, &policy, t0() + Duration::hours(48)));
    assert!(should_escalate(&alert, &policy, t0() + Duration::hours(54)));
  }

  #[test]
  fn per_level_thresholds_apply() {
    let policy = EscalationPolicy::from_hours(1, 2, 3);
    let mut alert = alert_at(AlertLevel::L3);
    alert.last_escalated_at = Some(t0());

    assert!(!should_escalate(&alert, &policy, t0() + Duration::hours(2)));
    assert!(should_escalate(&alert, &policy, t0() + Duration::hours(3)));
  }

  #[test]
  fn max_and_terminal_levels_never_escalate() {
    let policy = EscalationPolicy::default();
    let much_later = t0() + Duration::days(365);
    for level in [AlertLevel::L4, AlertLevel::Cancelled, AlertLevel::Resolved] {
      assert!(!should_escalate(&alert_at(level), &policy, much_later));
    }
  }

  #[test]
  fn creation_requires_overdue_and_no_active_alert() {
    let now = t0();
    let mut profile = Profile::new(Uuid::new_v4(), now);
    profile.last_check_in_at = Some(now - Duration::hours(25));

    assert!(should_create_alert(&profile, &[], now));

    let active = alert_at(AlertLevel::L2);
    assert!(!should_create_alert(&profile, &[active], now));

    let resolved = alert_at(AlertLevel::Resolved);
    assert!(should_create_alert(&profile, &[resolved], now));

    profile.last_check_in_at = Some(now - Duration::hours(23));
    assert!(!should_create_alert(&profile, &[], now));
  }

  #[test]
  fn never_checked_in_is_not_overdue() {
    let now = t0();
    let profile = Profile::new(Uuid::new_v4(), now);
    assert!(!should_create_alert(&profile, &[], now));
  }
}
