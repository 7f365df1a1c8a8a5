//! Alert lifecycle orchestration.
//!
//! Every operation that changes a subject's alert state runs under that
//! subject's lock and re-reads the state it acts on once the lock is held.
//! Notifications go out after the state change has committed, so a failed
//! notification never rolls back a transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;
use vigil_core::{
  alert::{Alert, AlertLevel},
  channel::{EmailSender, PushSender, SmsSender},
  check_in::{CheckInMethod, CheckInOutcome},
  clock::{Clock, SystemClock},
  escalation::{EscalationPolicy, next_level, should_create_alert, should_escalate},
  message::SubjectNotice,
  observer::{AlertEvent, AlertEventKind, AlertObserver},
  profile::{Profile, ValidSettings},
  schedule::compute_next_due,
  store::MonitorStore,
};

use crate::{
  dispatcher::{AllContactsOutcome, Dispatcher, PrimaryContactOutcome, Recipient},
  error::{EngineError, Result},
  locks::SubjectLocks,
};

// ─── Summaries ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueAlertsSummary {
  pub created: usize,
  /// Subjects skipped because their row could not be read or a store call
  /// failed.
  pub failed:  usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationSummary {
  pub escalated:   usize,
  /// Alerts that reached L3 and got through to a primary contact.
  pub l3_notified: usize,
  /// Contact deliveries (emails and SMS) made for alerts reaching L4.
  pub l4_sent:     usize,
  /// Alerts skipped because their row could not be read or a store call
  /// failed.
  pub failed:      usize,
}

/// One committed escalation and the contact notifications it triggered.
#[derive(Debug)]
struct Escalated {
  primary:   Option<PrimaryContactOutcome>,
  broadcast: Option<AllContactsOutcome>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct Engine<S, P, E, M> {
  store:      Arc<S>,
  dispatcher: Dispatcher<P, E, M>,
  policy:     EscalationPolicy,
  clock:      Arc<dyn Clock>,
  observer:   Option<Arc<dyn AlertObserver>>,
  locks:      SubjectLocks,
}

impl<S, P, E, M> Engine<S, P, E, M>
where
  S: MonitorStore,
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  pub fn new(store: Arc<S>, dispatcher: Dispatcher<P, E, M>) -> Self {
    Self {
      store,
      dispatcher,
      policy: EscalationPolicy::default(),
      clock: Arc::new(SystemClock),
      observer: None,
      locks: SubjectLocks::new(),
    }
  }

  pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_observer(mut self, observer: Arc<dyn AlertObserver>) -> Self {
    self.observer = Some(observer);
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn now(&self) -> DateTime<Utc> { self.clock.now() }

  // ── Subject-driven ────────────────────────────────────────────────────

  /// Record a check-in. Resolves the active alert, if any, in the same
  /// atomic unit, then tells the subject their alert is over.
  #[instrument(skip(self))]
  pub async fn record_check_in(
    &self,
    subject_id: Uuid,
    method: CheckInMethod,
  ) -> Result<CheckInOutcome> {
    let (profile, outcome) = {
      let _guard = self.locks.lock(subject_id).await;
      let now = self.clock.now();
      let profile = self
        .store
        .ensure_profile(subject_id, now)
        .await
        .map_err(EngineError::store)?;
      let outcome = self
        .store
        .record_check_in(subject_id, method, now)
        .await
        .map_err(EngineError::store)?;
      (profile, outcome)
    };

    info!(
      check_in_id = %outcome.check_in.check_in_id,
      resolved = outcome.resolved.is_some(),
      "check-in recorded"
    );

    if let Some(alert) = &outcome.resolved {
      self.observe(AlertEventKind::Resolved, alert);
      self.notify_subject(&profile, SubjectNotice::CheckedIn).await;
    }
    Ok(outcome)
  }

  /// Cancel the subject's active alert. Missing, inactive, and foreign alerts
  /// all produce the same [`EngineError::AlertNotFound`].
  #[instrument(skip(self, reason))]
  pub async fn cancel_alert(
    &self,
    subject_id: Uuid,
    alert_id: Uuid,
    reason: Option<String>,
  ) -> Result<Alert> {
    let cancelled = {
      let _guard = self.locks.lock(subject_id).await;
      let current = self
        .store
        .get_alert(alert_id)
        .await
        .map_err(EngineError::store)?;
      match current {
        Some(alert) if alert.subject_id == subject_id && alert.is_active() => {}
        _ => return Err(EngineError::AlertNotFound),
      }
      self
        .store
        .cancel_alert(alert_id, self.clock.now(), reason)
        .await
        .map_err(EngineError::store)?
        .ok_or(EngineError::AlertNotFound)?
    };

    info!(reason = ?cancelled.cancel_reason, "alert cancelled");
    self.observe(AlertEventKind::Cancelled, &cancelled);

    match self.store.get_profile(subject_id).await {
      Ok(Some(profile)) => self.notify_subject(&profile, SubjectNotice::Cancelled).await,
      Ok(None) => {}
      Err(e) => warn!(error = %e, "could not load profile for cancellation notice"),
    }
    Ok(cancelled)
  }

  // ── Scheduled ─────────────────────────────────────────────────────────

  /// Create an L1 alert for every active subject who is overdue and has no
  /// active alert. Safe to run repeatedly and concurrently.
  #[instrument(skip(self))]
  pub async fn process_due_alerts(&self) -> Result<DueAlertsSummary> {
    let profiles = self
      .store
      .list_active_profiles()
      .await
      .map_err(EngineError::store)?;

    let mut summary = DueAlertsSummary::default();
    for row in profiles {
      let subject_id = match row {
        Ok(candidate) => candidate.subject_id,
        Err(e) => {
          summary.failed += 1;
          warn!(error = %e, "skipping unreadable profile");
          continue;
        }
      };
      match self.create_due_alert(subject_id).await {
        Ok(Some((profile, alert))) => {
          summary.created += 1;
          self.observe(AlertEventKind::Created, &alert);
          self.notify_subject(&profile, SubjectNotice::Level(AlertLevel::L1)).await;
        }
        Ok(None) => {}
        Err(e) => {
          summary.failed += 1;
          error!(%subject_id, error = %e, "due-alert check failed");
        }
      }
    }

    info!(created = summary.created, failed = summary.failed, "due-alert scan finished");
    Ok(summary)
  }

  async fn create_due_alert(&self, subject_id: Uuid) -> Result<Option<(Profile, Alert)>> {
    let _guard = self.locks.lock(subject_id).await;
    let now = self.clock.now();

    let Some(profile) = self
      .store
      .get_profile(subject_id)
      .await
      .map_err(EngineError::store)?
    else {
      return Ok(None);
    };
    if !profile.is_active {
      return Ok(None);
    }
    let active: Vec<Alert> = self
      .store
      .find_active_alert(subject_id)
      .await
      .map_err(EngineError::store)?
      .into_iter()
      .collect();
    if !should_create_alert(&profile, &active, now) {
      return Ok(None);
    }

    let created = self
      .store
      .create_alert(subject_id, now)
      .await
      .map_err(EngineError::store)?;
    match created {
      Some(alert) => {
        info!(%subject_id, alert_id = %alert.alert_id, "alert created");
        Ok(Some((profile, alert)))
      }
      None => {
        debug!(%subject_id, "another writer created the alert first");
        Ok(None)
      }
    }
  }

  /// Advance every alert that has dwelt long enough at its level by exactly
  /// one level, notifying the subject and, from L3, their contacts.
  #[instrument(skip(self))]
  pub async fn process_escalations(&self) -> Result<EscalationSummary> {
    let candidates = self
      .store
      .list_alerts_in_levels(&AlertLevel::ESCALATABLE)
      .await
      .map_err(EngineError::store)?;

    let mut summary = EscalationSummary::default();
    for row in candidates {
      let candidate = match row {
        Ok(candidate) => candidate,
        Err(e) => {
          summary.failed += 1;
          warn!(error = %e, "skipping unreadable alert");
          continue;
        }
      };
      let alert_id = candidate.alert_id;
      match self.escalate(candidate.subject_id, alert_id).await {
        Ok(Some(step)) => {
          summary.escalated += 1;
          if step.primary.as_ref().is_some_and(PrimaryContactOutcome::success) {
            summary.l3_notified += 1;
          }
          if let Some(broadcast) = step.broadcast {
            summary.l4_sent += broadcast.delivered();
          }
        }
        Ok(None) => {}
        Err(e) => {
          summary.failed += 1;
          error!(%alert_id, error = %e, "escalation failed");
        }
      }
    }

    info!(
      escalated = summary.escalated,
      l3_notified = summary.l3_notified,
      l4_sent = summary.l4_sent,
      failed = summary.failed,
      "escalation scan finished"
    );
    Ok(summary)
  }

  async fn escalate(&self, subject_id: Uuid, alert_id: Uuid) -> Result<Option<Escalated>> {
    let (from, alert, now) = {
      let _guard = self.locks.lock(subject_id).await;
      let now = self.clock.now();

      let Some(current) = self
        .store
        .get_alert(alert_id)
        .await
        .map_err(EngineError::store)?
      else {
        return Ok(None);
      };
      if !should_escalate(&current, &self.policy, now) {
        return Ok(None);
      }
      let Some(to) = next_level(current.level) else {
        return Ok(None);
      };
      let Some(updated) = self
        .store
        .update_alert_level(alert_id, current.level, to, now)
        .await
        .map_err(EngineError::store)?
      else {
        debug!(%alert_id, "alert changed before escalation");
        return Ok(None);
      };
      (current.level, updated, now)
    };

    info!(%subject_id, %alert_id, %from, to = %alert.level, "alert escalated");
    self.observe(AlertEventKind::Escalated { from }, &alert);

    let mut step = Escalated { primary: None, broadcast: None };
    let profile = match self.store.get_profile(subject_id).await {
      Ok(Some(profile)) => profile,
      Ok(None) => {
        warn!(%subject_id, "escalated alert has no profile; skipping notifications");
        return Ok(Some(step));
      }
      Err(e) => {
        error!(%subject_id, error = %e, "could not load profile for notifications");
        return Ok(Some(step));
      }
    };

    self.notify_subject(&profile, SubjectNotice::Level(alert.level)).await;

    if matches!(alert.level, AlertLevel::L3 | AlertLevel::L4) {
      let contacts = match self.store.list_contacts(subject_id).await {
        Ok(contacts) => contacts,
        Err(e) => {
          error!(%subject_id, error = %e, "could not load contacts");
          return Ok(Some(step));
        }
      };
      if alert.level == AlertLevel::L3 {
        step.primary = Some(
          self
            .dispatcher
            .notify_primary_contact(&alert, &profile, &contacts, now)
            .await,
        );
      } else {
        step.broadcast = Some(
          self
            .dispatcher
            .notify_all_contacts(&alert, &profile, &contacts, now)
            .await,
        );
      }
    }
    Ok(Some(step))
  }

  // ── Reads and settings ────────────────────────────────────────────────

  pub async fn profile(&self, subject_id: Uuid) -> Result<Profile> {
    self
      .store
      .ensure_profile(subject_id, self.clock.now())
      .await
      .map_err(EngineError::store)
  }

  pub async fn update_profile(
    &self,
    subject_id: Uuid,
    settings: ValidSettings,
  ) -> Result<Profile> {
    let profile = self
      .store
      .update_profile(subject_id, settings, self.clock.now())
      .await
      .map_err(EngineError::store)?;
    info!(%subject_id, interval_hours = profile.check_in_interval_hours, "profile updated");
    Ok(profile)
  }

  pub async fn active_alert(&self, subject_id: Uuid) -> Result<Option<Alert>> {
    self
      .store
      .find_active_alert(subject_id)
      .await
      .map_err(EngineError::store)
  }

  /// When the subject's next check-in is due.
  pub async fn next_due(&self, subject_id: Uuid) -> Result<DateTime<Utc>> {
    let profile = self.profile(subject_id).await?;
    Ok(compute_next_due(&profile, self.clock.now()))
  }

  // ── Side effects ──────────────────────────────────────────────────────

  async fn notify_subject(&self, profile: &Profile, kind: SubjectNotice) {
    let notice = self.dispatcher.subject_notice(kind);
    let delivery = self
      .dispatcher
      .notify(&Recipient::from(profile), &notice)
      .await;
    debug!(
      subject_id = %profile.subject_id,
      channel = ?delivery.channel,
      delivered = delivery.delivered,
      "subject notified"
    );
  }

  fn observe(&self, kind: AlertEventKind, alert: &Alert) {
    let Some(observer) = &self.observer else {
      return;
    };
    let event = AlertEvent::new(kind, alert.clone(), self.clock.now());
    if let Err(e) = observer.on_event(&event) {
      warn!(alert_id = %alert.alert_id, error = %e, "alert observer failed");
    }
  }
}
