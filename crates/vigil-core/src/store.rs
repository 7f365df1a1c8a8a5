//! The `MonitorStore` trait.
//!
//! Implemented by storage backends (e.g. `vigil-store-sqlite`). The engine
//! depends on this abstraction, not on any concrete backend.
//!
//! Alert writes are conditional: each one names the state it expects and
//! reports `None` when the stored alert is no longer in that state. The
//! single-active-alert and monotonic-level rules therefore hold even when two
//! processes race, without relying on a storage-level unique constraint.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  alert::{Alert, AlertLevel},
  check_in::{CheckIn, CheckInMethod, CheckInOutcome},
  contact::{Contact, NewContact},
  profile::{Profile, ValidSettings},
};

/// A batch listing whose rows succeed or fail independently.
pub type Rows<T, E> = Vec<Result<T, E>>;

/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MonitorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Retrieve a profile. Returns `None` if the subject has none yet.
  fn get_profile(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Return the subject's profile, creating it with default settings and
  /// `created_at = now` if it does not exist.
  fn ensure_profile(
    &self,
    subject_id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  /// Replace the subject's settings, creating the profile (stamped `now`)
  /// if needed.
  fn update_profile(
    &self,
    subject_id: Uuid,
    settings: ValidSettings,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  /// Set `last_check_in_at`. Returns `false` if the profile does not exist.
  fn update_last_check_in(
    &self,
    subject_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Every profile with monitoring switched on.
  ///
  /// Rows are decoded one at a time: a row that cannot be decoded shows up
  /// as an `Err` entry and does not hide the others. The outer error is for
  /// failures of the query itself.
  fn list_active_profiles(
    &self,
  ) -> impl Future<Output = Result<Rows<Profile, Self::Error>, Self::Error>> + Send + '_;

  // ── Alerts ────────────────────────────────────────────────────────────

  /// Create an L1 alert, unless the subject already has an active alert, in
  /// which case nothing is written and `None` is returned.
  fn create_alert(
    &self,
    subject_id: Uuid,
    triggered_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  /// Move an alert from `from` to the escalation level `to`, stamping
  /// `last_escalated_at`. Returns `None` if the alert is no longer at `from`.
  ///
  /// Returns an error if `from -> to` is not a legal single-step escalation.
  fn update_alert_level(
    &self,
    alert_id: Uuid,
    from: AlertLevel,
    to: AlertLevel,
    last_escalated_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  /// Mark an active alert resolved. `None` if it is missing or not active.
  fn resolve_alert(
    &self,
    alert_id: Uuid,
    resolved_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  /// Mark an active alert cancelled. `None` if it is missing or not active.
  fn cancel_alert(
    &self,
    alert_id: Uuid,
    cancelled_at: DateTime<Utc>,
    reason: Option<String>,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  fn get_alert(
    &self,
    alert_id: Uuid,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  /// The subject's active alert, if any.
  fn find_active_alert(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  /// Every alert, across all subjects, whose level is one of `levels`.
  /// Decoded per row, like [`MonitorStore::list_active_profiles`].
  fn list_alerts_in_levels<'a>(
    &'a self,
    levels: &'a [AlertLevel],
  ) -> impl Future<Output = Result<Rows<Alert, Self::Error>, Self::Error>> + Send + 'a;

  /// Full alert history for a subject, oldest first.
  fn list_alerts(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Alert>, Self::Error>> + Send + '_;

  // ── Contacts ──────────────────────────────────────────────────────────

  fn add_contact(
    &self,
    input: NewContact,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  /// Soft-delete a contact. Returns `false` if it was missing or already
  /// deleted.
  fn soft_delete_contact(
    &self,
    contact_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All of a subject's contacts, soft-deleted ones included. Eligibility
  /// filtering is the caller's concern.
  fn list_contacts(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  // ── Check-ins ─────────────────────────────────────────────────────────

  /// Insert a check-in row on its own, touching nothing else.
  fn create_check_in(
    &self,
    subject_id: Uuid,
    method: CheckInMethod,
    performed_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<CheckIn, Self::Error>> + Send + '_;

  /// The atomic check-in unit: insert the check-in, set the profile's
  /// `last_check_in_at`, and resolve the active alert if there is one. Either
  /// every write lands or none does.
  fn record_check_in(
    &self,
    subject_id: Uuid,
    method: CheckInMethod,
    performed_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<CheckInOutcome, Self::Error>> + Send + '_;

  /// A subject's check-ins, oldest first.
  fn list_check_ins(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CheckIn>, Self::Error>> + Send + '_;
}
