//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;
use vigil_core::{
  alert::AlertLevel,
  check_in::CheckInMethod,
  contact::NewContact,
  profile::ProfileSettings,
  store::MonitorStore,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t0() -> chrono::DateTime<Utc> { Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap() }

fn new_contact(subject_id: Uuid, name: &str, priority: i64) -> NewContact {
  NewContact {
    subject_id,
    name: name.into(),
    priority,
    notify_by_email: true,
    notify_by_sms: false,
    email: Some(format!("{}@example.com", name.to_lowercase())),
    phone: None,
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ensure_profile_creates_defaults_once() {
  let s = store().await;
  let id = Uuid::new_v4();

  assert!(s.get_profile(id).await.unwrap().is_none());

  let created = s.ensure_profile(id, t0()).await.unwrap();
  assert_eq!(created.subject_id, id);
  assert_eq!(created.created_at, t0());
  assert_eq!(created.check_in_interval_hours, 24);
  assert_eq!(created.timezone, chrono_tz::Tz::UTC);
  assert!(created.is_active);
  assert!(created.last_check_in_at.is_none());

  s.update_last_check_in(id, t0()).await.unwrap();
  let again = s.ensure_profile(id, t0() + Duration::hours(3)).await.unwrap();
  assert_eq!(again.last_check_in_at, Some(t0()));
  assert_eq!(again.created_at, created.created_at);
}

#[tokio::test]
async fn update_profile_roundtrips_settings() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();
  s.update_last_check_in(id, t0()).await.unwrap();

  let settings = ProfileSettings {
    display_name:            Some("Ada".into()),
    email:                   Some("ada@example.com".into()),
    phone:                   Some("+15550101".into()),
    check_in_interval_hours: 12,
    preferred_check_in_time: Some("07:45".into()),
    timezone:                "Asia/Tokyo".into(),
    is_active:               false,
  }
  .validate()
  .unwrap();

  let updated = s.update_profile(id, settings, t0()).await.unwrap();
  assert_eq!(updated.display_name.as_deref(), Some("Ada"));
  assert_eq!(updated.check_in_interval_hours, 12);
  assert_eq!(updated.timezone, chrono_tz::Asia::Tokyo);
  assert_eq!(
    updated.preferred_check_in_time,
    chrono::NaiveTime::from_hms_opt(7, 45, 0)
  );
  assert!(!updated.is_active);
  // Settings never touch the check-in timestamp.
  assert_eq!(updated.last_check_in_at, Some(t0()));
}

#[tokio::test]
async fn list_active_profiles_skips_inactive() {
  let s = store().await;
  let on = Uuid::new_v4();
  let off = Uuid::new_v4();
  s.ensure_profile(on, t0()).await.unwrap();
  s.ensure_profile(off, t0()).await.unwrap();

  let mut settings = ProfileSettings {
    display_name:            None,
    email:                   None,
    phone:                   None,
    check_in_interval_hours: 24,
    preferred_check_in_time: None,
    timezone:                "UTC".into(),
    is_active:               false,
  };
  s.update_profile(off, settings.clone().validate().unwrap(), t0())
    .await
    .unwrap();
  settings.is_active = true;
  s.update_profile(on, settings.validate().unwrap(), t0()).await.unwrap();

  let active = s.list_active_profiles().await.unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].as_ref().unwrap().subject_id, on);
}

#[tokio::test]
async fn undecodable_profile_does_not_hide_the_rest() {
  let s = store().await;
  let good = Uuid::new_v4();
  s.ensure_profile(good, t0()).await.unwrap();
  s.execute_batch(
    "INSERT INTO profiles (subject_id, timezone, created_at)
     VALUES ('6f1c1d2e-0000-4000-8000-000000000001', 'Mars/Olympus',
             '2026-04-01T08:00:00+00:00');",
  )
  .await
  .unwrap();

  let rows = s.list_active_profiles().await.unwrap();
  assert_eq!(rows.len(), 2);
  let (ok, bad): (Vec<_>, Vec<_>) = rows.into_iter().partition(Result::is_ok);
  assert_eq!(ok.len(), 1);
  assert_eq!(ok[0].as_ref().unwrap().subject_id, good);
  assert!(matches!(
    bad[0],
    Err(crate::Error::Decode { column: "timezone", .. })
  ));
}

// ─── Alerts ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_alert_refuses_a_second_active_alert() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();

  let first = s.create_alert(id, t0()).await.unwrap().unwrap();
  assert_eq!(first.level, AlertLevel::L1);
  assert_eq!(first.triggered_at, t0());

  assert!(s.create_alert(id, t0()).await.unwrap().is_none());
  assert_eq!(s.list_alerts(id).await.unwrap().len(), 1);

  // Once the first is closed a new one may be created.
  s.resolve_alert(first.alert_id, t0() + Duration::hours(1))
    .await
    .unwrap()
    .unwrap();
  assert!(s.create_alert(id, t0() + Duration::hours(2)).await.unwrap().is_some());
}

#[tokio::test]
async fn update_alert_level_is_conditional_on_current_level() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();
  let alert = s.create_alert(id, t0()).await.unwrap().unwrap();
  let at = t0() + Duration::hours(24);

  let l2 = s
    .update_alert_level(alert.alert_id, AlertLevel::L1, AlertLevel::L2, at)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(l2.level, AlertLevel::L2);
  assert_eq!(l2.last_escalated_at, Some(at));

  // A stale writer that still believes the alert is at L1 changes nothing.
  let stale = s
    .update_alert_level(alert.alert_id, AlertLevel::L1, AlertLevel::L2, at)
    .await
    .unwrap();
  assert!(stale.is_none());
}

#[tokio::test]
async fn update_alert_level_rejects_illegal_transitions() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();
  let alert = s.create_alert(id, t0()).await.unwrap().unwrap();

  for (from, to) in [
    (AlertLevel::L1, AlertLevel::L3),
    (AlertLevel::L2, AlertLevel::L1),
    (AlertLevel::L1, AlertLevel::Resolved),
  ] {
    let err = s
      .update_alert_level(alert.alert_id, from, to, t0())
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      crate::Error::Core(vigil_core::Error::InvalidTransition { .. })
    ));
  }
}

#[tokio::test]
async fn cancel_records_reason_and_is_terminal() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();
  let alert = s.create_alert(id, t0()).await.unwrap().unwrap();
  let at = t0() + Duration::hours(3);

  let cancelled = s
    .cancel_alert(alert.alert_id, at, Some("false alarm".into()))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(cancelled.level, AlertLevel::Cancelled);
  assert_eq!(cancelled.cancelled_at, Some(at));
  assert_eq!(cancelled.cancel_reason.as_deref(), Some("false alarm"));

  assert!(s.cancel_alert(alert.alert_id, at, None).await.unwrap().is_none());
  assert!(s.resolve_alert(alert.alert_id, at).await.unwrap().is_none());
  assert!(s.find_active_alert(id).await.unwrap().is_none());
}

#[tokio::test]
async fn list_alerts_in_levels_filters_across_subjects() {
  let s = store().await;
  let a = Uuid::new_v4();
  let b = Uuid::new_v4();
  s.ensure_profile(a, t0()).await.unwrap();
  s.ensure_profile(b, t0()).await.unwrap();

  let alert_a = s.create_alert(a, t0()).await.unwrap().unwrap();
  let alert_b = s.create_alert(b, t0()).await.unwrap().unwrap();
  s.update_alert_level(alert_b.alert_id, AlertLevel::L1, AlertLevel::L2, t0())
    .await
    .unwrap();

  let l1 = s.list_alerts_in_levels(&[AlertLevel::L1]).await.unwrap();
  assert_eq!(l1.len(), 1);
  assert_eq!(l1[0].as_ref().unwrap().alert_id, alert_a.alert_id);

  let both = s
    .list_alerts_in_levels(&AlertLevel::ESCALATABLE)
    .await
    .unwrap();
  assert_eq!(both.len(), 2);

  assert!(s.list_alerts_in_levels(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn undecodable_alert_does_not_hide_the_rest() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();
  let good = s.create_alert(id, t0()).await.unwrap().unwrap();
  // A second subject whose alert row carries an unparseable timestamp.
  s.execute_batch(
    "INSERT INTO profiles (subject_id, created_at)
     VALUES ('6f1c1d2e-0000-4000-8000-000000000002', '2026-04-01T08:00:00+00:00');
     INSERT INTO alerts (alert_id, subject_id, level, triggered_at)
     VALUES ('6f1c1d2e-0000-4000-8000-0000000000a2',
             '6f1c1d2e-0000-4000-8000-000000000002', 'l1', 'yesterday');",
  )
  .await
  .unwrap();

  let rows = s.list_alerts_in_levels(&AlertLevel::ESCALATABLE).await.unwrap();
  assert_eq!(rows.len(), 2);
  let decoded: Vec<_> = rows.iter().filter_map(|r| r.as_ref().ok()).collect();
  assert_eq!(decoded.len(), 1);
  assert_eq!(decoded[0].alert_id, good.alert_id);
  assert!(rows.iter().any(|r| matches!(r, Err(crate::Error::DateParse(_)))));
}

// ─── Contacts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn soft_deleted_contacts_are_still_listed() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();

  let second = s.add_contact(new_contact(id, "Bob", 2), t0()).await.unwrap();
  let first = s.add_contact(new_contact(id, "Ann", 1), t0()).await.unwrap();

  assert!(s.soft_delete_contact(first.contact_id, t0()).await.unwrap());
  assert!(!s.soft_delete_contact(first.contact_id, t0()).await.unwrap());

  let contacts = s.list_contacts(id).await.unwrap();
  assert_eq!(contacts.len(), 2);
  assert_eq!(contacts[0].contact_id, first.contact_id);
  assert_eq!(contacts[0].deleted_at, Some(t0()));
  assert_eq!(contacts[1].contact_id, second.contact_id);
  assert!(contacts[1].deleted_at.is_none());
}

#[tokio::test]
async fn add_contact_rejects_non_positive_priority() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();

  let err = s.add_contact(new_contact(id, "Zed", 0), t0()).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(vigil_core::Error::InvalidPriority(0))
  ));
}

// ─── Check-ins ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_check_in_resolves_active_alert() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();
  let alert = s.create_alert(id, t0()).await.unwrap().unwrap();
  let at = t0() + Duration::hours(5);

  let outcome = s
    .record_check_in(id, CheckInMethod::Biometric, at)
    .await
    .unwrap();
  assert_eq!(outcome.check_in.method, CheckInMethod::Biometric);
  assert_eq!(outcome.check_in.performed_at, at);

  let resolved = outcome.resolved.unwrap();
  assert_eq!(resolved.alert_id, alert.alert_id);
  assert_eq!(resolved.level, AlertLevel::Resolved);
  assert_eq!(resolved.resolved_at, Some(at));

  let profile = s.get_profile(id).await.unwrap().unwrap();
  assert_eq!(profile.last_check_in_at, Some(at));
  assert_eq!(s.list_check_ins(id).await.unwrap().len(), 1);
  assert!(s.find_active_alert(id).await.unwrap().is_none());
}

#[tokio::test]
async fn record_check_in_without_alert_resolves_nothing() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();

  let outcome = s.record_check_in(id, CheckInMethod::Manual, t0()).await.unwrap();
  assert!(outcome.resolved.is_none());
  assert_eq!(
    s.get_profile(id).await.unwrap().unwrap().last_check_in_at,
    Some(t0())
  );
}

#[tokio::test]
async fn record_check_in_for_missing_profile_writes_nothing() {
  let s = store().await;
  let id = Uuid::new_v4();

  let err = s
    .record_check_in(id, CheckInMethod::Manual, t0())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::ProfileNotFound(missing) if missing == id));
  assert!(s.list_check_ins(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn record_check_in_is_all_or_nothing() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();
  s.update_last_check_in(id, t0()).await.unwrap();
  let alert = s
    .create_alert(id, t0() + Duration::hours(25))
    .await
    .unwrap()
    .unwrap();

  // Make the final write of the unit (resolving the alert) fail.
  s.execute_batch(
    "CREATE TRIGGER fail_resolve BEFORE UPDATE OF level ON alerts
     BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
  )
  .await
  .unwrap();

  let result = s
    .record_check_in(id, CheckInMethod::Manual, t0() + Duration::hours(26))
    .await;
  assert!(matches!(result, Err(crate::Error::Database(_))));

  // Neither the check-in nor the profile update survived.
  assert!(s.list_check_ins(id).await.unwrap().is_empty());
  let profile = s.get_profile(id).await.unwrap().unwrap();
  assert_eq!(profile.last_check_in_at, Some(t0()));
  let still_active = s.find_active_alert(id).await.unwrap().unwrap();
  assert_eq!(still_active.alert_id, alert.alert_id);
  assert_eq!(still_active.level, AlertLevel::L1);
}

#[tokio::test]
async fn create_check_in_touches_nothing_else() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.ensure_profile(id, t0()).await.unwrap();
  s.create_alert(id, t0()).await.unwrap().unwrap();

  let check_in = s
    .create_check_in(id, CheckInMethod::Conversation, t0())
    .await
    .unwrap();
  assert_eq!(s.list_check_ins(id).await.unwrap(), vec![check_in]);
  assert!(s.find_active_alert(id).await.unwrap().is_some());
  assert!(s.get_profile(id).await.unwrap().unwrap().last_check_in_at.is_none());
}
