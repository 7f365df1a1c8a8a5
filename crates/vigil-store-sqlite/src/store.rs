//! [`SqliteStore`], the SQLite implementation of [`MonitorStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use vigil_core::{
  alert::{Alert, AlertLevel},
  check_in::{CheckIn, CheckInMethod, CheckInOutcome},
  contact::{Contact, NewContact},
  profile::{Profile, ValidSettings},
  store::{MonitorStore, Rows},
};

use crate::{
  encode::{
    encode_dt, encode_level, encode_method, encode_time, encode_tz, encode_uuid,
    RawAlert, RawCheckIn, RawContact, RawProfile,
  },
  schema::{ACTIVE_LEVELS, ALERT_COLUMNS, CONTACT_COLUMNS, PROFILE_COLUMNS, SCHEMA},
  Error, Result,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn select_profile(
  conn: &rusqlite::Connection,
  subject_id: &str,
) -> rusqlite::Result<Option<RawProfile>> {
  conn
    .query_row(
      &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE subject_id = ?1"),
      rusqlite::params![subject_id],
      RawProfile::from_row,
    )
    .optional()
}

fn select_alert(
  conn: &rusqlite::Connection,
  alert_id: &str,
) -> rusqlite::Result<Option<RawAlert>> {
  conn
    .query_row(
      &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE alert_id = ?1"),
      rusqlite::params![alert_id],
      RawAlert::from_row,
    )
    .optional()
}

fn select_active_alert(
  conn: &rusqlite::Connection,
  subject_id: &str,
) -> rusqlite::Result<Option<RawAlert>> {
  conn
    .query_row(
      &format!(
        "SELECT {ALERT_COLUMNS} FROM alerts
         WHERE subject_id = ?1 AND level IN {ACTIVE_LEVELS}
         ORDER BY triggered_at DESC
         LIMIT 1"
      ),
      rusqlite::params![subject_id],
      RawAlert::from_row,
    )
    .optional()
}

/// Decode one row of a batch listing. A bad row becomes an `Err` entry of its
/// own instead of failing the listing.
fn decode_row<R, T>(
  row: rusqlite::Result<R>,
  decode: impl FnOnce(R) -> Result<T>,
) -> Result<T> {
  decode(row.map_err(tokio_rusqlite::Error::from)?)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Vigil monitor store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every call
/// runs on the connection's own thread, one at a time.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run raw SQL against the connection. Tests use it to inject failures.
  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a conditional `UPDATE` on one alert and return the row afterwards,
  /// or `None` if the condition matched nothing.
  async fn update_alert_where(
    &self,
    alert_id: Uuid,
    sql: String,
    params: Vec<Option<String>>,
  ) -> Result<Option<Alert>> {
    let id_str = encode_uuid(alert_id);

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut bound: Vec<Option<String>> = vec![Some(id_str.clone())];
        bound.extend(params);
        let changed =
          conn.execute(&sql, rusqlite::params_from_iter(bound.iter()))?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_alert(conn, &id_str)?)
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }
}

// ─── MonitorStore impl ───────────────────────────────────────────────────────

impl MonitorStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn get_profile(&self, subject_id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(subject_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| Ok(select_profile(conn, &id_str)?))
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn ensure_profile(
    &self,
    subject_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Profile> {
    let id_str = encode_uuid(subject_id);
    let at_str = encode_dt(now);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        // Every other column takes its schema default, which matches
        // `Profile::new`.
        conn.execute(
          "INSERT INTO profiles (subject_id, created_at) VALUES (?1, ?2)
           ON CONFLICT (subject_id) DO NOTHING",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(select_profile(conn, &id_str)?)
      })
      .await?;

    raw
      .ok_or(Error::ProfileNotFound(subject_id))?
      .into_profile()
  }

  async fn update_profile(
    &self,
    subject_id: Uuid,
    settings: ValidSettings,
    now: DateTime<Utc>,
  ) -> Result<Profile> {
    let id_str    = encode_uuid(subject_id);
    let at_str    = encode_dt(now);
    let time_str  = settings.preferred_check_in_time.map(encode_time);
    let tz_str    = encode_tz(settings.timezone);
    let interval  = i64::from(settings.check_in_interval_hours);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (
             subject_id, display_name, email, phone, check_in_interval_hours,
             preferred_check_in_time, timezone, is_active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
           ON CONFLICT (subject_id) DO UPDATE SET
             display_name            = excluded.display_name,
             email                   = excluded.email,
             phone                   = excluded.phone,
             check_in_interval_hours = excluded.check_in_interval_hours,
             preferred_check_in_time = excluded.preferred_check_in_time,
             timezone                = excluded.timezone,
             is_active               = excluded.is_active",
          rusqlite::params![
            id_str,
            settings.display_name,
            settings.email,
            settings.phone,
            interval,
            time_str,
            tz_str,
            settings.is_active,
            at_str,
          ],
        )?;
        Ok(select_profile(conn, &id_str)?)
      })
      .await?;

    raw
      .ok_or(Error::ProfileNotFound(subject_id))?
      .into_profile()
  }

  async fn update_last_check_in(
    &self,
    subject_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let id_str = encode_uuid(subject_id);
    let at_str = encode_dt(at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE profiles SET last_check_in_at = ?2 WHERE subject_id = ?1",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn list_active_profiles(&self) -> Result<Rows<Profile, Error>> {
    let rows: Vec<rusqlite::Result<RawProfile>> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles WHERE is_active = 1"
        ))?;
        let rows = stmt
          .query_map([], RawProfile::from_row)?
          .collect::<Vec<_>>();
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|row| decode_row(row, RawProfile::into_profile))
        .collect(),
    )
  }

  // ── Alerts ────────────────────────────────────────────────────────────────

  async fn create_alert(
    &self,
    subject_id: Uuid,
    triggered_at: DateTime<Utc>,
  ) -> Result<Option<Alert>> {
    let alert = Alert {
      alert_id: Uuid::new_v4(),
      subject_id,
      level: AlertLevel::L1,
      triggered_at,
      last_escalated_at: None,
      resolved_at: None,
      cancelled_at: None,
      cancel_reason: None,
    };

    let alert_id_str   = encode_uuid(alert.alert_id);
    let subject_id_str = encode_uuid(subject_id);
    let at_str         = encode_dt(triggered_at);

    let inserted = self
      .conn
      .call(move |conn| {
        // Guarded insert: a concurrent creator loses instead of producing a
        // second active alert.
        Ok(conn.execute(
          &format!(
            "INSERT INTO alerts (alert_id, subject_id, level, triggered_at)
             SELECT ?1, ?2, 'l1', ?3
             WHERE NOT EXISTS (
               SELECT 1 FROM alerts WHERE subject_id = ?2 AND level IN {ACTIVE_LEVELS}
             )"
          ),
          rusqlite::params![alert_id_str, subject_id_str, at_str],
        )?)
      })
      .await?;

    Ok((inserted == 1).then_some(alert))
  }

  async fn update_alert_level(
    &self,
    alert_id: Uuid,
    from: AlertLevel,
    to: AlertLevel,
    last_escalated_at: DateTime<Utc>,
  ) -> Result<Option<Alert>> {
    if !to.is_active() || !from.can_transition_to(to) {
      return Err(vigil_core::Error::InvalidTransition { from, to }.into());
    }

    self
      .update_alert_where(
        alert_id,
        "UPDATE alerts SET level = ?3, last_escalated_at = ?4
         WHERE alert_id = ?1 AND level = ?2"
          .to_owned(),
        vec![
          Some(encode_level(from).to_owned()),
          Some(encode_level(to).to_owned()),
          Some(encode_dt(last_escalated_at)),
        ],
      )
      .await
  }

  async fn resolve_alert(
    &self,
    alert_id: Uuid,
    resolved_at: DateTime<Utc>,
  ) -> Result<Option<Alert>> {
    self
      .update_alert_where(
        alert_id,
        format!(
          "UPDATE alerts SET level = 'resolved', resolved_at = ?2
           WHERE alert_id = ?1 AND level IN {ACTIVE_LEVELS}"
        ),
        vec![Some(encode_dt(resolved_at))],
      )
      .await
  }

  async fn cancel_alert(
    &self,
    alert_id: Uuid,
    cancelled_at: DateTime<Utc>,
    reason: Option<String>,
  ) -> Result<Option<Alert>> {
    self
      .update_alert_where(
        alert_id,
        format!(
          "UPDATE alerts SET level = 'cancelled', cancelled_at = ?2, cancel_reason = ?3
           WHERE alert_id = ?1 AND level IN {ACTIVE_LEVELS}"
        ),
        vec![Some(encode_dt(cancelled_at)), reason],
      )
      .await
  }

  async fn get_alert(&self, alert_id: Uuid) -> Result<Option<Alert>> {
    let id_str = encode_uuid(alert_id);

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| Ok(select_alert(conn, &id_str)?))
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn find_active_alert(&self, subject_id: Uuid) -> Result<Option<Alert>> {
    let id_str = encode_uuid(subject_id);

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| Ok(select_active_alert(conn, &id_str)?))
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn list_alerts_in_levels(
    &self,
    levels: &[AlertLevel],
  ) -> Result<Rows<Alert, Error>> {
    if levels.is_empty() {
      return Ok(Vec::new());
    }
    let level_strs: Vec<&'static str> =
      levels.iter().copied().map(encode_level).collect();

    let rows: Vec<rusqlite::Result<RawAlert>> = self
      .conn
      .call(move |conn| {
        let placeholders = vec!["?"; level_strs.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
          "SELECT {ALERT_COLUMNS} FROM alerts
           WHERE level IN ({placeholders})
           ORDER BY triggered_at"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(level_strs.iter()),
            RawAlert::from_row,
          )?
          .collect::<Vec<_>>();
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|row| decode_row(row, RawAlert::into_alert))
        .collect(),
    )
  }

  async fn list_alerts(&self, subject_id: Uuid) -> Result<Vec<Alert>> {
    let id_str = encode_uuid(subject_id);

    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ALERT_COLUMNS} FROM alerts
           WHERE subject_id = ?1
           ORDER BY triggered_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawAlert::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_alert).collect()
  }

  // ── Contacts ──────────────────────────────────────────────────────────────

  async fn add_contact(
    &self,
    input: NewContact,
    now: DateTime<Utc>,
  ) -> Result<Contact> {
    let priority = input.validated_priority()?;
    let contact = Contact {
      contact_id:      Uuid::new_v4(),
      subject_id:      input.subject_id,
      name:            input.name,
      priority,
      notify_by_email: input.notify_by_email,
      notify_by_sms:   input.notify_by_sms,
      email:           input.email,
      phone:           input.phone,
      created_at:      now,
      deleted_at:      None,
    };

    let contact_id_str = encode_uuid(contact.contact_id);
    let subject_id_str = encode_uuid(contact.subject_id);
    let at_str         = encode_dt(contact.created_at);
    let name           = contact.name.clone();
    let email          = contact.email.clone();
    let phone          = contact.phone.clone();
    let by_email       = contact.notify_by_email;
    let by_sms         = contact.notify_by_sms;
    let priority       = i64::from(priority);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contacts (
             contact_id, subject_id, name, priority, notify_by_email,
             notify_by_sms, email, phone, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            contact_id_str,
            subject_id_str,
            name,
            priority,
            by_email,
            by_sms,
            email,
            phone,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(contact)
  }

  async fn soft_delete_contact(
    &self,
    contact_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let id_str = encode_uuid(contact_id);
    let at_str = encode_dt(at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE contacts SET deleted_at = ?2
           WHERE contact_id = ?1 AND deleted_at IS NULL",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn list_contacts(&self, subject_id: Uuid) -> Result<Vec<Contact>> {
    let id_str = encode_uuid(subject_id);

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts
           WHERE subject_id = ?1
           ORDER BY priority, created_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  // ── Check-ins ─────────────────────────────────────────────────────────────

  async fn create_check_in(
    &self,
    subject_id: Uuid,
    method: CheckInMethod,
    performed_at: DateTime<Utc>,
  ) -> Result<CheckIn> {
    let check_in = CheckIn {
      check_in_id: Uuid::new_v4(),
      subject_id,
      method,
      performed_at,
    };

    let check_in_id_str = encode_uuid(check_in.check_in_id);
    let subject_id_str  = encode_uuid(subject_id);
    let method_str      = encode_method(method);
    let at_str          = encode_dt(performed_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO check_ins (check_in_id, subject_id, method, performed_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![check_in_id_str, subject_id_str, method_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(check_in)
  }

  async fn record_check_in(
    &self,
    subject_id: Uuid,
    method: CheckInMethod,
    performed_at: DateTime<Utc>,
  ) -> Result<CheckInOutcome> {
    let check_in = CheckIn {
      check_in_id: Uuid::new_v4(),
      subject_id,
      method,
      performed_at,
    };

    let check_in_id_str = encode_uuid(check_in.check_in_id);
    let subject_id_str  = encode_uuid(subject_id);
    let method_str      = encode_method(method);
    let at_str          = encode_dt(performed_at);

    // Outer `None`: the profile does not exist and the transaction was rolled
    // back. Inner `Option`: the alert this check-in resolved, if any.
    let committed: Option<Option<RawAlert>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO check_ins (check_in_id, subject_id, method, performed_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![check_in_id_str, subject_id_str, method_str, at_str],
        )?;

        let updated = tx.execute(
          "UPDATE profiles SET last_check_in_at = ?2 WHERE subject_id = ?1",
          rusqlite::params![subject_id_str, at_str],
        )?;
        if updated == 0 {
          // Dropping `tx` rolls back the check-in insert.
          return Ok(None);
        }

        let resolved = match select_active_alert(&tx, &subject_id_str)? {
          Some(active) => {
            tx.execute(
              "UPDATE alerts SET level = 'resolved', resolved_at = ?2
               WHERE alert_id = ?1",
              rusqlite::params![active.alert_id, at_str],
            )?;
            select_alert(&tx, &active.alert_id)?
          }
          None => None,
        };

        tx.commit()?;
        Ok(Some(resolved))
      })
      .await?;

    let resolved = committed.ok_or(Error::ProfileNotFound(subject_id))?;
    Ok(CheckInOutcome {
      check_in,
      resolved: resolved.map(RawAlert::into_alert).transpose()?,
    })
  }

  async fn list_check_ins(&self, subject_id: Uuid) -> Result<Vec<CheckIn>> {
    let id_str = encode_uuid(subject_id);

    let raws: Vec<RawCheckIn> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT check_in_id, subject_id, method, performed_at FROM check_ins
           WHERE subject_id = ?1
           ORDER BY performed_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawCheckIn::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCheckIn::into_check_in).collect()
  }
}
