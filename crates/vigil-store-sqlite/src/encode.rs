//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Enums use their `strum` string forms.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use vigil_core::{
  alert::{Alert, AlertLevel},
  check_in::{CheckIn, CheckInMethod},
  contact::Contact,
  profile::Profile,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Time of day / timezone ───────────────────────────────────────────────────

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S").map_err(|_| Error::Decode {
    column: "preferred_check_in_time",
    value:  s.to_owned(),
  })
}

pub fn encode_tz(tz: Tz) -> String { tz.name().to_owned() }

fn decode_tz(s: &str) -> Result<Tz> {
  s.parse::<Tz>().map_err(|_| Error::Decode {
    column: "timezone",
    value:  s.to_owned(),
  })
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn encode_level(level: AlertLevel) -> &'static str {
  match level {
    AlertLevel::L1 => "l1",
    AlertLevel::L2 => "l2",
    AlertLevel::L3 => "l3",
    AlertLevel::L4 => "l4",
    AlertLevel::Cancelled => "cancelled",
    AlertLevel::Resolved => "resolved",
  }
}

fn decode_level(s: &str) -> Result<AlertLevel> {
  s.parse()
    .map_err(|_| Error::Core(vigil_core::Error::UnknownLevel(s.to_owned())))
}

pub fn encode_method(method: CheckInMethod) -> String { method.as_ref().to_owned() }

fn decode_method(s: &str) -> Result<CheckInMethod> {
  s.parse()
    .map_err(|_| Error::Core(vigil_core::Error::UnknownMethod(s.to_owned())))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `profiles` row, in
/// [`crate::schema::PROFILE_COLUMNS`] order.
pub struct RawProfile {
  pub subject_id:              String,
  pub display_name:            Option<String>,
  pub email:                   Option<String>,
  pub phone:                   Option<String>,
  pub last_check_in_at:        Option<String>,
  pub check_in_interval_hours: i64,
  pub preferred_check_in_time: Option<String>,
  pub timezone:                String,
  pub is_active:               bool,
  pub created_at:              String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:              row.get(0)?,
      display_name:            row.get(1)?,
      email:                   row.get(2)?,
      phone:                   row.get(3)?,
      last_check_in_at:        row.get(4)?,
      check_in_interval_hours: row.get(5)?,
      preferred_check_in_time: row.get(6)?,
      timezone:                row.get(7)?,
      is_active:               row.get(8)?,
      created_at:              row.get(9)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    let check_in_interval_hours = u32::try_from(self.check_in_interval_hours)
      .map_err(|_| Error::Decode {
        column: "check_in_interval_hours",
        value:  self.check_in_interval_hours.to_string(),
      })?;

    Ok(Profile {
      subject_id: decode_uuid(&self.subject_id)?,
      display_name: self.display_name,
      email: self.email,
      phone: self.phone,
      last_check_in_at: decode_opt_dt(self.last_check_in_at)?,
      check_in_interval_hours,
      preferred_check_in_time: self
        .preferred_check_in_time
        .as_deref()
        .map(decode_time)
        .transpose()?,
      timezone: decode_tz(&self.timezone)?,
      is_active: self.is_active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from an `alerts` row, in
/// [`crate::schema::ALERT_COLUMNS`] order.
pub struct RawAlert {
  pub alert_id:          String,
  pub subject_id:        String,
  pub level:             String,
  pub triggered_at:      String,
  pub last_escalated_at: Option<String>,
  pub resolved_at:       Option<String>,
  pub cancelled_at:      Option<String>,
  pub cancel_reason:     Option<String>,
}

impl RawAlert {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:          row.get(0)?,
      subject_id:        row.get(1)?,
      level:             row.get(2)?,
      triggered_at:      row.get(3)?,
      last_escalated_at: row.get(4)?,
      resolved_at:       row.get(5)?,
      cancelled_at:      row.get(6)?,
      cancel_reason:     row.get(7)?,
    })
  }

  pub fn into_alert(self) -> Result<Alert> {
    Ok(Alert {
      alert_id:          decode_uuid(&self.alert_id)?,
      subject_id:        decode_uuid(&self.subject_id)?,
      level:             decode_level(&self.level)?,
      triggered_at:      decode_dt(&self.triggered_at)?,
      last_escalated_at: decode_opt_dt(self.last_escalated_at)?,
      resolved_at:       decode_opt_dt(self.resolved_at)?,
      cancelled_at:      decode_opt_dt(self.cancelled_at)?,
      cancel_reason:     self.cancel_reason,
    })
  }
}

/// Raw values read directly from a `contacts` row, in
/// [`crate::schema::CONTACT_COLUMNS`] order.
pub struct RawContact {
  pub contact_id:      String,
  pub subject_id:      String,
  pub name:            String,
  pub priority:        i64,
  pub notify_by_email: bool,
  pub notify_by_sms:   bool,
  pub email:           Option<String>,
  pub phone:           Option<String>,
  pub created_at:      String,
  pub deleted_at:      Option<String>,
}

impl RawContact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contact_id:      row.get(0)?,
      subject_id:      row.get(1)?,
      name:            row.get(2)?,
      priority:        row.get(3)?,
      notify_by_email: row.get(4)?,
      notify_by_sms:   row.get(5)?,
      email:           row.get(6)?,
      phone:           row.get(7)?,
      created_at:      row.get(8)?,
      deleted_at:      row.get(9)?,
    })
  }

  pub fn into_contact(self) -> Result<Contact> {
    let priority = u32::try_from(self.priority).map_err(|_| Error::Decode {
      column: "priority",
      value:  self.priority.to_string(),
    })?;

    Ok(Contact {
      contact_id: decode_uuid(&self.contact_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      name: self.name,
      priority,
      notify_by_email: self.notify_by_email,
      notify_by_sms: self.notify_by_sms,
      email: self.email,
      phone: self.phone,
      created_at: decode_dt(&self.created_at)?,
      deleted_at: decode_opt_dt(self.deleted_at)?,
    })
  }
}

/// Raw values read directly from a `check_ins` row.
pub struct RawCheckIn {
  pub check_in_id:  String,
  pub subject_id:   String,
  pub method:       String,
  pub performed_at: String,
}

impl RawCheckIn {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      check_in_id:  row.get(0)?,
      subject_id:   row.get(1)?,
      method:       row.get(2)?,
      performed_at: row.get(3)?,
    })
  }

  pub fn into_check_in(self) -> Result<CheckIn> {
    Ok(CheckIn {
      check_in_id:  decode_uuid(&self.check_in_id)?,
      subject_id:   decode_uuid(&self.subject_id)?,
      method:       decode_method(&self.method)?,
      performed_at: decode_dt(&self.performed_at)?,
    })
  }
}
