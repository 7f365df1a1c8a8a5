//! Subject profiles: the monitored person and their check-in schedule.

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const MIN_INTERVAL_HOURS: u32 = 1;
pub const MAX_INTERVAL_HOURS: u32 = 168;
pub const DEFAULT_INTERVAL_HOURS: u32 = 24;

/// One monitored person.
///
/// `check_in_interval_hours` is always within
/// [`MIN_INTERVAL_HOURS`]..=[`MAX_INTERVAL_HOURS`]; the only way to change it
/// is through [`ProfileSettings::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub subject_id:              Uuid,
  pub display_name:            Option<String>,
  /// Fallback address for subject notifications when push fails.
  pub email:                   Option<String>,
  /// Last-resort number for subject notifications.
  pub phone:                   Option<String>,
  pub last_check_in_at:        Option<DateTime<Utc>>,
  pub check_in_interval_hours: u32,
  pub preferred_check_in_time: Option<NaiveTime>,
  pub timezone:                Tz,
  /// Monitoring on/off. Inactive profiles are never scanned.
  pub is_active:               bool,
  pub created_at:              DateTime<Utc>,
}

impl Profile {
  /// A freshly created profile with default settings.
  pub fn new(subject_id: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      subject_id,
      display_name: None,
      email: None,
      phone: None,
      last_check_in_at: None,
      check_in_interval_hours: DEFAULT_INTERVAL_HOURS,
      preferred_check_in_time: None,
      timezone: Tz::UTC,
      is_active: true,
      created_at: now,
    }
  }

  /// The name used in messages about this subject.
  pub fn name(&self) -> &str {
    self
      .display_name
      .as_deref()
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .unwrap_or("your contact")
  }
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// Unvalidated settings as submitted by the subject.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSettings {
  pub display_name:            Option<String>,
  pub email:                   Option<String>,
  pub phone:                   Option<String>,
  pub check_in_interval_hours: i64,
  /// Local wall-clock time, `HH:MM`.
  pub preferred_check_in_time: Option<String>,
  /// IANA zone name, e.g. `Europe/Berlin`.
  #[serde(default = "default_timezone")]
  pub timezone:                String,
  #[serde(default = "default_active")]
  pub is_active:               bool,
}

fn default_timezone() -> String { "UTC".to_owned() }

fn default_active() -> bool { true }

/// Settings that passed [`ProfileSettings::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSettings {
  pub display_name:            Option<String>,
  pub email:                   Option<String>,
  pub phone:                   Option<String>,
  pub check_in_interval_hours: u32,
  pub preferred_check_in_time: Option<NaiveTime>,
  pub timezone:                Tz,
  pub is_active:               bool,
}

impl ProfileSettings {
  pub fn validate(self) -> Result<ValidSettings> {
    let interval = self.check_in_interval_hours;
    let check_in_interval_hours = u32::try_from(interval)
      .ok()
      .filter(|h| (MIN_INTERVAL_HOURS..=MAX_INTERVAL_HOURS).contains(h))
      .ok_or(Error::InvalidInterval(interval))?;

    let timezone = self
      .timezone
      .trim()
      .parse::<Tz>()
      .map_err(|_| Error::UnknownTimezone(self.timezone.clone()))?;

    let preferred_check_in_time = self
      .preferred_check_in_time
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(parse_time_of_day)
      .transpose()?;

    Ok(ValidSettings {
      display_name: non_empty(self.display_name),
      email: non_empty(self.email),
      phone: non_empty(self.phone),
      check_in_interval_hours,
      preferred_check_in_time,
      timezone,
      is_active: self.is_active,
    })
  }
}

/// Parse `HH:MM` (or `HH:MM:SS`).
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M")
    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
    .map_err(|_| Error::InvalidPreferredTime(s.to_owned()))
}

fn non_empty(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn settings(hours: i64) -> ProfileSettings {
    ProfileSettings {
      display_name:            Some("  Ada ".into()),
      email:                   Some("".into()),
      phone:                   None,
      check_in_interval_hours: hours,
      preferred_check_in_time: Some("08:30".into()),
      timezone:                "Europe/Berlin".into(),
      is_active:               true,
    }
  }

  #[test]
  fn interval_bounds_are_enforced() {
    assert!(matches!(settings(0).validate(), Err(Error::InvalidInterval(0))));
    assert!(matches!(settings(-5).validate(), Err(Error::InvalidInterval(-5))));
    assert!(matches!(settings(169).validate(), Err(Error::InvalidInterval(169))));
    assert_eq!(settings(1).validate().unwrap().check_in_interval_hours, 1);
    assert_eq!(settings(168).validate().unwrap().check_in_interval_hours, 168);
  }

  #[test]
  fn validation_normalises_fields() {
    let valid = settings(24).validate().unwrap();
    assert_eq!(valid.display_name.as_deref(), Some("Ada"));
    assert_eq!(valid.email, None);
    assert_eq!(valid.timezone, chrono_tz::Europe::Berlin);
    assert_eq!(
      valid.preferred_check_in_time,
      Some(NaiveTime::from_hms_opt(8, 30, 0).unwrap())
    );
  }

  #[test]
  fn bad_timezone_and_time_are_rejected() {
    let mut s = settings(24);
    s.timezone = "Mars/Olympus".into();
    assert!(matches!(s.validate(), Err(Error::UnknownTimezone(_))));

    let mut s = settings(24);
    s.preferred_check_in_time = Some("25:00".into());
    assert!(matches!(s.validate(), Err(Error::InvalidPreferredTime(_))));
  }

  #[test]
  fn name_falls_back_when_unset() {
    let mut profile = Profile::new(Uuid::new_v4(), Utc::now());
    assert_eq!(profile.name(), "your contact");
    profile.display_name = Some("Grace".into());
    assert_eq!(profile.name(), "Grace");
  }
}
