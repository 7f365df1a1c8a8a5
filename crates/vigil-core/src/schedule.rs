//! When is a subject's next check-in due?

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::profile::Profile;

/// Compute the next due timestamp for `profile`.
///
/// The base is `last_check_in_at` (or `now` for a subject who never checked
/// in) plus the interval. With a preferred time of day, the result is the
/// first occurrence of that wall-clock time in the subject's timezone that is
/// not earlier than the base.
pub fn compute_next_due(profile: &Profile, now: DateTime<Utc>) -> DateTime<Utc> {
  let base = profile.last_check_in_at.unwrap_or(now)
    + Duration::hours(profile.check_in_interval_hours.into());

  let Some(preferred) = profile.preferred_check_in_time else {
    return base;
  };

  let local = base.with_timezone(&profile.timezone);
  let mut date = local.date_naive();
  if local.time() > preferred {
    date = date.succ_opt().unwrap_or(date);
  }

  resolve_local(&profile.timezone, date.and_time(preferred), base).unwrap_or(base)
}

/// Map a local wall-clock time to an instant. An ambiguous time (DST
/// fall-back) takes the earlier of its two instants that is not before
/// `base`; a time inside a spring-forward gap moves to the first valid
/// instant after the gap.
fn resolve_local(
  tz: &Tz,
  naive: NaiveDateTime,
  base: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
  match tz.from_local_datetime(&naive) {
    LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
    LocalResult::Ambiguous(earliest, latest) => {
      let earliest = earliest.with_timezone(&Utc);
      let latest = latest.with_timezone(&Utc);
      Some(if earliest >= base { earliest } else { latest })
    }
    LocalResult::None => (1..=4)
      .map(|h| naive + Duration::hours(h))
      .find_map(|shifted| tz.from_local_datetime(&shifted).earliest())
      .map(|dt| dt.with_timezone(&Utc)),
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveTime;
  use uuid::Uuid;

  use super::*;

  fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
  }

  fn profile(last: Option<DateTime<Utc>>, hours: u32) -> Profile {
    let mut p = Profile::new(Uuid::new_v4(), at(2026, 1, 1, 0, 0));
    p.last_check_in_at = last;
    p.check_in_interval_hours = hours;
    p
  }

  #[test]
  fn base_due_without_preferred_time() {
    let last = at(2026, 5, 1, 10, 0);
    let p = profile(Some(last), 24);
    assert_eq!(compute_next_due(&p, at(2026, 5, 1, 12, 0)), at(2026, 5, 2, 10, 0));
  }

  #[test]
  fn never_checked_in_counts_from_now() {
    let now = at(2026, 5, 1, 12, 0);
    let p = profile(None, 6);
    assert_eq!(compute_next_due(&p, now), at(2026, 5, 1, 18, 0));
  }

  #[test]
  fn preferred_time_later_same_day() {
    let mut p = profile(Some(at(2026, 5, 1, 6, 0)), 24);
    p.preferred_check_in_time = NaiveTime::from_hms_opt(9, 0, 0);
    // Base is 2026-05-02 06:00 UTC; 09:00 that day is still ahead.
    assert_eq!(compute_next_due(&p, at(2026, 5, 1, 7, 0)), at(2026, 5, 2, 9, 0));
  }

  #[test]
  fn preferred_time_already_passed_rolls_to_next_day() {
    let mut p = profile(Some(at(2026, 5, 1, 20, 0)), 24);
    p.preferred_check_in_time = NaiveTime::from_hms_opt(9, 0, 0);
    assert_eq!(compute_next_due(&p, at(2026, 5, 1, 21, 0)), at(2026, 5, 3, 9, 0));
  }

  #[test]
  fn preferred_time_equal_to_base_is_kept() {
    let mut p = profile(Some(at(2026, 5, 1, 9, 0)), 24);
    p.preferred_check_in_time = NaiveTime::from_hms_opt(9, 0, 0);
    assert_eq!(compute_next_due(&p, at(2026, 5, 1, 10, 0)), at(2026, 5, 2, 9, 0));
  }

  #[test]
  fn preferred_time_uses_subject_timezone() {
    // 08:00 in New York (EDT, UTC-4) is 12:00 UTC.
    let mut p = profile(Some(at(2026, 6, 10, 2, 0)), 24);
    p.timezone = chrono_tz::America::New_York;
    p.preferred_check_in_time = NaiveTime::from_hms_opt(8, 0, 0);
    // Base: 2026-06-11 02:00 UTC = 2026-06-10 22:00 local, past 08:00, so
    // the next occurrence is 2026-06-11 08:00 local.
    assert_eq!(compute_next_due(&p, at(2026, 6, 10, 3, 0)), at(2026, 6, 11, 12, 0));
  }

  #[test]
  fn preferred_time_inside_dst_gap_moves_forward() {
    // Europe/Berlin springs forward 2026-03-29 02:00 -> 03:00.
    let mut p = profile(Some(at(2026, 3, 27, 23, 0)), 24);
    p.timezone = chrono_tz::Europe::Berlin;
    p.preferred_check_in_time = NaiveTime::from_hms_opt(2, 30, 0);
    // Base: 2026-03-28 23:00 UTC = 2026-03-29 00:00 local (CET), before 02:30.
    // 02:30 does not exist that day; 03:30 CEST = 01:30 UTC.
    assert_eq!(compute_next_due(&p, at(2026, 3, 28, 0, 0)), at(2026, 3, 29, 1, 30));
  }

  #[test]
  fn repeated_hour_takes_the_first_pass_when_base_precedes_it() {
    // New York falls back 2026-11-01 02:00 EDT -> 01:00 EST, so 01:00-02:00
    // local happens twice: 05:00-06:00 UTC, then 06:00-07:00 UTC.
    let mut p = profile(Some(at(2026, 10, 31, 4, 0)), 24);
    p.timezone = chrono_tz::America::New_York;
    p.preferred_check_in_time = NaiveTime::from_hms_opt(1, 30, 0);
    // Base: 2026-11-01 04:00 UTC = 00:00 EDT.
    assert_eq!(compute_next_due(&p, at(2026, 10, 31, 5, 0)), at(2026, 11, 1, 5, 30));
  }

  #[test]
  fn repeated_hour_never_resolves_before_the_base() {
    let mut p = profile(Some(at(2026, 10, 31, 6, 15)), 24);
    p.timezone = chrono_tz::America::New_York;
    p.preferred_check_in_time = NaiveTime::from_hms_opt(1, 45, 0);
    // Base: 2026-11-01 06:15 UTC = 01:15 EST, the second pass. The first
    // 01:45 (05:45 UTC) is already behind it.
    let due = compute_next_due(&p, at(2026, 10, 31, 7, 0));
    assert_eq!(due, at(2026, 11, 1, 6, 45));
    assert!(due >= at(2026, 11, 1, 6, 15));
  }
}
