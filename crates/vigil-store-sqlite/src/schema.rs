//! SQL schema for the Vigil SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    subject_id              TEXT PRIMARY KEY,
    display_name            TEXT,
    email                   TEXT,
    phone                   TEXT,
    last_check_in_at        TEXT,            -- RFC 3339 UTC or NULL
    check_in_interval_hours INTEGER NOT NULL DEFAULT 24
        CHECK (check_in_interval_hours BETWEEN 1 AND 168),
    preferred_check_in_time TEXT,            -- 'HH:MM:SS' local time or NULL
    timezone                TEXT NOT NULL DEFAULT 'UTC',
    is_active               INTEGER NOT NULL DEFAULT 1,
    created_at              TEXT NOT NULL
);

-- At most one row per subject may hold an active level ('l1'..'l4'). This is
-- kept by the conditional writes in store.rs, not by a constraint.
CREATE TABLE IF NOT EXISTS alerts (
    alert_id          TEXT PRIMARY KEY,
    subject_id        TEXT NOT NULL REFERENCES profiles(subject_id),
    level             TEXT NOT NULL,
    triggered_at      TEXT NOT NULL,
    last_escalated_at TEXT,
    resolved_at       TEXT,
    cancelled_at      TEXT,
    cancel_reason     TEXT
);

CREATE TABLE IF NOT EXISTS contacts (
    contact_id      TEXT PRIMARY KEY,
    subject_id      TEXT NOT NULL REFERENCES profiles(subject_id),
    name            TEXT NOT NULL,
    priority        INTEGER NOT NULL CHECK (priority >= 1),
    notify_by_email INTEGER NOT NULL DEFAULT 0,
    notify_by_sms   INTEGER NOT NULL DEFAULT 0,
    email           TEXT,
    phone           TEXT,
    created_at      TEXT NOT NULL,
    deleted_at      TEXT
);

-- Check-ins are strictly append-only.
CREATE TABLE IF NOT EXISTS check_ins (
    check_in_id  TEXT PRIMARY KEY,
    subject_id   TEXT NOT NULL REFERENCES profiles(subject_id),
    method       TEXT NOT NULL,   -- 'manual' | 'biometric' | 'conversation'
    performed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS alerts_subject_level_idx ON alerts(subject_id, level);
CREATE INDEX IF NOT EXISTS alerts_level_idx         ON alerts(level);
CREATE INDEX IF NOT EXISTS contacts_subject_idx     ON contacts(subject_id);
CREATE INDEX IF NOT EXISTS check_ins_subject_idx    ON check_ins(subject_id);

PRAGMA user_version = 1;
";

/// SQL list of the active alert levels, for `level IN (...)` filters.
pub const ACTIVE_LEVELS: &str = "('l1', 'l2', 'l3', 'l4')";

/// Column list shared by every alert query; matches [`crate::encode::RawAlert`].
pub const ALERT_COLUMNS: &str = "alert_id, subject_id, level, triggered_at, \
  last_escalated_at, resolved_at, cancelled_at, cancel_reason";

/// Column list shared by every profile query; matches
/// [`crate::encode::RawProfile`].
pub const PROFILE_COLUMNS: &str = "subject_id, display_name, email, phone, \
  last_check_in_at, check_in_interval_hours, preferred_check_in_time, \
  timezone, is_active, created_at";

/// Column list shared by every contact query; matches
/// [`crate::encode::RawContact`].
pub const CONTACT_COLUMNS: &str = "contact_id, subject_id, name, priority, \
  notify_by_email, notify_by_sms, email, phone, created_at, deleted_at";
