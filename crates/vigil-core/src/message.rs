//! Message content for subjects and their contacts.
//!
//! Contact messages at L3 are concerned, at L4 urgent; both name the subject
//! and say how long ago they last checked in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::AlertLevel;

/// A channel-neutral message. Push uses all of it, email uses the title as
/// the subject line, SMS flattens it with [`Notice::sms_text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
  pub title: String,
  pub body:  String,
  /// Deep link into the app, when one is configured.
  pub url:   Option<String>,
}

impl Notice {
  pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
    Self { title: title.into(), body: body.into(), url: None }
  }

  pub fn with_url(mut self, url: Option<String>) -> Self {
    self.url = url;
    self
  }

  pub fn sms_text(&self) -> String {
    match &self.url {
      Some(url) => format!("{}: {} {url}", self.title, self.body),
      None => format!("{}: {}", self.title, self.body),
    }
  }

  pub fn email_text(&self) -> String {
    match &self.url {
      Some(url) => format!("{}\n\n{url}\n", self.body),
      None => format!("{}\n", self.body),
    }
  }
}

// ─── Subject-facing ──────────────────────────────────────────────────────────

/// What a subject is being told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectNotice {
  /// The alert reached this level.
  Level(AlertLevel),
  /// The subject's check-in resolved the alert.
  CheckedIn,
  /// The alert was cancelled by hand.
  Cancelled,
}

pub fn subject_notice(kind: SubjectNotice) -> Notice {
  match kind {
    SubjectNotice::Level(AlertLevel::L1) => Notice::new(
      "Missed check-in",
      "You missed your scheduled check-in. Open Vigil and let us know you're okay.",
    ),
    SubjectNotice::Level(AlertLevel::L2) => Notice::new(
      "Please check in",
      "We still haven't heard from you. Check in now, or your trusted contacts will be notified.",
    ),
    SubjectNotice::Level(AlertLevel::L3) => Notice::new(
      "Your primary contact was notified",
      "We couldn't reach you, so we've contacted your primary trusted contact. Check in to stop the alert.",
    ),
    SubjectNotice::Level(AlertLevel::L4) => Notice::new(
      "All contacts notified",
      "We've alerted all of your trusted contacts. Check in to let them know you're okay.",
    ),
    SubjectNotice::CheckedIn | SubjectNotice::Level(AlertLevel::Resolved) => Notice::new(
      "Alert cancelled",
      "Thanks for checking in. Your alert has been cancelled.",
    ),
    SubjectNotice::Cancelled | SubjectNotice::Level(AlertLevel::Cancelled) => Notice::new(
      "Alert cancelled",
      "Your alert has been cancelled. No further notifications will be sent.",
    ),
  }
}

// ─── Contact-facing ──────────────────────────────────────────────────────────

/// Email and SMS content for trusted contacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactMessage {
  pub email_subject: String,
  pub email_body:    String,
  pub sms_body:      String,
}

/// Build the message sent to contacts when an alert reaches `level`.
///
/// `greeting` personalises the email (the L3 primary contact); batch emails
/// pass `None`. Levels below L3 are treated as L3.
pub fn contact_message(
  level: AlertLevel,
  subject_name: &str,
  last_check_in: Option<DateTime<Utc>>,
  now: DateTime<Utc>,
  greeting: Option<&str>,
  app_url: Option<&str>,
) -> ContactMessage {
  let last = relative_time(last_check_in, now);
  let hello = match greeting {
    Some(name) => format!("Hi {name},"),
    None => "Hello,".to_owned(),
  };
  let link = app_url
    .map(|url| format!("\n\nMore details: {url}"))
    .unwrap_or_default();

  if level == AlertLevel::L4 {
    ContactMessage {
      email_subject: format!("URGENT: please contact {subject_name} immediately"),
      email_body:    format!(
        "{hello}\n\n{subject_name} has missed several check-ins and has not responded to \
         reminders. Their last check-in was {last}.\n\nPlease contact {subject_name} \
         immediately. If you cannot reach them and believe they may be in danger, \
         contact local emergency services.{link}\n"
      ),
      sms_body:      format!(
        "URGENT from Vigil: {subject_name} has not checked in (last check-in: {last}). \
         Please contact them immediately."
      ),
    }
  } else {
    ContactMessage {
      email_subject: format!("We haven't heard from {subject_name}"),
      email_body:    format!(
        "{hello}\n\nWe haven't heard from {subject_name} in a while. Their last check-in \
         was {last}. You are listed as one of their trusted contacts.\n\nCould you reach \
         out and make sure they're okay?{link}\n"
      ),
      sms_body:      format!(
        "Vigil: We haven't heard from {subject_name} (last check-in: {last}). \
         Could you reach out and check they're okay?"
      ),
    }
  }
}

/// Human-readable age of a timestamp: `"never"`, `"just now"`,
/// `"5 minutes ago"`, `"1 hour ago"`, `"3 days ago"`.
pub fn relative_time(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
  let Some(at) = at else {
    return "never".to_owned();
  };
  let elapsed = now - at;
  let minutes = elapsed.num_minutes();
  let hours = elapsed.num_hours();
  let days = elapsed.num_days();

  if minutes < 1 {
    "just now".to_owned()
  } else if hours < 1 {
    plural(minutes, "minute")
  } else if days < 1 {
    plural(hours, "hour")
  } else {
    plural(days, "day")
  }
}

fn plural(n: i64, unit: &str) -> String {
  if n == 1 {
    format!("1 {unit} ago")
  } else {
    format!("{n} {unit}s ago")
  }
}
