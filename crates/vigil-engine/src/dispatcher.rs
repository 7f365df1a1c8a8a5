//! Notification dispatch with channel fallback.
//!
//! Subjects are reached with an ordered fallback: push, then email, then SMS,
//! stopping at the first channel that delivers. Contacts are reached on every
//! channel they opted into, with no fallback between channels.
//!
//! Nothing here returns an error. A sender that errors, times out, or reports
//! zero deliveries counts as a failed attempt and is logged.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vigil_core::{
  alert::{Alert, AlertLevel},
  channel::{ChannelError, EmailSender, PushSender, SmsSender},
  contact::{Contact, ContactChannel, eligible_contacts, primary_contact},
  message::{Notice, SubjectNotice, contact_message, subject_notice},
  profile::Profile,
};

/// Bound on any single send attempt.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
  pub timeout: Duration,
  /// Link included in notices and contact emails.
  pub app_url: Option<String>,
}

impl Default for DispatcherConfig {
  fn default() -> Self { Self { timeout: DEFAULT_SEND_TIMEOUT, app_url: None } }
}

/// Which channel ended up delivering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
  Push,
  Email,
  Sms,
  None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delivery {
  pub channel:   Channel,
  /// Number of endpoints reached on `channel`.
  pub delivered: usize,
}

impl Delivery {
  fn none() -> Self { Self { channel: Channel::None, delivered: 0 } }

  pub fn succeeded(&self) -> bool { self.delivered > 0 }
}

/// Where a subject can be reached.
#[derive(Debug, Clone, Copy)]
pub struct Recipient<'a> {
  pub subject_id: Uuid,
  pub email:      Option<&'a str>,
  pub phone:      Option<&'a str>,
}

impl<'a> From<&'a Profile> for Recipient<'a> {
  fn from(profile: &'a Profile) -> Self {
    Self {
      subject_id: profile.subject_id,
      email:      non_blank(profile.email.as_deref()),
      phone:      non_blank(profile.phone.as_deref()),
    }
  }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
  s.map(str::trim).filter(|s| !s.is_empty())
}

/// Result of notifying the primary contact on each channel. `None` means no
/// contact was eligible on that channel and nothing was attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrimaryContactOutcome {
  pub email_contact: Option<Uuid>,
  pub email_sent:    Option<bool>,
  pub sms_contact:   Option<Uuid>,
  pub sms_sent:      Option<bool>,
}

impl PrimaryContactOutcome {
  /// At least one channel reached a primary contact.
  pub fn success(&self) -> bool {
    self.email_sent == Some(true) || self.sms_sent == Some(true)
  }

  pub fn no_eligible_contact(&self) -> bool {
    self.email_sent.is_none() && self.sms_sent.is_none()
  }
}

/// Counts from notifying every eligible contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AllContactsOutcome {
  /// Emails accepted.
  pub sent:     usize,
  /// Email and SMS attempts that did not deliver.
  pub failed:   usize,
  pub sms_sent: usize,
}

impl AllContactsOutcome {
  pub fn delivered(&self) -> usize { self.sent + self.sms_sent }
}

pub struct Dispatcher<P, E, M> {
  push:   P,
  email:  E,
  sms:    M,
  config: DispatcherConfig,
}

impl<P, E, M> Dispatcher<P, E, M>
where
  P: PushSender,
  E: EmailSender,
  M: SmsSender,
{
  pub fn new(push: P, email: E, sms: M, config: DispatcherConfig) -> Self {
    Self { push, email, sms, config }
  }

  pub fn config(&self) -> &DispatcherConfig { &self.config }

  /// The subject-facing notice for `kind`, with the app link attached.
  pub fn subject_notice(&self, kind: SubjectNotice) -> Notice {
    subject_notice(kind).with_url(self.config.app_url.clone())
  }

  /// Reach a subject through the first channel that delivers.
  pub async fn notify(&self, recipient: &Recipient<'_>, notice: &Notice) -> Delivery {
    let pushed = self
      .attempt(Channel::Push, self.push.send_push(recipient.subject_id, notice))
      .await
      .unwrap_or(0);
    if pushed > 0 {
      return Delivery { channel: Channel::Push, delivered: pushed };
    }

    if let Some(address) = recipient.email {
      let text = notice.email_text();
      let sent = self
        .attempt(Channel::Email, self.email.send_email(address, &notice.title, &text))
        .await;
      if sent == Some(true) {
        return Delivery { channel: Channel::Email, delivered: 1 };
      }
    }

    if let Some(phone) = recipient.phone {
      let text = notice.sms_text();
      let sent = self.attempt(Channel::Sms, self.sms.send_sms(phone, &text)).await;
      if sent == Some(true) {
        return Delivery { channel: Channel::Sms, delivered: 1 };
      }
    }

    warn!(subject_id = %recipient.subject_id, title = %notice.title, "no channel reached subject");
    Delivery::none()
  }

  /// Notify the lowest-priority eligible contact on email and on SMS. The
  /// two channels may pick different contacts and are both attempted.
  pub async fn notify_primary_contact(
    &self,
    alert: &Alert,
    profile: &Profile,
    contacts: &[Contact],
    now: DateTime<Utc>,
  ) -> PrimaryContactOutcome {
    let app_url = self.config.app_url.as_deref();
    let by_email = primary_contact(contacts, ContactChannel::Email);
    let by_sms = primary_contact(contacts, ContactChannel::Sms);

    let email = async {
      let contact = by_email?;
      let address = contact.address_for(ContactChannel::Email)?;
      let msg = contact_message(
        AlertLevel::L3,
        profile.name(),
        profile.last_check_in_at,
        now,
        Some(&contact.name),
        app_url,
      );
      let sent = self
        .attempt(
          Channel::Email,
          self.email.send_email(address, &msg.email_subject, &msg.email_body),
        )
        .await;
      Some(sent == Some(true))
    };

    let sms = async {
      let contact = by_sms?;
      let phone = contact.address_for(ContactChannel::Sms)?;
      let msg = contact_message(
        AlertLevel::L3,
        profile.name(),
        profile.last_check_in_at,
        now,
        Some(&contact.name),
        app_url,
      );
      let sent = self.attempt(Channel::Sms, self.sms.send_sms(phone, &msg.sms_body)).await;
      Some(sent == Some(true))
    };

    let (email_sent, sms_sent) = tokio::join!(email, sms);
    let outcome = PrimaryContactOutcome {
      email_contact: by_email.map(|c| c.contact_id),
      email_sent,
      sms_contact: by_sms.map(|c| c.contact_id),
      sms_sent,
    };

    if outcome.no_eligible_contact() {
      warn!(alert_id = %alert.alert_id, "no eligible primary contact");
    } else {
      info!(
        alert_id = %alert.alert_id,
        email_sent = ?outcome.email_sent,
        sms_sent = ?outcome.sms_sent,
        "primary contact notified"
      );
    }
    outcome
  }

  /// Notify every eligible contact: one batched email to all email-eligible
  /// contacts, then one SMS per SMS-eligible contact. A failure for one
  /// recipient does not stop the others.
  pub async fn notify_all_contacts(
    &self,
    alert: &Alert,
    profile: &Profile,
    contacts: &[Contact],
    now: DateTime<Utc>,
  ) -> AllContactsOutcome {
    let msg = contact_message(
      AlertLevel::L4,
      profile.name(),
      profile.last_check_in_at,
      now,
      None,
      self.config.app_url.as_deref(),
    );
    let mut outcome = AllContactsOutcome::default();

    let addresses: Vec<String> = eligible_contacts(contacts, ContactChannel::Email)
      .into_iter()
      .filter_map(|c| c.address_for(ContactChannel::Email))
      .map(str::to_owned)
      .collect();
    if !addresses.is_empty() {
      let accepted = self
        .attempt(
          Channel::Email,
          self.email.send_email_batch(&addresses, &msg.email_subject, &msg.email_body),
        )
        .await
        .unwrap_or(0)
        .min(addresses.len());
      outcome.sent = accepted;
      outcome.failed += addresses.len() - accepted;
    }

    for contact in eligible_contacts(contacts, ContactChannel::Sms) {
      let Some(phone) = contact.address_for(ContactChannel::Sms) else {
        continue;
      };
      match self.attempt(Channel::Sms, self.sms.send_sms(phone, &msg.sms_body)).await {
        Some(true) => outcome.sms_sent += 1,
        _ => {
          debug!(contact_id = %contact.contact_id, "sms to contact failed");
          outcome.failed += 1;
        }
      }
    }

    info!(
      alert_id = %alert.alert_id,
      sent = outcome.sent,
      sms_sent = outcome.sms_sent,
      failed = outcome.failed,
      "all contacts notified"
    );
    outcome
  }

  /// Run one send attempt under the configured timeout. `None` on error or
  /// timeout.
  async fn attempt<T>(
    &self,
    channel: Channel,
    send: impl Future<Output = Result<T, ChannelError>>,
  ) -> Option<T> {
    match tokio::time::timeout(self.config.timeout, send).await {
      Ok(Ok(value)) => Some(value),
      Ok(Err(e)) => {
        warn!(?channel, error = %e, "send attempt failed");
        None
      }
      Err(_) => {
        let e = ChannelError::Timeout(self.config.timeout);
        warn!(?channel, error = %e, "send attempt failed");
        None
      }
    }
  }
}
