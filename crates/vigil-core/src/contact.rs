//! Trusted contacts and channel eligibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// The contact-facing delivery channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactChannel {
  Email,
  Sms,
}

/// A trusted person associated with a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id:      Uuid,
  pub subject_id:      Uuid,
  pub name:            String,
  /// Lower is contacted earlier; always at least 1.
  pub priority:        u32,
  pub notify_by_email: bool,
  pub notify_by_sms:   bool,
  pub email:           Option<String>,
  pub phone:           Option<String>,
  pub created_at:      DateTime<Utc>,
  /// Soft delete marker. Deleted contacts stay in the store.
  pub deleted_at:      Option<DateTime<Utc>>,
}

impl Contact {
  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }

  /// The address this contact is reached at on `channel`, if they are
  /// eligible for it: not deleted, opted in, and with a non-blank address.
  pub fn address_for(&self, channel: ContactChannel) -> Option<&str> {
    if self.is_deleted() {
      return None;
    }
    let (opted_in, address) = match channel {
      ContactChannel::Email => (self.notify_by_email, &self.email),
      ContactChannel::Sms => (self.notify_by_sms, &self.phone),
    };
    if !opted_in {
      return None;
    }
    address.as_deref().map(str::trim).filter(|a| !a.is_empty())
  }

  pub fn is_eligible(&self, channel: ContactChannel) -> bool {
    self.address_for(channel).is_some()
  }
}

/// The eligible contact with the lowest priority value for `channel`. Ties go
/// to the contact listed first.
pub fn primary_contact(
  contacts: &[Contact],
  channel: ContactChannel,
) -> Option<&Contact> {
  contacts
    .iter()
    .filter(|c| c.is_eligible(channel))
    .min_by_key(|c| c.priority)
}

/// All contacts eligible for `channel`, in priority order.
pub fn eligible_contacts(
  contacts: &[Contact],
  channel: ContactChannel,
) -> Vec<&Contact> {
  let mut eligible: Vec<&Contact> =
    contacts.iter().filter(|c| c.is_eligible(channel)).collect();
  eligible.sort_by_key(|c| c.priority);
  eligible
}

// ─── NewContact ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::MonitorStore::add_contact`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewContact {
  pub subject_id:      Uuid,
  pub name:            String,
  pub priority:        i64,
  #[serde(default)]
  pub notify_by_email: bool,
  #[serde(default)]
  pub notify_by_sms:   bool,
  pub email:           Option<String>,
  pub phone:           Option<String>,
}

impl NewContact {
  /// Check the priority and return it as stored.
  pub fn validated_priority(&self) -> Result<u32> {
    u32::try_from(self.priority)
      .ok()
      .filter(|p| *p >= 1)
      .ok_or(Error::InvalidPriority(self.priority))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn contact(name: &str, priority: u32) -> Contact {
    Contact {
      contact_id: Uuid::new_v4(),
      subject_id: Uuid::nil(),
      name: name.into(),
      priority,
      notify_by_email: true,
      notify_by_sms: true,
      email: Some(format!("{}@example.com", name.to_lowercase())),
      phone: Some("+15550100".into()),
      created_at: Utc::now(),
      deleted_at: None,
    }
  }

  #[test]
  fn email_opt_out_is_never_primary() {
    let mut first = contact("Ann", 1);
    first.notify_by_email = false;
    let second = contact("Bob", 2);
    let contacts = vec![first, second];

    let email = primary_contact(&contacts, ContactChannel::Email).unwrap();
    assert_eq!(email.name, "Bob");
    let sms = primary_contact(&contacts, ContactChannel::Sms).unwrap();
    assert_eq!(sms.name, "Ann");
  }

  #[test]
  fn deleted_and_addressless_contacts_are_ineligible() {
    let mut deleted = contact("Cid", 1);
    deleted.deleted_at = Some(Utc::now());
    let mut blank = contact("Dee", 2);
    blank.email = Some("   ".into());
    blank.phone = None;

    assert!(!deleted.is_eligible(ContactChannel::Email));
    assert!(!blank.is_eligible(ContactChannel::Email));
    assert!(!blank.is_eligible(ContactChannel::Sms));
    assert!(primary_contact(&[deleted, blank], ContactChannel::Email).is_none());
  }

  #[test]
  fn eligible_contacts_are_priority_ordered() {
    let contacts = vec![contact("C", 3), contact("A", 1), contact("B", 2)];
    let names: Vec<_> = eligible_contacts(&contacts, ContactChannel::Sms)
      .into_iter()
      .map(|c| c.name.as_str())
      .collect();
    assert_eq!(names, ["A", "B", "C"]);
  }

  #[test]
  fn priority_must_be_positive() {
    let mut input = NewContact {
      subject_id:      Uuid::nil(),
      name:            "Eve".into(),
      priority:        0,
      notify_by_email: true,
      notify_by_sms:   false,
      email:           None,
      phone:           None,
    };
    assert!(matches!(input.validated_priority(), Err(Error::InvalidPriority(0))));
    input.priority = 2;
    assert_eq!(input.validated_priority().unwrap(), 2);
  }
}
