//! Channel sender traits.
//!
//! Each sender makes one delivery attempt and reports how it went. Expected
//! failures (channel not configured, invalid address, provider rejection)
//! are reported as `Ok(0)` / `Ok(false)`; `Err` is reserved for the
//! unexpected. Callers treat both the same way: as a failed attempt.

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::message::Notice;

/// An unexpected failure inside a channel sender.
#[derive(Debug, Error)]
pub enum ChannelError {
  #[error("transport error: {0}")]
  Transport(String),

  #[error("unexpected response: {0}")]
  Response(String),

  #[error("timed out after {0:?}")]
  Timeout(std::time::Duration),
}

pub trait PushSender: Send + Sync {
  /// Deliver `notice` to every push subscription the subject has. Returns the
  /// number of subscriptions that accepted it.
  fn send_push<'a>(
    &'a self,
    subject_id: Uuid,
    notice: &'a Notice,
  ) -> impl Future<Output = Result<usize, ChannelError>> + Send + 'a;
}

pub trait EmailSender: Send + Sync {
  fn send_email<'a>(
    &'a self,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
  ) -> impl Future<Output = Result<bool, ChannelError>> + Send + 'a;

  /// Send the same message to each recipient individually, as one request.
  /// Returns how many were accepted.
  fn send_email_batch<'a>(
    &'a self,
    to: &'a [String],
    subject: &'a str,
    body: &'a str,
  ) -> impl Future<Output = Result<usize, ChannelError>> + Send + 'a;
}

pub trait SmsSender: Send + Sync {
  fn send_sms<'a>(
    &'a self,
    to: &'a str,
    body: &'a str,
  ) -> impl Future<Output = Result<bool, ChannelError>> + Send + 'a;
}
