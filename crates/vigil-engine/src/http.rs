//! HTTP-backed channel senders and the webhook projection observer.
//!
//! Each channel posts JSON to a configured gateway URL. A channel with no URL
//! is switched off: every attempt on it reports zero deliveries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use vigil_core::{
  channel::{ChannelError, EmailSender, PushSender, SmsSender},
  message::Notice,
  observer::{AlertEvent, AlertObserver, ObserverError},
};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
  /// Push gateway; receives one request per subject.
  pub push_url:     Option<String>,
  /// Transactional email provider. `{email_url}/batch` must accept a list.
  pub email_url:    Option<String>,
  pub sms_url:      Option<String>,
  /// Sent as a bearer token to every gateway.
  pub api_key:      Option<String>,
  pub from_email:   String,
  pub timeout_secs: u64,
}

impl Default for ChannelsConfig {
  fn default() -> Self {
    Self {
      push_url:     None,
      email_url:    None,
      sms_url:      None,
      api_key:      None,
      from_email:   "Vigil <alerts@vigil.invalid>".to_owned(),
      timeout_secs: 10,
    }
  }
}

impl ChannelsConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

/// The three senders built from one [`ChannelsConfig`], sharing a client.
pub struct HttpSenders {
  pub push:  HttpPushSender,
  pub email: HttpEmailSender,
  pub sms:   HttpSmsSender,
}

impl HttpSenders {
  pub fn from_config(config: &ChannelsConfig) -> reqwest::Result<Self> {
    let client = reqwest::Client::builder().timeout(config.timeout()).build()?;
    let gateway = |url: &Option<String>| Gateway {
      client:  client.clone(),
      url:     url.clone(),
      api_key: config.api_key.clone(),
    };
    Ok(Self {
      push:  HttpPushSender { gateway: gateway(&config.push_url) },
      email: HttpEmailSender {
        gateway: gateway(&config.email_url),
        from:    config.from_email.clone(),
      },
      sms:   HttpSmsSender { gateway: gateway(&config.sms_url) },
    })
  }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Gateway {
  client:  reqwest::Client,
  url:     Option<String>,
  api_key: Option<String>,
}

impl Gateway {
  /// POST `body` to the gateway, or to `{url}{suffix}`. `None` when the
  /// gateway is not configured.
  async fn post<T: Serialize + ?Sized>(
    &self,
    suffix: &str,
    body: &T,
  ) -> Result<Option<reqwest::Response>, ChannelError> {
    let Some(url) = &self.url else {
      return Ok(None);
    };
    let mut req = self.client.post(format!("{url}{suffix}")).json(body);
    if let Some(key) = &self.api_key {
      req = req.bearer_auth(key);
    }
    let resp = req
      .send()
      .await
      .map_err(|e| ChannelError::Transport(e.to_string()))?;
    Ok(Some(resp))
  }

  /// POST and report whether the gateway accepted it.
  async fn accepted<T: Serialize + ?Sized>(&self, body: &T) -> Result<bool, ChannelError> {
    match self.post("", body).await? {
      Some(resp) if resp.status().is_success() => Ok(true),
      Some(resp) => {
        warn!(status = %resp.status(), "gateway rejected message");
        Ok(false)
      }
      None => Ok(false),
    }
  }
}

// ─── Push ────────────────────────────────────────────────────────────────────

pub struct HttpPushSender {
  gateway: Gateway,
}

#[derive(Serialize)]
struct PushRequest<'a> {
  subject_id: Uuid,
  #[serde(flatten)]
  notice:     &'a Notice,
}

#[derive(Deserialize)]
struct PushResponse {
  delivered: usize,
}

impl PushSender for HttpPushSender {
  async fn send_push(&self, subject_id: Uuid, notice: &Notice) -> Result<usize, ChannelError> {
    let Some(resp) = self.gateway.post("", &PushRequest { subject_id, notice }).await? else {
      debug!("push gateway not configured");
      return Ok(0);
    };
    if !resp.status().is_success() {
      warn!(status = %resp.status(), "push gateway rejected message");
      return Ok(0);
    }
    let body: PushResponse = resp
      .json()
      .await
      .map_err(|e| ChannelError::Response(e.to_string()))?;
    Ok(body.delivered)
  }
}

// ─── Email ───────────────────────────────────────────────────────────────────

pub struct HttpEmailSender {
  gateway: Gateway,
  from:    String,
}

#[derive(Serialize)]
struct EmailRequest<'a> {
  from:    &'a str,
  to:      &'a str,
  subject: &'a str,
  text:    &'a str,
}

impl EmailSender for HttpEmailSender {
  async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<bool, ChannelError> {
    self
      .gateway
      .accepted(&EmailRequest { from: &self.from, to, subject, text: body })
      .await
  }

  async fn send_email_batch(
    &self,
    to: &[String],
    subject: &str,
    body: &str,
  ) -> Result<usize, ChannelError> {
    let batch: Vec<EmailRequest<'_>> = to
      .iter()
      .map(|to| EmailRequest { from: &self.from, to, subject, text: body })
      .collect();
    match self.gateway.post("/batch", &batch).await? {
      Some(resp) if resp.status().is_success() => Ok(batch.len()),
      Some(resp) => {
        warn!(status = %resp.status(), recipients = batch.len(), "email batch rejected");
        Ok(0)
      }
      None => Ok(0),
    }
  }
}

// ─── SMS ─────────────────────────────────────────────────────────────────────

pub struct HttpSmsSender {
  gateway: Gateway,
}

#[derive(Serialize)]
struct SmsRequest<'a> {
  to:   &'a str,
  body: &'a str,
}

impl SmsSender for HttpSmsSender {
  async fn send_sms(&self, to: &str, body: &str) -> Result<bool, ChannelError> {
    self.gateway.accepted(&SmsRequest { to, body }).await
  }
}

// ─── Webhook observer ────────────────────────────────────────────────────────

/// Mirrors alert events to a read-model endpoint. Delivery happens on a
/// spawned task; the caller never waits on it.
pub struct WebhookObserver {
  client: reqwest::Client,
  url:    String,
}

impl WebhookObserver {
  pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, url: url.into() })
  }
}

impl AlertObserver for WebhookObserver {
  fn on_event(&self, event: &AlertEvent) -> Result<(), ObserverError> {
    let payload = event.to_json().map_err(|e| ObserverError(e.to_string()))?;
    let runtime = tokio::runtime::Handle::try_current()
      .map_err(|e| ObserverError(e.to_string()))?;
    let req = self.client.post(&self.url).json(&payload);
    let alert_id = event.alert.alert_id;

    runtime.spawn(async move {
      match req.send().await {
        Ok(resp) if resp.status().is_success() => {}
        Ok(resp) => warn!(%alert_id, status = %resp.status(), "projection rejected event"),
        Err(e) => warn!(%alert_id, error = %e, "projection delivery failed"),
      }
    });
    Ok(())
  }
}
