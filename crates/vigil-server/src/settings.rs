//! Runtime configuration, deserialised from `config.toml` and `VIGIL_*`
//! environment variables.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `VIGIL_ESCALATION__L1_HOURS=12`.

use std::{path::PathBuf, time::Duration};

use anyhow::ensure;
use serde::Deserialize;
use vigil_core::escalation::EscalationPolicy;
use vigil_engine::http::ChannelsConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Base URL linked from notifications.
  pub app_url:    Option<String>,
  pub escalation: EscalationConfig,
  pub scheduler:  SchedulerConfig,
  pub channels:   ChannelsConfig,
  pub projection: ProjectionConfig,
  pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_owned(),
      port:       8080,
      store_path: PathBuf::from("~/.local/share/vigil/vigil.db"),
      app_url:    None,
      escalation: EscalationConfig::default(),
      scheduler:  SchedulerConfig::default(),
      channels:   ChannelsConfig::default(),
      projection: ProjectionConfig::default(),
      rate_limit: RateLimitConfig::default(),
    }
  }
}

impl ServerConfig {
  pub fn load(path: PathBuf) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("VIGIL")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn validate(&self) -> anyhow::Result<()> {
    let e = &self.escalation;
    ensure!(
      e.l1_hours > 0 && e.l2_hours > 0 && e.l3_hours > 0,
      "escalation dwell times must be at least one hour"
    );
    ensure!(self.scheduler.interval_secs > 0, "scheduler.interval_secs must be positive");
    ensure!(self.rate_limit.max_requests > 0, "rate_limit.max_requests must be positive");
    ensure!(self.rate_limit.window_secs > 0, "rate_limit.window_secs must be positive");
    Ok(())
  }
}

/// Hours an alert must dwell at each level before it escalates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
  pub l1_hours: u32,
  pub l2_hours: u32,
  pub l3_hours: u32,
}

impl Default for EscalationConfig {
  fn default() -> Self { Self { l1_hours: 24, l2_hours: 24, l3_hours: 24 } }
}

impl EscalationConfig {
  pub fn policy(&self) -> EscalationPolicy {
    EscalationPolicy::from_hours(self.l1_hours, self.l2_hours, self.l3_hours)
  }
}

/// The in-process trigger. Disable it when an external cron calls the
/// `/jobs/*` endpoints instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
  pub enabled:       bool,
  pub interval_secs: u64,
}

impl Default for SchedulerConfig {
  fn default() -> Self { Self { enabled: true, interval_secs: 3600 } }
}

impl SchedulerConfig {
  pub fn interval(&self) -> Duration { Duration::from_secs(self.interval_secs) }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
  /// Webhook receiving every alert transition. Unset means no projection.
  pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
  pub max_requests: u64,
  pub window_secs:  u64,
}

impl Default for RateLimitConfig {
  fn default() -> Self { Self { max_requests: 10, window_secs: 60 } }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.port, 8080);
    assert!(cfg.scheduler.enabled);
    assert_eq!(cfg.scheduler.interval_secs, 3600);
    assert_eq!(cfg.rate_limit.max_requests, 10);
    assert_eq!(cfg.channels.timeout_secs, 10);
    assert!(cfg.channels.push_url.is_none());
    assert!(cfg.projection.url.is_none());
    assert_eq!(cfg.escalation.policy(), EscalationPolicy::default());
    cfg.validate().unwrap();
  }

  #[test]
  fn nested_sections_override_defaults() {
    let cfg = from_toml(
      r#"
        port = 9000
        app_url = "https://vigil.example"

        [escalation]
        l1_hours = 2
        l3_hours = 6

        [scheduler]
        enabled = false

        [channels]
        email_url = "https://mail.example/send"
      "#,
    );
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.escalation.policy(), EscalationPolicy::from_hours(2, 24, 6));
    assert!(!cfg.scheduler.enabled);
    assert_eq!(cfg.channels.email_url.as_deref(), Some("https://mail.example/send"));
    assert_eq!(cfg.app_url.as_deref(), Some("https://vigil.example"));
  }

  #[test]
  fn zero_dwell_time_is_rejected() {
    let cfg = from_toml("[escalation]\nl2_hours = 0\n");
    assert!(cfg.validate().is_err());
  }
}
