//! vigil server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, serves the JSON API over HTTP, and runs the due-alert and
//! escalation scans on a fixed interval.
//!
//! # One-shot mode
//!
//! To run both scans once, e.g. from an external cron, and exit:
//!
//! ```
//! cargo run -p vigil-server -- --once
//! ```

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use tokio::{net::TcpListener, time::MissedTickBehavior};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vigil_api::{AppState, RateLimiter};
use vigil_core::expiring::MemoryExpiringStore;
use vigil_engine::{
  Dispatcher, DispatcherConfig, Engine,
  http::{HttpEmailSender, HttpPushSender, HttpSenders, HttpSmsSender, WebhookObserver},
};
use vigil_store_sqlite::SqliteStore;

use settings::ServerConfig;

type AppEngine = Engine<SqliteStore, HttpPushSender, HttpEmailSender, HttpSmsSender>;

#[derive(Parser)]
#[command(author, version, about = "Vigil check-in monitor")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run the due-alert and escalation scans once and exit.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let cfg = ServerConfig::load(cli.config).context("failed to read configuration")?;
  cfg.validate().context("invalid configuration")?;

  // Open SQLite store.
  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // Build the engine.
  let HttpSenders { push, email, sms } =
    HttpSenders::from_config(&cfg.channels).context("failed to build channel clients")?;
  let dispatcher = Dispatcher::new(push, email, sms, DispatcherConfig {
    timeout: cfg.channels.timeout(),
    app_url: cfg.app_url.clone(),
  });
  let mut engine = Engine::new(Arc::new(store), dispatcher).with_policy(cfg.escalation.policy());
  if let Some(url) = &cfg.projection.url {
    let observer = WebhookObserver::new(url.clone(), cfg.channels.timeout())
      .context("failed to build projection client")?;
    engine = engine.with_observer(Arc::new(observer));
    tracing::info!(%url, "alert projection enabled");
  }
  let engine = Arc::new(engine);

  if cli.once {
    return run_jobs(&engine).await;
  }

  let rate_cache = Arc::new(MemoryExpiringStore::new());
  if cfg.scheduler.enabled {
    tokio::spawn(run_scheduler(
      engine.clone(),
      rate_cache.clone(),
      cfg.scheduler.interval(),
    ));
  }

  let limiter = RateLimiter::new(
    rate_cache,
    cfg.rate_limit.max_requests,
    chrono::Duration::seconds(cfg.rate_limit.window_secs.try_into()?),
  );
  let app = vigil_api::api_router(AppState::new(engine, limiter))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Run both scans. The second runs even if the first fails.
async fn run_jobs(engine: &AppEngine) -> anyhow::Result<()> {
  let due = engine
    .process_due_alerts()
    .await
    .context("due-alert scan failed");
  let escalations = engine
    .process_escalations()
    .await
    .context("escalation scan failed");
  due?;
  escalations?;
  Ok(())
}

async fn run_scheduler(
  engine: Arc<AppEngine>,
  rate_cache: Arc<MemoryExpiringStore>,
  every: Duration,
) {
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
  loop {
    ticker.tick().await;
    if let Err(e) = run_jobs(&engine).await {
      tracing::error!(error = ?e, "scheduled run failed");
    }
    let purged = rate_cache.purge_expired();
    tracing::debug!(purged, "expired rate-limit entries dropped");
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
