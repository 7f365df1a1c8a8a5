//! The Vigil alert engine.
//!
//! Ties the pure rules in `vigil-core` to a [`MonitorStore`] and the channel
//! senders:
//!
//! - [`Engine::process_due_alerts`] and [`Engine::process_escalations`] are
//!   the two scheduled entry points;
//! - [`Engine::record_check_in`] and [`Engine::cancel_alert`] are driven by
//!   the subject.
//!
//! [`MonitorStore`]: vigil_core::store::MonitorStore

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod http;
pub mod locks;

pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use engine::{DueAlertsSummary, Engine, EscalationSummary};
pub use error::EngineError;
