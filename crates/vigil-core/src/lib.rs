//! Core types and decision logic for the Vigil check-in monitor.
//!
//! This crate has no HTTP or database dependencies. It owns
//! the data model, the pure scheduling and escalation rules, message content,
//! and the trait seams (store, channel senders, observer, clock) that the
//! engine and storage crates plug into.

pub mod alert;
pub mod channel;
pub mod check_in;
pub mod clock;
pub mod contact;
pub mod error;
pub mod escalation;
pub mod expiring;
pub mod message;
pub mod observer;
pub mod profile;
pub mod schedule;
pub mod store;

pub use error::{Error, Result};
