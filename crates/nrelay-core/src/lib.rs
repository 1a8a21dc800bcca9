//! Core domain + application logic for the notification relay.
//!
//! This crate is intentionally transport-agnostic. The directory service and the
//! Telegram / SMTP / SMS gateways live behind ports (traits) implemented in adapter
//! crates.

pub mod audit;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod pacing;
pub mod ports;
pub mod recipients;
pub mod store;
pub mod templates;

pub use errors::{Error, Result};
