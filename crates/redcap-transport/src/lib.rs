//! Reqwest-backed transport for the `redcap` compatibility core.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain protocol rules. It
//! implements the [`redcap::Transport`] port over [`reqwest`] and loads
//! endpoint configuration from the environment; everything REDCap-specific
//! (parameter encoding, version adapters, error classification) lives in
//! the [`redcap`] crate.
//!
//! Timeouts are deliberately not set here: pass a pre-configured
//! [`reqwest::Client`] to [`ReqwestTransport::from_client`] to enforce one.

pub mod config;
pub mod http;

pub use config::{ConfigError, RedcapConfig};
pub use http::ReqwestTransport;
