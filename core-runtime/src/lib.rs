//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the read-ahead cache
//! workspace:
//! - Logging and tracing initialisation
//! - Forwarding of log events to a host logger
//!
//! ## Overview
//!
//! Library crates in this workspace only emit `tracing` events. Hosts call
//! [`logging::init_logging`] once at startup to decide where those events go.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
