//! # Read-Ahead Cache Module
//!
//! Streams bytes from a slow or high-latency source into a fixed-size ring
//! buffer while a consumer reads and seeks within it at playback speed.
//!
//! ## Overview
//!
//! This module handles:
//! - The circular cache itself: bounded memory, a retained back window for
//!   cheap rewinds, short-write/short-read semantics and blocking waits
//! - A source pump thread that keeps the front window filled
//! - A blocking `Read + Seek` reader that reseeks the source when a seek
//!   leaves the cached window

pub mod circular;
pub mod config;
pub mod error;
pub mod pump;
pub mod reader;
pub mod source;
pub mod stats;

pub use circular::{CircularCache, ReadOutcome};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use pump::{PumpState, PumpStats, SourcePump};
pub use reader::CachedReader;
pub use source::{ByteSource, ReaderSource};
pub use stats::CacheStats;
