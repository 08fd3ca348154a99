//! # Cache Configuration
//!
//! Configuration types for the circular cache, the source pump and the
//! cached reader.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Read-ahead cache configuration.
///
/// Controls the split between buffered-ahead and retained memory, the
/// forward-seek policy and the blocking bounds used by the pump and reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Bytes reserved for data that has not been consumed yet.
    ///
    /// Default: 15 MiB.
    #[serde(default = "default_front_capacity")]
    pub front_capacity: usize,

    /// Bytes of already-consumed data kept for cheap backward seeks.
    ///
    /// Default: 5 MiB.
    #[serde(default = "default_back_capacity")]
    pub back_capacity: usize,

    /// How far past the buffered end a seek may land and still wait for the
    /// producer instead of failing with an out-of-window error.
    ///
    /// Default: 100 000 bytes.
    #[serde(default = "default_forward_seek_tolerance")]
    pub forward_seek_tolerance: u64,

    /// Maximum time a forward seek waits for the producer to catch up.
    ///
    /// Default: 5 seconds.
    #[serde(default = "default_forward_seek_timeout")]
    pub forward_seek_timeout: Duration,

    /// Upper bound on a single condition-variable sleep inside blocking waits.
    ///
    /// Default: 50 ms.
    #[serde(default = "default_wait_poll_interval")]
    pub wait_poll_interval: Duration,

    /// Size of each read the pump issues against the source (in bytes).
    ///
    /// Default: 128 KiB.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum time a blocking reader waits for the next byte.
    ///
    /// Default: 30 seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout: Duration,

    /// Maximum time a reader waits for the pump to reposition the source.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_reseek_timeout")]
    pub reseek_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            front_capacity: default_front_capacity(),
            back_capacity: default_back_capacity(),
            forward_seek_tolerance: default_forward_seek_tolerance(),
            forward_seek_timeout: default_forward_seek_timeout(),
            wait_poll_interval: default_wait_poll_interval(),
            chunk_size: default_chunk_size(),
            read_timeout: default_read_timeout(),
            reseek_timeout: default_reseek_timeout(),
        }
    }
}

impl CacheConfig {
    /// Split a total memory budget into front and back windows.
    ///
    /// The back window gets a quarter of the budget, the front window the rest.
    pub fn from_memory_size(total: usize) -> Self {
        let back_capacity = total / 4;
        Self {
            front_capacity: total - back_capacity,
            back_capacity,
            ..Default::default()
        }
    }

    /// Create a configuration for memory-constrained hosts.
    ///
    /// - 1 MiB front, 256 KiB back
    /// - Small pump reads
    pub fn low_memory() -> Self {
        Self {
            front_capacity: 1024 * 1024,
            back_capacity: 256 * 1024,
            forward_seek_tolerance: 64 * 1024,
            chunk_size: 16 * 1024,
            ..Default::default()
        }
    }

    /// Create a configuration for slow, high-latency sources.
    ///
    /// - 48 MiB front, 16 MiB back
    /// - Generous forward-seek tolerance and read timeout
    pub fn high_latency() -> Self {
        Self {
            front_capacity: 48 * 1024 * 1024,
            back_capacity: 16 * 1024 * 1024,
            forward_seek_tolerance: 1024 * 1024,
            forward_seek_timeout: Duration::from_secs(10),
            chunk_size: 256 * 1024,
            read_timeout: Duration::from_secs(60),
            ..Default::default()
        }
    }

    /// Total physical buffer size, `front_capacity + back_capacity`.
    ///
    /// Returns `None` if the sum overflows.
    pub fn total_capacity(&self) -> Option<usize> {
        self.front_capacity.checked_add(self.back_capacity)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.front_capacity == 0 {
            return Err("front_capacity must be > 0".to_string());
        }

        if self.total_capacity().is_none() {
            return Err("front_capacity + back_capacity overflows".to_string());
        }

        if self.wait_poll_interval.is_zero() {
            return Err("wait_poll_interval must be > 0".to_string());
        }

        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.read_timeout.is_zero() {
            return Err("read_timeout must be > 0".to_string());
        }

        if self.reseek_timeout.is_zero() {
            return Err("reseek_timeout must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_front_capacity() -> usize {
    15 * 1024 * 1024 // 15 MiB
}

fn default_back_capacity() -> usize {
    5 * 1024 * 1024 // 5 MiB
}

fn default_forward_seek_tolerance() -> u64 {
    100_000
}

fn default_forward_seek_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_wait_poll_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_chunk_size() -> usize {
    128 * 1024 // 128 KiB
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_reseek_timeout() -> Duration {
    Duration::from_secs(10)
}
