//! # Cache Statistics
//!
//! Point-in-time snapshots of cache occupancy and lifetime counters.

use std::ops::Range;

/// Snapshot of the cache window and counters, taken under the cache lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Oldest retained logical offset.
    pub begin: u64,
    /// Next logical offset the consumer will read.
    pub cursor: u64,
    /// One past the last written logical offset.
    pub end: u64,
    /// Physical buffer size in bytes.
    pub capacity: usize,
    /// Bytes reserved for retained history.
    pub back_capacity: usize,
    /// Total bytes accepted by writes.
    pub bytes_written: u64,
    /// Total bytes handed to the consumer.
    pub bytes_read: u64,
    /// Total bytes discarded by eviction.
    pub bytes_evicted: u64,
    /// Number of resets since open.
    pub resets: u64,
    /// Number of seeks rejected as out of window.
    pub out_of_window_seeks: u64,
    /// Producer has signalled the end of its input.
    pub end_of_input: bool,
    /// The cache has been closed.
    pub closed: bool,
}

impl CacheStats {
    /// Buffered-ahead bytes, `end - cursor`.
    pub fn front_bytes(&self) -> u64 {
        self.end - self.cursor
    }

    /// Retained already-consumed bytes, `cursor - begin`.
    pub fn back_bytes(&self) -> u64 {
        self.cursor - self.begin
    }

    /// Logical range currently held by the buffer.
    pub fn cached_range(&self) -> Range<u64> {
        self.begin..self.end
    }

    /// Front-window fill level (0.0 to 1.0).
    pub fn fill_ratio(&self) -> f32 {
        let front_capacity = self.capacity - self.back_capacity;
        if front_capacity == 0 {
            return 0.0;
        }
        (self.front_bytes() as f32 / front_capacity as f32).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.front_bytes(), 0);
        assert_eq!(stats.back_bytes(), 0);
        assert_eq!(stats.fill_ratio(), 0.0);
        assert!(stats.cached_range().is_empty());
    }

    #[test]
    fn test_stats_occupancy() {
        let stats = CacheStats {
            begin: 2,
            cursor: 6,
            end: 14,
            capacity: 24,
            back_capacity: 8,
            ..Default::default()
        };
        assert_eq!(stats.front_bytes(), 8);
        assert_eq!(stats.back_bytes(), 4);
        assert!((stats.fill_ratio() - 0.5).abs() < 0.01);
        assert_eq!(stats.cached_range(), 2..14);
    }
}
