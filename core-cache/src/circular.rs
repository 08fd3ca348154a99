//! # Circular Read-Ahead Cache
//!
//! A fixed-capacity byte ring shared between one producer (the thread pumping
//! a slow source) and one consumer (the playback pipeline).
//!
//! ## Design
//!
//! - **Logical offsets**: `begin <= cursor <= end` index an unbounded byte
//!   stream; the byte at offset `o` lives at `o % capacity`.
//! - **Back window**: `[begin, cursor)`, already consumed, kept for cheap
//!   backward seeks. Up to `back_capacity` bytes of it are protected from
//!   eviction.
//! - **Front window**: `[cursor, end)`, buffered ahead and unread.
//! - **Short transfers**: `write` and `read` stop at the physical wrap point
//!   and at the capacity limit. Callers loop.
//! - **Synchronization**: one `parking_lot::Mutex` around the offsets and the
//!   buffer, plus two condition variables (`data_written`, `space_freed`).
//!   The lock is never held across a wait.
//!
//! ## Usage
//!
//! ```rust
//! use core_cache::circular::{CircularCache, ReadOutcome};
//!
//! let cache = CircularCache::open(16, 8).unwrap();
//!
//! // Producer
//! assert_eq!(cache.write(b"hello world"), 11);
//!
//! // Consumer
//! let mut out = [0u8; 5];
//! assert_eq!(cache.read(&mut out), ReadOutcome::Data(5));
//! assert_eq!(&out, b"hello");
//!
//! // Rewind inside the retained window
//! assert_eq!(cache.seek(0).unwrap(), 0);
//! ```

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::stats::CacheStats;
use parking_lot::{Condvar, Mutex};
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Result of a non-blocking [`CircularCache::read`].
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were copied into the caller's buffer.
    Data(usize),
    /// No data is buffered yet; the producer is still running.
    WouldBlock,
    /// The producer signalled end of input (or the cache was closed) and
    /// every buffered byte has been consumed.
    EndOfStream,
}

impl ReadOutcome {
    /// Number of bytes copied, if any were.
    pub fn bytes(&self) -> Option<usize> {
        match self {
            ReadOutcome::Data(n) => Some(*n),
            _ => None,
        }
    }
}

// ============================================================================
// Shared State
// ============================================================================

struct CacheState {
    buffer: Vec<u8>,
    capacity: usize,
    begin: u64,
    cursor: u64,
    end: u64,
    end_of_input: bool,
    closed: bool,
    bytes_written: u64,
    bytes_read: u64,
    bytes_evicted: u64,
    resets: u64,
    out_of_window_seeks: u64,
}

impl CacheState {
    fn physical(&self, offset: u64) -> usize {
        (offset % self.capacity as u64) as usize
    }

    fn front(&self) -> u64 {
        self.end - self.cursor
    }

    fn back(&self) -> u64 {
        self.cursor - self.begin
    }

    /// Bytes readable right now; zero once closed since the buffer is gone.
    fn available(&self) -> usize {
        if self.closed {
            0
        } else {
            self.front() as usize
        }
    }

    /// Bytes that can be appended without evicting protected history.
    fn write_limit(&self, back_capacity: usize) -> usize {
        let reserved = self.back().min(back_capacity as u64);
        (self.capacity as u64)
            .saturating_sub(reserved)
            .saturating_sub(self.front()) as usize
    }
}

struct CacheInner {
    state: Mutex<CacheState>,
    data_written: Condvar,
    space_freed: Condvar,
    front_capacity: usize,
    back_capacity: usize,
    forward_seek_tolerance: u64,
    forward_seek_timeout: Duration,
    poll_interval: Duration,
}

/// Thread-safe circular read-ahead cache.
///
/// Cloning yields another handle to the same cache, so the producer and the
/// consumer can each own one.
#[derive(Clone)]
pub struct CircularCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for CircularCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("CircularCache")
            .field("capacity", &state.capacity)
            .field("back_capacity", &self.inner.back_capacity)
            .field("begin", &state.begin)
            .field("cursor", &state.cursor)
            .field("end", &state.end)
            .field("end_of_input", &state.end_of_input)
            .field("closed", &state.closed)
            .finish()
    }
}

impl CircularCache {
    /// Open a cache holding `front_capacity + back_capacity` bytes.
    ///
    /// Other tunables take their [`CacheConfig`] defaults.
    ///
    /// # Errors
    ///
    /// - [`CacheError::InvalidConfig`] if `front_capacity` is zero or the sum
    ///   overflows
    /// - [`CacheError::Allocation`] if the buffer cannot be obtained
    pub fn open(front_capacity: usize, back_capacity: usize) -> Result<Self> {
        Self::with_config(&CacheConfig {
            front_capacity,
            back_capacity,
            ..Default::default()
        })
    }

    /// Open a cache sized and tuned by `config`.
    pub fn with_config(config: &CacheConfig) -> Result<Self> {
        config.validate().map_err(CacheError::InvalidConfig)?;
        let capacity = config.total_capacity().ok_or_else(|| {
            CacheError::InvalidConfig("front_capacity + back_capacity overflows".to_string())
        })?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| CacheError::Allocation {
                requested: capacity,
            })?;
        buffer.resize(capacity, 0);

        debug!(
            front = config.front_capacity,
            back = config.back_capacity,
            "Opened circular cache"
        );

        Ok(Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState {
                    buffer,
                    capacity,
                    begin: 0,
                    cursor: 0,
                    end: 0,
                    end_of_input: false,
                    closed: false,
                    bytes_written: 0,
                    bytes_read: 0,
                    bytes_evicted: 0,
                    resets: 0,
                    out_of_window_seeks: 0,
                }),
                data_written: Condvar::new(),
                space_freed: Condvar::new(),
                front_capacity: config.front_capacity,
                back_capacity: config.back_capacity,
                forward_seek_tolerance: config.forward_seek_tolerance,
                forward_seek_timeout: config.forward_seek_timeout,
                poll_interval: config.wait_poll_interval,
            }),
        })
    }

    // ========================================================================
    // Producer Side
    // ========================================================================

    /// Append bytes at the end of the stream.
    ///
    /// Returns the number of bytes accepted, which is short when the write
    /// reaches the physical wrap point or the capacity limit, and zero when
    /// the buffer has no room (or the cache is closed). Only history beyond
    /// `back_capacity` is ever evicted to make room, oldest first.
    pub fn write(&self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.closed {
            return 0;
        }

        let limit = state.write_limit(self.inner.back_capacity);
        let pos = state.physical(state.end);
        let wrap = state.capacity - pos;
        let actual = data.len().min(limit).min(wrap);
        if actual == 0 {
            return 0;
        }

        state.buffer[pos..pos + actual].copy_from_slice(&data[..actual]);
        state.end += actual as u64;
        state.bytes_written += actual as u64;

        let capacity = state.capacity as u64;
        if state.end - state.begin > capacity {
            let begin = state.end - capacity;
            trace!(from = state.begin, to = begin, "Evicting retained bytes");
            state.bytes_evicted += begin - state.begin;
            state.begin = begin;
        }
        drop(guard);

        self.inner.data_written.notify_all();
        actual
    }

    /// Write all of `data`, waiting for space as needed.
    ///
    /// Gives up when `timeout` elapses or the cache is closed; the return
    /// value is the number of bytes accepted before that.
    pub fn write_all(&self, mut data: &[u8], timeout: Duration) -> usize {
        let deadline = Instant::now().checked_add(timeout);
        let mut total = 0;

        while !data.is_empty() {
            let written = self.write(data);
            if written > 0 {
                total += written;
                data = &data[written..];
                continue;
            }

            if self.is_closed() {
                break;
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if remaining.is_zero() {
                break;
            }
            self.wait_for_space(1, remaining);
        }

        total
    }

    /// Block until at least `minimum` bytes can be written.
    ///
    /// `minimum` is clamped to `front_capacity`. Returns the current
    /// [`max_write_size`](Self::max_write_size), which may be smaller on
    /// timeout or close.
    pub fn wait_for_space(&self, minimum: usize, timeout: Duration) -> usize {
        let back_capacity = self.inner.back_capacity;
        let mut state = self.inner.state.lock();
        if timeout.is_zero() || state.closed {
            return if state.closed {
                0
            } else {
                state.write_limit(back_capacity)
            };
        }

        let minimum = minimum.min(self.inner.front_capacity);
        let deadline = Instant::now().checked_add(timeout);

        while !state.closed && state.write_limit(back_capacity) < minimum {
            let Some(slice) = self.next_sleep(deadline) else {
                break;
            };
            self.inner.space_freed.wait_for(&mut state, slice);
        }

        if state.closed {
            0
        } else {
            state.write_limit(back_capacity)
        }
    }

    /// Mark the source as exhausted. Readers see end of stream once the
    /// buffered data is consumed.
    pub fn set_end_of_input(&self) {
        let mut state = self.inner.state.lock();
        if !state.end_of_input {
            debug!(end = state.end, "End of input");
            state.end_of_input = true;
        }
        drop(state);
        self.inner.data_written.notify_all();
    }

    /// Maximum number of bytes a write of `requested` bytes could accept
    /// right now, ignoring the physical wrap point.
    pub fn max_write_size(&self, requested: usize) -> usize {
        let state = self.inner.state.lock();
        if state.closed {
            return 0;
        }
        requested.min(state.write_limit(self.inner.back_capacity))
    }

    // ========================================================================
    // Consumer Side
    // ========================================================================

    /// Copy buffered bytes at the cursor into `buf` without blocking.
    ///
    /// Reads are short at the physical wrap point; callers loop.
    pub fn read(&self, buf: &mut [u8]) -> ReadOutcome {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.closed {
            return ReadOutcome::EndOfStream;
        }
        if buf.is_empty() {
            return ReadOutcome::Data(0);
        }

        let pos = state.physical(state.cursor);
        let avail = ((state.capacity - pos) as u64).min(state.front()) as usize;
        if avail == 0 {
            return if state.end_of_input {
                ReadOutcome::EndOfStream
            } else {
                ReadOutcome::WouldBlock
            };
        }

        let n = buf.len().min(avail);
        buf[..n].copy_from_slice(&state.buffer[pos..pos + n]);
        state.cursor += n as u64;
        state.bytes_read += n as u64;
        drop(guard);

        self.inner.space_freed.notify_all();
        ReadOutcome::Data(n)
    }

    /// Block until at least `minimum` bytes are buffered ahead of the cursor.
    ///
    /// Returns immediately when `timeout` is zero or the producer has already
    /// signalled end of input. `minimum` is clamped to `front_capacity`, the
    /// most the front window can ever hold. Always returns the latest
    /// `end - cursor`, which may be less than `minimum` on timeout; zero once
    /// the cache is closed.
    pub fn wait_for_data(&self, minimum: usize, timeout: Duration) -> usize {
        let mut state = self.inner.state.lock();
        if timeout.is_zero() || state.end_of_input || state.closed {
            return state.available();
        }

        let minimum = minimum.min(self.inner.front_capacity) as u64;
        let deadline = Instant::now().checked_add(timeout);

        while state.front() < minimum && !state.end_of_input && !state.closed {
            let Some(slice) = self.next_sleep(deadline) else {
                break;
            };
            self.inner.data_written.wait_for(&mut state, slice);
        }

        state.available()
    }

    /// Move the cursor to `position`.
    ///
    /// Inside `[begin, end]` this is O(1) and copies nothing. A position a
    /// little past `end` (within the configured forward tolerance) first
    /// waits up to the forward-seek timeout for the producer to catch up.
    ///
    /// # Errors
    ///
    /// - [`CacheError::OutOfWindow`] if the position is still not cached;
    ///   the caller repositions the source and calls [`reset`](Self::reset)
    /// - [`CacheError::Closed`] after [`close`](Self::close)
    pub fn seek(&self, position: u64) -> Result<u64> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(CacheError::Closed);
        }

        if position > state.end
            && position - state.end <= self.inner.forward_seek_tolerance
            && !state.end_of_input
        {
            let wanted = usize::try_from(position - state.cursor).unwrap_or(usize::MAX);
            drop(state);
            trace!(position, wanted, "Waiting for producer before forward seek");
            self.wait_for_data(wanted, self.inner.forward_seek_timeout);
            state = self.inner.state.lock();
            if state.closed {
                return Err(CacheError::Closed);
            }
        }

        if position >= state.begin && position <= state.end {
            state.cursor = position;
            drop(state);
            self.inner.space_freed.notify_all();
            return Ok(position);
        }

        state.out_of_window_seeks += 1;
        let (begin, end) = (state.begin, state.end);
        drop(state);

        debug!(position, begin, end, "Seek outside cached window");
        Err(CacheError::OutOfWindow {
            position,
            begin,
            end,
        })
    }

    /// Discard all buffered content and restart the window at `position`.
    ///
    /// Clears end of input; the producer is expected to continue from the
    /// matching source position.
    pub fn reset(&self, position: u64) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        debug!(position, "Resetting cache window");
        state.begin = position;
        state.cursor = position;
        state.end = position;
        state.end_of_input = false;
        state.resets += 1;
        drop(state);

        self.inner.data_written.notify_all();
        self.inner.space_freed.notify_all();
    }

    /// Release the buffer and wake every blocked caller.
    ///
    /// Afterwards reads report end of stream, writes accept nothing and
    /// seeks fail with [`CacheError::Closed`].
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.buffer = Vec::new();
        debug!(
            written = state.bytes_written,
            read = state.bytes_read,
            "Closed circular cache"
        );
        drop(state);

        self.inner.data_written.notify_all();
        self.inner.space_freed.notify_all();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Logical range held by the buffer, `begin..end`.
    pub fn cached_range(&self) -> Range<u64> {
        let state = self.inner.state.lock();
        state.begin..state.end
    }

    /// Returns `true` if a seek to `position` would succeed without waiting.
    pub fn is_cached_position(&self, position: u64) -> bool {
        let state = self.inner.state.lock();
        position >= state.begin && position <= state.end
    }

    /// End of contiguous cached data after seeking to `position`, or
    /// `position` itself when it is not cached.
    pub fn cached_end_if_seek_to(&self, position: u64) -> u64 {
        let state = self.inner.state.lock();
        if position >= state.begin && position <= state.end {
            state.end
        } else {
            position
        }
    }

    /// Logical offset of the next byte [`read`](Self::read) returns.
    pub fn position(&self) -> u64 {
        self.inner.state.lock().cursor
    }

    /// Bytes buffered ahead of the cursor.
    pub fn available(&self) -> usize {
        self.inner.state.lock().available()
    }

    /// Physical buffer size, `front_capacity + back_capacity`.
    pub fn capacity(&self) -> usize {
        self.inner.front_capacity + self.inner.back_capacity
    }

    pub fn front_capacity(&self) -> usize {
        self.inner.front_capacity
    }

    pub fn back_capacity(&self) -> usize {
        self.inner.back_capacity
    }

    pub fn is_end_of_input(&self) -> bool {
        self.inner.state.lock().end_of_input
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Consistent snapshot of the window and lifetime counters.
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            begin: state.begin,
            cursor: state.cursor,
            end: state.end,
            capacity: state.capacity,
            back_capacity: self.inner.back_capacity,
            bytes_written: state.bytes_written,
            bytes_read: state.bytes_read,
            bytes_evicted: state.bytes_evicted,
            resets: state.resets,
            out_of_window_seeks: state.out_of_window_seeks,
            end_of_input: state.end_of_input,
            closed: state.closed,
        }
    }

    /// Length of the next condition-variable sleep, or `None` once the
    /// deadline has passed.
    fn next_sleep(&self, deadline: Option<Instant>) -> Option<Duration> {
        match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    None
                } else {
                    Some(remaining.min(self.inner.poll_interval))
                }
            }
            None => Some(self.inner.poll_interval),
        }
    }
}
