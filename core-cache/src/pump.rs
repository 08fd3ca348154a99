//! # Source Pump
//!
//! Producer side of the read-ahead pipeline. Runs on its own named thread and
//! keeps the cache's front window topped up from a [`ByteSource`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         SourcePump (Producer)           │
//! │                                         │
//! │  1. Read a chunk (ByteSource)           │
//! │  2. write_all into the cache            │
//! │  3. Service reposition requests         │
//! └────────────┬────────────────────────────┘
//!              │ bytes
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │        CircularCache (Shared)           │
//! └────────────┬────────────────────────────┘
//!              │ bytes
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │      CachedReader (Consumer)            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Writes are bounded by the cache's poll interval so that stop and seek
//! requests are noticed even while the cache is full.

use crate::circular::CircularCache;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::source::ByteSource;
use parking_lot::{Condvar, Mutex};
use std::io;
use std::ops::Range;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Current state of the source pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpState {
    /// Thread spawned, nothing read yet.
    Idle,
    /// Reading from the source and writing into the cache.
    Filling,
    /// The cache has no room; waiting for the consumer.
    Full,
    /// The source is exhausted; end of input has been signalled.
    Completed,
    /// The source failed; end of input has been signalled.
    Failed,
    /// The pump thread has exited.
    Stopped,
}

impl PumpState {
    /// Returns `true` while the pump can still produce data without a seek.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Idle | Self::Filling | Self::Full)
    }

    /// Returns `true` once the thread has exited.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Statistics about pump throughput.
#[derive(Debug, Clone, Default)]
pub struct PumpStats {
    /// Successful reads issued against the source.
    pub source_reads: u64,
    /// Bytes accepted by the cache.
    pub bytes_pumped: u64,
    /// Completed source repositions.
    pub reseeks: u64,
    /// Source read or seek failures.
    pub source_errors: u64,
    /// Average fill rate in bytes per second since the pump started.
    pub avg_fill_rate: f64,
}

// ============================================================================
// Control Block
// ============================================================================

/// A reposition request, tagged so its answer cannot be mistaken for
/// another request's.
#[derive(Debug, Clone, Copy)]
struct SeekRequest {
    id: u64,
    position: u64,
}

struct PumpControl {
    state: PumpState,
    stats: PumpStats,
    stop: bool,
    next_seek_id: u64,
    pending_seek: Option<SeekRequest>,
    seek_result: Option<(u64, io::Result<u64>)>,
    last_error: Option<String>,
}

struct PumpShared {
    control: Mutex<PumpControl>,
    changed: Condvar,
}

impl PumpShared {
    fn set_state(&self, state: PumpState) {
        self.control.lock().state = state;
        self.changed.notify_all();
    }
}

/// Handle to a running pump thread.
///
/// Dropping the handle stops the thread and joins it. The cache itself is not
/// closed; its owner decides that.
pub struct SourcePump {
    shared: Arc<PumpShared>,
    handle: Option<JoinHandle<()>>,
    length: Option<u64>,
    reseek_timeout: Duration,
}

impl std::fmt::Debug for SourcePump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourcePump")
            .field("state", &self.state())
            .field("length", &self.length)
            .finish()
    }
}

impl SourcePump {
    /// Start pumping `source` into `cache` on a new thread.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid or the thread cannot be
    /// spawned.
    pub fn spawn<S>(source: S, cache: CircularCache, config: &CacheConfig) -> Result<Self>
    where
        S: ByteSource + 'static,
    {
        config.validate().map_err(CacheError::InvalidConfig)?;

        let length = source.length();
        let shared = Arc::new(PumpShared {
            control: Mutex::new(PumpControl {
                state: PumpState::Idle,
                stats: PumpStats::default(),
                stop: false,
                next_seek_id: 0,
                pending_seek: None,
                seek_result: None,
                last_error: None,
            }),
            changed: Condvar::new(),
        });

        let worker = PumpWorker {
            source,
            cache,
            shared: Arc::clone(&shared),
            chunk: vec![0u8; config.chunk_size],
            poll_interval: config.wait_poll_interval,
        };
        let handle = thread::Builder::new()
            .name("cache-pump".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            shared,
            handle: Some(handle),
            length,
            reseek_timeout: config.reseek_timeout,
        })
    }

    /// Total source length, as reported when the pump started.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Get the current pump state.
    pub fn state(&self) -> PumpState {
        self.shared.control.lock().state
    }

    /// Get pump statistics.
    pub fn stats(&self) -> PumpStats {
        self.shared.control.lock().stats.clone()
    }

    /// Message of the most recent source failure, cleared by a successful
    /// reseek.
    pub fn last_error(&self) -> Option<String> {
        self.shared.control.lock().last_error.clone()
    }

    /// Ask the pump to reposition the source to `position` and reset the
    /// cache there. Blocks until the pump has done so.
    ///
    /// A request that times out before the pump picks it up is withdrawn. One
    /// that times out while the source is already seeking still completes
    /// unless a newer request supersedes it, so callers should re-read the
    /// cache position after a timeout.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Source`] if the source cannot seek, or the pump did not
    ///   answer within the reseek timeout
    /// - [`CacheError::PumpStopped`] if the thread has exited
    pub fn request_seek(&self, position: u64) -> Result<u64> {
        let mut control = self.shared.control.lock();
        if control.stop || control.state == PumpState::Stopped {
            return Err(CacheError::PumpStopped);
        }

        control.next_seek_id += 1;
        let id = control.next_seek_id;
        debug!(id, position, "Requesting source reseek");
        control.seek_result = None;
        control.pending_seek = Some(SeekRequest { id, position });
        self.shared.changed.notify_all();

        let deadline = Instant::now() + self.reseek_timeout;
        loop {
            if let Some(result) = Self::take_result(&mut control, id) {
                return result.map_err(CacheError::Source);
            }
            if control.state == PumpState::Stopped {
                return Err(CacheError::PumpStopped);
            }
            if self
                .shared
                .changed
                .wait_until(&mut control, deadline)
                .timed_out()
            {
                if let Some(result) = Self::take_result(&mut control, id) {
                    return result.map_err(CacheError::Source);
                }
                if control.pending_seek.is_some_and(|pending| pending.id == id) {
                    control.pending_seek = None;
                }
                warn!(id, position, "Source reseek timed out");
                return Err(CacheError::Source(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "source reseek timed out",
                )));
            }
        }
    }

    fn take_result(control: &mut PumpControl, id: u64) -> Option<io::Result<u64>> {
        match control.seek_result.take() {
            Some((answered, result)) if answered == id => Some(result),
            // Answer to an abandoned request
            Some(_) | None => None,
        }
    }

    /// Stop the pump thread and wait for it to exit.
    pub fn stop(&mut self) {
        {
            let mut control = self.shared.control.lock();
            control.stop = true;
        }
        self.shared.changed.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Source pump thread panicked");
            }
        }
    }
}

impl Drop for SourcePump {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Worker
// ============================================================================

enum Command {
    Stop,
    Seek(SeekRequest),
    Continue,
}

struct PumpWorker<S> {
    source: S,
    cache: CircularCache,
    shared: Arc<PumpShared>,
    chunk: Vec<u8>,
    poll_interval: Duration,
}

impl<S: ByteSource> PumpWorker<S> {
    #[instrument(skip(self), name = "source_pump")]
    fn run(mut self) {
        info!(chunk_size = self.chunk.len(), "Source pump started");
        let started = Instant::now();
        let mut pending: Range<usize> = 0..0;

        loop {
            match self.next_command() {
                Command::Stop => break,
                Command::Seek(request) => {
                    pending = 0..0;
                    self.reposition(request);
                    continue;
                }
                Command::Continue => {}
            }

            if self.cache.is_closed() {
                debug!("Cache closed, stopping pump");
                break;
            }

            if pending.is_empty() {
                let state = self.shared.control.lock().state;
                if matches!(state, PumpState::Completed | PumpState::Failed) {
                    // Nothing left to read until someone asks for a reseek
                    let mut control = self.shared.control.lock();
                    if !control.stop && control.pending_seek.is_none() {
                        self.shared
                            .changed
                            .wait_for(&mut control, self.poll_interval);
                    }
                    continue;
                }

                match self.source.read(&mut self.chunk) {
                    Ok(0) => {
                        info!(end = self.cache.cached_range().end, "Source exhausted");
                        self.shared.set_state(PumpState::Completed);
                        self.cache.set_end_of_input();
                        continue;
                    }
                    Ok(n) => {
                        pending = 0..n;
                        self.shared.control.lock().stats.source_reads += 1;
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(error = %e, "Source read failed");
                        {
                            let mut control = self.shared.control.lock();
                            control.stats.source_errors += 1;
                            control.last_error = Some(e.to_string());
                            control.state = PumpState::Failed;
                        }
                        self.shared.changed.notify_all();
                        self.cache.set_end_of_input();
                        continue;
                    }
                }
            }

            let written = self
                .cache
                .write_all(&self.chunk[pending.clone()], self.poll_interval);
            pending.start += written;

            let mut control = self.shared.control.lock();
            control.stats.bytes_pumped += written as u64;
            let elapsed = started.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                control.stats.avg_fill_rate = control.stats.bytes_pumped as f64 / elapsed;
            }
            control.state = if pending.is_empty() {
                PumpState::Filling
            } else {
                PumpState::Full
            };
        }

        self.shared.set_state(PumpState::Stopped);
        info!("Source pump stopped");
    }

    fn next_command(&self) -> Command {
        let mut control = self.shared.control.lock();
        if control.stop {
            return Command::Stop;
        }
        match control.pending_seek.take() {
            Some(request) => Command::Seek(request),
            None => Command::Continue,
        }
    }

    fn reposition(&mut self, request: SeekRequest) {
        let SeekRequest { id, position } = request;
        let result = self.source.seek(position);
        let mut control = self.shared.control.lock();
        if control.pending_seek.is_some() {
            // A newer request moves the source again before anything is read
            debug!(id, position, "Reseek superseded");
            return;
        }
        match &result {
            Ok(actual) => {
                self.cache.reset(*actual);
                control.stats.reseeks += 1;
                control.last_error = None;
                control.state = PumpState::Filling;
                debug!(position = *actual, "Source repositioned");
            }
            Err(e) => {
                warn!(position, error = %e, "Source reseek failed");
                control.stats.source_errors += 1;
            }
        }
        control.seek_result = Some((id, result));
        drop(control);
        self.shared.changed.notify_all();
    }
}
