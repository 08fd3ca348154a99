//! # Cached Reader
//!
//! Blocking `Read + Seek` view over a [`CircularCache`] fed by a
//! [`SourcePump`]. Decoders and demuxers consume this like a file.
//!
//! Reads block (up to the configured read timeout) when the producer has not
//! caught up. Seeks inside the cached window are free; anything else asks the
//! pump to reposition the source and restarts the window there.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core_cache::{CacheConfig, CachedReader, ReaderSource};
//! use std::io::{Read, Seek, SeekFrom};
//!
//! # fn main() -> std::io::Result<()> {
//! let file = std::fs::File::open("track.flac")?;
//! let source = ReaderSource::new(file)?;
//! let mut reader = CachedReader::new(source, CacheConfig::default())?;
//!
//! let mut header = [0u8; 4];
//! reader.read_exact(&mut header)?;
//! reader.seek(SeekFrom::Start(0))?; // served from the back window
//! # Ok(())
//! # }
//! ```

use crate::circular::{CircularCache, ReadOutcome};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::pump::{PumpState, PumpStats, SourcePump};
use crate::source::ByteSource;
use crate::stats::CacheStats;
use std::io::{self, Read, Seek, SeekFrom};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// `Read + Seek` adapter over a pumped circular cache.
///
/// Dropping the reader closes the cache and stops the pump.
#[derive(Debug)]
pub struct CachedReader {
    cache: CircularCache,
    pump: SourcePump,
    read_timeout: Duration,
}

impl CachedReader {
    /// Open a cache sized by `config` and start pumping `source` into it.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the buffer cannot be
    /// allocated, or the pump thread cannot be spawned.
    pub fn new<S>(source: S, config: CacheConfig) -> Result<Self>
    where
        S: ByteSource + 'static,
    {
        let cache = CircularCache::with_config(&config)?;
        let pump = match SourcePump::spawn(source, cache.clone(), &config) {
            Ok(pump) => pump,
            Err(e) => {
                cache.close();
                return Err(e);
            }
        };

        Ok(Self {
            cache,
            pump,
            read_timeout: config.read_timeout,
        })
    }

    /// Total stream length, if the source reports one.
    pub fn length(&self) -> Option<u64> {
        self.pump.length()
    }

    /// Current logical read position.
    pub fn position(&self) -> u64 {
        self.cache.position()
    }

    /// Shared handle to the underlying cache.
    pub fn cache(&self) -> &CircularCache {
        &self.cache
    }

    pub fn pump_state(&self) -> PumpState {
        self.pump.state()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn pump_stats(&self) -> PumpStats {
        self.pump.stats()
    }

    fn resolve(&self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.cache.position().checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let Some(length) = self.length() else {
                    warn!("SeekFrom::End failed: unknown stream length");
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "cannot seek from end: unknown stream length",
                    ));
                };
                length.checked_add_signed(delta)
            }
        };

        target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )
        })
    }
}

impl Read for CachedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = Instant::now() + self.read_timeout;
        loop {
            match self.cache.read(buf) {
                ReadOutcome::Data(n) => return Ok(n),
                ReadOutcome::EndOfStream => {
                    if let Some(message) = self.pump.last_error() {
                        return Err(io::Error::new(io::ErrorKind::Other, message));
                    }
                    return Ok(0);
                }
                ReadOutcome::WouldBlock => {
                    if self.pump.state().is_terminal() {
                        return Err(CacheError::PumpStopped.into());
                    }
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        warn!(position = self.cache.position(), "Read timed out");
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "timed out waiting for source data",
                        ));
                    }
                    self.cache.wait_for_data(1, remaining);
                }
            }
        }
    }
}

impl Seek for CachedReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = self.resolve(pos)?;

        match self.cache.seek(target) {
            Ok(position) => Ok(position),
            Err(CacheError::OutOfWindow { begin, end, .. }) => {
                debug!(target, begin, end, "Reseeking source outside cached window");
                Ok(self.pump.request_seek(target)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for CachedReader {
    fn drop(&mut self) {
        // Wakes a pump blocked on back-pressure so the join below is quick
        self.cache.close();
    }
}
