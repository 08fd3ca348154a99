//! Logging system demonstration
//!
//! Streams an in-memory "track" through a small read-ahead cache with logging
//! enabled, so pump lifecycle, window resets and reseeks show up in the log.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # With custom filter
//! cargo run --example logging_demo -- compact "core_cache=trace"
//! ```

use core_cache::{CacheConfig, CachedReader, ReaderSource};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use std::env;
use std::io::{Cursor, Read, Seek, SeekFrom};
use tracing::{info, span, Level};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug)
        .with_thread_info(true);
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }
    init_logging(config)?;

    let track: Vec<u8> = (0..1_000_000u32).map(|i| (i % 251) as u8).collect();
    let source = ReaderSource::new(Cursor::new(track))?;
    let cache_config = CacheConfig {
        chunk_size: 16 * 1024,
        ..CacheConfig::low_memory()
    };
    let mut reader = CachedReader::new(source, cache_config)?;

    let _span = span!(Level::INFO, "playback").entered();

    let mut buf = vec![0u8; 64 * 1024];
    reader.read_exact(&mut buf)?;
    info!(position = reader.position(), "Read intro");

    // Short rewind: served from the back window
    reader.seek(SeekFrom::Current(-32 * 1024))?;
    reader.read_exact(&mut buf[..1024])?;

    // Jump near the end: the source has to be repositioned
    reader.seek(SeekFrom::End(-4096))?;
    let mut tail = Vec::new();
    reader.read_to_end(&mut tail)?;

    let stats = reader.cache_stats();
    let pump = reader.pump_stats();
    info!(
        tail = tail.len(),
        resets = stats.resets,
        reseeks = pump.reseeks,
        fill_rate = pump.avg_fill_rate,
        "Playback finished"
    );

    Ok(())
}
