//! Producer/consumer tests for the circular cache.
//!
//! These run a real producer thread against the public API and check the
//! window invariants from the consumer side.

use core_cache::{CacheConfig, CacheError, CircularCache, ReadOutcome};
use std::thread;
use std::time::{Duration, Instant};

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8).collect()
}

#[test]
fn test_concurrent_round_trip() {
    let cache = CircularCache::open(64, 32).unwrap();
    let data = pattern(10_000);

    let producer = cache.clone();
    let input = data.clone();
    let handle = thread::spawn(move || {
        let mut offset = 0;
        let mut size = 1;
        while offset < input.len() {
            let end = (offset + size).min(input.len());
            offset += producer.write_all(&input[offset..end], Duration::from_secs(10));
            size = size % 37 + 1;
        }
        producer.set_end_of_input();
    });

    let mut received = Vec::with_capacity(data.len());
    let mut out = [0u8; 5];
    loop {
        match cache.read(&mut out) {
            ReadOutcome::Data(n) => received.extend_from_slice(&out[..n]),
            ReadOutcome::WouldBlock => {
                cache.wait_for_data(1, Duration::from_millis(50));
            }
            ReadOutcome::EndOfStream => break,
        }

        let stats = cache.stats();
        assert!(stats.begin <= stats.cursor && stats.cursor <= stats.end);
        assert!(stats.end - stats.begin <= 96);
    }

    handle.join().unwrap();
    assert_eq!(received, data);
    assert_eq!(cache.stats().bytes_read, 10_000);
}

#[test]
fn test_rewind_replays_back_window() {
    let cache = CircularCache::open(16, 8).unwrap();
    let data = pattern(40);
    let mut written = 0;
    let mut received = Vec::new();
    let mut out = [0u8; 4];

    while written < data.len() {
        written += cache.write(&data[written..]);
        if let ReadOutcome::Data(n) = cache.read(&mut out) {
            received.extend_from_slice(&out[..n]);
        }
    }

    let stats = cache.stats();
    assert!(stats.back_bytes() >= 8);

    // Rewind to the oldest retained byte and read it again
    let oldest = stats.begin;
    assert_eq!(cache.seek(oldest).unwrap(), oldest);
    let mut replay = [0u8; 4];
    assert_eq!(cache.read(&mut replay), ReadOutcome::Data(4));
    let start = oldest as usize;
    assert_eq!(&replay[..], &data[start..start + 4]);

    assert!(matches!(
        cache.seek(oldest - 1),
        Err(CacheError::OutOfWindow { .. })
    ));
}

#[test]
fn test_blocked_producer_resumes_after_read() {
    let cache = CircularCache::open(8, 0).unwrap();
    assert_eq!(cache.write(&[0u8; 8]), 8);
    assert_eq!(cache.max_write_size(8), 0);

    let producer = cache.clone();
    let handle = thread::spawn(move || producer.wait_for_space(4, Duration::from_secs(10)));

    thread::sleep(Duration::from_millis(20));
    let mut out = [0u8; 4];
    assert_eq!(cache.read(&mut out), ReadOutcome::Data(4));

    assert!(handle.join().unwrap() >= 4);
}

#[test]
fn test_reset_after_out_of_window_seek() {
    let cache = CircularCache::open(16, 8).unwrap();
    cache.write(&pattern(16));

    let err = cache.seek(5_000_000).unwrap_err();
    assert!(err.is_recoverable());

    // The owner repositions its source and restarts the window
    cache.reset(5_000_000);
    cache.write(b"tail");
    let mut out = [0u8; 4];
    assert_eq!(cache.read(&mut out), ReadOutcome::Data(4));
    assert_eq!(&out, b"tail");
    assert_eq!(cache.position(), 5_000_004);
}

#[test]
fn test_wait_for_data_bounded_overshoot() {
    let config = CacheConfig {
        front_capacity: 32,
        back_capacity: 8,
        wait_poll_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let cache = CircularCache::with_config(&config).unwrap();

    let start = Instant::now();
    assert_eq!(cache.wait_for_data(16, Duration::from_millis(80)), 0);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(80));
    assert!(elapsed < Duration::from_millis(1500));
}
