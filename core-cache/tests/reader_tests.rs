//! End-to-end tests for the cached reader.
//!
//! An in-memory source is pumped through a deliberately small cache so that
//! both window hits and real source reseeks are exercised.

use core_cache::{CacheConfig, CachedReader, PumpState, ReaderSource};
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::time::Duration;

fn config() -> CacheConfig {
    CacheConfig {
        front_capacity: 256,
        back_capacity: 128,
        chunk_size: 64,
        forward_seek_tolerance: 32,
        forward_seek_timeout: Duration::from_millis(500),
        wait_poll_interval: Duration::from_millis(5),
        read_timeout: Duration::from_secs(5),
        reseek_timeout: Duration::from_secs(5),
    }
}

fn media(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31) ^ (i >> 8)) as u8).collect()
}

fn open(data: &[u8]) -> CachedReader {
    let source = ReaderSource::new(Cursor::new(data.to_vec())).unwrap();
    CachedReader::new(source, config()).unwrap()
}

#[test]
fn test_sequential_read_matches_source() {
    let data = media(20_000);
    let mut reader = open(&data);

    let mut out = Vec::new();
    let mut buf = [0u8; 17];
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }

    assert_eq!(out, data);
    assert_eq!(reader.pump_stats().reseeks, 0);
    assert_eq!(reader.pump_state(), PumpState::Completed);
}

#[test]
fn test_short_rewind_is_served_from_cache() {
    let data = media(4096);
    let mut reader = open(&data);

    let mut buf = [0u8; 100];
    reader.read_exact(&mut buf).unwrap();

    assert_eq!(reader.seek(SeekFrom::Current(-50)).unwrap(), 50);
    reader.read_exact(&mut buf[..10]).unwrap();
    assert_eq!(&buf[..10], &data[50..60]);
    assert_eq!(reader.pump_stats().reseeks, 0);
}

#[test]
fn test_far_seeks_reseek_the_source() {
    let data = media(50_000);
    let mut reader = open(&data);

    let mut buf = [0u8; 64];
    assert_eq!(reader.seek(SeekFrom::Start(40_000)).unwrap(), 40_000);
    reader.read_exact(&mut buf).unwrap();
    assert_eq!(&buf[..], &data[40_000..40_064]);

    // Behind the retained window now
    assert_eq!(reader.seek(SeekFrom::Start(1_000)).unwrap(), 1_000);
    reader.read_exact(&mut buf).unwrap();
    assert_eq!(&buf[..], &data[1_000..1_064]);

    assert_eq!(reader.pump_stats().reseeks, 2);
    assert!(reader.cache_stats().resets >= 2);
}

#[test]
fn test_seek_to_end_reads_nothing() {
    let data = media(1_000);
    let mut reader = open(&data);

    assert_eq!(reader.seek(SeekFrom::End(0)).unwrap(), 1_000);
    let mut buf = [0u8; 8];
    assert_eq!(reader.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_interleaved_reads_and_seeks() {
    let data = media(8_192);
    let mut reader = open(&data);
    let mut buf = [0u8; 32];

    for &offset in &[0u64, 7_000, 6_990, 100, 8_000, 3_333] {
        reader.seek(SeekFrom::Start(offset)).unwrap();
        let want = ((data.len() as u64 - offset) as usize).min(buf.len());
        reader.read_exact(&mut buf[..want]).unwrap();
        let start = offset as usize;
        assert_eq!(&buf[..want], &data[start..start + want]);
    }
}
