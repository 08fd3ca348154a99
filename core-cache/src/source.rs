//! # Byte Source Boundary
//!
//! The cache never touches files, sockets or archives itself. Whatever feeds
//! it implements [`ByteSource`]: sequential reads, absolute repositioning and
//! an optional total length.

use std::io::{self, Read, Seek, SeekFrom};

/// A sequential byte source with optional random access.
#[cfg_attr(test, mockall::automock)]
pub trait ByteSource: Send {
    /// Read up to `buf.len()` bytes. `Ok(0)` means the source is exhausted.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Reposition to an absolute byte offset, returning the new offset.
    fn seek(&mut self, position: u64) -> io::Result<u64>;

    /// Total length in bytes, if the source knows it.
    fn length(&self) -> Option<u64>;
}

/// Adapts any `Read + Seek` implementation into a [`ByteSource`].
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    length: Option<u64>,
}

impl<R: Read + Seek + Send> ReaderSource<R> {
    /// Wrap `reader`, probing its length once without moving its position.
    pub fn new(mut reader: R) -> io::Result<Self> {
        let current = reader.stream_position()?;
        let length = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(current))?;
        Ok(Self {
            reader,
            length: Some(length),
        })
    }

    /// Wrap `reader` as a source of unknown length.
    pub fn without_length(reader: R) -> Self {
        Self {
            reader,
            length: None,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek + Send> ByteSource for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }

    fn seek(&mut self, position: u64) -> io::Result<u64> {
        self.reader.seek(SeekFrom::Start(position))
    }

    fn length(&self) -> Option<u64> {
        self.length
    }
}
