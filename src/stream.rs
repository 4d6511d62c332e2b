// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Chunked, pull-based byte streams
//!
//! A [`ByteStream`] only pulls another chunk from its source
//! when a consumer asks for more bytes than are buffered,
//! so an idle stream never reads ahead.
//! A [`ByteSink`] buffers written bytes and suspends the writer
//! whenever its buffer reaches the high-water mark,
//! resuming once the underlying sink has accepted everything.
//!
//! Neither type is shared between tasks;
//! each operation runs to completion before the next begins.

use std::collections::VecDeque;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default size of each chunk pulled from a source
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default number of pending bytes before a sink suspends to drain
pub const DEFAULT_HIGH_WATER: usize = 64 * 1024;

/// A pull-based reader over some asynchronous source
///
/// # Example
/// ```
/// use id3_codec::stream::ByteStream;
///
/// # tokio_test();
/// # fn tokio_test() {
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let data: &[u8] = b"....ID3....";
/// let mut stream = ByteStream::with_chunk_size(data, 3);
///
/// // scanning discards everything before the marker
/// assert_eq!(stream.scan(b"ID3").await.unwrap(), Some(4));
/// assert_eq!(stream.read(3).await.unwrap(), b"ID3");
///
/// // reads at the end of the stream may come up short
/// assert_eq!(stream.read(10).await.unwrap(), b"....");
/// assert!(stream.is_finished());
/// # });
/// # }
/// ```
pub struct ByteStream<R> {
    source: R,
    chunks: VecDeque<Vec<u8>>,
    buffered: usize,
    position: u64,
    chunk_size: usize,
    exhausted: bool,
}

impl ByteStream<tokio::fs::File> {
    /// Opens a file for streaming
    ///
    /// # Errors
    ///
    /// Passes along any I/O error from opening the file.
    pub async fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        tokio::fs::File::open(path).await.map(Self::new)
    }
}

impl<R: AsyncRead + Unpin> ByteStream<R> {
    /// Wraps a source using the default chunk size
    pub fn new(source: R) -> Self {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    /// Wraps a source, pulling at most `chunk_size` bytes at a time
    pub fn with_chunk_size(source: R, chunk_size: usize) -> Self {
        Self {
            source,
            chunks: VecDeque::new(),
            buffered: 0,
            position: 0,
            chunk_size: chunk_size.max(1),
            exhausted: false,
        }
    }

    /// Absolute offset of the next unread byte
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of bytes pulled from the source but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// Whether the source is exhausted and nothing remains buffered
    pub fn is_finished(&self) -> bool {
        self.exhausted && self.buffered == 0
    }

    /// Pulls a single chunk from the source
    ///
    /// Returns `false` once the source is exhausted.
    async fn pull(&mut self) -> std::io::Result<bool> {
        if self.exhausted {
            return Ok(false);
        }

        let mut chunk = vec![0; self.chunk_size];
        match self.source.read(&mut chunk).await? {
            0 => {
                self.exhausted = true;
                Ok(false)
            }
            read => {
                chunk.truncate(read);
                self.buffered += read;
                self.chunks.push_back(chunk);
                Ok(true)
            }
        }
    }

    /// Removes up to `len` buffered bytes from the front of the queue
    fn take(&mut self, len: usize) -> Vec<u8> {
        let len = len.min(self.buffered);
        let mut output = Vec::with_capacity(len);

        while output.len() < len {
            let Some(mut chunk) = self.chunks.pop_front() else {
                break;
            };
            let wanted = len - output.len();
            if chunk.len() > wanted {
                let rest = chunk.split_off(wanted);
                self.chunks.push_front(rest);
            }
            output.extend_from_slice(&chunk);
        }

        self.buffered -= output.len();
        self.position += output.len() as u64;
        output
    }

    /// Drops up to `len` buffered bytes without copying them
    fn discard(&mut self, len: usize) -> usize {
        let mut dropped = 0;

        while dropped < len {
            let Some(chunk) = self.chunks.front_mut() else {
                break;
            };
            let wanted = len - dropped;
            if chunk.len() > wanted {
                chunk.drain(..wanted);
                dropped += wanted;
            } else {
                dropped += chunk.len();
                self.chunks.pop_front();
            }
        }

        self.buffered -= dropped;
        self.position += dropped as u64;
        dropped
    }

    /// Merges every buffered chunk into one
    fn coalesce(&mut self) -> &[u8] {
        if self.chunks.len() > 1 {
            let merged = self.chunks.drain(..).flatten().collect();
            self.chunks.push_back(merged);
        }
        self.chunks.front().map(Vec::as_slice).unwrap_or_default()
    }

    /// Reads up to `len` bytes
    ///
    /// Suspends until enough bytes are available.
    /// If the source is exhausted first, whatever remains is returned,
    /// so callers must check the length of the result.
    ///
    /// # Errors
    ///
    /// Passes along any I/O error from the source.
    pub async fn read(&mut self, len: usize) -> std::io::Result<Vec<u8>> {
        while self.buffered < len && self.pull().await? {}
        Ok(self.take(len))
    }

    /// Reads everything up to the end of the source
    pub async fn read_to_end(&mut self) -> std::io::Result<Vec<u8>> {
        while self.pull().await? {}
        Ok(self.take(self.buffered))
    }

    /// Logically un-reads some bytes
    ///
    /// They are returned again by the next read
    /// and the stream's position moves back accordingly.
    pub fn unshift(&mut self, bytes: Vec<u8>) {
        if !bytes.is_empty() {
            self.buffered += bytes.len();
            self.position = self.position.saturating_sub(bytes.len() as u64);
            self.chunks.push_front(bytes);
        }
    }

    /// Discards up to `len` bytes
    ///
    /// Returns the number of bytes actually skipped,
    /// which is fewer than `len` only at the end of the stream.
    pub async fn skip(&mut self, len: u64) -> std::io::Result<u64> {
        let mut skipped = 0;

        loop {
            let wanted = usize::try_from(len - skipped).unwrap_or(usize::MAX);
            skipped += self.discard(wanted) as u64;
            if skipped == len || !self.pull().await? {
                break Ok(skipped);
            }
        }
    }

    /// Searches forward for an exact byte sequence
    ///
    /// On success, every byte before the match is discarded,
    /// the match itself remains unread,
    /// and its absolute offset is returned.
    /// If the stream ends first, everything is discarded
    /// and `None` is returned.
    pub async fn scan(&mut self, marker: &[u8]) -> std::io::Result<Option<u64>> {
        if marker.is_empty() {
            return Ok(Some(self.position));
        }

        loop {
            let found = self
                .coalesce()
                .windows(marker.len())
                .position(|window| window == marker);

            if let Some(offset) = found {
                self.discard(offset);
                break Ok(Some(self.position));
            }

            // keep just enough to catch a marker split across chunks
            let keep = (marker.len() - 1).min(self.buffered);
            self.discard(self.buffered - keep);

            if !self.pull().await? {
                self.discard(self.buffered);
                break Ok(None);
            }
        }
    }

    /// Drops any buffered bytes and stops pulling from the source
    ///
    /// Subsequent reads return nothing.
    pub fn close(&mut self) {
        self.discard(self.buffered);
        self.exhausted = true;
    }

    /// Returns the underlying source, dropping any buffered bytes
    pub fn into_inner(self) -> R {
        self.source
    }
}

/// A buffered writer with explicit backpressure
///
/// Bytes accumulate until the high-water mark is reached,
/// at which point the writer suspends until the underlying
/// sink has accepted all of them.
pub struct ByteSink<W> {
    sink: W,
    pending: Vec<u8>,
    high_water: usize,
    written: u64,
}

impl ByteSink<tokio::fs::File> {
    /// Creates (or truncates) a file for writing
    ///
    /// # Errors
    ///
    /// Passes along any I/O error from creating the file.
    pub async fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        tokio::fs::File::create(path).await.map(Self::new)
    }
}

impl<W: AsyncWrite + Unpin> ByteSink<W> {
    /// Wraps a sink using the default high-water mark
    pub fn new(sink: W) -> Self {
        Self::with_high_water(sink, DEFAULT_HIGH_WATER)
    }

    /// Wraps a sink which drains whenever `high_water` bytes are pending
    pub fn with_high_water(sink: W, high_water: usize) -> Self {
        Self {
            sink,
            pending: Vec::new(),
            high_water: high_water.max(1),
            written: 0,
        }
    }

    /// Total bytes accepted so far, drained or not
    pub fn position(&self) -> u64 {
        self.written
    }

    /// Whether the next write would suspend to drain
    pub fn is_saturated(&self) -> bool {
        self.pending.len() >= self.high_water
    }

    /// Accepts bytes, suspending to drain if the buffer is full
    ///
    /// # Errors
    ///
    /// Passes along any I/O error from the sink.
    pub async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.pending.extend_from_slice(bytes);
        self.written += bytes.len() as u64;
        if self.is_saturated() {
            self.drain().await?;
        }
        Ok(())
    }

    /// Suspends until every pending byte is accepted by the sink
    pub async fn drain(&mut self) -> std::io::Result<()> {
        if !self.pending.is_empty() {
            self.sink.write_all(&self.pending).await?;
            self.pending.clear();
        }
        Ok(())
    }

    /// Drains pending bytes and flushes the sink
    pub async fn flush(&mut self) -> std::io::Result<()> {
        self.drain().await?;
        self.sink.flush().await
    }

    /// Copies the remainder of a stream into this sink
    ///
    /// Returns the number of bytes copied.
    pub async fn pipe<R: AsyncRead + Unpin>(
        &mut self,
        stream: &mut ByteStream<R>,
    ) -> std::io::Result<u64> {
        let mut copied = 0;
        loop {
            let chunk = stream.read(DEFAULT_CHUNK_SIZE).await?;
            if chunk.is_empty() {
                break Ok(copied);
            }
            copied += chunk.len() as u64;
            self.write(&chunk).await?;
        }
    }

    /// Flushes everything and returns the underlying sink
    pub async fn finish(mut self) -> std::io::Result<W> {
        self.flush().await?;
        Ok(self.sink)
    }
}
