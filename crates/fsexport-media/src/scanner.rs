//! Chunked frame span reassembly.
//!
//! The scanner reads its source in fixed-size chunks and keeps a window of
//! bytes not yet consumed. Marker tests only run where four bytes are
//! available, so a marker split across reads is found once the next chunk
//! arrives and results do not depend on the chunk size.
//!
//! Rules:
//! - a start marker opens a span; a later start marker replaces it
//! - an end marker closes the open span, which is yielded whole
//! - an end marker with no open span is ignored
//! - a span still open at end of input is dropped

use std::io::{ErrorKind, Read};

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::frame::codec::MARKER_LEN;
use crate::frame::{FRAME_END, FRAME_START, MIN_FRAME_LEN};
use crate::ScanError;

/// Read size per chunk (16 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Open spans longer than this (16 MiB) are abandoned.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub chunk_size: usize,
    pub max_frame_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Counters collected while scanning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub bytes_read: u64,
    pub spans: u64,
    pub abandoned: u64,
}

pub struct FrameScanner<R> {
    reader: R,
    chunk: Vec<u8>,
    window: BytesMut,
    /// Next window offset to test for a marker.
    cursor: usize,
    /// Window offset of the open span's start marker.
    frame_start: Option<usize>,
    max_frame_size: usize,
    eof: bool,
    stats: ScanStats,
}

impl<R: Read> FrameScanner<R> {
    pub fn new(reader: R, options: ScanOptions) -> Self {
        let chunk_size = options.chunk_size.max(1);
        Self {
            reader,
            chunk: vec![0; chunk_size],
            window: BytesMut::with_capacity(chunk_size * 2),
            cursor: 0,
            frame_start: None,
            max_frame_size: options.max_frame_size.max(MIN_FRAME_LEN),
            eof: false,
            stats: ScanStats::default(),
        }
    }

    /// Next complete span, or `None` at end of input.
    ///
    /// `cancel` is checked before every chunk read.
    pub fn next_span(&mut self, cancel: &CancellationToken) -> Result<Option<Bytes>, ScanError> {
        loop {
            if let Some(span) = self.scan_window() {
                return Ok(Some(span));
            }
            if self.eof {
                return Ok(None);
            }
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            self.fill()?;
        }
    }

    #[must_use]
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    fn fill(&mut self) -> Result<(), ScanError> {
        let n = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if n == 0 {
            self.eof = true;
        } else {
            self.stats.bytes_read += n as u64;
            self.window.extend_from_slice(&self.chunk[..n]);
        }
        Ok(())
    }

    fn scan_window(&mut self) -> Option<Bytes> {
        while self.cursor + MARKER_LEN <= self.window.len() {
            let at = &self.window[self.cursor..self.cursor + MARKER_LEN];
            if at == FRAME_START {
                self.frame_start = Some(self.cursor);
            } else if at == FRAME_END {
                if let Some(start) = self.frame_start.take() {
                    let end = self.cursor + MARKER_LEN;
                    self.window.advance(start);
                    let span = self.window.split_to(end - start).freeze();
                    self.cursor = 0;
                    if span.len() > self.max_frame_size {
                        self.stats.abandoned += 1;
                        continue;
                    }
                    self.stats.spans += 1;
                    return Some(span);
                }
            }
            self.cursor += 1;
        }
        self.compact();
        None
    }

    /// Drop bytes that can no longer belong to a span.
    fn compact(&mut self) {
        match self.frame_start {
            Some(start) if self.window.len() - start > self.max_frame_size => {
                trace!(len = self.window.len() - start, "abandoning oversized span");
                self.stats.abandoned += 1;
                self.frame_start = None;
                self.window.advance(self.cursor);
                self.cursor = 0;
            }
            Some(start) => {
                self.window.advance(start);
                self.cursor -= start;
                self.frame_start = Some(0);
            }
            None => {
                self.window.advance(self.cursor);
                self.cursor = 0;
            }
        }
    }
}
