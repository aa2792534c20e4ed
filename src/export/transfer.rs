//! Scanning one source material file into one output material file.

use std::io::Read;
use std::path::Path;

use fsexport_common::TimeInterval;
use fsexport_index::IndexRecord;
use fsexport_media::frame::{self, BufferPool};
use fsexport_media::{FrameGate, FrameScanner, MaterialFile, ScanError, ScanOptions, Verdict};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::events::EventBus;

/// Per-file scan counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    pub spans: u64,
    pub decode_failures: u64,
    pub stale: u64,
    pub foreign: u64,
    pub awaiting_intra: u64,
    pub out_of_interval: u64,
    pub written: u64,
    pub write_failures: u64,
    pub bytes_read: u64,
    pub abandoned: u64,
}

/// Why scanning of a file ended.
#[derive(Debug)]
pub enum StopReason {
    EndOfFile,
    Cancelled,
    ReadError(std::io::Error),
}

/// Names used in per-write error reports.
pub(crate) struct TransferNames<'a> {
    pub source: &'a Path,
    pub destination: &'a Path,
}

/// Everything a transfer needs besides the files themselves.
pub(crate) struct Transfer<'a> {
    pub interval: &'a TimeInterval,
    pub options: ScanOptions,
    pub pool: &'a BufferPool,
    pub events: &'a EventBus,
    pub cancel: &'a CancellationToken,
}

impl Transfer<'_> {
    /// Stream frames from `source` into `writer`.
    ///
    /// Every written frame widens `record`. Decode failures and rejected
    /// frames are counted and skipped. An accepted intra frame ends key-frame
    /// waiting even when it falls outside the interval. Each failed write is
    /// reported and puts the gate back into waiting for an intra frame.
    pub fn run<R: Read>(
        &self,
        source: R,
        names: &TransferNames<'_>,
        writer: &mut dyn MaterialFile,
        gate: &mut FrameGate,
        record: &mut IndexRecord,
    ) -> (FileStats, StopReason) {
        let mut stats = FileStats::default();
        let mut scanner = FrameScanner::new(source, self.options);

        let reason = loop {
            let span = match scanner.next_span(self.cancel) {
                Ok(Some(span)) => span,
                Ok(None) => break StopReason::EndOfFile,
                Err(ScanError::Cancelled) => break StopReason::Cancelled,
                Err(ScanError::Io(e)) => break StopReason::ReadError(e),
            };
            stats.spans += 1;

            let frame = match frame::decode(&span, self.pool) {
                Ok(frame) => frame,
                Err(e) => {
                    trace!(error = %e, "Skipping undecodable span");
                    stats.decode_failures += 1;
                    continue;
                }
            };

            match gate.inspect(&frame) {
                Verdict::Stale => stats.stale += 1,
                Verdict::ForeignChannel => stats.foreign += 1,
                Verdict::AwaitingIntra => stats.awaiting_intra += 1,
                Verdict::Accept => {
                    gate.record_accepted();
                    if !self.interval.contains(frame.timestamp()) {
                        stats.out_of_interval += 1;
                    } else {
                        match writer.write(&frame) {
                            Ok(_) => {
                                gate.record_written(frame.timestamp());
                                record.note_frame(frame.timestamp());
                                stats.written += 1;
                            }
                            Err(status) => {
                                gate.record_failure();
                                stats.write_failures += 1;
                                self.events.error(format!(
                                    "Write frame error, status: {status}, source file {}, destination file {}!",
                                    names.source.display(),
                                    names.destination.display()
                                ));
                            }
                        }
                    }
                }
            }
            frame.release();
        };

        let scan = scanner.stats();
        stats.bytes_read = scan.bytes_read;
        stats.abandoned = scan.abandoned;
        (stats, reason)
    }
}
