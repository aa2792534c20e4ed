//! One export run.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use fsexport_common::paths::material_file_path;
use fsexport_common::{ArchiveId, MaterialFileId, TimeInterval};
use fsexport_index::{ArchiveInfoBuilder, IndexRecord, MaterialFolderIndex};
use fsexport_media::frame::BufferPool;
use fsexport_media::{FrameGate, MaterialFileFactory};
use parking_lot::Mutex;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::progress::{ProgressSender, ProgressTracker};
use super::transfer::{FileStats, StopReason, Transfer, TransferNames};
use super::{ChannelPlan, ExportError, ExportOutcome, ExportRequest, ExportSettings, ExportSummary};
use crate::events::EventBus;

/// `Export_YYYYMMDD_HH_MM_SS_mmm` for the given local time.
pub fn destination_dir_name(at: DateTime<Local>) -> String {
    at.format("Export_%Y%m%d_%H_%M_%S_%3f").to_string()
}

/// Index and archive info under construction, guarded together.
struct Output {
    index: MaterialFolderIndex,
    info: ArchiveInfoBuilder,
}

/// State shared by the channel workers of one run.
struct RunContext<'a> {
    request: &'a ExportRequest,
    destination: PathBuf,
    archive_id: ArchiveId,
    cancel: &'a CancellationToken,
    next_file_id: AtomicU32,
    output: Mutex<Output>,
    progress: ProgressTracker,
}

pub struct ExportPipeline {
    settings: ExportSettings,
    factory: Arc<dyn MaterialFileFactory>,
    events: Arc<EventBus>,
    pool: BufferPool,
}

impl ExportPipeline {
    pub fn new(
        settings: ExportSettings,
        factory: Arc<dyn MaterialFileFactory>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            settings,
            factory,
            events,
            pool: BufferPool::default(),
        }
    }

    /// Export `request` into a new `Export_*` directory under its destination root.
    ///
    /// Per-file problems are reported as error events and do not fail the
    /// run. Index and archive info are written only when the run was not
    /// cancelled and produced at least one record.
    pub fn run(
        &self,
        request: &ExportRequest,
        cancel: &CancellationToken,
    ) -> Result<ExportSummary, ExportError> {
        if request.source_root.as_os_str().is_empty() {
            return Err(ExportError::EmptySourcePath);
        }
        if request.destination_root.as_os_str().is_empty() {
            return Err(ExportError::EmptyDestinationPath);
        }

        let destination = request
            .destination_root
            .join(destination_dir_name(Local::now()));
        if request.channels.is_empty() {
            info!("No channels selected, nothing to export");
            return Ok(ExportSummary {
                destination,
                files_written: 0,
                records: Vec::new(),
                outcome: ExportOutcome::Empty,
            });
        }
        fs::create_dir_all(&destination).map_err(|source| ExportError::CreateDestination {
            path: destination.clone(),
            source,
        })?;
        info!(
            destination = %destination.display(),
            channels = request.channels.len(),
            interval = %request.interval,
            parallelism = self.settings.parallelism,
            "Starting export"
        );

        let archive_id = ArchiveId::new();
        let events = Arc::clone(&self.events);
        let ctx = RunContext {
            request,
            destination,
            archive_id,
            cancel,
            next_file_id: AtomicU32::new(1),
            output: Mutex::new(Output {
                index: MaterialFolderIndex::with_id(archive_id),
                info: ArchiveInfoBuilder::new(archive_id),
            }),
            progress: ProgressTracker::new(
                request.channels.len(),
                ProgressSender::new(move |percent| events.progress(percent)),
            ),
        };

        if self.settings.parallelism <= 1 {
            for (slot, plan) in request.channels.iter().enumerate() {
                self.export_channel(&ctx, slot, plan);
            }
        } else {
            let workers = rayon::ThreadPoolBuilder::new()
                .num_threads(self.settings.parallelism)
                .thread_name(|i| format!("fsexport-channel-{i}"))
                .build()
                .map_err(|e| ExportError::WorkerPool(e.to_string()))?;
            workers.install(|| {
                request
                    .channels
                    .par_iter()
                    .enumerate()
                    .for_each(|(slot, plan)| self.export_channel(&ctx, slot, plan));
            });
        }

        let RunContext {
            destination,
            output,
            ..
        } = ctx;
        let Output {
            mut index,
            info: archive_info,
        } = output.into_inner();
        index.records.sort_by_key(|r| r.file_id);
        let files_written = index.records.len();

        let outcome = if cancel.is_cancelled() {
            info!(destination = %destination.display(), "Export cancelled");
            ExportOutcome::Cancelled
        } else if index.records.is_empty() {
            info!(destination = %destination.display(), "Nothing exported");
            ExportOutcome::Empty
        } else {
            index.save(&destination)?;
            archive_info.save(&destination)?;
            info!(
                destination = %destination.display(),
                files = files_written,
                "Export finished"
            );
            ExportOutcome::Completed
        };

        Ok(ExportSummary {
            destination,
            files_written,
            records: index.records,
            outcome,
        })
    }

    fn export_channel(&self, ctx: &RunContext<'_>, slot: usize, plan: &ChannelPlan) {
        if ctx.cancel.is_cancelled() {
            return;
        }

        let records = eligible_records(&plan.records, &ctx.request.interval);
        debug!(
            channel = %plan.id,
            total = plan.records.len(),
            eligible = records.len(),
            "Exporting channel"
        );
        ctx.progress.start_channel(slot, records.len());

        for record in records {
            if ctx.cancel.is_cancelled() {
                return;
            }
            let source = material_file_path(&ctx.request.source_root, record.file_id);
            if source.is_file() {
                self.export_file(ctx, plan, &source);
            } else {
                warn!(channel = %plan.id, source = %source.display(), "Source file is missing, skipping");
            }
            ctx.progress.file_done(slot);
        }
    }

    fn export_file(&self, ctx: &RunContext<'_>, plan: &ChannelPlan, source: &Path) {
        let input = match File::open(source) {
            Ok(file) => file,
            Err(e) => {
                self.events
                    .error(format!("Cannot open source file {}: {e}", source.display()));
                return;
            }
        };

        let file_id = MaterialFileId::from(ctx.next_file_id.fetch_add(1, Ordering::SeqCst));
        let mut record = IndexRecord::material(plan.id, file_id);
        let destination = material_file_path(&ctx.destination, file_id);
        let mut writer = match self.factory.create(ctx.archive_id, &record, &destination) {
            Ok(writer) => writer,
            Err(e) => {
                self.events.error(format!(
                    "Cannot create destination file {}: {e}",
                    destination.display()
                ));
                return;
            }
        };

        let transfer = Transfer {
            interval: &ctx.request.interval,
            options: self.settings.scan,
            pool: &self.pool,
            events: &self.events,
            cancel: ctx.cancel,
        };
        let names = TransferNames {
            source,
            destination: &destination,
        };
        let mut gate = FrameGate::new(plan.id);
        let (stats, reason) = transfer.run(input, &names, writer.as_mut(), &mut gate, &mut record);

        if let Err(e) = writer.close() {
            self.events.error(format!(
                "Cannot close destination file {}: {e}",
                destination.display()
            ));
        }
        log_stats(source, &stats);

        let cancelled = match reason {
            StopReason::EndOfFile => {
                record.complete();
                false
            }
            StopReason::Cancelled => true,
            StopReason::ReadError(e) => {
                self.events
                    .error(format!("Cannot read source file {}: {e}", source.display()));
                false
            }
        };

        if stats.written == 0 {
            if let Err(e) = fs::remove_file(&destination) {
                debug!(path = %destination.display(), error = %e, "Cannot remove empty output file");
            }
            return;
        }
        if cancelled {
            return;
        }

        let mut output = ctx.output.lock();
        if let Err(e) = output.info.update_file_info(&record, &destination, stats.written) {
            self.events.error(format!(
                "Cannot read destination file {}: {e}",
                destination.display()
            ));
        }
        output.index.records.push(record);
    }
}

/// Records overlapping `interval`, ordered by begin.
fn eligible_records(records: &[IndexRecord], interval: &TimeInterval) -> Vec<IndexRecord> {
    let mut eligible: Vec<IndexRecord> = records
        .iter()
        .filter(|r| r.overlaps(interval))
        .cloned()
        .collect();
    eligible.sort_by_key(|r| r.begin);
    eligible
}

fn log_stats(source: &Path, stats: &FileStats) {
    debug!(
        source = %source.display(),
        bytes = stats.bytes_read,
        spans = stats.spans,
        written = stats.written,
        decode_failures = stats.decode_failures,
        stale = stats.stale,
        foreign = stats.foreign,
        awaiting_intra = stats.awaiting_intra,
        out_of_interval = stats.out_of_interval,
        write_failures = stats.write_failures,
        abandoned = stats.abandoned,
        "Scanned source file"
    );
}
