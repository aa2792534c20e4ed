//! End-to-end export runs against synthetic archives.

mod common;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::*;
use fsexport::catalog::Catalog;
use fsexport::events::{EventBus, ExportEvent};
use fsexport::export::{ExportOutcome, Exporter};
use fsexport_common::paths::{parse_material_file_name, ARCHIVE_INFO_FILE_NAME, INDEX_FILE_NAME};
use fsexport_common::{ArchiveId, FileState, MaterialFileId, TimeInterval, Timestamp};
use fsexport_index::{ArchiveInfo, IndexRecord, MaterialFolderIndex};
use fsexport_media::{
    FileMaterialFactory, Frame, MaterialFile, MaterialFileFactory, MaterialPosition,
    MaterialSummary, WriteError,
};
use tempfile::TempDir;

fn interval(begin: i64, end: i64) -> TimeInterval {
    TimeInterval::new(Timestamp::from_micros(begin), Timestamp::from_micros(end))
}

/// Load, select everything and run to completion.
fn export_all(exporter: &mut Exporter, window: TimeInterval) -> fsexport::export::ExportSummary {
    let mut catalog = exporter.load_channels();
    catalog.select_all(true);
    assert!(exporter.start(&catalog, window));
    exporter.wait().expect("export summary")
}

fn load_index(dir: &Path) -> MaterialFolderIndex {
    MaterialFolderIndex::load(&dir.join(INDEX_FILE_NAME)).expect("load exported index")
}

fn progress_values(events: &EventBus) -> Vec<f64> {
    let mut values: Vec<f64> = events
        .recent_events(usize::MAX)
        .into_iter()
        .filter_map(|e| match e.payload {
            ExportEvent::Progress { percent } => Some(percent),
            _ => None,
        })
        .collect();
    values.reverse();
    values
}

fn completions(events: &EventBus) -> Vec<ExportOutcome> {
    events
        .recent_events(usize::MAX)
        .into_iter()
        .filter_map(|e| match e.payload {
            ExportEvent::Completed { outcome } => Some(outcome),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Basic runs
// ============================================================================

#[test]
fn test_single_record_exports_one_file() {
    let mut builder = ArchiveBuilder::new();
    let source = frames(camera(1), (0..10).map(|i| 100 + i * 10));
    builder.add_file(camera(1), &source);
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 1_000));

    assert_eq!(summary.outcome, ExportOutcome::Completed);
    assert_eq!(summary.files_written, 1);
    assert_eq!(export_dirs(destination.path()), vec![summary.destination.clone()]);

    let files = material_files(&summary.destination);
    assert_eq!(files.len(), 1);
    assert_eq!(read_frames(&files[0]), source);

    let index = load_index(&summary.destination);
    assert_eq!(index.records.len(), 1);
    let record = &index.records[0];
    assert_eq!(record.file_id.get(), 1);
    assert_eq!(record.begin, Timestamp::from_micros(100));
    assert_eq!(record.end, Timestamp::from_micros(190));
    assert_eq!(record.file_state, FileState::Complete);
    assert_eq!(completions(&exporter.events()), vec![ExportOutcome::Completed]);
}

#[test]
fn test_two_records_export_one_file_each() {
    let mut builder = ArchiveBuilder::new();
    let first = frames(camera(1), (0..10).map(|i| 100 + i * 10));
    let second = frames(camera(1), (0..10).map(|i| 300 + i * 10));
    builder.add_file(camera(1), &first);
    builder.add_file(camera(1), &second);
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 1_000));

    assert_eq!(summary.outcome, ExportOutcome::Completed);
    let files = material_files(&summary.destination);
    assert_eq!(files.len(), 2);
    assert_eq!(read_frames(&files[0]), first);
    assert_eq!(read_frames(&files[1]), second);

    let index = load_index(&summary.destination);
    let ranges: Vec<(i64, i64)> = index
        .records
        .iter()
        .map(|r| (r.begin.as_micros(), r.end.as_micros()))
        .collect();
    assert_eq!(ranges, vec![(100, 190), (300, 390)]);
}

#[test]
fn test_window_starting_mid_gop_keeps_deltas() {
    let mut builder = ArchiveBuilder::new();
    // Intra frames at 0, 100, 200, ...
    builder.add_file(camera(1), &frames(camera(1), (0..100).map(|i| i * 10)));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(250, 640));

    let files = material_files(&summary.destination);
    let written: Vec<i64> = read_frames(&files[0]).iter().map(|f| f.ts).collect();
    assert_eq!(written, (25..=64).map(|i| i * 10).collect::<Vec<_>>());

    let record = &load_index(&summary.destination).records[0];
    assert_eq!(record.begin, Timestamp::from_micros(250));
    assert_eq!(record.end, Timestamp::from_micros(640));
}

#[test]
fn test_record_outside_window_exports_nothing() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &frames(camera(1), [100, 150, 200]));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(5_000, 6_000));

    assert_eq!(summary.outcome, ExportOutcome::Empty);
    assert_eq!(summary.files_written, 0);
    assert!(material_files(&summary.destination).is_empty());
    assert!(!summary.destination.join(INDEX_FILE_NAME).exists());
    assert!(!summary.destination.join(ARCHIVE_INFO_FILE_NAME).exists());
    assert_eq!(completions(&exporter.events()), vec![ExportOutcome::Empty]);
}

#[test]
fn test_missing_source_file_is_skipped() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &frames(camera(1), [100, 110]));
    builder.add_missing_file(camera(1), &frames(camera(1), [200, 210]));
    builder.add_file(camera(1), &frames(camera(1), [300, 310]));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 1_000));

    assert_eq!(summary.outcome, ExportOutcome::Completed);
    assert!(exporter.events().recent_errors().is_empty());

    let index = load_index(&summary.destination);
    let ids: Vec<u32> = index.records.iter().map(|r| r.file_id.get()).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(index.records[1].begin, Timestamp::from_micros(300));
    assert_eq!(progress_values(&exporter.events()).last(), Some(&100.0));
}

#[test]
fn test_no_selected_channels() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &frames(camera(1), [100]));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let catalog = exporter.load_channels();
    assert!(exporter.start(&catalog, interval(0, 1_000)));
    let summary = exporter.wait().unwrap();

    assert_eq!(summary.outcome, ExportOutcome::Empty);
    assert!(export_dirs(destination.path()).is_empty());
}

// ============================================================================
// Frame filtering
// ============================================================================

#[test]
fn test_foreign_and_stale_frames_are_dropped() {
    let mut source = frames(camera(1), [100, 110, 120]);
    source.push(TestFrame {
        channel: audio(1),
        ts: 130,
        intra: true,
    });
    source.push(TestFrame {
        channel: camera(1),
        ts: 115,
        intra: true,
    });
    source.push(TestFrame {
        channel: camera(1),
        ts: 140,
        intra: false,
    });

    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &source);
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 1_000));

    let written: Vec<i64> = read_frames(&material_files(&summary.destination)[0])
        .iter()
        .map(|f| f.ts)
        .collect();
    assert_eq!(written, vec![100, 110, 120, 140]);
}

#[test]
fn test_garbage_between_frames_is_skipped() {
    let source = frames(camera(1), [100, 110, 120]);
    let mut bytes = b"leading noise".to_vec();
    bytes.extend(encode_frames(&source[..1]));
    bytes.extend_from_slice(b"noise between frames");
    bytes.extend(encode_frames(&source[1..]));
    bytes.extend_from_slice(b"trailing");

    let mut builder = ArchiveBuilder::new();
    builder.add_raw_file(camera(1), 100, 120, &bytes);
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 1_000));

    assert_eq!(read_frames(&material_files(&summary.destination)[0]), source);
}

#[test]
fn test_file_without_intra_frame_leaves_no_output() {
    let source: Vec<TestFrame> = [100, 110, 120]
        .into_iter()
        .map(|ts| TestFrame {
            channel: camera(1),
            ts,
            intra: false,
        })
        .collect();
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &source);
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 1_000));

    assert_eq!(summary.outcome, ExportOutcome::Empty);
    assert!(material_files(&summary.destination).is_empty());
}

#[test]
fn test_small_read_chunks_give_identical_output() {
    let source = frames(camera(1), (0..50).map(|i| 1_000 + i * 7));
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &source);
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut config = licensed_config();
    config.export.chunk_size = 64;
    let mut exporter = licensed_exporter(config, &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 10_000));

    assert_eq!(read_frames(&material_files(&summary.destination)[0]), source);
}

// ============================================================================
// Catalog files
// ============================================================================

#[test]
fn test_archive_info_describes_exported_files() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(2), &frames(camera(2), (0..5).map(|i| 100 + i)));
    builder.add_file(audio(1), &frames(audio(1), (0..3).map(|i| 200 + i)));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 1_000));

    let info = ArchiveInfo::load(&summary.destination.join(ARCHIVE_INFO_FILE_NAME)).unwrap();
    assert_eq!(info.archive_id, load_index(&summary.destination).folder_id);
    let names: Vec<&str> = info.channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Camera 2", "Audio 1"]);
    let frames: Vec<u64> = info
        .channels
        .iter()
        .flat_map(|c| c.files.iter().map(|f| f.frames))
        .collect();
    assert_eq!(frames, vec![5, 3]);
}

#[test]
fn test_exported_archive_can_be_exported_again() {
    let mut builder = ArchiveBuilder::new();
    let source = frames(camera(1), (0..20).map(|i| 100 + i * 10));
    builder.add_file(camera(1), &source);
    builder.add_file(audio(3), &frames(audio(3), (0..20).map(|i| 105 + i * 10)));
    let archive = builder.build();
    let first_destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, first_destination.path());
    let first = export_all(&mut exporter, interval(0, 10_000));

    let catalog = Catalog::open(&first.destination).unwrap();
    let ids: Vec<String> = catalog.channels().map(|c| c.id().to_string()).collect();
    assert_eq!(ids, vec!["Camera 1", "Audio 3"]);
    assert!(catalog.channels().all(|c| c.is_enabled()));

    let second_destination = TempDir::new().unwrap();
    let mut exporter = Exporter::new(licensed_config());
    exporter.set_source_path(&first.destination);
    exporter.set_destination_path(second_destination.path());
    exporter.set_license_path(write_license(second_destination.path()));
    let second = export_all(&mut exporter, interval(0, 10_000));

    assert_eq!(second.outcome, ExportOutcome::Completed);
    assert_eq!(second.files_written, 2);
    let files = material_files(&second.destination);
    assert_eq!(read_frames(&files[0]), source);

    let named: Vec<MaterialFileId> = files
        .iter()
        .filter_map(|p| parse_material_file_name(p.file_name()?.to_str()?))
        .collect();
    let indexed: Vec<MaterialFileId> = load_index(&second.destination)
        .records
        .iter()
        .map(|r| r.file_id)
        .collect();
    assert_eq!(named, indexed);
}

#[test]
fn test_index_in_materials_subdir() {
    let mut builder = ArchiveBuilder::in_materials_subdir();
    builder.add_file(camera(1), &frames(camera(1), [100, 110]));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 1_000));

    assert_eq!(exporter.source_path(), Some(archive.root()));
    assert_eq!(summary.outcome, ExportOutcome::Completed);
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_parallel_channels_get_unique_file_ids() {
    let mut builder = ArchiveBuilder::new();
    for number in 1..=4 {
        for part in 0..3 {
            let base = part * 1_000 + i64::from(number);
            builder.add_file(camera(number), &frames(camera(number), (0..20).map(|i| base + i * 10)));
        }
    }
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut config = licensed_config();
    config.export.parallelism = 4;
    let mut exporter = licensed_exporter(config, &archive, destination.path());
    let summary = export_all(&mut exporter, interval(0, 100_000));

    assert_eq!(summary.outcome, ExportOutcome::Completed);
    assert_eq!(summary.files_written, 12);
    let index = load_index(&summary.destination);
    let ids: Vec<u32> = index.records.iter().map(|r| r.file_id.get()).collect();
    assert_eq!(ids, (1..=12).collect::<Vec<_>>());

    for record in &index.records {
        let path = summary.destination.join(fsexport_common::paths::material_file_name(record.file_id));
        let written = read_frames(&path);
        assert_eq!(written.len(), 20);
        assert!(written.iter().all(|f| f.channel == record.channel()));
    }

    let progress = progress_values(&exporter.events());
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(progress.last(), Some(&100.0));
}

// ============================================================================
// Failure handling
// ============================================================================

/// Real material files whose listed write attempts fail.
struct FlakyFactory {
    inner: FileMaterialFactory,
    fail_on: Vec<usize>,
}

struct FlakyFile {
    inner: Box<dyn MaterialFile>,
    attempts: usize,
    fail_on: Vec<usize>,
}

impl MaterialFileFactory for FlakyFactory {
    fn create(
        &self,
        archive_id: ArchiveId,
        record: &IndexRecord,
        path: &Path,
    ) -> fsexport_media::Result<Box<dyn MaterialFile>> {
        Ok(Box::new(FlakyFile {
            inner: self.inner.create(archive_id, record, path)?,
            attempts: 0,
            fail_on: self.fail_on.clone(),
        }))
    }
}

impl MaterialFile for FlakyFile {
    fn write(&mut self, frame: &Frame) -> Result<MaterialPosition, WriteError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_on.contains(&attempt) {
            return Err(WriteError::FileTooLarge { limit: 0 });
        }
        self.inner.write(frame)
    }

    fn close(self: Box<Self>) -> fsexport_media::Result<MaterialSummary> {
        self.inner.close()
    }
}

#[test]
fn test_write_failure_resumes_at_next_intra() {
    let mut builder = ArchiveBuilder::new();
    // Intra frames at 0 and 100.
    builder.add_file(camera(1), &frames(camera(1), (0..20).map(|i| i * 10)));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let factory = FlakyFactory {
        inner: FileMaterialFactory::new(),
        fail_on: vec![1],
    };
    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path())
        .with_factory(Arc::new(factory));
    let summary = export_all(&mut exporter, interval(0, 1_000));

    assert_eq!(summary.outcome, ExportOutcome::Completed);
    let written: Vec<i64> = read_frames(&material_files(&summary.destination)[0])
        .iter()
        .map(|f| f.ts)
        .collect();
    let mut expected = vec![0];
    expected.extend((10..20).map(|i| i * 10));
    assert_eq!(written, expected);

    let errors = exporter.events().recent_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Write frame error, status: FileTooLarge"));
    assert!(errors[0].ends_with(".mfd!"));
}

struct PanickingFactory;

impl MaterialFileFactory for PanickingFactory {
    fn create(
        &self,
        _archive_id: ArchiveId,
        _record: &IndexRecord,
        _path: &Path,
    ) -> fsexport_media::Result<Box<dyn MaterialFile>> {
        panic!("factory exploded");
    }
}

#[test]
fn test_completion_fires_after_panic() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &frames(camera(1), [100]));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path())
        .with_factory(Arc::new(PanickingFactory));
    let mut catalog = exporter.load_channels();
    catalog.select_all(true);
    assert!(exporter.start(&catalog, interval(0, 1_000)));
    assert!(exporter.wait().is_none());

    let events = exporter.events();
    assert_eq!(completions(&events), vec![ExportOutcome::Failed]);
    assert_eq!(events.recent_errors(), vec!["Export failed: factory exploded"]);
}

#[test]
fn test_corrupt_destination_parent_fails_run() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &frames(camera(1), [100]));
    let archive = builder.build();
    let scratch = TempDir::new().unwrap();
    let blocker = scratch.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, scratch.path());
    exporter.set_destination_path(&blocker);
    let mut catalog = exporter.load_channels();
    catalog.select_all(true);
    assert!(exporter.start(&catalog, interval(0, 1_000)));
    assert!(exporter.wait().is_none());

    let events = exporter.events();
    assert_eq!(completions(&events), vec![ExportOutcome::Failed]);
    assert!(events.recent_errors()[0].starts_with("Cannot create destination directory"));
}

// ============================================================================
// Cancellation
// ============================================================================

/// Real material files that signal the first write and then slow down.
struct SlowFactory {
    inner: FileMaterialFactory,
    started: parking_lot::Mutex<Option<mpsc::Sender<()>>>,
    writes: Arc<AtomicUsize>,
}

struct SlowFile {
    inner: Box<dyn MaterialFile>,
    started: Option<mpsc::Sender<()>>,
    writes: Arc<AtomicUsize>,
}

impl MaterialFileFactory for SlowFactory {
    fn create(
        &self,
        archive_id: ArchiveId,
        record: &IndexRecord,
        path: &Path,
    ) -> fsexport_media::Result<Box<dyn MaterialFile>> {
        Ok(Box::new(SlowFile {
            inner: self.inner.create(archive_id, record, path)?,
            started: self.started.lock().take(),
            writes: Arc::clone(&self.writes),
        }))
    }
}

impl MaterialFile for SlowFile {
    fn write(&mut self, frame: &Frame) -> Result<MaterialPosition, WriteError> {
        if let Some(started) = self.started.take() {
            let _ = started.send(());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(2));
        self.inner.write(frame)
    }

    fn close(self: Box<Self>) -> fsexport_media::Result<MaterialSummary> {
        self.inner.close()
    }
}

fn slow_exporter(archive: &TestArchive, destination: &Path) -> (Exporter, mpsc::Receiver<()>, Arc<AtomicUsize>) {
    let (tx, rx) = mpsc::channel();
    let writes = Arc::new(AtomicUsize::new(0));
    let factory = SlowFactory {
        inner: FileMaterialFactory::new(),
        started: parking_lot::Mutex::new(Some(tx)),
        writes: Arc::clone(&writes),
    };
    let exporter = licensed_exporter(licensed_config(), archive, destination)
        .with_factory(Arc::new(factory));
    (exporter, rx, writes)
}

fn large_archive() -> TestArchive {
    let mut builder = ArchiveBuilder::new();
    for part in 0..4 {
        let base = part * 100_000;
        builder.add_file(camera(1), &frames(camera(1), (0..1_000).map(|i| base + i * 10)));
    }
    builder.build()
}

#[test]
fn test_stop_cancels_run() {
    let archive = large_archive();
    let destination = TempDir::new().unwrap();
    let (mut exporter, started, writes) = slow_exporter(&archive, destination.path());

    let mut catalog = exporter.load_channels();
    catalog.select_all(true);
    assert!(exporter.start(&catalog, interval(0, 1_000_000)));
    started
        .recv_timeout(Duration::from_secs(10))
        .expect("first frame written");

    let summary = exporter.stop().expect("export summary");
    assert_eq!(summary.outcome, ExportOutcome::Cancelled);
    assert!(writes.load(Ordering::SeqCst) < 4_000);
    assert!(!summary.destination.join(INDEX_FILE_NAME).exists());
    assert!(!summary.destination.join(ARCHIVE_INFO_FILE_NAME).exists());
    assert_eq!(completions(&exporter.events()), vec![ExportOutcome::Cancelled]);
    assert!(!exporter.is_running());
}

#[test]
fn test_second_start_while_running_is_rejected() {
    let archive = large_archive();
    let destination = TempDir::new().unwrap();
    let (mut exporter, started, _) = slow_exporter(&archive, destination.path());

    let mut catalog = exporter.load_channels();
    catalog.select_all(true);
    assert!(exporter.start(&catalog, interval(0, 1_000_000)));
    started
        .recv_timeout(Duration::from_secs(10))
        .expect("first frame written");

    assert!(!exporter.start(&catalog, interval(0, 1_000_000)));
    assert_eq!(exporter.events().recent_errors(), vec!["Export is already running!"]);
    exporter.stop();
}

#[test]
fn test_selection_is_captured_at_start() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &frames(camera(1), [100, 110]));
    builder.add_file(camera(2), &frames(camera(2), [100, 110]));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();

    let mut exporter = licensed_exporter(licensed_config(), &archive, destination.path());
    let mut catalog = exporter.load_channels();
    catalog.select(camera(2), true);
    assert!(exporter.start(&catalog, interval(0, 1_000)));
    catalog.select_all(true);
    let summary = exporter.wait().unwrap();

    let index = load_index(&summary.destination);
    assert_eq!(index.records.len(), 1);
    assert_eq!(index.records[0].channel(), camera(2));
}

// ============================================================================
// Start preconditions
// ============================================================================

#[test]
fn test_start_rejects_empty_paths() {
    let archive = {
        let mut builder = ArchiveBuilder::new();
        builder.add_file(camera(1), &frames(camera(1), [100]));
        builder.build()
    };
    let scratch = TempDir::new().unwrap();

    let mut exporter = Exporter::new(licensed_config());
    assert!(exporter.set_license_path(write_license(scratch.path())));
    let catalog = Catalog::open(archive.root()).unwrap();

    assert!(!exporter.start(&catalog, interval(0, 1_000)));
    exporter.set_source_path(archive.root());
    assert!(!exporter.start(&catalog, interval(0, 1_000)));
    exporter.set_destination_path(PathBuf::new());
    assert!(!exporter.start(&catalog, interval(0, 1_000)));

    assert_eq!(
        exporter.events().recent_errors(),
        vec![
            "Source path is invalid!",
            "Destination path is invalid!",
            "Destination path is invalid!"
        ]
    );
    assert!(completions(&exporter.events()).is_empty());
}

#[test]
fn test_start_requires_valid_license() {
    let mut builder = ArchiveBuilder::new();
    builder.add_file(camera(1), &frames(camera(1), [100]));
    let archive = builder.build();
    let destination = TempDir::new().unwrap();
    let bad_license = destination.path().join("bad.lic");
    std::fs::write(&bad_license, "garbage").unwrap();

    let mut exporter = Exporter::new(licensed_config());
    exporter.set_source_path(archive.path());
    exporter.set_destination_path(destination.path());
    assert!(!exporter.set_license_path(&bad_license));

    let mut catalog = exporter.load_channels();
    catalog.select_all(true);
    assert!(!exporter.start(&catalog, interval(0, 1_000)));
    assert_eq!(exporter.events().recent_errors().last().unwrap(), "License is invalid!");
    assert!(export_dirs(destination.path()).is_empty());

    let parsed: Vec<bool> = exporter
        .events()
        .recent_events(usize::MAX)
        .into_iter()
        .filter_map(|e| match e.payload {
            ExportEvent::LicenseParsed { valid } => Some(valid),
            _ => None,
        })
        .collect();
    assert_eq!(parsed, vec![false]);
}

#[test]
fn test_valid_license_is_reported() {
    let scratch = TempDir::new().unwrap();
    let mut exporter = Exporter::new(licensed_config());
    let mut rx = exporter.subscribe();

    assert!(exporter.set_license_path(write_license(scratch.path())));
    assert!(exporter.is_license_valid());
    assert_eq!(exporter.license().unwrap().holder, "Test Holder");
    assert_matches!(
        rx.try_recv().unwrap().payload,
        ExportEvent::LicenseParsed { valid: true }
    );
}
