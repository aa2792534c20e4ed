//! Shared test harness for integration tests.
//!
//! Provides [`ArchiveBuilder`], which writes a synthetic material archive
//! (index plus `.mfd` files) into a temporary directory, and helpers for
//! signed licenses and for reading exported files back.

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fsexport::config::Config;
use fsexport::export::Exporter;
use fsexport::license::{HmacLicenseDecoder, License};
use fsexport_common::paths::{material_file_path, MATERIALS_SUBDIR};
use fsexport_common::{ArchiveId, ChannelIdentifier, DataType, MaterialFileId, Timestamp};
use fsexport_index::{IndexRecord, MaterialFolderIndex};
use fsexport_media::frame::{self, encode_into, BufferPool, FrameMetadata};
use fsexport_media::{FrameScanner, ScanOptions};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Hex key shared by [`licensed_config`] and [`write_license`].
pub const LICENSE_KEY: &str = "00112233445566778899aabbccddeeff";

pub fn camera(number: u16) -> ChannelIdentifier {
    ChannelIdentifier::new(DataType::Camera, number)
}

pub fn audio(number: u16) -> ChannelIdentifier {
    ChannelIdentifier::new(DataType::Audio, number)
}

/// Frame as written to or read from a material file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestFrame {
    pub channel: ChannelIdentifier,
    pub ts: i64,
    pub intra: bool,
}

/// Frames of `channel`; every tenth one is intra, starting with the first.
pub fn frames(channel: ChannelIdentifier, timestamps: impl IntoIterator<Item = i64>) -> Vec<TestFrame> {
    timestamps
        .into_iter()
        .enumerate()
        .map(|(i, ts)| TestFrame {
            channel,
            ts,
            intra: i % 10 == 0,
        })
        .collect()
}

pub fn encode_frames(frames: &[TestFrame]) -> Vec<u8> {
    let mut out = Vec::new();
    for f in frames {
        let metadata = FrameMetadata {
            timestamp: Timestamp::from_micros(f.ts),
            channel_id: f.channel.number,
            is_intra: f.intra,
        };
        let payload = format!("payload-{}", f.ts);
        encode_into(&metadata, f.channel.data_type, payload.as_bytes(), &mut out);
    }
    out
}

/// Decode every frame of a material file.
pub fn read_frames(path: &Path) -> Vec<TestFrame> {
    let file = File::open(path).expect("open material file");
    let mut scanner = FrameScanner::new(file, ScanOptions::default());
    let pool = BufferPool::default();
    let cancel = CancellationToken::new();
    let mut out = Vec::new();
    while let Some(span) = scanner.next_span(&cancel).expect("scan material file") {
        let frame = frame::decode(&span, &pool).expect("decode frame");
        out.push(TestFrame {
            channel: frame.channel(),
            ts: frame.timestamp().as_micros(),
            intra: frame.is_intra(),
        });
    }
    out
}

/// Builds a source archive in a temporary directory.
pub struct ArchiveBuilder {
    dir: TempDir,
    root: PathBuf,
    records: Vec<IndexRecord>,
    next_id: u32,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = dir.path().to_path_buf();
        Self {
            dir,
            root,
            records: Vec::new(),
            next_id: 1,
        }
    }

    /// Place index and files in the `materials` subdirectory.
    pub fn in_materials_subdir() -> Self {
        let mut builder = Self::new();
        builder.root = builder.dir.path().join(MATERIALS_SUBDIR);
        fs::create_dir_all(&builder.root).expect("create materials dir");
        builder
    }

    /// Write a material file holding `frames` and index it under `channel`.
    pub fn add_file(&mut self, channel: ChannelIdentifier, frames: &[TestFrame]) -> MaterialFileId {
        let id = self.allocate(channel, frames);
        fs::write(material_file_path(&self.root, id), encode_frames(frames))
            .expect("write material file");
        id
    }

    /// Index a file under `channel` without writing it.
    pub fn add_missing_file(&mut self, channel: ChannelIdentifier, frames: &[TestFrame]) -> MaterialFileId {
        self.allocate(channel, frames)
    }

    /// Write raw bytes as a material file indexed over `[begin, end]`.
    pub fn add_raw_file(&mut self, channel: ChannelIdentifier, begin: i64, end: i64, bytes: &[u8]) -> MaterialFileId {
        let id = MaterialFileId::from(self.next_id);
        self.next_id += 1;
        let mut record = IndexRecord::material(channel, id);
        record.note_frame(Timestamp::from_micros(begin));
        record.note_frame(Timestamp::from_micros(end));
        record.complete();
        self.records.push(record);
        fs::write(material_file_path(&self.root, id), bytes).expect("write material file");
        id
    }

    fn allocate(&mut self, channel: ChannelIdentifier, frames: &[TestFrame]) -> MaterialFileId {
        let id = MaterialFileId::from(self.next_id);
        self.next_id += 1;
        let mut record = IndexRecord::material(channel, id);
        for f in frames {
            record.note_frame(Timestamp::from_micros(f.ts));
        }
        record.complete();
        self.records.push(record);
        id
    }

    pub fn build(self) -> TestArchive {
        let mut index = MaterialFolderIndex::with_id(ArchiveId::new());
        index.records = self.records;
        index.save(&self.root).expect("save index");
        TestArchive {
            dir: self.dir,
            root: self.root,
        }
    }
}

/// A source archive on disk. Removed when dropped.
pub struct TestArchive {
    dir: TempDir,
    root: PathBuf,
}

impl TestArchive {
    /// Directory the archive was built in; the index may be one level down.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory holding the index.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Default config with the test license key.
pub fn licensed_config() -> Config {
    let mut config = Config::default();
    config.license.key = Some(LICENSE_KEY.to_string());
    config
}

/// Write a license signed with [`LICENSE_KEY`] into `dir`.
pub fn write_license(dir: &Path) -> PathBuf {
    let decoder = HmacLicenseDecoder::from_hex(LICENSE_KEY).expect("valid key");
    let content = decoder.sign(&License::new("Test Holder")).expect("sign license");
    let path = dir.join("fsexport.lic");
    fs::write(&path, content).expect("write license");
    path
}

/// Exporter over `archive` writing into `destination`, with a valid license.
pub fn licensed_exporter(config: Config, archive: &TestArchive, destination: &Path) -> Exporter {
    let mut exporter = Exporter::new(config);
    exporter.set_source_path(archive.path());
    exporter.set_destination_path(destination);
    assert!(exporter.set_license_path(write_license(destination)));
    exporter
}

/// `Export_*` directories under `destination`.
pub fn export_dirs(destination: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(destination)
        .expect("read destination")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

/// Material files in an exported directory, sorted by name.
pub fn material_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("read export dir")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "mfd"))
        .collect();
    files.sort();
    files
}
