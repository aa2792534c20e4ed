//! Background export controller.
//!
//! [`Exporter`] owns the settings of the host, decodes the license, lists
//! channels and runs one export at a time on a named background thread.
//! All status flows through the [`EventBus`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use fsexport_common::TimeInterval;
use fsexport_media::{FileMaterialFactory, MaterialFileFactory};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{ChannelPlan, ExportOutcome, ExportPipeline, ExportRequest, ExportSettings, ExportSummary};
use crate::catalog::Catalog;
use crate::config::{self, Config};
use crate::events::{Event, EventBus, ExportEvent};
use crate::license::{self, HmacLicenseDecoder, License, LicenseDecoder};

struct ExportJob {
    cancel: CancellationToken,
    handle: JoinHandle<Option<ExportSummary>>,
}

pub struct Exporter {
    config: Config,
    config_path: Option<PathBuf>,
    events: Arc<EventBus>,
    factory: Arc<dyn MaterialFileFactory>,
    decoder: Option<Arc<dyn LicenseDecoder>>,
    license: Option<License>,
    job: Option<ExportJob>,
}

impl Exporter {
    pub fn new(config: Config) -> Self {
        let factory: Arc<dyn MaterialFileFactory> = Arc::new(FileMaterialFactory::with_max_file_size(
            config.export.max_material_file_size,
        ));
        let decoder = config
            .license
            .key
            .as_deref()
            .and_then(|key| HmacLicenseDecoder::from_hex(key).ok())
            .map(|d| Arc::new(d) as Arc<dyn LicenseDecoder>);
        Self {
            config,
            config_path: None,
            events: Arc::new(EventBus::default()),
            factory,
            decoder,
            license: None,
            job: None,
        }
    }

    /// File that [`Exporter::shutdown`] writes the paths back to.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn MaterialFileFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_license_decoder(mut self, decoder: Arc<dyn LicenseDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.config.paths.source.as_deref()
    }

    pub fn set_source_path(&mut self, path: impl Into<PathBuf>) {
        self.config.paths.source = Some(path.into());
    }

    pub fn destination_path(&self) -> Option<&Path> {
        self.config.paths.destination.as_deref()
    }

    pub fn set_destination_path(&mut self, path: impl Into<PathBuf>) {
        self.config.paths.destination = Some(path.into());
    }

    pub fn license_path(&self) -> Option<&Path> {
        self.config.paths.license.as_deref()
    }

    /// Select a license file and decode it right away.
    pub fn set_license_path(&mut self, path: impl Into<PathBuf>) -> bool {
        self.config.paths.license = Some(path.into());
        self.process_license()
    }

    pub fn is_license_valid(&self) -> bool {
        self.license.is_some()
    }

    pub fn license(&self) -> Option<&License> {
        self.license.as_ref()
    }

    /// Decode the configured license file.
    ///
    /// A missing file leaves the license invalid without notifications.
    /// Otherwise `LicenseParsed` is broadcast, preceded by an error when
    /// the license is invalid.
    pub fn process_license(&mut self) -> bool {
        self.license = None;
        let Some(path) = self.config.paths.license.clone().filter(|p| p.is_file()) else {
            return false;
        };

        let result = match &self.decoder {
            Some(decoder) => license::read_license(decoder.as_ref(), &path),
            None => Err(license::LicenseError::InvalidKey),
        };
        match result {
            Ok(license) => {
                info!(holder = %license.holder, "License accepted");
                self.license = Some(license);
            }
            Err(e) => {
                self.events.error(e.to_string());
                self.events.error("License is invalid!");
            }
        }

        let valid = self.license.is_some();
        self.events.broadcast(ExportEvent::LicenseParsed { valid });
        valid
    }

    /// Load the channels of the source archive.
    ///
    /// Failures are reported as error events and yield an empty catalog. When
    /// the index is found in the `materials` subdirectory, that directory
    /// becomes the source path.
    pub fn load_channels(&mut self) -> Catalog {
        let Some(source) = self
            .config
            .paths
            .source
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
        else {
            return Catalog::empty(PathBuf::new());
        };

        if !source.is_dir() {
            self.events.error("Selected directory does not exist!");
            return Catalog::empty(source);
        }

        match Catalog::open(&source) {
            Ok(catalog) => {
                if catalog.root() != source {
                    info!(root = %catalog.root().display(), "Using materials subdirectory as source");
                    self.config.paths.source = Some(catalog.root().to_path_buf());
                }
                catalog
            }
            Err(e) if e.is_not_found() => {
                self.events
                    .error("Selected directory doesn't contain index file!");
                Catalog::empty(source)
            }
            Err(e) => {
                self.events.error(e.to_string());
                Catalog::empty(source)
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.job.as_ref().is_some_and(|job| !job.handle.is_finished())
    }

    /// Start exporting the catalog's selected channels over `interval`.
    ///
    /// Returns `false`, with an error event, when a run is already active,
    /// the license is not valid or a path is empty. The selection is
    /// captured now; later changes to the catalog do not affect the run.
    pub fn start(&mut self, catalog: &Catalog, interval: TimeInterval) -> bool {
        if self.is_running() {
            self.events.error("Export is already running!");
            return false;
        }
        // Reap a finished run.
        self.wait();

        if !self.is_license_valid() {
            self.events.error("License is invalid!");
            return false;
        }
        let Some(source_root) = self.non_empty(self.source_path()) else {
            self.events.error("Source path is invalid!");
            return false;
        };
        let Some(destination_root) = self.non_empty(self.destination_path()) else {
            self.events.error("Destination path is invalid!");
            return false;
        };

        let request = ExportRequest {
            source_root,
            destination_root,
            interval,
            channels: catalog.selected().map(ChannelPlan::from).collect(),
        };
        let pipeline = ExportPipeline::new(
            ExportSettings::from(&self.config.export),
            Arc::clone(&self.factory),
            Arc::clone(&self.events),
        );
        let events = Arc::clone(&self.events);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let spawned = thread::Builder::new()
            .name("fsexport-export".to_string())
            .spawn(move || run_job(&pipeline, &request, &token, &events));
        match spawned {
            Ok(handle) => {
                self.job = Some(ExportJob { cancel, handle });
                true
            }
            Err(e) => {
                self.events
                    .error(format!("Cannot start export thread: {e}"));
                false
            }
        }
    }

    /// Request cancellation and wait for the run to reach a checkpoint.
    pub fn stop(&mut self) -> Option<ExportSummary> {
        if let Some(job) = &self.job {
            job.cancel.cancel();
        }
        self.wait()
    }

    /// Wait for the current run to finish.
    pub fn wait(&mut self) -> Option<ExportSummary> {
        let job = self.job.take()?;
        match job.handle.join() {
            Ok(summary) => summary,
            Err(_) => {
                warn!("Export thread terminated abnormally");
                None
            }
        }
    }

    /// Stop any run and write the current paths back to the config file.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop();
        let path = self
            .config_path
            .clone()
            .unwrap_or_else(config::default_save_path);
        config::persist::update_paths(&path, &self.config.paths)?;
        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    fn non_empty(&self, path: Option<&Path>) -> Option<PathBuf> {
        path.filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

impl Drop for Exporter {
    fn drop(&mut self) {
        if let Some(job) = &self.job {
            job.cancel.cancel();
        }
        self.wait();
    }
}

/// Body of the background thread. Completion is broadcast on every path.
fn run_job(
    pipeline: &ExportPipeline,
    request: &ExportRequest,
    cancel: &CancellationToken,
    events: &EventBus,
) -> Option<ExportSummary> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(request, cancel)));
    let (summary, outcome) = match result {
        Ok(Ok(summary)) => {
            let outcome = summary.outcome;
            (Some(summary), outcome)
        }
        Ok(Err(e)) => {
            events.error(e.to_string());
            (None, ExportOutcome::Failed)
        }
        Err(payload) => {
            events.error(format!("Export failed: {}", panic_message(payload.as_ref())));
            (None, ExportOutcome::Failed)
        }
    };
    info!(?outcome, "Export complete.");
    events.broadcast(ExportEvent::Completed { outcome });
    summary
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}
