mod cli;

use fsexport::catalog::Catalog;
use fsexport::config;
use fsexport::events::ExportEvent;
use fsexport::export::{ExportOutcome, Exporter};

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use cli::{Cli, Commands};
use fsexport_common::{ChannelIdentifier, TimeInterval, Timestamp};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "fsexport=trace,fsexport_media=debug,fsexport_index=debug,fsexport_common=debug"
                .to_string()
        } else {
            "fsexport=info,fsexport_media=info,fsexport_index=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Channels { source } => list_channels(cli.config.as_deref(), source),
        Commands::Export {
            source,
            destination,
            license,
            from,
            to,
            channels,
            parallelism,
        } => run_export(
            cli.config.as_deref(),
            ExportArgs {
                source,
                destination,
                license,
                from,
                to,
                channels,
                parallelism,
            },
        ),
        Commands::License { file } => check_license(cli.config.as_deref(), file),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("fsexport {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct ExportArgs {
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    license: Option<PathBuf>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    channels: Vec<ChannelIdentifier>,
    parallelism: Option<usize>,
}

/// File that settings are saved back to: the one they came from, if any.
fn save_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .or_else(config::find_config)
        .unwrap_or_else(config::default_save_path)
}

fn exporter(config_path: Option<&Path>) -> Result<Exporter> {
    let config = config::load_config_or_default(config_path)?;
    Ok(Exporter::new(config).with_config_path(save_path(config_path)))
}

/// Load channels, turning reported errors into a command failure.
fn load_catalog(exporter: &mut Exporter) -> Result<Catalog> {
    let events = exporter.events();
    let before = events.recent_errors().len();
    let catalog = exporter.load_channels();
    if let Some(message) = events.recent_errors().get(before) {
        anyhow::bail!("{message}");
    }
    Ok(catalog)
}

fn list_channels(config_path: Option<&Path>, source: Option<PathBuf>) -> Result<()> {
    let mut exporter = exporter(config_path)?;
    if let Some(source) = source {
        exporter.set_source_path(source);
    }
    if exporter.source_path().is_none() {
        anyhow::bail!("No source directory given");
    }

    let catalog = load_catalog(&mut exporter)?;
    println!("Archive: {}", catalog.root().display());
    println!("Channels: {}", catalog.len());
    for channel in catalog.channels() {
        let marker = if channel.is_enabled() { "" } else { " [missing]" };
        println!("  {}{}", channel.display_line(), marker);
    }
    Ok(())
}

fn run_export(config_path: Option<&Path>, args: ExportArgs) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(parallelism) = args.parallelism {
        if parallelism == 0 {
            anyhow::bail!("--parallelism must be at least 1");
        }
        config.export.parallelism = parallelism;
    }
    let mut exporter = Exporter::new(config).with_config_path(save_path(config_path));
    let events = exporter.events();

    if let Some(source) = args.source {
        exporter.set_source_path(source);
    }
    if let Some(destination) = args.destination {
        exporter.set_destination_path(destination);
    }
    if let Some(license) = args.license {
        exporter.set_license_path(license);
    } else {
        exporter.process_license();
    }

    let mut catalog = load_catalog(&mut exporter)?;
    if args.channels.is_empty() {
        for channel in catalog.channels_mut() {
            let enabled = channel.is_enabled();
            channel.select(enabled);
        }
    } else {
        for id in &args.channels {
            if !catalog.select(*id, true) {
                anyhow::bail!("Archive has no channel {id}");
            }
        }
    }

    let selected = catalog.selected_interval();
    let begin = args.from.map(Timestamp::from).or(selected.begin());
    let end = args.to.map(Timestamp::from).or(selected.end());
    let (Some(begin), Some(end)) = (begin, end) else {
        anyhow::bail!("Selected channels contain no frames; pass --from and --to");
    };
    let interval = TimeInterval::new(begin, end);

    let mut rx = exporter.subscribe();
    let before = events.recent_errors().len();
    if !exporter.start(&catalog, interval) {
        let message = events
            .recent_errors()
            .get(before)
            .cloned()
            .unwrap_or_else(|| "Export did not start".to_string());
        anyhow::bail!("{message}");
    }
    println!("Exporting {} channel(s), {}", catalog.selected().count(), interval);

    let mut outcome = ExportOutcome::Failed;
    loop {
        match rx.blocking_recv() {
            Ok(event) => match event.payload {
                ExportEvent::Progress { percent } => eprintln!("Progress: {:.1}%", percent),
                ExportEvent::Error { message } => eprintln!("Error: {message}"),
                ExportEvent::Completed { outcome: done } => {
                    outcome = done;
                    break;
                }
                ExportEvent::LicenseParsed { .. } => {}
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }

    if let Some(summary) = exporter.wait() {
        println!("Destination: {}", summary.destination.display());
        println!("Files written: {}", summary.files_written);
    }
    println!("Outcome: {:?}", outcome);
    exporter.shutdown()?;

    if outcome == ExportOutcome::Failed {
        anyhow::bail!("Export failed");
    }
    Ok(())
}

fn check_license(config_path: Option<&Path>, file: Option<PathBuf>) -> Result<()> {
    let mut exporter = exporter(config_path)?;
    let path = match file.or_else(|| exporter.license_path().map(Path::to_path_buf)) {
        Some(path) => path,
        None => anyhow::bail!("No license file given"),
    };
    if !path.is_file() {
        anyhow::bail!("License file does not exist: {:?}", path);
    }

    let events = exporter.events();
    if exporter.set_license_path(&path) {
        if let Some(license) = exporter.license() {
            println!("✓ License is valid");
            println!("  Holder: {}", license.holder);
            if let Some(expires_at) = license.expires_at {
                println!("  Expires: {}", expires_at);
            }
        }
        Ok(())
    } else {
        let reason = events.recent_errors().into_iter().next();
        match reason {
            Some(reason) => anyhow::bail!("{reason}"),
            None => anyhow::bail!("License is invalid!"),
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_paths(&config);
            println!("  Parallelism: {}", config.export.parallelism);
            println!("  Chunk size: {} bytes", config.export.chunk_size);
            println!("  Max frame size: {} bytes", config.export.max_frame_size);
            println!(
                "  License key: {}",
                if config.license.key.is_some() { "configured" } else { "missing" }
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Parallelism: {}", config.export.parallelism);
        }
    }

    Ok(())
}

fn print_paths(config: &config::Config) {
    let show = |p: &Option<PathBuf>| {
        p.as_ref()
            .map_or_else(|| "-".to_string(), |p| p.display().to_string())
    };
    println!("  Source: {}", show(&config.paths.source));
    println!("  Destination: {}", show(&config.paths.destination));
    println!("  License: {}", show(&config.paths.license));
}
