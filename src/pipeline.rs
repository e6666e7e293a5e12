use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::Result;
use crate::extractor::{BatchExtractor, IncrementalExtractor, PostgresBatchExtractor};
use crate::rows::format_batch;
use crate::table::TableLocation;
use crate::uploader::{BatchUploader, PostgresBatchUploader};
use crate::watermark::{create_store, Watermark, WatermarkStore};
use std::io::Write;
use std::time::Duration;
use tracing::info;

/// Source tables and the backup tables they are copied into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTables {
    pub registry: TableLocation,
    pub registry_backup: TableLocation,
    pub log: TableLocation,
    pub log_backup: TableLocation,
}

impl BackupTables {
    pub fn new(registry: TableLocation, log: TableLocation, backup_suffix: &str) -> Self {
        Self {
            registry_backup: registry.with_suffix(backup_suffix),
            log_backup: log.with_suffix(backup_suffix),
            registry,
            log,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            TableLocation::new(config.registry_table.as_str()),
            TableLocation::new(config.log_table.as_str()),
            &config.backup_suffix,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub registry_rows: usize,
    pub log_rows: usize,
    pub watermark: Watermark,
}

/// Copy the registry snapshot, then the new log rows, into their backup
/// tables. Each batch is echoed to `out` before it is written.
///
/// The log watermark is persisted only once the log batch has been written,
/// so a failed upload is retried from the same point next run.
pub async fn run_backup<E, U>(
    extractor: &mut IncrementalExtractor<E>,
    uploader: &mut U,
    tables: &BackupTables,
    store: &dyn WatermarkStore,
    out: &mut (dyn Write + Send),
) -> Result<RunSummary>
where
    E: BatchExtractor,
    U: BatchUploader,
{
    let registry = extractor.get_registry_data(&tables.registry).await?;
    writeln!(out, "{}", format_batch(&registry))?;
    let registry_rows = uploader.save_data(&registry, &tables.registry_backup).await?;
    info!("Copied {} rows {} -> {}", registry_rows, tables.registry, tables.registry_backup);

    let log = extractor.get_log_data(&tables.log).await?;
    writeln!(out, "{}", format_batch(&log))?;
    let log_rows = uploader.save_data(&log, &tables.log_backup).await?;
    info!("Copied {} rows {} -> {}", log_rows, tables.log, tables.log_backup);

    let watermark = extractor.watermark();
    store.save(&tables.log, watermark)?;

    Ok(RunSummary {
        registry_rows,
        log_rows,
        watermark,
    })
}

/// One full run against the databases named in `config`.
pub async fn run(config: &Config) -> Result<RunSummary> {
    let timeout = Duration::from_secs(config.connect_timeout_seconds);
    let tables = BackupTables::from_config(config);
    let store = create_store(config.watermark_file.as_deref());

    let since = store.load(&tables.log)?.unwrap_or_default();
    info!("Starting backup of {} and {} (log watermark {})", tables.registry, tables.log, since);

    let source = Credentials::from_file(&config.source_credentials)?;
    let destination = Credentials::from_file(&config.destination_credentials)?;

    let extractor = PostgresBatchExtractor::connect(&source, &config.timestamp_column, timeout)
        .await?
        .naive_time_zone(config.naive_time_zone);
    let mut extractor = IncrementalExtractor::resume(extractor, since);
    let mut uploader = PostgresBatchUploader::connect(&destination, config.commit_mode, timeout).await?;

    let mut stdout = std::io::stdout();
    let summary = run_backup(&mut extractor, &mut uploader, &tables, &*store, &mut stdout).await?;

    info!(
        "Backup finished: {} registry rows, {} log rows, watermark {}",
        summary.registry_rows, summary.log_rows, summary.watermark
    );
    Ok(summary)
}
