use anyhow::Context;
use clap::{Parser, Subcommand};
use pg_backup::config::{CommitMode, Config};
use pg_backup::table::TableLocation;
use pg_backup::watermark::{FileWatermarkStore, NaiveTimeZone, WatermarkStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pg-backup")]
#[command(about = "Copy registry snapshots and new log rows into backup tables")]
struct Cli {
    /// Settings file (TOML); defaults to ./pg-backup.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backup pass
    Run {
        /// Credential file of the source database
        #[arg(long)]
        source_credentials: Option<PathBuf>,
        /// Credential file of the destination database
        #[arg(long)]
        destination_credentials: Option<PathBuf>,
        /// Registry (full snapshot) table
        #[arg(long)]
        registry_table: Option<String>,
        /// Log (incremental) table
        #[arg(long)]
        log_table: Option<String>,
        #[arg(long, value_enum)]
        commit_mode: Option<CommitMode>,
        /// Zone of the log table's `timestamp without time zone` values
        #[arg(long, value_enum)]
        naive_time_zone: Option<NaiveTimeZone>,
        /// Keep log watermarks in this file between runs
        #[arg(long)]
        watermark_file: Option<PathBuf>,
    },
    /// Check both databases are reachable
    Check,
    /// Inspect or clear persisted watermarks
    Watermark {
        #[command(subcommand)]
        action: WatermarkAction,
    },
}

#[derive(Subcommand)]
enum WatermarkAction {
    /// Print every saved watermark
    Show,
    /// Forget the watermark of one table, or all of them
    Reset {
        #[arg(long)]
        table: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // stdout carries the extracted batches; logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Run {
            source_credentials,
            destination_credentials,
            registry_table,
            log_table,
            commit_mode,
            naive_time_zone,
            watermark_file,
        } => {
            if let Some(path) = source_credentials {
                config.source_credentials = path;
            }
            if let Some(path) = destination_credentials {
                config.destination_credentials = path;
            }
            if let Some(table) = registry_table {
                config.registry_table = table;
            }
            if let Some(table) = log_table {
                config.log_table = table;
            }
            if let Some(mode) = commit_mode {
                config.commit_mode = mode;
            }
            if let Some(zone) = naive_time_zone {
                config.naive_time_zone = zone;
            }
            if watermark_file.is_some() {
                config.watermark_file = watermark_file;
            }
            // after the overrides: a flag may fill in what the file left empty
            config.validate()?;

            pg_backup::pipeline::run(&config).await.context("backup run failed")?;
        }
        Commands::Check => {
            pg_backup::health::check_health(&config).await?;
        }
        Commands::Watermark { action } => {
            let path = config
                .watermark_file
                .clone()
                .context("no watermark_file configured; watermarks are not persisted")?;
            let store = FileWatermarkStore::new(path);
            match action {
                WatermarkAction::Show => {
                    for (table, mark) in store.list()? {
                        println!("{}\t{}", table, mark);
                    }
                }
                WatermarkAction::Reset { table } => {
                    let table = table.map(TableLocation::new);
                    store.reset(table.as_ref())?;
                    tracing::info!("Reset watermarks in {}", store.path().display());
                }
            }
        }
    }

    Ok(())
}
