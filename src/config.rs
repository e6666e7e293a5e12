use crate::error::Result;
use crate::watermark::NaiveTimeZone;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Prefix of environment variables that override file settings,
/// e.g. `PG_BACKUP_LOG_TABLE=events`.
pub const ENV_PREFIX: &str = "PG_BACKUP";

/// Settings file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "pg-backup.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_credentials: PathBuf,
    pub destination_credentials: PathBuf,
    pub registry_table: String,
    pub log_table: String,
    pub backup_suffix: String,
    pub timestamp_column: String,
    /// Zone the log table's `timestamp without time zone` values are in.
    /// Ignored for `timestamptz` columns.
    pub naive_time_zone: NaiveTimeZone,
    pub commit_mode: CommitMode,
    /// Where watermarks are persisted between runs. `None` restarts every
    /// run from the minimum timestamp.
    pub watermark_file: Option<PathBuf>,
    pub connect_timeout_seconds: u64,
}

/// How the uploader commits a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CommitMode {
    /// Every INSERT commits on its own; a failure leaves earlier rows in place.
    #[default]
    Autocommit,
    /// One transaction per batch; a failure writes nothing.
    Transaction,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_credentials: PathBuf::from("postgre_credentials.txt"),
            destination_credentials: PathBuf::from("postgre_credentials_backup.txt"),
            registry_table: "account".to_string(),
            log_table: "transaction".to_string(),
            backup_suffix: "_backup".to_string(),
            timestamp_column: "datetime".to_string(),
            naive_time_zone: NaiveTimeZone::Local,
            commit_mode: CommitMode::Autocommit,
            watermark_file: None,
            connect_timeout_seconds: 30,
        }
    }
}

impl Config {
    /// Layer defaults, an optional TOML file and `PG_BACKUP_*` environment
    /// variables, in that order.
    ///
    /// Not validated here: command-line overrides still apply on top, call
    /// [`Config::validate`] once they have.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            // An explicitly requested file must exist
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<Config>()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry_table.trim().is_empty() || self.log_table.trim().is_empty() {
            return Err(crate::ETLError::Config(
                "registry_table and log_table must not be empty".to_string(),
            ));
        }
        if self.timestamp_column.trim().is_empty() {
            return Err(crate::ETLError::Config(
                "timestamp_column must not be empty".to_string(),
            ));
        }
        if self.backup_suffix.is_empty() {
            return Err(crate::ETLError::Config(
                "backup_suffix must not be empty, backups would overwrite their source tables".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_backup_layout() {
        let config = Config::default();
        assert_eq!(config.registry_table, "account");
        assert_eq!(config.log_table, "transaction");
        assert_eq!(config.backup_suffix, "_backup");
        assert_eq!(config.timestamp_column, "datetime");
        assert_eq!(config.commit_mode, CommitMode::Autocommit);
        assert_eq!(config.naive_time_zone, NaiveTimeZone::Local);
        assert!(config.watermark_file.is_none());
    }

    #[test]
    fn load_reads_toml_file_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "log_table = \"events\"\ncommit_mode = \"transaction\"\nwatermark_file = \"state.json\"\nnaive_time_zone = \"utc\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.log_table, "events");
        assert_eq!(config.commit_mode, CommitMode::Transaction);
        assert_eq!(config.watermark_file, Some(PathBuf::from("state.json")));
        assert_eq!(config.naive_time_zone, NaiveTimeZone::Utc);
        // untouched keys keep their defaults
        assert_eq!(config.registry_table, "account");
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/pg-backup.toml"))).unwrap_err();
        assert!(matches!(err, crate::ETLError::Config(_)));
    }

    #[test]
    fn empty_table_in_file_is_left_for_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "log_table = \"\"").unwrap();

        let mut config = Config::load(Some(file.path())).unwrap();
        assert!(matches!(config.validate(), Err(crate::ETLError::Config(_))));

        // what `run --log-table events` does
        config.log_table = "events".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_empty_suffix() {
        let config = Config {
            backup_suffix: String::new(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(crate::ETLError::Config(_))));
    }
}
