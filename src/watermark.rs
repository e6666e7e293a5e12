//! Extraction watermarks and where they are kept between runs.

use crate::error::{ETLError, Result};
use crate::table::TableLocation;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Upper bound of the rows already extracted from a log table: the next
/// read only returns rows strictly newer than this.
///
/// Kept as an instant in UTC. How it is compared against a column depends
/// on the column: `timestamptz` values are instants too, `timestamp`
/// values are wall-clock readings in a [`NaiveTimeZone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(DateTime<Utc>);

impl Watermark {
    /// `0001-01-01 00:00:00 UTC`, older than any row a log table holds.
    pub fn min() -> Self {
        let date = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN);
        Watermark(Utc.from_utc_datetime(&date.and_time(NaiveTime::default())))
    }

    pub fn at(ts: DateTime<Utc>) -> Self {
        Watermark(ts)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    /// Wall-clock reading of the watermark in `zone`, for comparing against
    /// `timestamp without time zone` columns.
    pub fn naive_in(&self, zone: NaiveTimeZone) -> NaiveDateTime {
        zone.from_utc(self.0)
    }

    /// Move to `now` without ever going backwards.
    pub fn advance_to(self, now: DateTime<Utc>) -> Self {
        Watermark(self.0.max(now))
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Watermark::min()
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zone that `timestamp without time zone` values of a log table were
/// written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NaiveTimeZone {
    /// The zone of this host (`TZ`), as with writers filling the column
    /// from a local clock.
    #[default]
    Local,
    Utc,
}

impl NaiveTimeZone {
    pub fn from_utc(self, ts: DateTime<Utc>) -> NaiveDateTime {
        match self {
            NaiveTimeZone::Local => ts.with_timezone(&Local).naive_local(),
            NaiveTimeZone::Utc => ts.naive_utc(),
        }
    }

    /// The instant a wall-clock reading stands for. Ambiguous local times
    /// (clocks going back) take the earlier instant; skipped ones (clocks
    /// going forward) use the offset in effect just after the gap.
    pub fn to_utc(self, ts: NaiveDateTime) -> DateTime<Utc> {
        match self {
            NaiveTimeZone::Local => match Local.from_local_datetime(&ts).earliest() {
                Some(local) => local.with_timezone(&Utc),
                None => {
                    let offset = Local.offset_from_utc_datetime(&ts).fix();
                    Utc.from_utc_datetime(&(ts - Duration::seconds(i64::from(offset.local_minus_utc()))))
                }
            },
            NaiveTimeZone::Utc => Utc.from_utc_datetime(&ts),
        }
    }
}

/// Source of "now" for advancing watermarks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host's clock, as an instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Monotonic test clock: every call returns the previous reading plus `step`.
#[derive(Debug)]
pub struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        let now = *next;
        *next = now + self.step;
        now
    }
}

/// Persistence of per-table watermarks between runs.
pub trait WatermarkStore: Send + Sync {
    /// Watermark saved for `table`, if any.
    fn load(&self, table: &TableLocation) -> Result<Option<Watermark>>;

    fn save(&self, table: &TableLocation, watermark: Watermark) -> Result<()>;

    /// Forget one table, or every table when `None`.
    fn reset(&self, table: Option<&TableLocation>) -> Result<()>;

    fn list(&self) -> Result<BTreeMap<String, Watermark>>;
}

/// Keeps nothing: every run starts again from [`Watermark::min`] and
/// re-extracts the whole log history.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralStore;

impl WatermarkStore for EphemeralStore {
    fn load(&self, _table: &TableLocation) -> Result<Option<Watermark>> {
        Ok(None)
    }

    fn save(&self, _table: &TableLocation, _watermark: Watermark) -> Result<()> {
        Ok(())
    }

    fn reset(&self, _table: Option<&TableLocation>) -> Result<()> {
        Ok(())
    }

    fn list(&self) -> Result<BTreeMap<String, Watermark>> {
        Ok(BTreeMap::new())
    }
}

/// JSON file mapping table name to watermark, e.g.
/// `{"transaction": "2024-03-01T12:30:00Z"}`.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Watermark>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            ETLError::Watermark(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            ETLError::Watermark(format!("Corrupt watermark file {}: {}", self.path.display(), e))
        })
    }

    // Write-then-rename so a crash never leaves a truncated file behind
    fn write_all(&self, marks: &BTreeMap<String, Watermark>) -> Result<()> {
        let json = serde_json::to_string_pretty(marks)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, &self.path))
            .map_err(|e| {
                ETLError::Watermark(format!("Failed to write {}: {}", self.path.display(), e))
            })
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn load(&self, table: &TableLocation) -> Result<Option<Watermark>> {
        Ok(self.read_all()?.get(&table.to_string()).copied())
    }

    fn save(&self, table: &TableLocation, watermark: Watermark) -> Result<()> {
        let mut marks = self.read_all()?;
        marks.insert(table.to_string(), watermark);
        self.write_all(&marks)?;
        tracing::debug!("Saved watermark {} for {}", watermark, table);
        Ok(())
    }

    fn reset(&self, table: Option<&TableLocation>) -> Result<()> {
        let mut marks = self.read_all()?;
        match table {
            Some(table) => {
                marks.remove(&table.to_string());
            }
            None => marks.clear(),
        }
        self.write_all(&marks)
    }

    fn list(&self) -> Result<BTreeMap<String, Watermark>> {
        self.read_all()
    }
}

/// Store selected by configuration: a file when `watermark_file` is set,
/// otherwise nothing survives the run.
pub fn create_store(watermark_file: Option<&Path>) -> Box<dyn WatermarkStore> {
    match watermark_file {
        Some(path) => Box::new(FileWatermarkStore::new(path)),
        None => Box::new(EphemeralStore),
    }
}
