use crate::credentials::Credentials;
use crate::error::{ETLError, Result};
use crate::rows::{decode_row, ColumnKind, RowBatch};
use crate::table::{quote_identifier, TableLocation};
use crate::watermark::{Clock, NaiveTimeZone, SystemClock, Watermark};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection};
use sqlx::query::Query;
use sqlx::Postgres;
use std::collections::HashMap;
use std::time::Duration;

#[async_trait]
pub trait BatchExtractor: Send {
    /// Rows of a log table newer than `since`, plus the watermark the next
    /// read should start from.
    async fn extract_log(
        &mut self,
        location: &TableLocation,
        since: Watermark,
    ) -> Result<(RowBatch, Watermark)>;

    /// Full snapshot of a registry table.
    async fn get_registry_data(&mut self, location: &TableLocation) -> Result<RowBatch>;
}

/// Holds the watermark between log reads so callers can ask for "what's
/// new" without threading it through themselves.
///
/// ```
/// # tokio_test::block_on(async {
/// use chrono::{Duration, TimeZone, Utc};
/// use pg_backup::extractor::IncrementalExtractor;
/// use pg_backup::memory::{MemoryDatabase, MemoryExtractor};
/// use pg_backup::rows::Value;
/// use pg_backup::table::TableLocation;
/// use pg_backup::watermark::SteppingClock;
///
/// let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
/// let log = TableLocation::new("transaction");
/// let db = MemoryDatabase::new();
/// db.create_table(&log, 2, Some(1));
/// db.insert(&log, vec![Value::Int(1), Value::TimestampTz(at)]).unwrap();
///
/// let clock = SteppingClock::new(at + Duration::hours(1), Duration::seconds(1));
/// let mut extractor = IncrementalExtractor::new(MemoryExtractor::new(db, clock));
/// assert_eq!(extractor.get_log_data(&log).await.unwrap().len(), 1);
/// assert!(extractor.get_log_data(&log).await.unwrap().is_empty());
/// # });
/// ```
pub struct IncrementalExtractor<E> {
    inner: E,
    watermark: Watermark,
}

impl<E: BatchExtractor> IncrementalExtractor<E> {
    /// Start from the minimum timestamp: the first log read returns
    /// everything.
    pub fn new(inner: E) -> Self {
        Self::resume(inner, Watermark::min())
    }

    pub fn resume(inner: E, watermark: Watermark) -> Self {
        Self { inner, watermark }
    }

    pub fn watermark(&self) -> Watermark {
        self.watermark
    }

    /// Read log rows newer than the current watermark and advance it.
    /// On error the watermark is left untouched.
    pub async fn get_log_data(&mut self, location: &TableLocation) -> Result<RowBatch> {
        let (rows, next) = self.inner.extract_log(location, self.watermark).await?;
        tracing::debug!(
            "{}: {} new rows, watermark {} -> {}",
            location,
            rows.len(),
            self.watermark,
            next
        );
        self.watermark = next;
        Ok(rows)
    }

    pub async fn get_registry_data(&mut self, location: &TableLocation) -> Result<RowBatch> {
        self.inner.get_registry_data(location).await
    }
}

/// `SELECT *` over a log table, filtered on its timestamp column.
pub fn log_query(location: &TableLocation, timestamp_column: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE {} > $1",
        location.quoted(),
        quote_identifier(timestamp_column)
    )
}

pub fn registry_query(location: &TableLocation) -> String {
    format!("SELECT * FROM {}", location.quoted())
}

/// Type name (`timestamp`, `timestamptz`, ...) of column `$2` of the
/// relation `$1`, resolved through the search path like the reads are.
/// No row when either does not exist.
pub const COLUMN_TYPE_QUERY: &str = "SELECT t.typname::text \
     FROM pg_catalog.pg_attribute a \
     JOIN pg_catalog.pg_type t ON t.oid = a.atttypid \
     WHERE a.attrelid = to_regclass($1) AND a.attname = $2 \
     AND a.attnum > 0 AND NOT a.attisdropped";

/// Kind of a log table's timestamp column, from its catalog type name.
pub fn timestamp_kind(type_name: &str) -> Option<ColumnKind> {
    match ColumnKind::from_type_name(&type_name.to_uppercase()) {
        Some(kind @ (ColumnKind::Timestamp | ColumnKind::TimestampTz)) => Some(kind),
        _ => None,
    }
}

/// Postgres extractor
///
/// The watermark is bound with the type of the log table's timestamp
/// column: as an instant for `timestamptz`, as wall-clock time in
/// `naive_time_zone` for `timestamp`. sqlx sessions run in UTC, so binding
/// one kind against the other would shift the comparison.
pub struct PostgresBatchExtractor<C = SystemClock> {
    conn: PgConnection,
    timestamp_column: String,
    clock: C,
    naive_time_zone: NaiveTimeZone,
    timestamp_kinds: HashMap<TableLocation, ColumnKind>,
}

impl PostgresBatchExtractor<SystemClock> {
    pub async fn connect(
        credentials: &Credentials,
        timestamp_column: &str,
        timeout: Duration,
    ) -> Result<Self> {
        tracing::info!("Source: {}", credentials);
        Self::connect_with(&credentials.connect_options(), timestamp_column, timeout, SystemClock).await
    }
}

impl<C: Clock> PostgresBatchExtractor<C> {
    pub async fn connect_with(
        options: &PgConnectOptions,
        timestamp_column: &str,
        timeout: Duration,
        clock: C,
    ) -> Result<Self> {
        let conn = crate::connection::open(options, timeout, "source").await?;
        Ok(Self {
            conn,
            timestamp_column: timestamp_column.to_string(),
            clock,
            naive_time_zone: NaiveTimeZone::default(),
            timestamp_kinds: HashMap::new(),
        })
    }

    /// Zone naive `timestamp` log columns are written in (host local by default).
    pub fn naive_time_zone(mut self, zone: NaiveTimeZone) -> Self {
        self.naive_time_zone = zone;
        self
    }

    async fn timestamp_kind(&mut self, location: &TableLocation) -> Result<ColumnKind> {
        if let Some(kind) = self.timestamp_kinds.get(location) {
            return Ok(*kind);
        }

        let type_name: Option<String> = sqlx::query_scalar(COLUMN_TYPE_QUERY)
            .bind(location.quoted())
            .bind(self.timestamp_column.as_str())
            .fetch_optional(&mut self.conn)
            .await
            .map_err(|e| ETLError::Extract(format!("Failed to look up {}: {}", location, e)))?;
        let type_name = type_name.ok_or_else(|| {
            ETLError::Extract(format!(
                "{} does not exist or has no column {}",
                location, self.timestamp_column
            ))
        })?;

        let kind = timestamp_kind(&type_name).ok_or_else(|| {
            ETLError::Extract(format!(
                "Column {} of {} is {}, expected timestamp or timestamptz",
                self.timestamp_column, location, type_name
            ))
        })?;
        tracing::debug!("{}.{} is {}", location, self.timestamp_column, type_name);
        self.timestamp_kinds.insert(location.clone(), kind);
        Ok(kind)
    }

    async fn fetch(
        &mut self,
        query: Query<'_, Postgres, PgArguments>,
        location: &TableLocation,
    ) -> Result<RowBatch> {
        let mut stream = query.fetch(&mut self.conn);
        let mut batch = Vec::new();
        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| ETLError::Extract(format!("Failed to read {}: {}", location, e)))?
        {
            batch.push(decode_row(&row)?);
        }
        Ok(batch)
    }
}

#[async_trait]
impl<C: Clock> BatchExtractor for PostgresBatchExtractor<C> {
    async fn extract_log(
        &mut self,
        location: &TableLocation,
        since: Watermark,
    ) -> Result<(RowBatch, Watermark)> {
        let kind = self.timestamp_kind(location).await?;
        let sql = log_query(location, &self.timestamp_column);
        let query = match kind {
            ColumnKind::TimestampTz => sqlx::query(&sql).bind(since.timestamp()),
            _ => sqlx::query(&sql).bind(since.naive_in(self.naive_time_zone)),
        };
        let rows = self.fetch(query, location).await?;
        // Taken after the read: rows committed while it ran wait for the next call
        let next = since.advance_to(self.clock.now());
        tracing::info!("Extracted {} log rows from {} (since {})", rows.len(), location, since);
        Ok((rows, next))
    }

    async fn get_registry_data(&mut self, location: &TableLocation) -> Result<RowBatch> {
        let sql = registry_query(location);
        let rows = self.fetch(sqlx::query(&sql), location).await?;
        tracing::info!("Extracted {} registry rows from {}", rows.len(), location);
        Ok(rows)
    }
}
