//! In-memory extractor and uploader sharing one set of tables.
//!
//! They follow the same contracts as the Postgres implementations (same
//! watermark rule, same insert plan, same commit modes) and are used to
//! exercise the pipeline without a database.

use crate::config::CommitMode;
use crate::error::{ETLError, Result};
use crate::extractor::BatchExtractor;
use crate::rows::{Row, RowBatch};
use crate::table::TableLocation;
use crate::uploader::{BatchUploader, InsertPlan};
use crate::watermark::{Clock, NaiveTimeZone, Watermark};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: usize,
    timestamp_column: Option<usize>,
    rows: Vec<Row>,
}

/// Tables keyed by their display name (`schema.name` or `name`).
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<HashMap<String, MemoryTable>>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<String, MemoryTable>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create (or replace) a table of `columns` columns. Log tables name the
    /// ordinal of their timestamp column.
    pub fn create_table(&self, location: &TableLocation, columns: usize, timestamp_column: Option<usize>) {
        self.tables().insert(
            location.to_string(),
            MemoryTable {
                columns,
                timestamp_column,
                rows: Vec::new(),
            },
        );
    }

    /// Append a row directly, as another writer of the source would.
    pub fn insert(&self, location: &TableLocation, row: Row) -> Result<()> {
        let mut tables = self.tables();
        let table = tables
            .get_mut(&location.to_string())
            .ok_or_else(|| ETLError::Load(format!("relation {} does not exist", location)))?;
        if row.len() != table.columns {
            return Err(ETLError::Load(format!(
                "{} expects {} columns, got {}",
                location,
                table.columns,
                row.len()
            )));
        }
        table.rows.push(row);
        Ok(())
    }

    /// Append several rows under one lock: all of them or none.
    pub fn insert_all(&self, location: &TableLocation, rows: Vec<Row>) -> Result<()> {
        let mut tables = self.tables();
        let table = tables
            .get_mut(&location.to_string())
            .ok_or_else(|| ETLError::Load(format!("relation {} does not exist", location)))?;
        if let Some(row) = rows.iter().find(|r| r.len() != table.columns) {
            return Err(ETLError::Load(format!(
                "{} expects {} columns, got {}",
                location,
                table.columns,
                row.len()
            )));
        }
        table.rows.extend(rows);
        Ok(())
    }

    /// Current contents of a table, in insertion order.
    pub fn rows(&self, location: &TableLocation) -> Option<RowBatch> {
        self.tables().get(&location.to_string()).map(|t| t.rows.clone())
    }
}

pub struct MemoryExtractor<C> {
    db: MemoryDatabase,
    clock: C,
    naive_time_zone: NaiveTimeZone,
}

impl<C: Clock> MemoryExtractor<C> {
    pub fn new(db: MemoryDatabase, clock: C) -> Self {
        Self {
            db,
            clock,
            naive_time_zone: NaiveTimeZone::default(),
        }
    }

    /// Zone naive timestamp columns are compared in (host local by default).
    pub fn naive_time_zone(mut self, zone: NaiveTimeZone) -> Self {
        self.naive_time_zone = zone;
        self
    }
}

#[async_trait]
impl<C: Clock> BatchExtractor for MemoryExtractor<C> {
    async fn extract_log(
        &mut self,
        location: &TableLocation,
        since: Watermark,
    ) -> Result<(RowBatch, Watermark)> {
        let rows = {
            let tables = self.db.tables();
            let table = tables
                .get(&location.to_string())
                .ok_or_else(|| ETLError::Extract(format!("relation {} does not exist", location)))?;
            let ts_idx = table.timestamp_column.ok_or_else(|| {
                ETLError::Extract(format!("{} has no timestamp column", location))
            })?;

            // NULL timestamps never compare greater, as in SQL
            table
                .rows
                .iter()
                .filter(|row| {
                    row.get(ts_idx)
                        .and_then(|v| v.instant(self.naive_time_zone))
                        .is_some_and(|ts| ts > since.timestamp())
                })
                .cloned()
                .collect::<RowBatch>()
        };
        Ok((rows, since.advance_to(self.clock.now())))
    }

    async fn get_registry_data(&mut self, location: &TableLocation) -> Result<RowBatch> {
        self.db
            .rows(location)
            .ok_or_else(|| ETLError::Extract(format!("relation {} does not exist", location)))
    }
}

/// One executed INSERT: the statement text and how many values were bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedInsert {
    pub sql: String,
    pub params: usize,
}

pub struct MemoryUploader {
    db: MemoryDatabase,
    commit_mode: CommitMode,
    executed: Vec<ExecutedInsert>,
    fail_at_row: Option<usize>,
}

impl MemoryUploader {
    pub fn new(db: MemoryDatabase, commit_mode: CommitMode) -> Self {
        Self {
            db,
            commit_mode,
            executed: Vec::new(),
            fail_at_row: None,
        }
    }

    /// Make the insert of row `idx` (0-based, per batch) fail.
    pub fn fail_at_row(mut self, idx: usize) -> Self {
        self.fail_at_row = Some(idx);
        self
    }

    /// Every INSERT executed so far, across batches.
    pub fn executed(&self) -> &[ExecutedInsert] {
        &self.executed
    }
}

#[async_trait]
impl BatchUploader for MemoryUploader {
    async fn save_data(&mut self, rows: &[Row], location: &TableLocation) -> Result<usize> {
        let Some(plan) = InsertPlan::for_batch(rows, location)? else {
            return Ok(0);
        };

        let mut staged = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            self.executed.push(ExecutedInsert {
                sql: plan.sql.clone(),
                params: row.len(),
            });
            if self.fail_at_row == Some(idx) {
                return Err(ETLError::Load(format!(
                    "Failed to insert row {} into {}: injected failure",
                    idx, location
                )));
            }
            match self.commit_mode {
                CommitMode::Autocommit => self.db.insert(location, row.clone())?,
                CommitMode::Transaction => staged.push(row.clone()),
            }
        }

        if !staged.is_empty() {
            self.db.insert_all(location, staged)?;
        }
        Ok(rows.len())
    }
}
