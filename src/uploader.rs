use crate::config::CommitMode;
use crate::credentials::Credentials;
use crate::error::{ETLError, Result};
use crate::rows::{bind_value, Row};
use crate::table::TableLocation;
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::time::Duration;

#[async_trait]
pub trait BatchUploader: Send {
    /// Append `rows` to `location`, returning how many were written.
    async fn save_data(&mut self, rows: &[Row], location: &TableLocation) -> Result<usize>;
}

/// Positional INSERT with one placeholder per column:
/// `INSERT INTO "t" VALUES ($1, $2, $3)`.
pub fn insert_query(location: &TableLocation, column_count: usize) -> String {
    let placeholders: Vec<String> = (1..=column_count).map(|i| format!("${}", i)).collect();
    format!("INSERT INTO {} VALUES ({})", location.quoted(), placeholders.join(", "))
}

/// The statement every row of a batch is inserted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    pub sql: String,
    pub column_count: usize,
}

impl InsertPlan {
    /// `None` for an empty batch, which writes nothing.
    ///
    /// The column count comes from the first row; a batch with ragged rows
    /// is rejected before anything is written.
    pub fn for_batch(rows: &[Row], location: &TableLocation) -> Result<Option<Self>> {
        let Some(first) = rows.first() else {
            return Ok(None);
        };
        let column_count = first.len();
        if column_count == 0 {
            return Err(ETLError::Load(format!(
                "Cannot insert rows without columns into {}",
                location
            )));
        }
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != column_count) {
            return Err(ETLError::Load(format!(
                "Row {} has {} columns, expected {} for {}",
                idx,
                row.len(),
                column_count,
                location
            )));
        }
        Ok(Some(Self {
            sql: insert_query(location, column_count),
            column_count,
        }))
    }
}

pub struct PostgresBatchUploader {
    conn: PgConnection,
    commit_mode: CommitMode,
}

impl PostgresBatchUploader {
    pub async fn connect(credentials: &Credentials, commit_mode: CommitMode, timeout: Duration) -> Result<Self> {
        tracing::info!("Destination: {}", credentials);
        Self::connect_with(&credentials.connect_options(), commit_mode, timeout).await
    }

    pub async fn connect_with(
        options: &PgConnectOptions,
        commit_mode: CommitMode,
        timeout: Duration,
    ) -> Result<Self> {
        let conn = crate::connection::open(options, timeout, "destination").await?;
        Ok(Self { conn, commit_mode })
    }
}

async fn insert_row(
    conn: &mut PgConnection,
    plan: &InsertPlan,
    row: &Row,
    idx: usize,
    location: &TableLocation,
) -> Result<()> {
    let mut query = sqlx::query(&plan.sql);
    for value in row {
        query = bind_value(query, value);
    }
    query
        .execute(&mut *conn)
        .await
        .map_err(|e| ETLError::Load(format!("Failed to insert row {} into {}: {}", idx, location, e)))?;
    Ok(())
}

#[async_trait]
impl BatchUploader for PostgresBatchUploader {
    async fn save_data(&mut self, rows: &[Row], location: &TableLocation) -> Result<usize> {
        let Some(plan) = InsertPlan::for_batch(rows, location)? else {
            tracing::info!("Nothing to insert into {}", location);
            return Ok(0);
        };

        tracing::info!(
            "Inserting {} rows into {} ({:?})",
            rows.len(),
            location,
            self.commit_mode
        );

        match self.commit_mode {
            CommitMode::Autocommit => {
                // Each statement commits on its own; earlier rows stay on failure
                for (idx, row) in rows.iter().enumerate() {
                    insert_row(&mut self.conn, &plan, row, idx, location).await?;
                }
            }
            CommitMode::Transaction => {
                let mut tx = self
                    .conn
                    .begin()
                    .await
                    .map_err(|e| ETLError::Load(format!("Failed to begin transaction: {}", e)))?;

                // Dropping `tx` on error rolls the whole batch back
                for (idx, row) in rows.iter().enumerate() {
                    insert_row(&mut tx, &plan, row, idx, location).await?;
                }

                tx.commit()
                    .await
                    .map_err(|e| ETLError::Load(format!("Failed to commit transaction: {}", e)))?;
            }
        }

        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::{ColumnKind, Value};

    #[test]
    fn placeholders_match_column_count() {
        assert_eq!(
            insert_query(&TableLocation::new("account_backup"), 3),
            r#"INSERT INTO "account_backup" VALUES ($1, $2, $3)"#
        );
    }

    #[test]
    fn empty_batch_has_no_plan() {
        let plan = InsertPlan::for_batch(&[], &TableLocation::new("t")).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn plan_uses_first_row_width() {
        let rows = vec![
            vec![Value::Int(1), Value::Null(ColumnKind::Text)],
            vec![Value::Int(2), Value::Text("b".into())],
        ];
        let plan = InsertPlan::for_batch(&rows, &TableLocation::new("t"))
            .unwrap()
            .unwrap();
        assert_eq!(plan.column_count, 2);
        assert_eq!(plan.sql, r#"INSERT INTO "t" VALUES ($1, $2)"#);
    }

    #[test]
    fn ragged_batch_is_rejected() {
        let rows = vec![vec![Value::Int(1), Value::Int(2)], vec![Value::Int(3)]];
        let err = InsertPlan::for_batch(&rows, &TableLocation::new("t")).unwrap_err();
        match err {
            ETLError::Load(msg) => assert!(msg.contains("Row 1 has 1 columns, expected 2"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn zero_width_rows_are_rejected() {
        let rows = vec![Vec::new()];
        assert!(InsertPlan::for_batch(&rows, &TableLocation::new("t")).is_err());
    }
}
