use crate::error::{ETLError, Result};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::time::Duration;

/// Open a single, unpooled connection.
///
/// `role` ("source", "destination") only shows up in logs and errors.
pub async fn open(options: &PgConnectOptions, timeout: Duration, role: &str) -> Result<PgConnection> {
    tracing::info!("Connecting to {} database...", role);

    let conn = tokio::time::timeout(timeout, PgConnection::connect_with(options))
        .await
        .map_err(|_| ETLError::Connect(format!("Timed out connecting to {} database after {:?}", role, timeout)))?
        .map_err(|e| ETLError::Connect(format!("Failed to connect to {} database: {}", role, e)))?;

    tracing::info!("Connected to {} database", role);
    Ok(conn)
}

/// Round-trip a trivial query to prove the connection is usable.
pub async fn ping(conn: &mut PgConnection, role: &str) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(&mut *conn)
        .await
        .map_err(|e| ETLError::Connect(format!("Health check on {} database failed: {}", role, e)))?;
    Ok(())
}
