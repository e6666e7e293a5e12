use crate::config::Config;
use crate::connection::{open, ping};
use crate::credentials::Credentials;
use crate::error::Result;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Check that both databases are reachable with their credential files.
pub async fn check_health(config: &Config) -> Result<()> {
    info!("Running health check");

    let timeout = Duration::from_secs(config.connect_timeout_seconds);
    check_database(&config.source_credentials, "source", timeout).await?;
    check_database(&config.destination_credentials, "destination", timeout).await?;

    info!("Health check passed");
    Ok(())
}

async fn check_database(credentials: &Path, role: &str, timeout: Duration) -> Result<()> {
    let credentials = Credentials::from_file(credentials)?;
    let result = match open(&credentials.connect_options(), timeout, role).await {
        Ok(mut conn) => ping(&mut conn, role).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!("{} health: OK ({})", role, credentials);
            Ok(())
        }
        Err(e) => {
            warn!("{} health: FAILED - {}", role, e);
            Err(e)
        }
    }
}
