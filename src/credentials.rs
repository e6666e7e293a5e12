use crate::error::{ETLError, Result};
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::path::Path;

/// Number of lines a credential file holds.
pub const CREDENTIAL_FIELDS: usize = 5;

/// Connection parameters read from a plain credential file.
///
/// The file holds one value per line in this order:
///
/// ```text
/// host
/// port
/// dbname
/// user
/// password
/// ```
///
/// Values are bound to the connection by name, so the on-disk order is the
/// only convention that matters.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ETLError::Credentials(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
            .map_err(|e| ETLError::Credentials(format!("{}: {}", path.display(), e)))
    }

    /// Parse the five-line format. Blank lines after the last field are
    /// ignored; any other count is rejected.
    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        let mut lines: Vec<&str> = contents.lines().map(str::trim).collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        if lines.len() != CREDENTIAL_FIELDS {
            return Err(format!(
                "expected {} lines (host, port, dbname, user, password), found {}",
                CREDENTIAL_FIELDS,
                lines.len()
            ));
        }

        let port = lines[1]
            .parse::<u16>()
            .map_err(|e| format!("invalid port '{}': {}", lines[1], e))?;

        Ok(Credentials {
            host: lines[0].to_string(),
            port,
            dbname: lines[2].to_string(),
            user: lines[3].to_string(),
            password: lines[4].to_string(),
        })
    }

    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.dbname)
            .username(&self.user)
            .password(&self.password)
    }
}

// Keep the password out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}
