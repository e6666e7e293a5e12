use thiserror::Error;

pub type Result<T> = std::result::Result<T, ETLError>;

#[derive(Error, Debug)]
pub enum ETLError {
    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Extract error: {0}")]
    Extract(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Watermark error: {0}")]
    Watermark(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl From<config::ConfigError> for ETLError {
    fn from(e: config::ConfigError) -> Self {
        ETLError::Config(e.to_string())
    }
}
