pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod extractor;
pub mod health;
pub mod memory;
pub mod pipeline;
pub mod rows;
pub mod table;
pub mod uploader;
pub mod watermark;

pub use error::{ETLError, Result};
