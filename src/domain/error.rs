use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MistwarError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing API permissions: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Cache producer failed: {0}")]
    Producer(String),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A failure replayed from a shared cache entry.
    #[error(transparent)]
    Shared(#[from] Arc<MistwarError>),
}

impl MistwarError {
    /// Whether another attempt at the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder() && !e.is_decode(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Io(_) => true,
            Self::Shared(e) => e.is_transient(),
            _ => false,
        }
    }
}
