// HTTP client utilities
use crate::domain::error::MistwarError;
use crate::infrastructure::config::ApiConfig;
use reqwest::{Client, Response};
use std::time::Duration;

/// Create the shared HTTP client with pooling, timeout and user agent
pub fn create_client(api: &ApiConfig) -> Result<Client, MistwarError> {
    Ok(Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(30))
        .timeout(Duration::from_secs(api.timeout_secs))
        .user_agent(concat!("mistwar/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Map non-success statuses onto the error taxonomy
pub fn check_status(response: Response) -> Result<Response, MistwarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    match status.as_u16() {
        401 | 403 => Err(MistwarError::Unauthorized(url)),
        404 => Err(MistwarError::NotFound(url)),
        code => Err(MistwarError::Status { status: code, url }),
    }
}
