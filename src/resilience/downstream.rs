//! Classification of HTTP outcomes from downstream services.
//!
//! - 4xx responses are client errors and are never retried
//! - 5xx and other non-success responses are transient
//! - Connection and decode failures are transient

use reqwest::Response;

use crate::resilience::error::DownstreamError;

impl From<reqwest::Error> for DownstreamError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => DownstreamError::from_status(status.as_u16(), err.to_string()),
            None => DownstreamError::transport(err.to_string()),
        }
    }
}

/// Pass successful responses through; turn everything else into a
/// [`DownstreamError::Status`] carrying the response body.
pub async fn check_status(response: Response) -> Result<Response, DownstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DownstreamError::from_status(status.as_u16(), body))
}
