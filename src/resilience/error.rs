//! Failure taxonomy for outbound calls.
//!
//! Callers branch on [`ResilienceError::kind`] (or the string
//! [`ResilienceError::reason_code`]) rather than on message text, so a local
//! admission rejection can never be confused with a downstream fault.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failure reported by a single downstream operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownstreamError {
    /// The downstream answered with a non-success status.
    #[error("downstream responded with status {status}")]
    Status { status: u16, body: String },
    /// No usable response (connection refused, reset, decode failure).
    #[error("transport error: {0}")]
    Transport(String),
}

impl DownstreamError {
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        DownstreamError::Status {
            status,
            body: body.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        DownstreamError::Transport(message.into())
    }

    /// 4xx-equivalent responses; these are never retried.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DownstreamError::Status { status, .. } if (400..500).contains(status))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            DownstreamError::Status { status, .. } => Some(*status),
            DownstreamError::Transport(_) => None,
        }
    }
}

/// Machine-readable classification of a [`ResilienceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AdmissionRejected,
    Timeout,
    ClientError,
    TransientFailure,
    RetriesExhausted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AdmissionRejected => "admission_rejected",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ClientError => "client_error",
            ErrorKind::TransientFailure => "transient_failure",
            ErrorKind::RetriesExhausted => "retries_exhausted",
        }
    }
}

/// Outcome of a logical call that did not succeed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResilienceError {
    /// The breaker is open; the operation was never invoked.
    #[error("circuit breaker for {service} is OPEN")]
    AdmissionRejected { service: String },

    #[error("operation timeout for {service} after {timeout:?}")]
    Timeout { service: String, timeout: Duration },

    #[error("client error from {service}: {source}")]
    ClientError {
        service: String,
        source: DownstreamError,
    },

    #[error("transient failure from {service}: {source}")]
    TransientFailure {
        service: String,
        source: DownstreamError,
    },

    #[error("retries exhausted for {service} after {attempts} attempts: {last}")]
    RetriesExhausted {
        service: String,
        attempts: u32,
        #[source]
        last: Box<ResilienceError>,
    },
}

impl ResilienceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResilienceError::AdmissionRejected { .. } => ErrorKind::AdmissionRejected,
            ResilienceError::Timeout { .. } => ErrorKind::Timeout,
            ResilienceError::ClientError { .. } => ErrorKind::ClientError,
            ResilienceError::TransientFailure { .. } => ErrorKind::TransientFailure,
            ResilienceError::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
        }
    }

    pub fn reason_code(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn service(&self) -> &str {
        match self {
            ResilienceError::AdmissionRejected { service }
            | ResilienceError::Timeout { service, .. }
            | ResilienceError::ClientError { service, .. }
            | ResilienceError::TransientFailure { service, .. }
            | ResilienceError::RetriesExhausted { service, .. } => service,
        }
    }

    /// True when the breaker refused the call locally.
    pub fn is_admission_rejected(&self) -> bool {
        self.kind() == ErrorKind::AdmissionRejected
    }

    /// Classify a downstream failure for `service`.
    pub fn from_downstream(service: &str, source: DownstreamError) -> Self {
        if source.is_client_error() {
            ResilienceError::ClientError {
                service: service.to_string(),
                source,
            }
        } else {
            ResilienceError::TransientFailure {
                service: service.to_string(),
                source,
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ResilienceError::AdmissionRejected { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ResilienceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ResilienceError::ClientError { source, .. } => source
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_REQUEST),
            ResilienceError::TransientFailure { .. } | ResilienceError::RetriesExhausted { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ResilienceError {
    fn into_response(self) -> Response {
        let message = match self.kind() {
            ErrorKind::AdmissionRejected => "service temporarily unavailable",
            ErrorKind::Timeout => "service did not respond in time",
            ErrorKind::ClientError => "request rejected by service",
            ErrorKind::TransientFailure | ErrorKind::RetriesExhausted => "internal error",
        };
        let body = json!({
            "error": message,
            "service": self.service(),
            "reason": self.reason_code(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}
