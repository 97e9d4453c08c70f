//! Bearer access-token middleware.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::admin::AppState;
use crate::tokens::AccessTokenError;

const REFRESH_HINT: &str = "Try refreshing your token or logging in again";

/// Why a request was refused at the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    MissingToken,
    InvalidToken(AccessTokenError),
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthRejection::MissingToken => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Access token required" }),
            ),
            AuthRejection::InvalidToken(reason) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": reason.to_string(), "hint": REFRESH_HINT }),
            ),
            AuthRejection::Forbidden => (
                StatusCode::FORBIDDEN,
                json!({ "error": "Insufficient permissions" }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Verify `Authorization: Bearer <access token>` and expose the claims to
/// handlers through request extensions.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthRejection> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthRejection::MissingToken)?;

    let claims = state.core.tokens().verify_access(token).map_err(|reason| {
        tracing::debug!(%reason, "Rejected access token");
        AuthRejection::InvalidToken(reason)
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
