use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::admin::auth::AuthRejection;
use crate::admin::AppState;
use crate::resilience::BreakerSnapshot;
use crate::tokens::{AccessClaims, TokenStats};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse<T> {
    pub revoked: T,
}

#[derive(Debug, Serialize)]
pub struct GatewayStatus {
    pub breakers: BTreeMap<String, BreakerSnapshot>,
    pub tokens: TokenStats,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Response {
    let rotated = match body {
        Ok(Json(body)) => state.core.tokens().rotate(&body.refresh_token),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected refresh request body");
            None
        }
    };

    match rotated {
        Some(pair) => Json(pair).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "please log in again" })),
        )
            .into_response(),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Json<RevokeResponse<bool>> {
    let revoked = match body {
        Ok(Json(body)) => state.core.tokens().revoke(&body.refresh_token),
        Err(_) => false,
    };
    Json(RevokeResponse { revoked })
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Json<RevokeResponse<usize>> {
    Json(RevokeResponse {
        revoked: state.core.tokens().revoke_all(&claims.sub),
    })
}

pub async fn get_status(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Json<GatewayStatus>, AuthRejection> {
    if !claims.has_role(&state.core.config().admin.status_role) {
        return Err(AuthRejection::Forbidden);
    }

    Ok(Json(GatewayStatus {
        breakers: state.core.executor().status(),
        tokens: state.core.tokens().stats(),
    }))
}
