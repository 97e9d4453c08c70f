//! Admin and session HTTP surface.
//!
//! ```text
//! GET  /health              liveness
//! POST /auth/refresh        rotate a refresh token
//! POST /auth/logout         revoke one refresh token
//! POST /auth/logout-all     revoke every refresh token of the caller   (bearer)
//! GET  /admin/status        breaker + refresh token overview           (bearer, role)
//! ```

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::lifecycle::GatewayCore;
use self::auth::require_bearer;
use self::handlers::*;

/// State shared by every admin handler.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<GatewayCore>,
}

/// Build the admin router over a running core.
#[allow(deprecated)]
pub fn admin_router(core: Arc<GatewayCore>) -> Router {
    let timeout = Duration::from_secs(core.config().admin.request_timeout_secs);
    let state = AppState { core };

    let protected = Router::new()
        .route("/auth/logout-all", post(logout_all))
        .route("/admin/status", get(get_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .merge(protected)
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
