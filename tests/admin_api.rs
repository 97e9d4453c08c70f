//! Admin API served over TCP.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use gateway_core::admin::admin_router;
use gateway_core::config::GatewayConfig;
use gateway_core::lifecycle::{GatewayCore, Shutdown};
use gateway_core::resilience::DownstreamError;
use gateway_core::tokens::{AuthUser, TokenPair};

mod common;

async fn start_admin(core: Arc<GatewayCore>, shutdown: &Shutdown) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let signalled = shutdown.signalled();
    let handle = tokio::spawn(async move {
        axum::serve(listener, admin_router(core))
            .with_graceful_shutdown(signalled)
            .await
            .unwrap();
    });
    (format!("http://{addr}"), handle)
}

fn admin_user() -> AuthUser {
    AuthUser {
        id: "root".into(),
        email: "root@example.com".into(),
        roles: vec!["admin".into()],
        permissions: vec!["read".into(), "write".into()],
    }
}

#[tokio::test]
async fn test_session_flow_and_status() {
    let core = Arc::new(GatewayCore::start(GatewayConfig::default()));
    let shutdown = Shutdown::new();
    let (base, handle) = start_admin(core.clone(), &shutdown).await;
    let client = common::fresh_client();

    let _ = core
        .executor()
        .execute_with_retries(
            "inventory",
            || async { Err::<(), _>(DownstreamError::from_status(503, "")) },
            0,
        )
        .await;

    let login = core.tokens().issue(&admin_user()).unwrap();

    let res = client
        .post(format!("{base}/auth/refresh"))
        .json(&json!({ "refreshToken": login.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let rotated: TokenPair = res.json().await.unwrap();
    assert_eq!(rotated.expires_in, 900);

    let replay = client
        .post(format!("{base}/auth/refresh"))
        .json(&json!({ "refreshToken": login.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(replay.status(), 401);

    // The original access token is still valid until it expires.
    let status: Value = client
        .get(format!("{base}/admin/status"))
        .bearer_auth(&login.access_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        status["breakers"]["inventory"],
        json!({ "state": "OPEN", "failures": 1, "successes": 0 })
    );
    assert_eq!(status["tokens"]["activeTokens"], 1);

    let res = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("admin server drains")
        .unwrap();
    core.shutdown();
}
