//! Local HTTP stub shared by the API integration tests.
//!
//! Each test binary compiles its own copy, so not every helper is used by
//! every binary.
#![allow(dead_code)]

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counters for scripting stub behavior and asserting on it.
#[derive(Clone, Default)]
pub struct Stub {
    pub token_hits: Arc<AtomicUsize>,
    pub data_hits: Arc<AtomicUsize>,
}

impl Stub {
    /// How many tokens the stub has issued so far.
    pub fn tokens_issued(&self) -> usize {
        self.token_hits.load(Ordering::SeqCst)
    }

    pub fn data_requests(&self) -> usize {
        self.data_hits.load(Ordering::SeqCst)
    }

}

async fn issue_token(State(stub): State<Stub>) -> Json<Value> {
    let n = stub.token_hits.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("token-{n}"),
        "expires_in": 3600,
        "token_type": "bearer"
    }))
}

/// Router serving the client-credentials endpoint, issuing `token-1`,
/// `token-2`, ... on successive hits.
pub fn token_router(stub: Stub) -> Router {
    Router::new()
        .route("/oauth2/token", post(issue_token))
        .with_state(stub)
}

/// Extract the bearer token from a request, if any.
pub fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

/// Serve the router on an ephemeral local port; returns the base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
