//! Test utilities for integration testing (available with `test-utils` feature).

use std::sync::Arc;

use axum_test::TestServer;

use crate::storage::InMemoryStore;
use crate::{AppState, Application, Config, build_router};
use tokio::net::TcpListener;

/// Bucket used by [`create_test_config`]; matches [`InMemoryStore::new`] in the helpers below.
pub const TEST_BUCKET: &str = "uploads";

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.storage.bucket = TEST_BUCKET.to_string();
    config
}

/// Build the full router around `store` and wrap it in an in-process test server.
pub fn create_test_server(config: Config, store: InMemoryStore) -> TestServer {
    Application::with_storage(config, Arc::new(store))
        .expect("Failed to create application")
        .into_test_server()
}

/// Serve the full router around `store` on an ephemeral local port, for clients that need a real
/// socket. Returns the base URL; the server lives until the test runtime shuts down.
pub async fn spawn_test_server(config: Config, store: InMemoryStore) -> url::Url {
    let state = AppState::builder().config(config).storage(Arc::new(store)).build();
    let router = build_router(state).expect("Failed to build router");

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no local address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Test server failed");
    });

    url::Url::parse(&format!("http://{addr}/")).expect("Socket addresses are valid URLs")
}

/// Install the process-wide rustls provider once; `main` does this for the binaries.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}
