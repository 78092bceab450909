//! # filedrop: drag-and-drop uploads into object storage
//!
//! `filedrop` serves a small browser client and a single upload endpoint. The client collects one
//! file, posts it to `POST /api/upload`, and shows the location of the stored object. The
//! endpoint buffers the file, writes it into a bucket under its original name, and returns the
//! object's public or pre-signed URL.
//!
//! Two command-line tools ship alongside the server:
//!
//! - `filedrop-upload` drives the same upload flow from a terminal ([`client`]).
//! - `filedrop-authorize` runs a one-shot OAuth authorization-code flow against Google Drive and
//!   stores the resulting token in `token.json` ([`oauth`]). Nothing else in this crate reads
//!   that token.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Storage sits behind the
//! [`storage::ObjectStore`] trait; the production implementation wraps the AWS S3 SDK and is
//! built once at startup, then shared by every request through [`AppState`]. Requests share no
//! mutable state.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use filedrop::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = filedrop::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     filedrop::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod oauth;
mod openapi;
mod static_assets;
pub mod storage;
pub mod telemetry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod test;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::storage::{ObjectStore, S3Uploader};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::{
    Json, Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// The storage client is injected rather than built inside handlers, so tests can hand in a
/// [`storage::InMemoryStore`] (with the `test-utils` feature).
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .storage(Arc::new(store))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn ObjectStore>,
}

/// Create CORS layer from configuration. `None` when no origins are configured.
fn create_cors_layer(config: &Config) -> anyhow::Result<Option<CorsLayer>> {
    let cors_config = &config.security.cors;
    if cors_config.allowed_origins.is_empty() {
        return Ok(None);
    }

    let mut origins = Vec::new();
    for origin in &cors_config.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            // Origins never carry the trailing slash `Url` adds
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::POST])
        .allow_headers(tower_http::cors::Any);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(Some(cors))
}

/// Build the application router.
///
/// - `POST /api/upload` with its own body limit; every other verb answers 405
/// - `GET /healthz`
/// - `GET /api/openapi.json` and the `/api/docs` viewer
/// - the embedded browser client for everything else
/// - optional CORS and request tracing
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let upload_limit = usize::try_from(state.config.limits.max_upload_size)?;
    let cors = create_cors_layer(&state.config)?;

    let mut router = Router::new()
        .route(
            "/api/upload",
            post(api::handlers::upload::upload_file)
                .fallback(api::handlers::upload::method_not_allowed)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/healthz", get(api::handlers::healthz))
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .fallback(api::handlers::static_assets::serve_embedded_asset)
        .with_state(state);

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The upload server.
///
/// 1. **Create**: [`Application::new`] builds the storage client and the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application, building the S3 client from configuration
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!(
            host = %config.host,
            port = config.port,
            bucket = %config.storage.bucket,
            region = %config.storage.region,
            "Starting filedrop"
        );

        let storage = S3Uploader::from_config(&config.storage).await?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Create a new application around an existing storage client
    pub fn with_storage(config: Config, storage: Arc<dyn ObjectStore>) -> anyhow::Result<Self> {
        let state = AppState::builder().config(config.clone()).storage(storage).build();
        let router = build_router(state)?;
        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "filedrop listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
