//! HTTP request handlers for all API endpoints.
//!
//! # Handler Modules
//!
//! - [`upload`]: Multipart upload into object storage
//! - [`static_assets`]: Embedded browser client
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to an HTTP status code and a
//! `{"message": ...}` JSON body.

pub mod static_assets;
pub mod upload;

/// Liveness probe
pub async fn healthz() -> &'static str {
    "OK"
}
