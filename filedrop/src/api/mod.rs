//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Upload** (`POST /api/upload`): multipart file upload into the configured bucket
//! - **Client** (`/`): the embedded browser client
//! - **Health** (`GET /healthz`): liveness probe
//!
//! The upload endpoint is documented with `utoipa`; the OpenAPI document is served at
//! `/api/openapi.json` and rendered at `/api/docs`.

pub mod handlers;
pub mod models;
