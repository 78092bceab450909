//! Object storage behind the upload endpoint.
//!
//! The [`ObjectStore`] trait is the single seam between the HTTP layer and the bucket: one call,
//! one object, one location string back. [`S3Uploader`] is the production implementation; tests
//! use [`InMemoryStore`] (available with the `test-utils` feature).
//!
//! Stores never retry and never chunk. The whole payload is handed over in one `put_object`
//! call, and a failure is final for that upload.

mod s3;

#[cfg(any(test, feature = "test-utils"))]
mod memory;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{InMemoryStore, StoredObject};
pub use s3::{LocationStyle, S3Uploader, object_url, public_base_url};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// One object to write.
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    /// Object key. Writing an existing key replaces the object.
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Credentials are missing, malformed, expired or not allowed to write the bucket
    #[error("storage rejected credentials: {message}")]
    Credentials { message: String },

    /// The bucket could not be reached (network, DNS, timeout, or the bucket does not exist)
    #[error("storage unreachable: {message}")]
    Unreachable { message: String },

    /// The provider refused the payload size
    #[error("payload exceeds storage provider limits: {message}")]
    PayloadTooLarge { message: String },

    /// The object was written but a pre-signed location could not be produced
    #[error("failed to presign object location: {message}")]
    Presign { message: String },

    /// The key has a `.` or `..` segment, which no object URL can address
    #[error("object key {key:?} cannot be addressed by URL")]
    InvalidKey { key: String },

    #[error("storage error: {message}")]
    Other { message: String },
}

/// Reject keys whose location would not point back at them.
///
/// URL parsers fold `.` and `..` segments (percent-encoded or not) into their neighbours, so
/// `a/../b.txt` would be written as-is but linked as `b.txt`.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(StorageError::InvalidKey { key: key.to_string() });
    }
    Ok(())
}

/// Writes whole objects into a single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket this store writes into
    fn bucket(&self) -> &str;

    /// Store `request.body` under `request.key` and return a location the client can fetch it from.
    async fn put_object(&self, request: PutObjectRequest) -> Result<String, StorageError>;
}
