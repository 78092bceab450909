//! API request and response data models.
//!
//! - [`upload`]: the transient upload request and the JSON bodies the upload endpoint returns

pub mod upload;
