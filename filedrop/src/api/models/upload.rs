use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::PutObjectRequest;

/// Multipart field the upload endpoint reads the file from.
pub const FILE_FIELD: &str = "file";

/// A file pulled out of a multipart body. Lives for the duration of one request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_bytes: Bytes,
    pub file_name: String,
    pub mime_type: String,
}

impl From<UploadRequest> for PutObjectRequest {
    /// The original file name is the object key, so re-uploading a name replaces the object.
    fn from(upload: UploadRequest) -> Self {
        Self {
            key: upload.file_name,
            body: upload.file_bytes,
            content_type: upload.mime_type,
        }
    }
}

/// Body of a successful upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    /// Location of the stored object (public or pre-signed URL)
    #[serde(rename = "s3Url")]
    pub s3_url: String,
}

impl UploadResponse {
    pub fn stored_at(location: String) -> Self {
        Self {
            message: "File uploaded successfully to S3".to_string(),
            s3_url: location,
        }
    }
}
