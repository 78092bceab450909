//! OpenAPI documentation for the upload API.

use utoipa::OpenApi;

use crate::api::handlers::upload;
use crate::api::models::upload::UploadResponse;
use crate::errors::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(title = "filedrop", description = "Upload a file into object storage and get its location back"),
    paths(upload::upload_file),
    components(schemas(UploadResponse, ErrorResponse)),
    tags((name = "upload", description = "File upload"))
)]
pub struct ApiDoc;
