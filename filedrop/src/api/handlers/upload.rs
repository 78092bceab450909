//! `POST /api/upload`: buffer one multipart file in memory and put it into the bucket.
//!
//! A request moves through `UploadPhase`s: `Idle -> ReceivingMultipart -> Uploading ->
//! Succeeded | Failed`. Any failure along the way is terminal and answered with a generic 500.

use crate::AppState;
use crate::api::models::upload::{FILE_FIELD, UploadRequest, UploadResponse};
use crate::errors::{Error, ErrorResponse, Result};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadPhase {
    Idle,
    ReceivingMultipart,
    Uploading,
    Succeeded,
    Failed,
}

impl UploadPhase {
    fn advance(&mut self, next: UploadPhase) {
        debug!(from = ?*self, to = ?next, "Upload phase transition");
        *self = next;
    }
}

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "upload",
    summary = "Upload file",
    description = "Store a single file in the bucket under its original file name. An existing object with the same name is overwritten.",
    request_body(
        content_type = "multipart/form-data",
        description = "Exactly one file part named `file`"
    ),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 405, description = "Only POST is allowed", body = ErrorResponse),
        (status = 500, description = "Multipart parsing or storage failed", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut phase = UploadPhase::Idle;

    phase.advance(UploadPhase::ReceivingMultipart);
    let received = match multipart {
        Ok(multipart) => read_upload(multipart).await,
        Err(rejection) => Err(Error::Multipart {
            message: rejection.body_text(),
        }),
    };
    let upload = match received {
        Ok(upload) => upload,
        Err(e) => {
            phase.advance(UploadPhase::Failed);
            return Err(e);
        }
    };

    info!(
        file_name = %upload.file_name,
        mime_type = %upload.mime_type,
        size = upload.file_bytes.len(),
        bucket = state.storage.bucket(),
        "Received file, uploading"
    );

    phase.advance(UploadPhase::Uploading);
    match state.storage.put_object(upload.into()).await {
        Ok(location) => {
            phase.advance(UploadPhase::Succeeded);
            info!(%location, "File uploaded");
            Ok(Json(UploadResponse::stored_at(location)))
        }
        Err(e) => {
            phase.advance(UploadPhase::Failed);
            Err(e.into())
        }
    }
}

/// Answers every verb the upload route does not serve.
pub async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

/// Pull the single `file` part out of the body, fully buffered.
///
/// Parts with other names are skipped. A `file` part without a file name is a plain text field,
/// not a file, and is skipped too. A second file part is rejected.
async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest> {
    let mut upload: Option<UploadRequest> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| Error::Multipart { message: e.to_string() })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(file_name) = field.file_name().filter(|name| !name.is_empty()).map(str::to_owned) else {
            debug!("Skipping '{FILE_FIELD}' field without a file name");
            continue;
        };

        if upload.is_some() {
            return Err(Error::Multipart {
                message: format!("Unexpected second '{FILE_FIELD}' field ({file_name})"),
            });
        }

        // Browsers send octet-stream for types they do not know; the file name may say more
        let mime_type = match field.content_type() {
            Some(declared) if declared != mime_guess::mime::APPLICATION_OCTET_STREAM.as_ref() => declared.to_owned(),
            _ => mime_guess::from_path(&file_name).first_or_octet_stream().to_string(),
        };

        let file_bytes = field.bytes().await.map_err(|e| Error::Multipart { message: e.to_string() })?;

        upload = Some(UploadRequest {
            file_bytes,
            file_name,
            mime_type,
        });
    }

    upload.ok_or(Error::MissingFile { field: FILE_FIELD })
}
