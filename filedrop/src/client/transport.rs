//! HTTP transport for [`UploadClient`](super::UploadClient).

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tokio::sync::watch;
use tracing::{debug, instrument};
use url::Url;

use super::{ClientError, SelectedFile, UploadTransport};
use crate::api::models::upload::{FILE_FIELD, UploadResponse};
use crate::errors::ErrorResponse;

/// Size of the body chunks handed to the HTTP stack; progress advances once per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Posts files to `{server}/api/upload` as `multipart/form-data`.
pub struct ReqwestTransport {
    client: Client,
    upload_url: Url,
}

impl ReqwestTransport {
    pub fn new(server: &Url) -> Result<Self, ClientError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, server)?)
    }

    pub fn with_client(client: Client, server: &Url) -> Result<Self, url::ParseError> {
        let upload_url = ensure_slash(server).join("api/upload")?;
        Ok(Self { client, upload_url })
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }
}

/// `Url::join` replaces the last path segment unless the base ends with a slash.
fn ensure_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Percentage of `total` covered by `sent`. An empty body counts as fully sent.
fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as u128 * 100) / total as u128).min(100) as u8
}

/// Body stream that reports progress as the HTTP stack pulls each chunk.
fn progress_body(file: &SelectedFile, progress: Arc<watch::Sender<u8>>) -> Body {
    let bytes = file.bytes.clone();
    let total = bytes.len();

    let chunks: Vec<_> = (0..total)
        .step_by(CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + CHUNK_SIZE).min(total)))
        .collect();

    let mut sent = 0;
    let chunks = stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len();
        progress.send_replace(percent(sent, total));
        Ok::<_, std::io::Error>(chunk)
    }));

    Body::wrap_stream(chunks)
}

#[async_trait]
impl UploadTransport for ReqwestTransport {
    #[instrument(skip_all, fields(file_name = %file.name, url = %self.upload_url))]
    async fn send(&self, file: &SelectedFile, progress: Arc<watch::Sender<u8>>) -> Result<UploadResponse, ClientError> {
        let part = Part::stream_with_length(progress_body(file, progress), file.bytes.len() as u64)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self.client.post(self.upload_url.clone()).multipart(form).send().await?;

        let status = response.status();
        debug!(%status, "Upload response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<UploadResponse>().await?)
    }
}
