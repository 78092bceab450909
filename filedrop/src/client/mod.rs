//! Upload client: the state behind the browser page, usable from Rust.
//!
//! [`UploadClient`] holds the current selection, the status line shown to the user, upload
//! progress and the location of the last stored file. Sending is delegated to an
//! [`UploadTransport`]; [`ReqwestTransport`] posts to a running server.
//!
//! ```no_run
//! # async fn run() -> Result<(), filedrop::client::ClientError> {
//! use filedrop::client::{ReqwestTransport, SelectedFile, UploadClient};
//!
//! let server = url::Url::parse("http://localhost:3000/").unwrap();
//! let mut client = UploadClient::new(ReqwestTransport::new(&server)?);
//!
//! client.select(vec![SelectedFile::from_path("report.pdf".as_ref()).await?]);
//! let location = client.upload().await?;
//! println!("{location}");
//! # Ok(())
//! # }
//! ```

mod transport;

pub use transport::ReqwestTransport;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

use crate::api::models::upload::UploadResponse;

pub const NO_FILES_SELECTED: &str = "No files selected for upload.";
pub const UPLOADING: &str = "Uploading...";
pub const UPLOAD_SUCCEEDED: &str = "File uploaded successfully!";
pub const UPLOAD_FAILED: &str = "Error uploading file to S3.";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("no file selected for upload")]
    NoFileSelected,

    #[error("failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("upload failed with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// A file picked for upload, fully read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, naming it after its final path component and guessing its type
    /// from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path).first_or_octet_stream().to_string();

        Ok(Self::new(name, mime_type, bytes))
    }
}

/// Sends one file to the upload endpoint.
///
/// Implementations publish upload progress (0-100) on `progress` as the body goes out.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn send(&self, file: &SelectedFile, progress: Arc<watch::Sender<u8>>) -> Result<UploadResponse, ClientError>;
}

/// Client-side upload state. One upload at a time: [`UploadClient::upload`] borrows the client
/// mutably until the request settles.
pub struct UploadClient<T> {
    transport: T,
    selection: Vec<SelectedFile>,
    status_message: String,
    is_success: bool,
    location: Option<String>,
    progress: Arc<watch::Sender<u8>>,
}

impl<T: UploadTransport> UploadClient<T> {
    pub fn new(transport: T) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            transport,
            selection: Vec::new(),
            status_message: String::new(),
            is_success: false,
            location: None,
            progress: Arc::new(progress),
        }
    }

    /// Replace the current selection. Only the first file is ever uploaded.
    pub fn select(&mut self, files: Vec<SelectedFile>) {
        debug!(count = files.len(), "Selection replaced");
        self.selection = files;
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selection.first()
    }

    /// Message telling the user that all but the first selected file will be ignored.
    pub fn notice(&self) -> Option<String> {
        let first = self.selection.first()?;
        match self.selection.len() - 1 {
            0 => None,
            1 => Some(format!(
                "Only one file can be uploaded at a time. {} will be uploaded, 1 other file was ignored.",
                first.name
            )),
            ignored => Some(format!(
                "Only one file can be uploaded at a time. {} will be uploaded, {ignored} other files were ignored.",
                first.name
            )),
        }
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn is_success(&self) -> bool {
        self.is_success
    }

    /// Location of the last successfully stored file
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    /// Watch progress updates, e.g. to drive a progress bar while [`UploadClient::upload`] runs.
    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    /// Upload the first selected file and return its location.
    ///
    /// With nothing selected this only sets the status line; no request is made. A failure is
    /// final: progress drops back to 0 and nothing is retried.
    #[instrument(skip(self))]
    pub async fn upload(&mut self) -> Result<String, ClientError> {
        let Some(file) = self.selection.first() else {
            self.set_status(NO_FILES_SELECTED, false);
            return Err(ClientError::NoFileSelected);
        };

        self.progress.send_replace(0);
        self.location = None;
        self.status_message = UPLOADING.to_string();
        self.is_success = false;

        info!(file_name = %file.name, size = file.bytes.len(), "Uploading file");

        let result = self.transport.send(file, Arc::clone(&self.progress)).await;
        match result {
            Ok(response) => {
                self.progress.send_replace(100);
                self.set_status(UPLOAD_SUCCEEDED, true);
                self.location = Some(response.s3_url.clone());
                Ok(response.s3_url)
            }
            Err(e) => {
                error!("Error uploading file: {}", e);
                self.progress.send_replace(0);
                self.set_status(UPLOAD_FAILED, false);
                Err(e)
            }
        }
    }

    fn set_status(&mut self, message: &str, is_success: bool) {
        self.status_message = message.to_string();
        self.is_success = is_success;
    }
}
