//! One-shot OAuth 2.0 authorization-code flow for Google Drive.
//!
//! Used by the `filedrop-authorize` binary: load client credentials, show the consent URL, read
//! the code the user pastes back, exchange it for a token and write the token to disk. The flow
//! itself is an [`AuthorizationFlow`] state machine driven by [`FlowMessage`]s; terminal input
//! and the token endpoint sit behind the [`CodeSource`] and [`TokenExchange`] traits.
//!
//! The stored token is not read by the upload server.

mod code_source;
mod credentials;
mod exchange;
mod flow;
mod token;

pub use code_source::{CodeSource, StdinCodeSource};
pub use credentials::ClientCredentials;
pub use exchange::{GoogleTokenExchange, TokenExchange};
pub use flow::{AuthorizationFlow, FlowMessage, FlowState, authorize, authorize_to_file};
pub use token::OAuthToken;

use std::path::PathBuf;
use thiserror::Error;

/// Access requested from the user: files this app creates or opens in Drive.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("failed to read credentials from {}: {source}", path.display())]
    ReadCredentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials file: {0}")]
    ParseCredentials(#[source] serde_json::Error),

    #[error("credentials file has neither an 'installed' nor a 'web' section")]
    MissingClientSection,

    #[error("credentials file lists no redirect URI")]
    MissingRedirectUri,

    #[error("invalid authorization endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("no authorization code entered")]
    EmptyCode,

    #[error("failed to read authorization code: {0}")]
    Input(#[source] std::io::Error),

    /// A message arrived that the current state does not accept
    #[error("cannot handle {message} while {state}")]
    UnexpectedMessage { state: &'static str, message: &'static str },

    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The token endpoint refused the code
    #[error("token endpoint answered {status}: {message}")]
    Exchange { status: u16, message: String },

    #[error("failed to write token to {}: {source}", path.display())]
    WriteToken {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode token: {0}")]
    EncodeToken(#[source] serde_json::Error),
}
