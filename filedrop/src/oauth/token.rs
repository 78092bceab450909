//! The token written to `token.json`.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::OAuthError;

/// Raw token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Stored credentials. `expiry_date` is milliseconds since the epoch on disk, as Google client
/// libraries expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option", skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Build the stored token from an endpoint response received at `received_at`.
    pub(crate) fn from_response(response: TokenResponse, received_at: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            scope: response.scope,
            token_type: response.token_type,
            id_token: response.id_token,
            expiry_date: response.expires_in.map(|secs| received_at + Duration::seconds(secs)),
        }
    }

    pub async fn save(&self, path: &Path) -> Result<(), OAuthError> {
        let json = serde_json::to_string(self).map_err(OAuthError::EncodeToken)?;
        tokio::fs::write(path, json).await.map_err(|source| OAuthError::WriteToken {
            path: path.to_path_buf(),
            source,
        })
    }
}
