//! Client credentials as downloaded from the Google Cloud console (`credentials.json`).

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use super::{DRIVE_FILE_SCOPE, OAuthError};

fn default_auth_uri() -> Url {
    Url::parse("https://accounts.google.com/o/oauth2/v2/auth").expect("static URL is valid")
}

fn default_token_uri() -> Url {
    Url::parse("https://oauth2.googleapis.com/token").expect("static URL is valid")
}

#[derive(Deserialize)]
struct CredentialsFile {
    installed: Option<ClientCredentials>,
    web: Option<ClientCredentials>,
}

/// OAuth client identity plus the endpoints it talks to.
#[derive(Clone, Deserialize)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: Url,
    #[serde(default = "default_token_uri")]
    pub token_uri: Url,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uris", &self.redirect_uris)
            .field("auth_uri", &self.auth_uri.as_str())
            .field("token_uri", &self.token_uri.as_str())
            .finish()
    }
}

impl ClientCredentials {
    /// Parse a credentials file. The `installed` section wins over `web` when both exist.
    pub fn from_json(json: &str) -> Result<Self, OAuthError> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(OAuthError::ParseCredentials)?;
        file.installed.or(file.web).ok_or(OAuthError::MissingClientSection)
    }

    pub async fn load(path: &Path) -> Result<Self, OAuthError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|source| OAuthError::ReadCredentials {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The first registered redirect URI; it is sent with both the consent URL and the exchange.
    pub fn redirect_uri(&self) -> Result<&str, OAuthError> {
        self.redirect_uris.first().map(String::as_str).ok_or(OAuthError::MissingRedirectUri)
    }

    /// Consent page URL asking for offline access to [`DRIVE_FILE_SCOPE`].
    pub fn authorization_url(&self) -> Result<Url, OAuthError> {
        let redirect_uri = self.redirect_uri()?;
        let mut url = self.auth_uri.clone();
        url.query_pairs_mut()
            .append_pair("access_type", "offline")
            .append_pair("scope", DRIVE_FILE_SCOPE)
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "1234.apps.googleusercontent.com",
            "project_id": "filedrop",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "shh",
            "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob", "http://localhost"]
        }
    }"#;

    #[test]
    fn test_installed_section() {
        let credentials = ClientCredentials::from_json(INSTALLED).unwrap();

        assert_eq!(credentials.client_id, "1234.apps.googleusercontent.com");
        assert_eq!(credentials.client_secret, "shh");
        assert_eq!(credentials.redirect_uri().unwrap(), "urn:ietf:wg:oauth:2.0:oob");
        assert_eq!(credentials.auth_uri.as_str(), "https://accounts.google.com/o/oauth2/auth");
    }

    #[test]
    fn test_web_section_with_default_endpoints() {
        let credentials = ClientCredentials::from_json(
            r#"{"web": {"client_id": "web-id", "client_secret": "web-secret", "redirect_uris": ["https://example.com/cb"]}}"#,
        )
        .unwrap();

        assert_eq!(credentials.client_id, "web-id");
        assert_eq!(credentials.token_uri.as_str(), "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_installed_wins_over_web() {
        let credentials = ClientCredentials::from_json(
            r#"{
                "installed": {"client_id": "installed-id", "client_secret": "a", "redirect_uris": ["http://localhost"]},
                "web": {"client_id": "web-id", "client_secret": "b", "redirect_uris": ["http://localhost"]}
            }"#,
        )
        .unwrap();

        assert_eq!(credentials.client_id, "installed-id");
    }

    #[test]
    fn test_missing_sections_and_malformed_json() {
        assert!(matches!(
            ClientCredentials::from_json(r#"{"other": {}}"#),
            Err(OAuthError::MissingClientSection)
        ));
        assert!(matches!(
            ClientCredentials::from_json("not json"),
            Err(OAuthError::ParseCredentials(_))
        ));
    }

    #[test]
    fn test_authorization_url() {
        let credentials = ClientCredentials::from_json(INSTALLED).unwrap();

        let url = credentials.authorization_url().unwrap();
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(query["access_type"], "offline");
        assert_eq!(query["scope"], DRIVE_FILE_SCOPE);
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["client_id"], "1234.apps.googleusercontent.com");
        assert_eq!(query["redirect_uri"], "urn:ietf:wg:oauth:2.0:oob");
    }

    #[test]
    fn test_authorization_url_requires_redirect_uri() {
        let credentials =
            ClientCredentials::from_json(r#"{"web": {"client_id": "id", "client_secret": "secret"}}"#).unwrap();

        assert!(matches!(credentials.authorization_url(), Err(OAuthError::MissingRedirectUri)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credentials = ClientCredentials::from_json(INSTALLED).unwrap();

        assert!(!format!("{credentials:?}").contains("shh"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let result = ClientCredentials::load(&dir.path().join("credentials.json")).await;

        assert!(matches!(result, Err(OAuthError::ReadCredentials { .. })));
    }
}
