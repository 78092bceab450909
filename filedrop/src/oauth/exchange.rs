//! Authorization code to token exchange.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::token::TokenResponse;
use super::{ClientCredentials, OAuthError, OAuthToken};

/// Trades an authorization code for a token.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, credentials: &ClientCredentials, code: &str) -> Result<OAuthToken, OAuthError>;
}

/// Error body of the token endpoint (RFC 6749 section 5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Posts the code to the credential's `token_uri` as a form.
pub struct GoogleTokenExchange {
    client: Client,
}

impl GoogleTokenExchange {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenExchange for GoogleTokenExchange {
    #[instrument(skip_all, fields(token_uri = %credentials.token_uri))]
    async fn exchange(&self, credentials: &ClientCredentials, code: &str) -> Result<OAuthToken, OAuthError> {
        let redirect_uri = credentials.redirect_uri()?;
        let form = [
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self.client.post(credentials.token_uri.clone()).form(&form).send().await?;
        let status = response.status();
        debug!(%status, "Token endpoint responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(TokenErrorResponse {
                    error,
                    error_description: Some(description),
                }) => format!("{error}: {description}"),
                Ok(TokenErrorResponse { error, .. }) => error,
                Err(_) => body,
            };
            return Err(OAuthError::Exchange {
                status: status.as_u16(),
                message,
            });
        }

        let received_at = Utc::now();
        let token: TokenResponse = response.json().await?;
        Ok(OAuthToken::from_response(token, received_at))
    }
}
