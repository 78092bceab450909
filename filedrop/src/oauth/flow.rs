//! The authorization flow as a state machine.
//!
//! ```text
//! AwaitingUserVisit { auth_url } --UrlShown--> AwaitingCode --CodeEntered(code)--> Complete(token)
//! ```
//!
//! A failed exchange leaves the flow in `AwaitingCode`; nothing is retried on its own.

use std::path::Path;

use tracing::{info, warn};
use url::Url;

use super::{ClientCredentials, CodeSource, OAuthError, OAuthToken, TokenExchange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    AwaitingUserVisit { auth_url: Url },
    AwaitingCode,
    Complete(OAuthToken),
}

impl FlowState {
    fn name(&self) -> &'static str {
        match self {
            FlowState::AwaitingUserVisit { .. } => "awaiting user visit",
            FlowState::AwaitingCode => "awaiting code",
            FlowState::Complete(_) => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowMessage {
    /// The consent URL has been shown to the user
    UrlShown,
    /// The user entered the code from the consent page
    CodeEntered(String),
}

impl FlowMessage {
    fn name(&self) -> &'static str {
        match self {
            FlowMessage::UrlShown => "UrlShown",
            FlowMessage::CodeEntered(_) => "CodeEntered",
        }
    }
}

pub struct AuthorizationFlow<E> {
    credentials: ClientCredentials,
    exchange: E,
    state: FlowState,
}

impl<E: TokenExchange> AuthorizationFlow<E> {
    /// Start a flow in `AwaitingUserVisit` with the consent URL for `credentials`.
    pub fn new(credentials: ClientCredentials, exchange: E) -> Result<Self, OAuthError> {
        let auth_url = credentials.authorization_url()?;
        Ok(Self {
            credentials,
            exchange,
            state: FlowState::AwaitingUserVisit { auth_url },
        })
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Apply one message. Messages the current state does not expect are rejected and leave the
    /// state untouched.
    pub async fn handle(&mut self, message: FlowMessage) -> Result<&FlowState, OAuthError> {
        match (&self.state, message) {
            (FlowState::AwaitingUserVisit { .. }, FlowMessage::UrlShown) => {
                self.state = FlowState::AwaitingCode;
            }
            (FlowState::AwaitingCode, FlowMessage::CodeEntered(code)) => {
                let code = code.trim();
                if code.is_empty() {
                    return Err(OAuthError::EmptyCode);
                }
                match self.exchange.exchange(&self.credentials, code).await {
                    Ok(token) => {
                        info!("Authorization code exchanged for a token");
                        self.state = FlowState::Complete(token);
                    }
                    Err(e) => {
                        warn!("Token exchange failed: {}", e);
                        return Err(e);
                    }
                }
            }
            (state, message) => {
                return Err(OAuthError::UnexpectedMessage {
                    state: state.name(),
                    message: message.name(),
                });
            }
        }
        Ok(&self.state)
    }

    /// The token, once the flow is complete.
    pub fn into_token(self) -> Option<OAuthToken> {
        match self.state {
            FlowState::Complete(token) => Some(token),
            _ => None,
        }
    }
}

/// Drive a fresh flow to completion: show the URL, read one code, exchange it.
pub async fn authorize<E, C>(mut flow: AuthorizationFlow<E>, codes: &mut C) -> Result<OAuthToken, OAuthError>
where
    E: TokenExchange,
    C: CodeSource,
{
    if let FlowState::AwaitingUserVisit { auth_url } = flow.state() {
        codes.show_url(auth_url).await?;
    }
    flow.handle(FlowMessage::UrlShown).await?;

    let code = codes.read_code().await?;
    flow.handle(FlowMessage::CodeEntered(code)).await?;

    let state = flow.state().name();
    flow.into_token().ok_or(OAuthError::UnexpectedMessage {
        state,
        message: "CodeEntered",
    })
}

/// Load client credentials, run the flow and write the token to `token_path`.
///
/// The token file is only written once the exchange succeeds; any earlier failure leaves
/// `token_path` untouched.
pub async fn authorize_to_file<E, C>(
    credentials_path: &Path,
    token_path: &Path,
    exchange: E,
    codes: &mut C,
) -> Result<OAuthToken, OAuthError>
where
    E: TokenExchange,
    C: CodeSource,
{
    let credentials = ClientCredentials::load(credentials_path).await?;
    let flow = AuthorizationFlow::new(credentials, exchange)?;

    let token = authorize(flow, codes).await?;
    token.save(token_path).await?;
    info!(path = %token_path.display(), "Token stored");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Exchange that records codes and answers with a fixed outcome.
    #[derive(Clone, Default)]
    struct FakeExchange {
        codes: Arc<Mutex<Vec<String>>>,
        reject: bool,
    }

    #[async_trait]
    impl TokenExchange for FakeExchange {
        async fn exchange(&self, _credentials: &ClientCredentials, code: &str) -> Result<OAuthToken, OAuthError> {
            self.codes.lock().unwrap().push(code.to_string());
            if self.reject {
                return Err(OAuthError::Exchange {
                    status: 400,
                    message: "invalid_grant".to_string(),
                });
            }
            Ok(token())
        }
    }

    /// Code source with a canned answer that remembers the URL it was shown.
    struct ScriptedCodeSource {
        code: String,
        shown: Option<Url>,
    }

    #[async_trait]
    impl CodeSource for ScriptedCodeSource {
        async fn show_url(&mut self, auth_url: &Url) -> Result<(), OAuthError> {
            self.shown = Some(auth_url.clone());
            Ok(())
        }

        async fn read_code(&mut self) -> Result<String, OAuthError> {
            Ok(self.code.clone())
        }
    }

    fn token() -> OAuthToken {
        OAuthToken {
            access_token: "ya29.access".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            scope: None,
            token_type: Some("Bearer".to_string()),
            id_token: None,
            expiry_date: None,
        }
    }

    fn credentials() -> ClientCredentials {
        ClientCredentials::from_json(
            r#"{"installed": {"client_id": "id", "client_secret": "secret", "redirect_uris": ["http://localhost"]}}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_happy_path_transitions() {
        let mut flow = AuthorizationFlow::new(credentials(), FakeExchange::default()).unwrap();
        assert!(matches!(flow.state(), FlowState::AwaitingUserVisit { auth_url } if auth_url.as_str().contains("drive.file")));

        assert_eq!(flow.handle(FlowMessage::UrlShown).await.unwrap(), &FlowState::AwaitingCode);

        let state = flow.handle(FlowMessage::CodeEntered("4/code".to_string())).await.unwrap();
        assert_eq!(state, &FlowState::Complete(token()));
    }

    #[tokio::test]
    async fn test_code_before_url_is_rejected() {
        let exchange = FakeExchange::default();
        let mut flow = AuthorizationFlow::new(credentials(), exchange.clone()).unwrap();

        let result = flow.handle(FlowMessage::CodeEntered("4/code".to_string())).await;

        assert!(matches!(
            result,
            Err(OAuthError::UnexpectedMessage {
                state: "awaiting user visit",
                message: "CodeEntered"
            })
        ));
        assert!(matches!(flow.state(), FlowState::AwaitingUserVisit { .. }));
        assert!(exchange.codes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_messages_after_completion_are_rejected() {
        let mut flow = AuthorizationFlow::new(credentials(), FakeExchange::default()).unwrap();
        flow.handle(FlowMessage::UrlShown).await.unwrap();
        flow.handle(FlowMessage::CodeEntered("4/code".to_string())).await.unwrap();

        assert!(flow.handle(FlowMessage::UrlShown).await.is_err());
        assert!(flow.handle(FlowMessage::CodeEntered("again".to_string())).await.is_err());
        assert_eq!(flow.into_token(), Some(token()));
    }

    #[tokio::test]
    async fn test_failed_exchange_stays_awaiting_code() {
        let exchange = FakeExchange {
            reject: true,
            ..Default::default()
        };
        let mut flow = AuthorizationFlow::new(credentials(), exchange.clone()).unwrap();
        flow.handle(FlowMessage::UrlShown).await.unwrap();

        let result = flow.handle(FlowMessage::CodeEntered("bad".to_string())).await;

        assert!(matches!(result, Err(OAuthError::Exchange { status: 400, .. })));
        assert_eq!(flow.state(), &FlowState::AwaitingCode);
        assert_eq!(*exchange.codes.lock().unwrap(), vec!["bad".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_code_is_not_exchanged() {
        let exchange = FakeExchange::default();
        let mut flow = AuthorizationFlow::new(credentials(), exchange.clone()).unwrap();
        flow.handle(FlowMessage::UrlShown).await.unwrap();

        let result = flow.handle(FlowMessage::CodeEntered("   ".to_string())).await;

        assert!(matches!(result, Err(OAuthError::EmptyCode)));
        assert!(exchange.codes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_authorize_shows_url_then_exchanges_code() {
        let exchange = FakeExchange::default();
        let flow = AuthorizationFlow::new(credentials(), exchange.clone()).unwrap();
        let mut codes = ScriptedCodeSource {
            code: "4/code".to_string(),
            shown: None,
        };

        let stored = authorize(flow, &mut codes).await.unwrap();

        assert_eq!(stored, token());
        let shown = codes.shown.unwrap();
        assert!(shown.as_str().contains("access_type=offline"));
        assert_eq!(*exchange.codes.lock().unwrap(), vec!["4/code".to_string()]);
    }

    async fn write_credentials(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("credentials.json");
        tokio::fs::write(
            &path,
            r#"{"installed": {"client_id": "id", "client_secret": "secret", "redirect_uris": ["http://localhost"]}}"#,
        )
        .await
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_authorize_to_file_writes_token() {
        let dir = tempfile::tempdir().unwrap();
        let credentials_path = write_credentials(dir.path()).await;
        let token_path = dir.path().join("token.json");
        let mut codes = ScriptedCodeSource {
            code: "4/code".to_string(),
            shown: None,
        };

        let stored = authorize_to_file(&credentials_path, &token_path, FakeExchange::default(), &mut codes)
            .await
            .unwrap();

        let json = tokio::fs::read_to_string(&token_path).await.unwrap();
        assert_eq!(serde_json::from_str::<OAuthToken>(&json).unwrap(), stored);
        assert_eq!(stored, token());
    }

    #[tokio::test]
    async fn test_failed_exchange_writes_no_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let credentials_path = write_credentials(dir.path()).await;
        let token_path = dir.path().join("token.json");
        let exchange = FakeExchange {
            reject: true,
            ..Default::default()
        };
        let mut codes = ScriptedCodeSource {
            code: "bad".to_string(),
            shown: None,
        };

        let result = authorize_to_file(&credentials_path, &token_path, exchange.clone(), &mut codes).await;

        assert!(matches!(result, Err(OAuthError::Exchange { status: 400, .. })));
        assert!(!token_path.exists());
        assert_eq!(*exchange.codes.lock().unwrap(), vec!["bad".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_credentials_file_makes_no_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let exchange = FakeExchange::default();
        let mut codes = ScriptedCodeSource {
            code: "4/code".to_string(),
            shown: None,
        };

        let result = authorize_to_file(&dir.path().join("missing.json"), &token_path, exchange.clone(), &mut codes).await;

        assert!(matches!(result, Err(OAuthError::ReadCredentials { .. })));
        assert!(codes.shown.is_none());
        assert!(exchange.codes.lock().unwrap().is_empty());
        assert!(!token_path.exists());
    }
}
