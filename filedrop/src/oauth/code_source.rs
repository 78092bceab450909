//! Where the authorization code comes from.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use url::Url;

use super::OAuthError;

/// Shows the consent URL to the user and collects the code they paste back.
#[async_trait]
pub trait CodeSource: Send {
    async fn show_url(&mut self, auth_url: &Url) -> Result<(), OAuthError>;

    async fn read_code(&mut self) -> Result<String, OAuthError>;
}

/// Terminal prompt: URL and prompt on stdout, code from one line of stdin. Blocks until a line
/// arrives.
pub struct StdinCodeSource<R = BufReader<Stdin>, W = Stdout> {
    input: R,
    output: W,
}

impl StdinCodeSource {
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for StdinCodeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdinCodeSource<R, W> {
    pub fn with_io(input: R, output: W) -> Self {
        Self { input, output }
    }
}

#[async_trait]
impl<R, W> CodeSource for StdinCodeSource<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn show_url(&mut self, auth_url: &Url) -> Result<(), OAuthError> {
        let line = format!("Authorize this app by visiting this URL: {auth_url}\n");
        self.output.write_all(line.as_bytes()).await.map_err(OAuthError::Input)?;
        self.output.flush().await.map_err(OAuthError::Input)
    }

    async fn read_code(&mut self) -> Result<String, OAuthError> {
        self.output
            .write_all(b"Enter the code from the page here: ")
            .await
            .map_err(OAuthError::Input)?;
        self.output.flush().await.map_err(OAuthError::Input)?;

        let mut line = String::new();
        self.input.read_line(&mut line).await.map_err(OAuthError::Input)?;
        Ok(line.trim().to_string())
    }
}
