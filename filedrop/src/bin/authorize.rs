//! Authorize filedrop against Google Drive and store the token locally.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use filedrop::oauth::{GoogleTokenExchange, OAuthError, StdinCodeSource, authorize_to_file};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run the Google Drive OAuth flow and store the resulting token", long_about = None)]
struct Args {
    /// OAuth client credentials downloaded from the Google Cloud console
    #[arg(long, env = "OAUTH_CREDENTIALS_PATH", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Where to write the token
    #[arg(long, env = "OAUTH_TOKEN_PATH", default_value = "token.json")]
    token: PathBuf,
}

async fn run(args: &Args) -> Result<(), OAuthError> {
    let client = reqwest::Client::builder().build()?;
    let exchange = GoogleTokenExchange::new(client);

    authorize_to_file(&args.credentials, &args.token, exchange, &mut StdinCodeSource::new()).await?;
    println!("Token stored to {}", args.token.display());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Logs go to stderr so they never interleave with the prompt
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!("{:?}", args);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ (OAuthError::Exchange { .. } | OAuthError::Request(_))) => {
            eprintln!("Error retrieving access token: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
