//! Upload one file to a running filedrop server from the terminal.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use filedrop::client::{ReqwestTransport, SelectedFile, UploadClient};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about = "Upload a file through a filedrop server", long_about = None)]
struct Args {
    /// File to upload
    file: PathBuf,

    /// Base URL of the filedrop server
    #[arg(long, env = "UPLOAD_SERVER_URL", default_value = "http://localhost:3000/")]
    server: Url,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let file = SelectedFile::from_path(&args.file).await?;
    let mut client = UploadClient::new(ReqwestTransport::new(&args.server)?);
    client.select(vec![file]);

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos:>3}%")
            .context("Invalid progress bar template")?
            .progress_chars("=> "),
    );
    bar.set_message(args.file.display().to_string());
    bar.enable_steady_tick(Duration::from_millis(100));

    let mut progress = client.subscribe();
    let watcher = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                bar.set_position(u64::from(*progress.borrow_and_update()));
            }
        })
    };

    let result = client.upload().await;
    bar.set_position(u64::from(client.progress()));
    bar.finish_and_clear();
    let status = client.status_message().to_string();
    drop(client);
    let _ = watcher.await;

    match result {
        Ok(location) => {
            println!("{status}");
            println!("{location}");
            Ok(())
        }
        Err(e) => {
            eprintln!("{status}");
            Err(e.into())
        }
    }
}
