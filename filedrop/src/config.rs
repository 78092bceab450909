//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `FILEDROP_CONFIG`
//! environment variable. A missing file is not an error: every field has a default, except that
//! validation requires a bucket name.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `FILEDROP_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `FILEDROP_STORAGE__BUCKET=my-uploads` sets the `storage.bucket` field.
//!
//! Storage credentials are normally *not* part of this file: when `storage.access_key_id` is
//! unset, the AWS SDK default chain picks up `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`
//! once, when the application starts.
//!
//! ## Environment Variable Examples
//!
//! ```bash
//! FILEDROP_PORT=8080
//! FILEDROP_STORAGE__BUCKET=thegroveryfiles
//! FILEDROP_STORAGE__PRESIGN_EXPIRY=1h
//! FILEDROP_LIMITS__MAX_UPLOAD_SIZE=10485760
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// S3 refuses pre-signed URLs that live longer than a week.
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "FILEDROP_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Object storage the upload endpoint writes into
    pub storage: StorageConfig,
    /// Request size limits
    pub limits: LimitsConfig,
    /// CORS settings, only needed when the client is hosted on another origin
    pub security: SecurityConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Bucket every upload lands in
    pub bucket: String,
    /// AWS region of the bucket
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, R2, LocalStack...). Locations are path-style when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<Url>,
    /// Address objects as `{endpoint}/{bucket}/{key}` on the wire
    pub force_path_style: bool,
    /// Base URL to build public locations from instead of the bucket host (e.g. a CDN)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<Url>,
    /// When set, uploads return a pre-signed GET URL valid for this long instead of a public URL
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub presign_expiry: Option<Duration>,
    /// Static access key id. Falls back to the AWS default credential chain when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    /// Static secret access key, required when `access_key_id` is set
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
            public_base_url: None,
            presign_expiry: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest request body accepted by the upload endpoint, in bytes
    pub max_upload_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins allowed to call the API. Empty means same-origin only.
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache duration for preflight requests in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            storage: StorageConfig::default(),
            limits: LimitsConfig::default(),
            security: SecurityConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.storage.bucket.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "Config validation: storage.bucket must be set (or FILEDROP_STORAGE__BUCKET)".to_string(),
            });
        }

        if self.limits.max_upload_size == 0 {
            return Err(Error::InvalidConfig {
                message: "Config validation: limits.max_upload_size must be greater than 0".to_string(),
            });
        }

        if let Some(expiry) = self.storage.presign_expiry {
            if expiry.is_zero() || expiry > MAX_PRESIGN_EXPIRY {
                return Err(Error::InvalidConfig {
                    message: format!(
                        "Config validation: storage.presign_expiry must be between 1s and 7 days, got {}s",
                        expiry.as_secs()
                    ),
                });
            }
        }

        if self.storage.access_key_id.is_some() != self.storage.secret_access_key.is_some() {
            return Err(Error::InvalidConfig {
                message: "Config validation: storage.access_key_id and storage.secret_access_key must be set together".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // FILEDROP_CONFIG names the file itself, it is not a config key
            .merge(Env::prefixed("FILEDROP_").ignore(&["CONFIG"]).split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
