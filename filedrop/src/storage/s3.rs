//! S3 implementation of [`ObjectStore`].

use std::time::Duration;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    config::{Region, http::HttpResponse},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::put_object::PutObjectError,
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use tracing::{debug, info, instrument};
use url::Url;

use super::{ObjectStore, PutObjectRequest, StorageError, validate_key};
use crate::config::StorageConfig;

/// How the location returned for an uploaded object is built.
#[derive(Debug, Clone)]
pub enum LocationStyle {
    /// Plain URL under `base`, which already points at the bucket root
    Public { base: Url },
    /// Pre-signed GET URL valid for `expires_in`
    Presigned { expires_in: Duration },
}

pub struct S3Uploader {
    client: Client,
    bucket: String,
    locations: LocationStyle,
}

impl S3Uploader {
    pub fn new(client: Client, bucket: impl Into<String>, locations: LocationStyle) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            locations,
        }
    }

    /// Build the SDK client once from configuration.
    ///
    /// Static credentials from the config win; otherwise the SDK default chain is used, which
    /// reads `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` from the environment. SDK retries are
    /// turned off so that every failure surfaces on the first attempt.
    pub async fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(aws_config::retry::RetryConfig::disabled());

        if let (Some(access_key_id), Some(secret_access_key)) = (&config.access_key_id, &config.secret_access_key) {
            debug!("Using static storage credentials from configuration");
            loader = loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                None,
                None,
                "filedrop-config",
            ));
        }

        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(config.force_path_style || config.endpoint_url.is_some());
        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint.as_str().trim_end_matches('/'));
        }
        let client = Client::from_conf(builder.build());

        let locations = match config.presign_expiry {
            Some(expires_in) => LocationStyle::Presigned { expires_in },
            None => LocationStyle::Public {
                base: public_base_url(config)?,
            },
        };

        info!(bucket = %config.bucket, region = %config.region, ?locations, "Storage client configured");

        Ok(Self::new(client, config.bucket.clone(), locations))
    }

    async fn location(&self, key: &str) -> Result<String, StorageError> {
        match &self.locations {
            LocationStyle::Public { base } => Ok(object_url(base, key).to_string()),
            LocationStyle::Presigned { expires_in } => {
                let presigning = PresigningConfig::expires_in(*expires_in).map_err(|e| StorageError::Presign { message: e.to_string() })?;
                let request = self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .presigned(presigning)
                    .await
                    .map_err(|e| StorageError::Presign {
                        message: DisplayErrorContext(&e).to_string(),
                    })?;
                Ok(request.uri().to_string())
            }
        }
    }
}

#[async_trait]
impl ObjectStore for S3Uploader {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip_all, fields(bucket = %self.bucket, key = %request.key, size = request.body.len()))]
    async fn put_object(&self, request: PutObjectRequest) -> Result<String, StorageError> {
        validate_key(&request.key)?;
        let content_length = request.body.len() as i64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .content_length(content_length)
            .body(ByteStream::from(request.body))
            .send()
            .await
            .map_err(classify_put_error)?;

        debug!("Object written");
        self.location(&request.key).await
    }
}

/// Map an SDK failure onto the failure classes callers care about.
fn classify_put_error(err: SdkError<PutObjectError, HttpResponse>) -> StorageError {
    let message = DisplayErrorContext(&err).to_string();

    if matches!(err, SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)) {
        return StorageError::Unreachable { message };
    }

    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_owned);
    let status = err.raw_response().map(|r| r.status().as_u16());

    match (code.as_deref(), status) {
        (Some("InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AccessDenied" | "ExpiredToken" | "InvalidToken"), _) => {
            StorageError::Credentials { message }
        }
        (Some("NoSuchBucket" | "PermanentRedirect"), _) => StorageError::Unreachable { message },
        (Some("EntityTooLarge"), _) | (None, Some(413)) => StorageError::PayloadTooLarge { message },
        (None, Some(401 | 403)) => StorageError::Credentials { message },
        _ => StorageError::Other { message },
    }
}

/// Root URL objects of the configured bucket are publicly reachable under.
///
/// - `public_base_url` when configured (CDN or website endpoint)
/// - `{endpoint_url}/{bucket}` for custom S3-compatible endpoints
/// - the AWS virtual-hosted bucket host otherwise (`us-east-1` uses the legacy global host)
pub fn public_base_url(config: &StorageConfig) -> Result<Url, url::ParseError> {
    if let Some(base) = &config.public_base_url {
        return Ok(base.clone());
    }

    if let Some(endpoint) = &config.endpoint_url {
        return Ok(object_url(endpoint, &config.bucket));
    }

    let host = if config.region == "us-east-1" {
        format!("https://{}.s3.amazonaws.com/", config.bucket)
    } else {
        format!("https://{}.s3.{}.amazonaws.com/", config.bucket, config.region)
    };
    Url::parse(&host)
}

/// Append `key` to `base`, percent-encoding each `/`-separated segment. Only keys accepted by
/// [`validate_key`](super::validate_key) round-trip.
pub fn object_url(base: &Url, key: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(key.split('/'));
    }
    url
}
