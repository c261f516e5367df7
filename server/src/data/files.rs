//! Object storage for emergency photo attachments
//!
//! Talks to any S3-compatible service (MinIO in development). Keys are
//! written by mobile clients through their own upload path; the gateway only
//! turns stored keys into time-limited download URLs.

use std::time::Duration;

use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use thiserror::Error;

use crate::core::config::S3Config;

/// Fixed region; S3-compatible services ignore it but the SDK requires one
const S3_REGION: &str = "us-east-1";

/// Lifetime of presigned download URLs
const PRESIGN_TTL_SECS: u64 = 3600;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// S3-backed storage service
#[derive(Debug, Clone)]
pub struct StorageService {
    client: Client,
    bucket: String,
}

impl StorageService {
    /// Build the S3 client from configuration
    pub async fn new(config: &S3Config) -> Result<Self, StorageError> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "beacon-config",
        );

        let base = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(S3_REGION))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&base)
            .endpoint_url(config.endpoint.clone())
            // Required for most S3-compatible services
            .force_path_style(true)
            .build();

        let client = Client::from_conf(s3_config);

        tracing::debug!(
            bucket = %config.bucket_name,
            endpoint = %config.endpoint,
            "S3 storage initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket_name.clone(),
        })
    }

    /// Presigned download URL for a stored object key
    pub async fn presigned_url(&self, key: &str) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(Duration::from_secs(PRESIGN_TTL_SECS))
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(request.uri().to_string())
    }
}
