use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use crate::config::Config;

/// Destination for the exported file.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `local_path` to `bucket/key`, replacing any existing object.
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()>;
}

/// S3 uploader backed by the AWS SDK.
///
/// Credentials come from the default provider chain (environment, profile,
/// instance role), never from job configuration.
#[derive(Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Create a new S3 store from configuration.
    pub async fn new(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.s3_region.clone()));
        // Custom endpoint (MinIO, R2, etc.)
        if let Some(ref endpoint) = config.s3_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(config.s3_endpoint.is_some())
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .with_context(|| format!("Failed to read {}", local_path.display()))?;

        debug!(bucket = %bucket, key = %key, "Uploading file to S3");

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type("text/csv")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("PutObject s3://{bucket}/{key}: {}", DisplayErrorContext(&e)))?;

        Ok(())
    }
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store").finish_non_exhaustive()
    }
}
