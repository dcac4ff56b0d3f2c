//! The job driver: credentials → client → fetch → transform → CSV → S3.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::credentials::{CredentialSource, Credentials};
use crate::error::EtlError;
use crate::fetch::{try_fetch_posts, FetchError, RetryPolicy};
use crate::s3::ObjectStore;
use crate::sink::{upload_file, write_csv};
use crate::transform::transform;
use crate::twitter::{ApiError, TwitterApi, TwitterClient};

/// Builds the API client once credentials are known.
pub trait ApiConnector: Send + Sync {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn TwitterApi>, ApiError>;
}

impl<F> ApiConnector for F
where
    F: Fn(&Credentials) -> Result<Box<dyn TwitterApi>, ApiError> + Send + Sync,
{
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn TwitterApi>, ApiError> {
        self(credentials)
    }
}

/// Connects a [`TwitterClient`] to the configured API base URL.
#[derive(Debug, Clone)]
pub struct TwitterConnector {
    base_url: String,
    timeout: std::time::Duration,
}

impl TwitterConnector {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            timeout: config.http_timeout,
        }
    }
}

impl ApiConnector for TwitterConnector {
    fn connect(&self, credentials: &Credentials) -> Result<Box<dyn TwitterApi>, ApiError> {
        let client = TwitterClient::new(&self.base_url, credentials, self.timeout)?;
        Ok(Box::new(client))
    }
}

/// A single export run. Every collaborator that reaches outside the process
/// is supplied here, so tests can swap in fakes.
pub struct EtlJob {
    config: Config,
    credentials: Arc<dyn CredentialSource>,
    connector: Arc<dyn ApiConnector>,
    store: Arc<dyn ObjectStore>,
}

impl EtlJob {
    #[must_use]
    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialSource>,
        connector: Arc<dyn ApiConnector>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            credentials,
            connector,
            store,
        }
    }

    /// Run the job once.
    ///
    /// Failures are logged with their kind before being returned; there is no
    /// partial success.
    ///
    /// # Errors
    ///
    /// Any [`EtlError`]; each one means the run failed as a whole.
    pub async fn run(&self) -> Result<usize, EtlError> {
        let result = self.run_steps().await;
        if let Err(ref e) = result {
            error!(kind = e.kind(), error = %e, "Twitter ETL job failed");
        }
        result
    }

    async fn run_steps(&self) -> Result<usize, EtlError> {
        let credentials = Credentials::load(self.credentials.as_ref())?;
        let api = self
            .connector
            .connect(&credentials)
            .map_err(|e| EtlError::Api(e.to_string()))?;

        if self.config.rate_limit_precheck {
            self.check_quota(api.as_ref()).await?;
        }

        let username = &self.config.username;
        let count = self.config.count;
        info!(username = %username, count, "Fetching up to {count} tweets for @{username}");

        let policy = RetryPolicy::from(&self.config);
        let posts = try_fetch_posts(api.as_ref(), username, count, &policy)
            .await
            .map_err(|e| match e {
                FetchError::RetriesExhausted { .. } | FetchError::LookupRateLimited => {
                    EtlError::RateLimitExhausted(e.to_string())
                }
                FetchError::Api(message) => EtlError::Api(message),
            })?;
        if posts.is_empty() {
            return Err(EtlError::NoData);
        }
        info!(fetched = posts.len(), "Fetched {} tweets for @{username}", posts.len());

        let records = transform(posts);
        let rows = write_csv(&records, &self.config.output_path)?;
        upload_file(
            self.store.as_ref(),
            &self.config.output_path,
            &self.config.s3_bucket,
            &self.config.s3_key,
        )
        .await?;

        info!(rows, "Tweets transformed, saved locally, and uploaded to S3");
        Ok(rows)
    }

    /// Best-effort early exit when the quota is already spent. Rate-limit
    /// errors during the fetch remain the authoritative signal.
    async fn check_quota(&self, api: &dyn TwitterApi) -> Result<(), EtlError> {
        info!("Checking rate limits before fetching tweets");
        match api.remaining_quota().await {
            Ok(0) => Err(EtlError::RateLimitExhausted(
                "no requests remaining in the current rate limit window".to_string(),
            )),
            Ok(remaining) => {
                info!(remaining, "Rate limit quota available");
                Ok(())
            }
            // A 429 here is the status endpoint's own limit, not the timeline's.
            Err(e) => {
                warn!(error = %e, "Could not check rate limits, continuing");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for EtlJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtlJob")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
