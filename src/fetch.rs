//! Paginated timeline fetch with exponential backoff on rate limiting.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::constants::MAX_PAGE_SIZE;
use crate::twitter::{ApiError, Post, TwitterApi};

/// How long and how often to wait out a rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_wait: Duration::from_secs(60),
        }
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_wait: config.initial_wait,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("max retries ({retries}) reached while rate limited")]
    RetriesExhausted { retries: u32 },
    #[error("user lookup was rate limited")]
    LookupRateLimited,
    #[error("{0}")]
    Api(String),
}

/// Wait before retry number `attempt` (1-based): `initial * 2^(attempt - 1)`.
#[must_use]
pub fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    initial.saturating_mul(1u32 << exponent)
}

/// Fetch up to `count` posts for `username`.
///
/// Any failure, including running out of retries, yields an empty sequence and
/// discards whatever was already gathered. A missing account is also empty.
pub async fn fetch_posts(
    api: &dyn TwitterApi,
    username: &str,
    count: i64,
    policy: &RetryPolicy,
) -> Vec<Post> {
    try_fetch_posts(api, username, count, policy)
        .await
        .unwrap_or_default()
}

/// Like [`fetch_posts`], but reports why nothing was returned.
///
/// `Ok(vec![])` means the account is missing or has no posts.
///
/// # Errors
///
/// Returns [`FetchError::RetriesExhausted`] once `max_retries` rate-limited
/// attempts have been made and [`FetchError::Api`] on the first other failure.
/// Partial results are dropped in both cases.
pub async fn try_fetch_posts(
    api: &dyn TwitterApi,
    username: &str,
    count: i64,
    policy: &RetryPolicy,
) -> Result<Vec<Post>, FetchError> {
    let target = match usize::try_from(count) {
        Ok(n) if n > 0 => n,
        _ => return Ok(Vec::new()),
    };

    let user_id = match api.lookup_user_id(username).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            warn!(username, "User not found");
            return Ok(Vec::new());
        }
        Err(ApiError::RateLimited) => {
            error!(username, "Rate limited while looking up user");
            return Err(FetchError::LookupRateLimited);
        }
        Err(ApiError::Other(message)) => {
            error!(username, error = %message, "Error looking up user");
            return Err(FetchError::Api(message));
        }
    };
    debug!(username, user_id = %user_id, "Resolved user");

    let mut posts: Vec<Post> = Vec::new();
    let mut remaining = target;
    let mut next_token: Option<String> = None;
    let mut retries = 0u32;

    while remaining > 0 && retries < policy.max_retries {
        let batch_size = remaining.min(MAX_PAGE_SIZE);
        match api
            .user_tweets(&user_id, batch_size, next_token.as_deref())
            .await
        {
            Ok(page) => {
                if page.posts.is_empty() {
                    info!("No tweets found");
                    break;
                }
                remaining = remaining.saturating_sub(page.posts.len());
                posts.extend(page.posts);
                next_token = page.next_token;
                debug!(fetched = posts.len(), remaining, "Fetched page");
                if next_token.is_none() || posts.len() >= target {
                    break;
                }
            }
            Err(ApiError::RateLimited) => {
                retries += 1;
                let wait = backoff_delay(policy.initial_wait, retries);
                warn!(
                    retry = retries,
                    max_retries = policy.max_retries,
                    wait_secs = wait.as_secs_f64(),
                    "Rate limit hit, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            }
            Err(ApiError::Other(message)) => {
                error!(error = %message, "Twitter API error");
                return Err(FetchError::Api(message));
            }
        }
    }

    if retries >= policy.max_retries {
        error!(
            max_retries = policy.max_retries,
            discarded = posts.len(),
            "Max retries reached, no more attempts"
        );
        return Err(FetchError::RetriesExhausted { retries });
    }

    posts.truncate(target);
    Ok(posts)
}
