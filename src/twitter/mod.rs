//! Twitter API access: the client seam used by the fetcher and its HTTP implementation.

mod client;
mod models;

use async_trait::async_trait;
use thiserror::Error;

pub use client::TwitterClient;
pub use models::{Post, TweetPage};

/// Errors surfaced by a [`TwitterApi`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// HTTP 429: the request quota for the current window is used up.
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("{0}")]
    Other(String),
}

/// The two timeline operations the job needs, plus the quota check.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    /// Resolve a username to a user id. `Ok(None)` if the account does not exist.
    async fn lookup_user_id(&self, username: &str) -> Result<Option<String>, ApiError>;

    /// Fetch one page (at most 100 posts) of a user's timeline, excluding
    /// replies and retweets.
    async fn user_tweets(
        &self,
        user_id: &str,
        max_results: usize,
        pagination_token: Option<&str>,
    ) -> Result<TweetPage, ApiError>;

    /// Requests left in the current window for the user timeline endpoint.
    async fn remaining_quota(&self) -> Result<u32, ApiError>;
}
