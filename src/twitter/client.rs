use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, info};
use url::Url;

use super::models::{TimelineResponse, TweetPage, UserLookupResponse};
use super::{ApiError, TwitterApi};
use crate::constants::{MAX_PAGE_SIZE, USER_AGENT};
use crate::credentials::Credentials;

/// Fields requested for every post.
const TWEET_FIELDS: &str = "created_at,public_metrics";

/// Timeline entries we skip.
const EXCLUDE: &str = "replies,retweets";

/// Rate-limit resource covering the user timeline endpoint.
const TIMELINE_RESOURCE: &str = "/users/:id/tweets";

/// The timeline endpoint rejects `max_results` below this.
const MIN_PAGE_SIZE: usize = 5;

/// Twitter API v2 client using app-only bearer authentication.
#[derive(Clone)]
pub struct TwitterClient {
    client: Client,
    base_url: Url,
    bearer_token: String,
}

impl TwitterClient {
    /// Create a client talking to `base_url` (e.g. `https://api.twitter.com`).
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Other(format!("invalid API base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Other(format!(
                "API base URL '{base_url}' cannot carry a path"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            bearer_token: credentials.bearer_token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<Response, ApiError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.bearer_token)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Other(format!("GET {url}: {e}")))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        Ok(response)
    }
}

#[async_trait]
impl TwitterApi for TwitterClient {
    async fn lookup_user_id(&self, username: &str) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["2", "users", "by", "username", username]);
        let response = self.get(url, &[]).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(failed_status(response).await);
        }

        let body: UserLookupResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Other(format!("failed to parse user lookup: {e}")))?;

        if let Some(user) = body.data {
            return Ok(Some(user.id));
        }
        match body.errors.iter().find(|p| !p.is_not_found()) {
            Some(problem) => Err(ApiError::Other(problem.describe())),
            None => Ok(None),
        }
    }

    async fn user_tweets(
        &self,
        user_id: &str,
        max_results: usize,
        pagination_token: Option<&str>,
    ) -> Result<TweetPage, ApiError> {
        let url = self.endpoint(&["2", "users", user_id, "tweets"]);
        let max_results = max_results.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE).to_string();

        let mut query = vec![
            ("max_results", max_results.as_str()),
            ("tweet.fields", TWEET_FIELDS),
            ("exclude", EXCLUDE),
        ];
        if let Some(token) = pagination_token {
            query.push(("pagination_token", token));
        }

        let response = self.get(url, &query).await?;
        if !response.status().is_success() {
            return Err(failed_status(response).await);
        }

        let body: TimelineResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Other(format!("failed to parse timeline page: {e}")))?;
        Ok(TweetPage::from(body))
    }

    async fn remaining_quota(&self) -> Result<u32, ApiError> {
        let url = self.endpoint(&["1.1", "application", "rate_limit_status.json"]);
        let response = self.get(url, &[("resources", "users")]).await?;
        if !response.status().is_success() {
            return Err(failed_status(response).await);
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::Other(format!("failed to parse rate limit status: {e}")))?;

        let resource = json
            .get("resources")
            .and_then(|r| r.get("users"))
            .and_then(|u| u.get(TIMELINE_RESOURCE));
        let remaining = resource
            .and_then(|r| r.get("remaining"))
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());

        if let Some(remaining) = remaining {
            let reset = resource
                .and_then(|r| r.get("reset"))
                .and_then(serde_json::Value::as_i64);
            info!(remaining, reset, "User tweets endpoint quota");
            return Ok(remaining);
        }

        // The response's own x-rate-limit-* headers describe the status
        // endpoint, not the timeline, so they are no substitute.
        Err(ApiError::Other(format!(
            "rate limit status has no entry for {TIMELINE_RESOURCE}"
        )))
    }
}

async fn failed_status(response: Response) -> ApiError {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    ApiError::Other(format!("GET {url} failed with status {status}: {snippet}"))
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
