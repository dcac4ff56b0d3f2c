use serde::{Deserialize, Deserializer};

/// A post as returned by the user timeline endpoint, before any cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Opaque identifier. Never parsed as a number.
    pub id: String,
    pub created_at: Option<String>,
    pub text: String,
    pub likes: Option<i64>,
    pub retweets: Option<i64>,
}

/// One page of a user's timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TweetPage {
    pub posts: Vec<Post>,
    pub next_token: Option<String>,
}

/// Response from `GET /2/users/by/username/:username`.
#[derive(Debug, Deserialize)]
pub(crate) struct UserLookupResponse {
    pub data: Option<UserData>,
    #[serde(default)]
    pub errors: Vec<ApiProblem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserData {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
}

/// Entry of the `errors` array the v2 API returns alongside (or instead of) `data`.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiProblem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl ApiProblem {
    pub fn is_not_found(&self) -> bool {
        self.title.as_deref() == Some("Not Found Error")
            || self
                .kind
                .as_deref()
                .is_some_and(|t| t.ends_with("/resource-not-found"))
    }

    pub fn describe(&self) -> String {
        match (&self.title, &self.detail) {
            (Some(title), Some(detail)) => format!("{title}: {detail}"),
            (Some(s), None) | (None, Some(s)) => s.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

/// Response from `GET /2/users/:id/tweets`.
#[derive(Debug, Deserialize)]
pub(crate) struct TimelineResponse {
    #[serde(default)]
    pub data: Vec<TweetData>,
    #[serde(default)]
    pub meta: Option<TimelineMeta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TweetData {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublicMetrics {
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub retweet_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimelineMeta {
    #[serde(default)]
    pub next_token: Option<String>,
}

impl From<TweetData> for Post {
    fn from(tweet: TweetData) -> Self {
        let (likes, retweets) = tweet
            .public_metrics
            .map_or((None, None), |m| (m.like_count, m.retweet_count));
        Self {
            id: tweet.id,
            created_at: tweet.created_at,
            text: tweet.text,
            likes,
            retweets,
        }
    }
}

impl From<TimelineResponse> for TweetPage {
    fn from(response: TimelineResponse) -> Self {
        Self {
            posts: response.data.into_iter().map(Post::from).collect(),
            next_token: response.meta.and_then(|m| m.next_token),
        }
    }
}

/// Accept ids sent either as JSON strings or as integers, keeping every digit.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or integer id, got {other}"
        ))),
    }
}
