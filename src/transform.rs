//! Normalize raw posts into export rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Timelike, Utc};
use serde::{Serialize, Serializer};

use crate::twitter::Post;

/// One CSV row. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostRecord {
    pub id: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    pub text: String,
    pub likes: i64,
    pub retweets: i64,
    pub tweet_length: usize,
    pub created_date: Option<NaiveDate>,
    pub created_hour: Option<u32>,
}

impl From<Post> for PostRecord {
    fn from(post: Post) -> Self {
        let created_at = post.created_at.as_deref().and_then(parse_timestamp);
        let text = clean_text(&post.text);
        Self {
            id: post.id,
            created_at,
            tweet_length: text.chars().count(),
            text,
            likes: post.likes.unwrap_or(0),
            retweets: post.retweets.unwrap_or(0),
            created_date: created_at.map(|t| t.date_naive()),
            created_hour: created_at.map(|t| t.hour()),
        }
    }
}

/// Rebuild the raw form of a record, so a transformed batch can be fed back in.
impl From<&PostRecord> for Post {
    fn from(record: &PostRecord) -> Self {
        Self {
            id: record.id.clone(),
            created_at: record
                .created_at
                .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            text: record.text.clone(),
            likes: Some(record.likes),
            retweets: Some(record.retweets),
        }
    }
}

/// Turn raw posts into records, newest first.
///
/// Posts whose timestamp cannot be parsed keep a `None` timestamp and sort
/// after every dated post. The sort is stable, so ties keep arrival order.
#[must_use]
pub fn transform(posts: Vec<Post>) -> Vec<PostRecord> {
    let mut records: Vec<PostRecord> = posts.into_iter().map(PostRecord::from).collect();
    // `None < Some(_)`, so reversing the comparison puts undated rows last.
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records
}

#[allow(clippy::ref_option)]
fn serialize_timestamp<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(t) => serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        None => serializer.serialize_none(),
    }
}

fn clean_text(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

/// Lenient timestamp parsing; anything unrecognized becomes `None`.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(t) = DateTime::parse_from_str(raw, fmt) {
            return Some(t.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}
