//! Shared constants used across the application.

/// User agent string sent with Twitter API requests.
pub const USER_AGENT: &str = concat!("tweets-etl/", env!("CARGO_PKG_VERSION"));

/// Account whose timeline is exported.
pub const TARGET_USERNAME: &str = "NASA";

/// Number of posts fetched per run.
pub const TARGET_COUNT: i64 = 5;

/// Largest page the user timeline endpoint will return.
pub const MAX_PAGE_SIZE: usize = 100;

/// Local CSV written before upload.
pub const OUTPUT_PATH: &str = "/tmp/tweets.csv";

/// Destination bucket for the CSV snapshot.
pub const S3_BUCKET: &str = "airfloe-kini";

/// Destination key; each run overwrites the previous snapshot.
pub const S3_KEY: &str = "twitter_data/tweets.csv";

/// CSV header, in column order.
pub const CSV_COLUMNS: [&str; 8] = [
    "id",
    "created_at",
    "text",
    "likes",
    "retweets",
    "tweet_length",
    "created_date",
    "created_hour",
];
