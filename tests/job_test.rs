//! End-to-end tests for a job run against a mocked Twitter API.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tweets_etl::config::Config;
use tweets_etl::credentials::{
    CredentialSource, ACCESS_TOKEN_KEY, ACCESS_TOKEN_SECRET_KEY, API_KEY_KEY, API_KEY_SECRET_KEY,
    BEARER_TOKEN_KEY,
};
use tweets_etl::error::EtlError;
use tweets_etl::job::{EtlJob, TwitterConnector};
use tweets_etl::s3::ObjectStore;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records uploads and snapshots the uploaded file's contents.
#[derive(Default)]
struct RecordingStore {
    uploads: Mutex<Vec<(PathBuf, String, String, String)>>,
}

impl RecordingStore {
    fn uploads(&self) -> Vec<(PathBuf, String, String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn upload(&self, local_path: &Path, bucket: &str, key: &str) -> anyhow::Result<()> {
        let contents = std::fs::read_to_string(local_path)?;
        self.uploads.lock().unwrap().push((
            local_path.to_path_buf(),
            bucket.to_string(),
            key.to_string(),
            contents,
        ));
        Ok(())
    }
}

fn secrets() -> HashMap<String, String> {
    [
        BEARER_TOKEN_KEY,
        API_KEY_KEY,
        API_KEY_SECRET_KEY,
        ACCESS_TOKEN_KEY,
        ACCESS_TOKEN_SECRET_KEY,
    ]
    .into_iter()
    .map(|k| (k.to_string(), "secret".to_string()))
    .collect()
}

fn create_test_config(api_base_url: &str, output_dir: &Path) -> Config {
    Config {
        api_base_url: api_base_url.to_string(),
        http_timeout: Duration::from_secs(5),
        initial_wait: Duration::from_millis(10),
        output_path: output_dir.join("tweets.csv"),
        ..Config::default()
    }
}

fn build_job(
    config: Config,
    secrets: HashMap<String, String>,
    store: Arc<RecordingStore>,
) -> EtlJob {
    let connector = TwitterConnector::new(&config);
    let credentials: Arc<dyn CredentialSource> = Arc::new(secrets);
    EtlJob::new(config, credentials, Arc::new(connector), store)
}

async fn mount_user(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/NASA"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"data": {"id": "11348282", "name": "NASA", "username": "NASA"}}"#,
            "application/json",
        ))
        .mount(server)
        .await;
}

async fn mount_quota(server: &MockServer, remaining: u32) {
    Mock::given(method("GET"))
        .and(path("/1.1/application/rate_limit_status.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"{{"resources": {{"users": {{"/users/:id/tweets": {{"limit": 1500, "remaining": {remaining}, "reset": 1704103200}}}}}}}}"#
            ),
            "application/json",
        ))
        .mount(server)
        .await;
}

const TIMELINE: &str = r#"{
    "data": [
        {
            "id": "1745000000000000001",
            "created_at": "2024-01-01T08:00:00.000Z",
            "text": "Earlier post",
            "public_metrics": {"like_count": 10, "retweet_count": 2}
        },
        {
            "id": "1745000000000000002",
            "created_at": "2024-01-01T10:00:00.000Z",
            "text": "a\nb",
            "public_metrics": {"retweet_count": 5}
        }
    ],
    "meta": {"result_count": 2}
}"#;

#[tokio::test]
async fn test_run_writes_csv_and_uploads() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    mount_quota(&server, 1499).await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .and(query_param("max_results", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TIMELINE, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    let output = config.output_path.clone();
    let rows = build_job(config, secrets(), store.clone()).run().await.unwrap();
    assert_eq!(rows, 2);

    let expected = "id,created_at,text,likes,retweets,tweet_length,created_date,created_hour\n\
                    1745000000000000002,2024-01-01T10:00:00Z,a b,0,5,3,2024-01-01,10\n\
                    1745000000000000001,2024-01-01T08:00:00Z,Earlier post,10,2,12,2024-01-01,8\n";
    assert_eq!(std::fs::read_to_string(&output).unwrap(), expected);

    let uploads = store.uploads();
    assert_eq!(uploads.len(), 1);
    let (uploaded_path, bucket, key, contents) = &uploads[0];
    assert_eq!(uploaded_path, &output);
    assert_eq!(bucket, "airfloe-kini");
    assert_eq!(key, "twitter_data/tweets.csv");
    assert_eq!(contents, expected);
}

#[tokio::test]
async fn test_no_posts_is_no_data_and_nothing_written() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    mount_quota(&server, 10).await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"meta": {"result_count": 0}}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    let output = config.output_path.clone();
    let err = build_job(config, secrets(), store.clone()).run().await.unwrap_err();

    assert!(matches!(err, EtlError::NoData));
    assert!(!output.exists());
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn test_unknown_user_is_no_data() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_quota(&server, 10).await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/NASA"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    let err = build_job(config, secrets(), store.clone()).run().await.unwrap_err();
    assert_eq!(err.kind(), "NoDataError");
}

#[tokio::test]
async fn test_unauthorized_lookup_is_api_error() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_quota(&server, 10).await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/NASA"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TIMELINE, "application/json"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    let output = config.output_path.clone();
    let err = build_job(config, secrets(), store.clone()).run().await.unwrap_err();

    assert!(matches!(err, EtlError::Api(_)));
    assert!(err.to_string().contains("401"));
    assert!(!output.exists());
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn test_rate_limited_lookup_is_rate_limit_exhausted() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_quota(&server, 10).await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/NASA"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TIMELINE, "application/json"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    let output = config.output_path.clone();
    let err = build_job(config, secrets(), store.clone()).run().await.unwrap_err();

    assert_eq!(err.kind(), "RateLimitExhausted");
    assert!(!output.exists());
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn test_missing_credential_fails_before_any_request() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut secrets = secrets();
    secrets.remove(ACCESS_TOKEN_SECRET_KEY);

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    let err = build_job(config, secrets, store).run().await.unwrap_err();
    assert_eq!(err.kind(), "ConfigError");
    assert!(err.to_string().contains(ACCESS_TOKEN_SECRET_KEY));
}

#[tokio::test]
async fn test_zero_quota_aborts_before_fetch() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_quota(&server, 0).await;
    Mock::given(method("GET"))
        .and(path("/2/users/by/username/NASA"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    let err = build_job(config, secrets(), store).run().await.unwrap_err();
    assert_eq!(err.kind(), "RateLimitExhausted");
}

#[tokio::test]
async fn test_failed_quota_check_is_ignored() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    Mock::given(method("GET"))
        .and(path("/1.1/application/rate_limit_status.json"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TIMELINE, "application/json"))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    assert_eq!(build_job(config, secrets(), store.clone()).run().await.unwrap(), 2);
    assert_eq!(store.uploads().len(), 1);
}

#[tokio::test]
async fn test_status_header_does_not_stand_in_for_timeline_quota() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    Mock::given(method("GET"))
        .and(path("/1.1/application/rate_limit_status.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-rate-limit-remaining", "0")
                .set_body_raw(
                    r#"{"resources": {"users": {"/users/lookup": {"remaining": 900}}}}"#,
                    "application/json",
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TIMELINE, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    assert_eq!(build_job(config, secrets(), store.clone()).run().await.unwrap(), 2);
    assert_eq!(store.uploads().len(), 1);
}

#[tokio::test]
async fn test_rate_limited_quota_check_is_ignored() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    Mock::given(method("GET"))
        .and(path("/1.1/application/rate_limit_status.json"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TIMELINE, "application/json"))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    assert_eq!(build_job(config, secrets(), store.clone()).run().await.unwrap(), 2);
    assert_eq!(store.uploads().len(), 1);
}

#[tokio::test]
async fn test_precheck_can_be_disabled() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    mount_quota(&server, 0).await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TIMELINE, "application/json"))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = Config {
        rate_limit_precheck: false,
        ..create_test_config(&server.uri(), temp_dir.path())
    };
    assert_eq!(build_job(config, secrets(), store).run().await.unwrap(), 2);
}

#[tokio::test]
async fn test_rate_limited_then_recovers() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    mount_quota(&server, 10).await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TIMELINE, "application/json"))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    assert_eq!(build_job(config, secrets(), store.clone()).run().await.unwrap(), 2);
    assert_eq!(store.uploads().len(), 1);
}

#[tokio::test]
async fn test_rate_limited_every_time_exhausts_retries() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    mount_quota(&server, 10).await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    let output = config.output_path.clone();
    let err = build_job(config, secrets(), store.clone()).run().await.unwrap_err();

    assert_eq!(err.kind(), "RateLimitExhausted");
    assert!(!output.exists());
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn test_server_error_is_api_error() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    mount_quota(&server, 10).await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(503).set_body_string("over capacity"))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = create_test_config(&server.uri(), temp_dir.path());
    let err = build_job(config, secrets(), store).run().await.unwrap_err();
    assert_eq!(err.kind(), "ApiError");
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_unwritable_output_is_write_error() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    mount_user(&server).await;
    mount_quota(&server, 10).await;
    Mock::given(method("GET"))
        .and(path("/2/users/11348282/tweets"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(TIMELINE, "application/json"))
        .mount(&server)
        .await;

    let store = Arc::new(RecordingStore::default());
    let config = Config {
        // The temp dir itself is a directory, not a writable file path.
        output_path: temp_dir.path().to_path_buf(),
        ..create_test_config(&server.uri(), temp_dir.path())
    };
    let err = build_job(config, secrets(), store.clone()).run().await.unwrap_err();
    assert_eq!(err.kind(), "WriteError");
    assert!(store.uploads().is_empty());
}
