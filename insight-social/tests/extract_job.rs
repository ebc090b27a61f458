mod common;

use insight_common::activity::{ActivityLog, LogLevel};
use insight_common::model::{ExtractionResult, ExtractionType};
use insight_social::twitter::job::{ApifyClient, JobState, ManualClock, PollPolicy};
use insight_social::twitter::{ExtractError, ExtractRequest, Extractor, JobSource};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "apify-token";
const ACTOR: &str = "someone~tweet-scraper";

fn policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_secs(5),
        timeout: Duration::from_secs(20),
    }
}

fn extractor(server: &MockServer) -> Extractor {
    let api = ApifyClient::new(&server.uri(), ACTOR, TOKEN, Duration::from_secs(5)).expect("client");
    Extractor::new(JobSource::new(api, ManualClock::new(), policy()))
}

fn run_body(status: &str) -> Value {
    json!({ "data": { "id": "run-1", "status": status } })
}

async fn mount_start(server: &MockServer, expected_body: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/acts/{ACTOR}/runs")))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(body_partial_json(expected_body))
        .respond_with(ResponseTemplate::new(201).set_body_json(run_body("READY")))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, status: &str) {
    Mock::given(method("GET"))
        .and(path("/actor-runs/run-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body(status)))
        .mount(server)
        .await;
}

async fn mount_items(server: &MockServer, items: Value) {
    Mock::given(method("GET"))
        .and(path("/actor-runs/run-1/dataset/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn tweet_items_are_matched_by_id() -> anyhow::Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_start(
        &server,
        json!({ "startUrls": ["https://twitter.com/alice/status/42"], "handles": [] }),
    )
    .await;
    mount_status(&server, "SUCCEEDED").await;
    mount_items(
        &server,
        json!([
            { "id": "42", "fullText": "from alice", "likeCount": 5, "author": { "userName": "alice", "followers": 9 } },
            { "id": "43", "text": "unrelated", "author": { "userName": "alice" } }
        ]),
    )
    .await;

    let req = ExtractRequest::new(
        vec!["https://x.com/alice/status/42?s=20".into()],
        ExtractionType::Tweets,
        10,
    );
    let mut log = ActivityLog::new();
    let batch = extractor(&server).run(&req, &mut log).await?;

    assert_eq!(batch.total_results(), 1);
    let ExtractionResult::SingleTweet(t) = &batch.results()[0] else {
        panic!("expected a single tweet record");
    };
    assert_eq!(t.original_url, "https://x.com/alice/status/42?s=20");
    assert_eq!(t.tweet_data.text, "from alice");
    assert_eq!(t.tweet_data.like_count, 5);
    assert_eq!(t.author_profile.as_ref().map(|p| p.followers_count), Some(9));
    Ok(())
}

#[tokio::test]
async fn profile_items_are_grouped_by_author_and_truncated() -> anyhow::Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_start(
        &server,
        json!({ "handles": ["bob", "nobody"], "tweetsDesired": 2, "includeUserInfo": true }),
    )
    .await;
    mount_status(&server, "SUCCEEDED").await;
    mount_items(
        &server,
        json!([
            { "id": "7", "text": "b1", "author": { "userName": "bob", "followers": 10 } },
            { "id": "8", "text": "b2", "author": { "userName": "bob" } },
            { "id": "9", "text": "b3", "author": { "userName": "bob" } }
        ]),
    )
    .await;

    let req = ExtractRequest::new(
        vec!["https://x.com/bob".into(), "https://x.com/nobody".into()],
        ExtractionType::Accounts,
        2,
    );
    let mut log = ActivityLog::new();
    let batch = extractor(&server).run(&req, &mut log).await?;

    assert_eq!(batch.total_results(), 1);
    let ExtractionResult::UserTweets(bob) = &batch.results()[0] else {
        panic!("expected user tweets");
    };
    assert_eq!(bob.total_tweets, 2);
    assert_eq!(bob.tweets.len(), 2);
    assert_eq!(bob.user_profile.followers_count, 10);
    assert!(
        log.entries()
            .any(|e| e.level == LogLevel::Warning && e.message.contains("https://x.com/nobody"))
    );
    Ok(())
}

#[tokio::test]
async fn failed_job_aborts_the_batch() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_start(&server, json!({})).await;
    mount_status(&server, "FAILED").await;

    let req = ExtractRequest::new(vec!["https://x.com/a/status/1".into()], ExtractionType::Tweets, 5);
    let mut log = ActivityLog::new();
    let err = extractor(&server).run(&req, &mut log).await.unwrap_err();

    assert!(matches!(
        err,
        ExtractError::JobEnded { state: JobState::Failed, .. }
    ));
    assert!(
        log.entries()
            .any(|e| e.level == LogLevel::Error && e.message.contains("FAILED"))
    );
}

#[tokio::test]
async fn job_that_never_finishes_times_out() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_start(&server, json!({})).await;
    // 20s timeout at a 5s interval: polls at 5, 10, 15, 20 then gives up
    Mock::given(method("GET"))
        .and(path("/actor-runs/run-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("RUNNING")))
        .expect(4)
        .mount(&server)
        .await;

    let req = ExtractRequest::new(vec!["https://x.com/a".into()], ExtractionType::Accounts, 5);
    let mut log = ActivityLog::new();
    let err = extractor(&server).run(&req, &mut log).await.unwrap_err();

    assert!(matches!(
        err,
        ExtractError::JobEnded { state: JobState::TimedOut, .. }
    ));
}

#[tokio::test]
async fn rejected_start_reports_status_and_body() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/acts/{ACTOR}/runs")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": { "message": "bad token" } })))
        .mount(&server)
        .await;

    let req = ExtractRequest::new(vec!["https://x.com/a".into()], ExtractionType::Accounts, 5);
    let mut log = ActivityLog::new();
    let err = extractor(&server).run(&req, &mut log).await.unwrap_err();

    assert!(matches!(err, ExtractError::JobStart(_)));
    let msg = err.to_string();
    assert!(msg.starts_with("Failed to start job: 401"), "{msg}");
    assert!(msg.contains("bad token"), "{msg}");
}
