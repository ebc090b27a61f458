mod common;

use insight_common::activity::{ActivityLog, LogLevel};
use insight_common::model::{ExtractionBatch, ExtractionResult, ExtractionType, SingleTweet, TweetData};
use insight_llm::analysis::{NO_ANALYSIS_PLACEHOLDER, SYSTEM_PROMPT};
use insight_llm::{openai_analyzer, AnalysisError, OpenAiSettings};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, model: &str) -> OpenAiSettings {
    OpenAiSettings {
        base_url: format!("{}/v1/", server.uri()),
        model: model.to_string(),
        ..OpenAiSettings::default()
    }
}

fn batch() -> ExtractionBatch {
    ExtractionBatch::new(
        ExtractionType::Tweets,
        vec![ExtractionResult::SingleTweet(SingleTweet {
            original_url: "https://x.com/alice/status/42".into(),
            tweet_url: "https://twitter.com/alice/status/42".into(),
            tweet_data: TweetData {
                id: "42".into(),
                text: "shipping today".into(),
                like_count: 12,
                ..TweetData::default()
            },
            author_profile: None,
        })],
    )
}

#[tokio::test]
async fn sends_system_and_user_messages_and_returns_first_choice() -> anyhow::Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "temperature": 0.7,
            "max_tokens": 2000,
            "messages": [{ "role": "system", "content": SYSTEM_PROMPT }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o",
            "choices": [
                { "message": { "role": "assistant", "content": "Mostly positive." } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ],
            "usage": { "total_tokens": 321 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = openai_analyzer(&settings(&server, "gpt-4o"), Some("sk-test"))?;
    let mut log = ActivityLog::new();
    let text = analyzer
        .analyze(Some(&batch()), "Assess the sentiment", &mut log)
        .await?;

    assert_eq!(text, "Mostly positive.");
    assert_eq!(log.count(LogLevel::Success), 1);

    let requests = server.received_requests().await.unwrap_or_default();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body)?;
    let user = body["messages"][1]["content"].as_str().unwrap_or_default();
    assert!(user.starts_with("Assess the sentiment\n\nData for analysis:\n"));
    assert!(user.contains("Text: shipping today"));
    Ok(())
}

#[tokio::test]
async fn empty_choices_yield_placeholder() -> anyhow::Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let analyzer = openai_analyzer(&settings(&server, "gpt-4o-mini"), Some("sk-test"))?;
    let mut log = ActivityLog::new();
    let text = analyzer.analyze(Some(&batch()), "Summarize", &mut log).await?;
    assert_eq!(text, NO_ANALYSIS_PLACEHOLDER);
    Ok(())
}

#[tokio::test]
async fn upstream_rejection_carries_status() -> anyhow::Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "Rate limit reached" } })),
        )
        .mount(&server)
        .await;

    let analyzer = openai_analyzer(&settings(&server, "gpt-4o-mini"), Some("sk-test"))?;
    let mut log = ActivityLog::new();
    let err = analyzer
        .analyze(Some(&batch()), "Summarize", &mut log)
        .await
        .unwrap_err();

    let AnalysisError::Llm(inner) = &err else {
        panic!("expected an upstream error, got {err:?}");
    };
    assert_eq!(inner.status(), Some(429));
    assert!(err.to_string().contains("429"));
    assert_eq!(log.count(LogLevel::Error), 1);
    Ok(())
}

#[tokio::test]
async fn local_rejections_never_reach_the_network() -> anyhow::Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let mut log = ActivityLog::new();
    let analyzer = openai_analyzer(&settings(&server, "gpt-4o-mini"), Some("sk-test"))?;

    let err = analyzer
        .analyze(Some(&batch()), "   \n\t", &mut log)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyPrompt));

    let err = analyzer.analyze(None, "Summarize", &mut log).await.unwrap_err();
    assert!(matches!(err, AnalysisError::NoData));

    let keyless = openai_analyzer(&settings(&server, "gpt-4o-mini"), Some("  "))?;
    let err = keyless
        .analyze(Some(&batch()), "Summarize", &mut log)
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::MissingApiKey));

    assert!(log.is_empty());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_analysis_is_rejected_as_busy() -> anyhow::Result<()> {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "done" } }]
                }))
                .set_delay(std::time::Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = openai_analyzer(&settings(&server, "gpt-4o-mini"), Some("sk-test"))?;
    let data = batch();
    let mut first_log = ActivityLog::new();
    let mut second_log = ActivityLog::new();

    let (first, second) = tokio::join!(
        analyzer.analyze(Some(&data), "Summarize", &mut first_log),
        analyzer.analyze(Some(&data), "Summarize", &mut second_log),
    );

    assert_eq!(first?, "done");
    assert!(matches!(second, Err(AnalysisError::Busy)));
    assert!(second_log.is_empty());
    assert!(!analyzer.is_busy());
    Ok(())
}

#[tokio::test]
async fn readiness_check_needs_key_and_prompt() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let analyzer = openai_analyzer(&settings(&server, "gpt-4o-mini"), Some("sk-test"))?;
    assert!(analyzer.check_ready("Summarize").is_ok());
    assert!(matches!(
        analyzer.check_ready(" "),
        Err(AnalysisError::EmptyPrompt)
    ));

    let keyless = openai_analyzer(&settings(&server, "gpt-4o-mini"), None)?;
    assert!(matches!(
        keyless.check_ready("Summarize"),
        Err(AnalysisError::MissingApiKey)
    ));
    Ok(())
}
