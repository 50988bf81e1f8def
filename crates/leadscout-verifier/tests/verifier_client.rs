//! Integration tests for `EmailVerifierClient` using wiremock HTTP mocks.

use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadscout_verifier::{EmailVerifierClient, VerifierError, MAX_BATCH_SIZE};

fn test_client(base_url: &str) -> EmailVerifierClient {
    EmailVerifierClient::new(base_url, 5, "leadscout-test/0.1")
        .expect("client construction should not fail")
}

async fn mount_verdict(server: &MockServer, email: &str, result: &str, quality: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v3/"))
        .and(query_param("email", email))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "email": email,
            "result": result,
            "quality": quality,
            "resultcode": 1
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn verify_email_applies_predicate() {
    let server = MockServer::start().await;
    mount_verdict(&server, "ok@x.test", "ok", "good").await;
    mount_verdict(&server, "risky@x.test", "valid", "risky").await;

    let client = test_client(&server.uri());
    let ok = client.verify_email("key", "ok@x.test").await.unwrap();
    let risky = client.verify_email("key", "risky@x.test").await.unwrap();

    assert!(ok.is_email_valid);
    assert!(!risky.is_email_valid);
    assert_eq!(risky.quality.as_deref(), Some("risky"));
}

#[tokio::test]
async fn verify_email_sends_key_and_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/"))
        .and(query_param("api", "secret-key"))
        .and(query_param("timeout", "10"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&json!({ "result": "catch_all", "quality": "neutral" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let verdict = test_client(&server.uri())
        .verify_email("secret-key", "any@x.test")
        .await
        .unwrap();
    assert!(verdict.is_email_valid);
}

#[tokio::test]
async fn successive_single_calls_are_spaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({ "result": "ok" })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let start = Instant::now();
    client.verify_email("k", "a@x.test").await.unwrap();
    client.verify_email("k", "b@x.test").await.unwrap();
    client.verify_email("k", "c@x.test").await.unwrap();

    assert!(
        start.elapsed() >= Duration::from_millis(600),
        "three calls need two 300 ms gaps, took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn verify_batch_marks_failed_lookups_invalid_in_order() {
    let server = MockServer::start().await;
    mount_verdict(&server, "a@x.test", "valid", "good").await;
    Mock::given(method("GET"))
        .and(path("/api/v3/"))
        .and(query_param("email", "b@x.test"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_verdict(&server, "c@x.test", "invalid", "bad").await;

    let emails: Vec<String> = ["a@x.test", "b@x.test", "c@x.test"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
    let verdicts = test_client(&server.uri())
        .verify_batch("k", &emails)
        .await
        .unwrap();

    let flags: Vec<(&str, bool)> = verdicts
        .iter()
        .map(|v| (v.email.as_str(), v.is_email_valid))
        .collect();
    assert_eq!(
        flags,
        vec![("a@x.test", true), ("b@x.test", false), ("c@x.test", false)]
    );
}

#[tokio::test]
async fn verify_batch_fails_whole_batch_on_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({ "error": "Invalid API key" })))
        .mount(&server)
        .await;

    let emails = vec!["a@x.test".to_owned(), "b@x.test".to_owned()];
    let result = test_client(&server.uri()).verify_batch("bad", &emails).await;
    assert!(
        matches!(result, Err(VerifierError::Unauthorized(_))),
        "expected Unauthorized, got: {result:?}"
    );
}

#[tokio::test]
async fn verify_batch_rejects_oversized_batch_without_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({ "result": "ok" })))
        .expect(0)
        .mount(&server)
        .await;

    let emails: Vec<String> = (0..=MAX_BATCH_SIZE).map(|i| format!("u{i}@x.test")).collect();
    let result = test_client(&server.uri()).verify_batch("k", &emails).await;
    assert!(matches!(
        result,
        Err(VerifierError::BatchTooLarge { len: 26, max: 25 })
    ));
}
