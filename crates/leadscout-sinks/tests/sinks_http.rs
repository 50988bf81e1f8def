//! Integration tests for `SlackClient` and `InstantlyClient` using wiremock.

use std::time::{Duration, Instant};

use serde_json::{json, Map};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leadscout_core::{NotifyCredentials, UploadCredentials};
use leadscout_sinks::{InstantlyClient, Lead, SinkError, SlackClient};

fn slack_creds() -> NotifyCredentials {
    NotifyCredentials {
        bot_token: "xoxb-test".to_owned(),
        channel_id: "C123".to_owned(),
    }
}

fn upload_creds() -> UploadCredentials {
    UploadCredentials {
        api_key: "inst-key".to_owned(),
        list_id: "list-1".to_owned(),
        campaign_id: "camp-1".to_owned(),
    }
}

fn lead(email: &str) -> Lead {
    Lead {
        email: email.to_owned(),
        first_name: "Unknown".to_owned(),
        last_name: "Unknown".to_owned(),
        company_name: "Acme".to_owned(),
        phone: String::new(),
        website: String::new(),
        custom_variables: Map::new(),
    }
}

// ---------------------------------------------------------------------------
// Slack: chat.postMessage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn post_message_sends_bearer_and_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-test"))
        .and(body_partial_json(json!({ "channel": "C123", "text": "hello", "mrkdwn": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SlackClient::new(&format!("{}/api", server.uri()), 5, "t").unwrap();
    client
        .post_message(&slack_creds(), "hello")
        .await
        .expect("message should post");
}

#[tokio::test]
async fn post_message_maps_not_ok_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat.postMessage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(&json!({ "ok": false, "error": "channel_not_found" })),
        )
        .mount(&server)
        .await;

    let client = SlackClient::new(&format!("{}/api", server.uri()), 5, "t").unwrap();
    let result = client.post_message(&slack_creds(), "hello").await;
    assert!(
        matches!(result, Err(SinkError::Api { ref error, .. }) if error == "channel_not_found"),
        "got: {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Slack: external file upload flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn post_file_runs_three_step_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/files.getUploadURLExternal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({
            "ok": true,
            "upload_url": format!("{}/upload/F1", server.uri()),
            "file_id": "F1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/F1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/files.completeUploadExternal"))
        .and(body_partial_json(json!({ "channel_id": "C123", "files": [{ "id": "F1" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SlackClient::new(&format!("{}/api", server.uri()), 5, "t").unwrap();
    client
        .post_file(&slack_creds(), b"[]".to_vec(), "leads.json")
        .await
        .expect("file should upload");
}

// ---------------------------------------------------------------------------
// Instantly: partition and input order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_leads_partitions_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/leads"))
        .and(body_partial_json(json!({ "email": "bad@x.test" })))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/leads"))
        .and(header("authorization", "Bearer inst-key"))
        .and(body_partial_json(json!({ "list_id": "list-1", "campaign": "camp-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&json!({ "id": "lead" })))
        .mount(&server)
        .await;

    let leads = vec![
        lead("a@x.test"),
        lead("no-at-sign"),
        lead("bad@x.test"),
        lead("b@x.test"),
        lead("c@x.test"),
    ];
    let client = InstantlyClient::new(&server.uri(), 5, "t").unwrap();
    let outcome = client.upload_leads(&upload_creds(), &leads).await.unwrap();

    assert_eq!(outcome.succeeded, vec!["a@x.test", "b@x.test", "c@x.test"]);
    assert_eq!(outcome.failed, vec!["no-at-sign", "bad@x.test"]);
}

#[tokio::test]
async fn upload_leads_skips_invalid_without_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = InstantlyClient::new(&server.uri(), 5, "t").unwrap();
    let outcome = client
        .upload_leads(&upload_creds(), &[lead("has space@x.test")])
        .await
        .unwrap();
    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.failed, vec!["has space@x.test"]);
}

#[tokio::test]
async fn upload_leads_runs_chunks_of_three_sequentially() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/leads"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
        .expect(6)
        .mount(&server)
        .await;

    let leads: Vec<Lead> = (0..6).map(|i| lead(&format!("u{i}@x.test"))).collect();
    let client = InstantlyClient::new(&server.uri(), 5, "t").unwrap();
    let start = Instant::now();
    let outcome = client.upload_leads(&upload_creds(), &leads).await.unwrap();

    assert_eq!(outcome.succeeded.len(), 6);
    assert!(
        start.elapsed() >= Duration::from_millis(400),
        "two sequential chunks should take two delays, took {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn upload_leads_reports_unavailable_when_every_request_fails() {
    // Nothing listens on port 1.
    let client = InstantlyClient::new("http://127.0.0.1:1", 2, "t").unwrap();
    let result = client
        .upload_leads(&upload_creds(), &[lead("a@x.test"), lead("b@x.test")])
        .await;
    assert!(
        matches!(result, Err(SinkError::Unavailable { attempted: 2 })),
        "got: {result:?}"
    );
}
