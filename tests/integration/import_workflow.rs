//! End-to-end import scenarios against the scripted transport.

use chrono::NaiveDate;
use reqwest::Method;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;

use tradervue::imports::BUSY_RETRY_DELAY;
use tradervue::{Execution, ImportBatch, ImportOptions, ImportOutcome, ImportStatus, TradervueError};

use crate::mock_transport::{status, MockTransport};

fn fills() -> Vec<Execution> {
    let at = |h, m| NaiveDate::from_ymd_opt(2024, 5, 14).unwrap().and_hms_opt(h, m, 0).unwrap();
    vec![
        Execution::fill(at(9, 45), "NVDA", dec!(50), dec!(903.10)).with_amount("commission", dec!(1.00)),
        Execution::fill(at(10, 12), "NVDA", dec!(-50), dec!(911.45)).with_amount("commission", dec!(1.00)),
    ]
}

#[tokio::test]
async fn test_queued_on_first_attempt() {
    let transport = MockTransport::new();
    transport.respond(200, status("queued"));
    let client = transport.client();

    let outcome = client
        .import_executions(ImportBatch::new(fills()), &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, ImportOutcome::Submitted);
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].url, "https://tv.test/api/v1/imports");

    let body = requests[0].body.as_ref().unwrap();
    assert_eq!(body["executions"].as_array().unwrap().len(), 2);
    assert_eq!(body["executions"][0]["symbol"], json!("NVDA"));
    assert_eq!(body["allow_duplicates"], json!(false));
    assert!(body.get("tags").is_none());
}

#[tokio::test]
async fn test_account_tag_injected_into_tags() {
    let transport = MockTransport::new();
    transport.respond(200, status("queued"));
    let client = transport.client();

    let batch = ImportBatch::new(fills())
        .with_tags(["a", "b"])
        .with_account_tag("ACCT1")
        .allow_duplicates(true);
    client.import_executions(batch, &ImportOptions::default()).await.unwrap();

    let body = transport.requests()[0].body.clone().unwrap();
    assert_eq!(body["tags"], json!(["a", "b", "ACCT1"]));
    assert_eq!(body["account_tag"], json!("ACCT1"));
    assert_eq!(body["allow_duplicates"], json!(true));
}

#[tokio::test(start_paused = true)]
async fn test_busy_twice_then_queued_uses_three_attempts() {
    let transport = MockTransport::new();
    transport
        .respond(424, json!({ "error": "Previous import still processing" }))
        .respond(424, json!({ "error": "Previous import still processing" }))
        .respond(200, status("queued"));
    let client = transport.client();

    let start = Instant::now();
    let outcome = client
        .import_executions(ImportBatch::new(fills()), &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, ImportOutcome::Submitted);
    assert_eq!(transport.call_count(), 3);
    assert_eq!(start.elapsed(), BUSY_RETRY_DELAY * 2);
}

#[tokio::test(start_paused = true)]
async fn test_busy_beyond_budget_is_exhausted() {
    let transport = MockTransport::new();
    transport.then_always(424, json!({ "error": "Previous import still processing" }));
    let client = transport.client();

    let err = client
        .import_executions(ImportBatch::new(fills()), &ImportOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, TradervueError::SubmissionExhausted { attempts: 3 }));
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test]
async fn test_empty_batch_makes_no_requests() {
    let transport = MockTransport::new();
    let client = transport.client();

    let err = client
        .import_executions(ImportBatch::new(Vec::new()), &ImportOptions::default().waiting())
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_rejected_submission_is_not_retried() {
    let transport = MockTransport::new();
    transport.then_always(422, json!({ "error": "Invalid execution data" }));
    let client = transport.client();

    let err = client
        .import_executions(ImportBatch::new(fills()), &ImportOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_completion_succeeds() {
    let transport = MockTransport::new();
    transport
        .respond(200, status("queued"))
        .respond(200, status("queued"))
        .respond(200, status("processing"))
        .respond(200, json!({ "status": "succeeded", "info": { "exec_count": 2 } }));
    let client = transport.client();

    let start = Instant::now();
    let outcome = client
        .import_executions(ImportBatch::new(fills()), &ImportOptions::default().waiting())
        .await
        .unwrap();

    let ImportOutcome::Succeeded(state) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(state.status, ImportStatus::Succeeded);
    assert_eq!(state.details["info"]["exec_count"], json!(2));
    assert_eq!(start.elapsed(), Duration::from_secs(30));

    let requests = transport.requests();
    assert_eq!(requests.len(), 4);
    assert!(requests[1..].iter().all(|r| r.method == Method::GET));
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out_after_budget_plus_one_queries() {
    let transport = MockTransport::new();
    transport.respond(200, status("queued"));
    transport.then_always(200, status("processing"));
    let client = transport.client();

    let opts = ImportOptions {
        wait_retries: 2,
        poll_interval: Duration::from_secs(4),
        ..ImportOptions::default()
    }
    .waiting();

    let start = Instant::now();
    let err = client
        .import_executions(ImportBatch::new(fills()), &opts)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TradervueError::PollTimeout { queries: 3, last_status: ImportStatus::Processing }
    ));
    // 1 submission + (wait_retries + 1) status queries
    assert_eq!(transport.call_count(), 4);
    assert_eq!(start.elapsed(), Duration::from_secs(8));
}

#[tokio::test]
async fn test_failed_import_returns_state() {
    let transport = MockTransport::new();
    transport
        .respond(200, status("queued"))
        .respond(200, json!({ "status": "failed", "info": { "errors": ["row 2: bad price"] } }));
    let client = transport.client();

    let outcome = client
        .import_executions(ImportBatch::new(fills()), &ImportOptions::default().waiting())
        .await
        .unwrap();

    assert!(!outcome.is_success());
    let state = outcome.state().unwrap();
    assert_eq!(state.status, ImportStatus::Failed);
    assert_eq!(state.details["info"]["errors"][0], json!("row 2: bad price"));
}

#[tokio::test]
async fn test_status_query_failure_aborts_wait() {
    let transport = MockTransport::new();
    transport
        .respond(200, status("queued"))
        .respond(503, json!({ "status": "maintenance" }));
    let client = transport.client();

    let err = client
        .import_executions(ImportBatch::new(fills()), &ImportOptions::default().waiting())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.to_string(), "HTTP 503: maintenance");
}
