//! Trade, execution, comment and user calls against the scripted transport.

use chrono::NaiveDate;
use reqwest::Method;
use rust_decimal_macros::dec;
use secrecy::SecretString;
use serde_json::json;
use tracing::info_span;

use tradervue::transport::RawResponse;
use tradervue::types::{NewTrade, NewUser, TradeUpdate, UserUpdate};
use tradervue::{ResourceId, TradervueError};

use crate::mock_transport::{LogCapture, MockTransport};

#[tokio::test]
async fn test_create_trade_returns_id() {
    let transport = MockTransport::new();
    transport.respond(201, json!({ "id": 31337 }));
    let client = transport.client();

    let trade = NewTrade {
        initial_risk: Some(dec!(150)),
        tags: vec!["earnings".into()],
        ..NewTrade::new("AMD")
    };
    let id = client.create_trade(&trade).await.unwrap();
    assert_eq!(id, ResourceId::from(31337));

    let req = &transport.requests()[0];
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.url, "https://tv.test/api/v1/trades");
    let body = req.body.as_ref().unwrap();
    assert_eq!(body["symbol"], json!("AMD"));
    assert_eq!(body["shared"], json!(false));
    assert_eq!(body["tags"], json!(["earnings"]));
    assert!(body.get("notes").is_none());
}

#[tokio::test]
async fn test_create_trade_location() {
    let transport = MockTransport::new();
    transport.respond_raw(
        RawResponse::new(201, r#"{"id": 5}"#).with_header("Location", "https://tv.test/trades/5"),
    );
    let client = transport.client();

    let location = client.create_trade_location(&NewTrade::new("AMD")).await.unwrap();
    assert_eq!(location, "https://tv.test/trades/5");
}

#[tokio::test]
async fn test_create_trade_wrong_status_is_failure() {
    let transport = MockTransport::new();
    transport.respond(200, json!({ "id": 5 }));
    let client = transport.client();

    let err = client.create_trade(&NewTrade::new("AMD")).await.unwrap_err();
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn test_get_trade() {
    let transport = MockTransport::new();
    transport.respond(200, json!({ "id": 77, "symbol": "QQQ", "side": "Short", "gross_pl": "-42.00" }));
    let client = transport.client();

    let trade = client.get_trade(77u64).await.unwrap();
    assert_eq!(trade.symbol, "QQQ");
    assert_eq!(trade.extra["gross_pl"], json!("-42.00"));
    assert_eq!(transport.requests()[0].url, "https://tv.test/api/v1/trades/77");
}

#[tokio::test]
async fn test_update_trade_without_fields_is_local_noop() {
    let transport = MockTransport::new();
    let client = transport.client();

    let updated = client.update_trade(9u64, &TradeUpdate::default()).await.unwrap();
    assert!(!updated);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_update_trade_sends_only_set_fields() {
    let transport = MockTransport::new();
    transport.respond(200, json!({}));
    let client = transport.client();

    let update = TradeUpdate {
        shared: Some(true),
        ..TradeUpdate::default()
    };
    assert!(client.update_trade(9u64, &update).await.unwrap());

    let req = &transport.requests()[0];
    assert_eq!(req.method, Method::PUT);
    assert_eq!(req.body, Some(json!({ "shared": true })));
}

#[tokio::test]
async fn test_delete_trades_reports_each_result() {
    let transport = MockTransport::new();
    transport
        .respond(200, json!({}))
        .respond(404, json!({ "error": "Trade not found" }))
        .respond(200, json!({}));
    let client = transport.client();

    let ids: Vec<ResourceId> = vec![1u64.into(), 2u64.into(), 3u64.into()];
    let results = client.delete_trades(&ids).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert_eq!(results[1].as_ref().unwrap_err().status(), Some(404));
    assert!(results[2].is_ok());
    assert!(transport.requests().iter().all(|r| r.method == Method::DELETE));
}

#[tokio::test]
async fn test_trade_executions_and_comments() {
    let transport = MockTransport::new();
    transport
        .respond(200, json!({ "executions": [
            { "datetime": "2024-05-14T09:45:00", "symbol": "NVDA", "quantity": 50, "price": 903.1 }
        ] }))
        .respond(200, json!({ "comments": [ { "id": 4, "comment": "Chased the entry" } ] }));
    let client = transport.client();

    let executions = client.get_trade_executions(12u64).await.unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].symbol(), Some("NVDA"));

    let comments = client.get_trade_comments(12u64).await.unwrap();
    assert_eq!(comments[0].comment.as_deref(), Some("Chased the entry"));

    let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
    assert_eq!(
        urls,
        vec![
            "https://tv.test/api/v1/trades/12/executions",
            "https://tv.test/api/v1/trades/12/comments",
        ]
    );
}

#[tokio::test]
async fn test_executions_missing_key_is_protocol_violation() {
    let transport = MockTransport::new();
    transport.respond(200, json!({ "fills": [] }));
    let client = transport.client();

    let err = client.get_trade_executions(12u64).await.unwrap_err();
    assert!(matches!(err, TradervueError::ProtocolViolation(_)));
}

#[tokio::test]
async fn test_users_roundtrip() {
    let transport = MockTransport::new();
    transport
        .respond(200, json!({ "users": [ { "id": 1, "username": "alice", "plan": "gold" } ] }))
        .respond(201, json!({ "id": 2 }))
        .respond(200, json!({}))
        .respond(200, json!({ "id": 2, "username": "bob", "plan": "platinum" }));
    let client = transport.client();

    let users = client.list_users().await.unwrap();
    assert_eq!(users[0].username.as_deref(), Some("alice"));

    let new_user = NewUser {
        username: "bob".into(),
        plan: "silver".into(),
        email: "bob@example.com".into(),
        password: SecretString::new("correct horse".into()),
        trial_end: NaiveDate::from_ymd_opt(2025, 1, 31),
    };
    let id = client.create_user(&new_user).await.unwrap();
    assert_eq!(id.as_str(), "2");

    let update = UserUpdate {
        plan: Some("platinum".into()),
    };
    assert!(client.update_user(id.clone(), &update).await.unwrap());

    let user = client.get_user(id).await.unwrap();
    assert_eq!(user.plan.as_deref(), Some("platinum"));

    let requests = transport.requests();
    assert_eq!(requests[1].body.as_ref().unwrap()["trial_end"], json!("2025-01-31"));
    assert_eq!(requests[2].method, Method::PUT);
    assert_eq!(requests[2].url, "https://tv.test/api/v1/users/2");
    assert_eq!(requests[3].url, "https://tv.test/api/v1/users/2");
}

#[tokio::test]
async fn test_forbidden_while_impersonating_logs_hint() {
    let (logs, _guard) = LogCapture::install();
    let transport = MockTransport::new();
    transport.respond(403, json!({ "error": "Forbidden" }));
    let client = transport.impersonating_client("4411");

    let err = client.list_users().await.unwrap_err();
    assert_eq!(err.status(), Some(403));

    let out = logs.contents();
    assert!(out.contains("Unable to query users"));
    assert!(out.contains("No permission to issue API calls on behalf of user 4411"));
}

#[tokio::test]
async fn test_forbidden_without_impersonation_has_no_hint() {
    let (logs, _guard) = LogCapture::install();
    let transport = MockTransport::new();
    transport.respond(403, json!({ "error": "Forbidden" }));
    let client = transport.client();

    assert!(client.list_users().await.is_err());
    assert!(!logs.contents().contains("on behalf of user"));
}

#[tokio::test]
async fn test_operations_log_under_the_injected_span() {
    let (logs, _guard) = LogCapture::install();
    let transport = MockTransport::new();
    transport
        .respond(200, json!({ "executions": [] }))
        .respond(404, json!({ "error": "Trade not found" }));
    let client = transport
        .client()
        .with_span(info_span!("journal", desk = "equities"));

    client.get_trade_executions(12u64).await.unwrap();
    let results = client.delete_trades(&[ResourceId::from(5)]).await;
    assert!(results[0].is_err());

    let out = logs.contents();
    let line_with = |needle: &str| {
        out.lines()
            .find(|l| l.contains(needle))
            .unwrap_or_else(|| panic!("no log line containing {needle:?} in:\n{out}"))
            .to_string()
    };
    assert!(line_with("Queried trade executions").contains("journal{desk=\"equities\"}:get_trade_executions"));
    assert!(line_with("Deletion of trade ID 5").contains("journal{desk=\"equities\"}:delete_trades"));
    assert!(line_with("Unable to delete trade").contains("journal{"));
}

#[tokio::test]
async fn test_transport_failure_is_logged_with_url() {
    let (logs, _guard) = LogCapture::install();
    let transport = MockTransport::new();
    let client = transport.client();

    let err = client.get_trade(3u64).await.unwrap_err();
    assert!(matches!(err, TradervueError::Transport(_)));

    let out = logs.contents();
    assert!(out.contains("Tradervue request failed"));
    assert!(out.contains("https://tv.test/api/v1/trades/3"));
    assert!(out.contains("mock transport has no response scripted"));
}

#[tokio::test]
async fn test_undecodable_trade_is_logged() {
    let (logs, _guard) = LogCapture::install();
    let transport = MockTransport::new();
    transport.respond(200, json!({ "id": 3 }));
    let client = transport.client();

    let err = client.get_trade(3u64).await.unwrap_err();
    assert!(matches!(err, TradervueError::Decode(_)));
    let out = logs.contents();
    assert!(out.contains("Unable to decode trade from response"));
    assert!(out.contains("missing field `symbol`"));
}

#[tokio::test]
async fn test_created_user_without_id_is_logged() {
    let (logs, _guard) = LogCapture::install();
    let transport = MockTransport::new();
    transport.respond(201, json!({ "ok": true }));
    let client = transport.client();

    let new_user = NewUser {
        username: "carol".into(),
        plan: "gold".into(),
        email: "carol@example.com".into(),
        password: SecretString::new("pw".into()),
        trial_end: None,
    };
    let err = client.create_user(&new_user).await.unwrap_err();
    assert!(matches!(err, TradervueError::ProtocolViolation(_)));
    assert!(logs.contents().contains("No 'id' in response creating user"));
}
