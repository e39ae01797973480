use chrono::Utc;
use deal_sniper::config::FeedConfig;
use deal_sniper::feed::{FeedSource, RedditFeed};
use deal_sniper::model::{FeedError, Submission};
use httpmock::prelude::*;
use serde_json::json;

fn config(server: &MockServer) -> FeedConfig {
    serde_json::from_value(json!({
        "client_id": "client",
        "client_secret": "secret",
        "username": "deal_bot",
        "password": "hunter2",
        "auth_url": server.base_url(),
        "api_url": server.base_url(),
        "poll_interval_seconds": 0,
        "listing_limit": 25
    }))
    .unwrap()
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/access_token")
                .body_contains("grant_type=password")
                .body_contains("username=deal_bot");
            then.status(200)
                .json_body(json!({"access_token": "tok-1", "token_type": "bearer", "expires_in": 3600}));
        })
        .await
}

fn link(id: &str, url: &str, created: i64) -> serde_json::Value {
    json!({"kind": "t3", "data": {"id": id, "title": format!("[GPU] {id}"), "url": url, "created_utc": created as f64}})
}

fn submission(id: &str) -> Submission {
    Submission {
        id: id.into(),
        title: "[SSD] Crucial MX500 500GB".into(),
        url: "https://www.amazon.com/dp/B078211KBB".into(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn listing_is_delivered_oldest_first() {
    let server = MockServer::start_async().await;
    let token = mock_token(&server).await;
    let listing = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/r/buildapcsales/new")
                .query_param("limit", "25")
                .header("authorization", "Bearer tok-1");
            then.status(200).json_body(json!({"kind": "Listing", "data": {"children": [
                link("newer2", "https://www.newegg.com/p/2", 1_525_000_100),
                link("older1", "https://www.bestbuy.com/site/1.p", 1_525_000_000),
            ]}}));
        })
        .await;

    let mut feed = RedditFeed::new(config(&server), "buildapcsales").unwrap();
    let first = feed.next_submission().await.unwrap().unwrap();
    let second = feed.next_submission().await.unwrap().unwrap();

    assert_eq!(first.id, "older1");
    assert_eq!(first.url, "https://www.bestbuy.com/site/1.p");
    assert_eq!(first.created_at.timestamp(), 1_525_000_000);
    assert_eq!(second.id, "newer2");
    token.assert_hits_async(1).await;
    listing.assert_hits_async(1).await;
}

#[tokio::test]
async fn ratelimit_error_carries_message() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    let comment = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/comment")
                .header("authorization", "Bearer tok-1")
                .body_contains("thing_id=t3_8r1x2k")
                .body_contains("api_type=json");
            then.status(200).json_body(json!({"json": {"errors": [[
                "RATELIMIT",
                "you are doing that too much. try again in 7 minutes.",
                "ratelimit"
            ]]}}));
        })
        .await;

    let mut feed = RedditFeed::new(config(&server), "buildapcsales").unwrap();
    let err = feed.reply(&submission("8r1x2k"), "MPN|Price").await.unwrap_err();

    match err {
        FeedError::RateLimited { message } => {
            assert_eq!(message, "you are doing that too much. try again in 7 minutes.")
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
    comment.assert_hits_async(1).await;
}

#[tokio::test]
async fn successful_reply_reuses_token() {
    let server = MockServer::start_async().await;
    let token = mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/comment");
            then.status(200).json_body(json!({"json": {"errors": [], "data": {}}}));
        })
        .await;

    let mut feed = RedditFeed::new(config(&server), "buildapcsales").unwrap();
    feed.reply(&submission("a1"), "body").await.unwrap();
    feed.reply(&submission("b2"), "body").await.unwrap();
    token.assert_hits_async(1).await;
}

#[tokio::test]
async fn server_errors_are_transient() {
    let server = MockServer::start_async().await;
    mock_token(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/r/buildapcsales/new");
            then.status(503).body("upstream unavailable");
        })
        .await;

    let mut feed = RedditFeed::new(config(&server), "buildapcsales").unwrap();
    let err = feed.next_submission().await.unwrap_err();
    assert!(matches!(err, FeedError::Unreachable(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn rejected_credentials_are_not_transient() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/access_token");
            then.status(200).json_body(json!({"error": "invalid_grant"}));
        })
        .await;

    let mut feed = RedditFeed::new(config(&server), "buildapcsales").unwrap();
    let err = feed.reply(&submission("a1"), "body").await.unwrap_err();
    assert!(matches!(err, FeedError::Auth(ref e) if e == "invalid_grant"));
    assert!(!err.is_transient());
}
