//! Integration tests for the notification relay
//!
//! Push and the subscriber's webhook are both wiremock servers.

use relay::{NotificationRelay, SubscriptionStore};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use warp::http::StatusCode;
use warp::test::request;
use wiremock::matchers::{body_json, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    build_test_config_with_mock_server, create_feed_item, create_push_client,
    create_test_api_server, dummy_channel_caip, DUMMY_CHANNEL_ADDR, TEST_MAKER_ADDRESS,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Feed path of the maker's inbox
fn feeds_path() -> String {
    format!("/apis/v1/users/eip155:{}/feeds", TEST_MAKER_ADDRESS)
}

/// Mount an inbox returning `feeds` on every poll.
async fn mount_feeds(server: &MockServer, feeds: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(feeds_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "feeds": feeds })))
        .mount(server)
        .await;
}

/// Unique subscription file under the system temp dir.
fn temp_store_path() -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("relay-test-{}", uuid::Uuid::new_v4()))
        .join("subscriptions.json")
}

// ============================================================================
// DELIVERY TESTS
// ============================================================================

/// Test the subscribe-then-notify flow end to end
/// What is tested: Subscribe is acknowledged before any notification exists;
/// a later notification from the channel causes exactly one webhook call with
/// `{"body": <notification>}`, and later polls do not redeliver it
/// Why: Subscribers must get each channel notification once
#[tokio::test]
async fn test_subscribe_then_notification_delivered_once() {
    let push = MockServer::start().await;
    let webhook = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/apis/v1/channels/.+/subscribe$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
        .expect(1)
        .mount(&push)
        .await;

    let config = build_test_config_with_mock_server(&push.uri());
    let (api_server, store) = create_test_api_server(&config);
    let routes = api_server.test_routes();

    let response = request()
        .method("POST")
        .path("/subscribeChannel")
        .json(&json!({
            "channelInCAIP": dummy_channel_caip(),
            "webhookUrl": format!("{}/hook", webhook.uri())
        }))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The notification shows up only after the subscription was acknowledged
    let event = create_feed_item(10, DUMMY_CHANNEL_ADDR);
    mount_feeds(&push, json!([event])).await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({ "body": event })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&webhook)
        .await;

    let relay = NotificationRelay::new(&config.push, create_push_client(&config), store.clone()).unwrap();

    assert_eq!(relay.poll_once().await.unwrap(), 1);
    assert_eq!(relay.poll_once().await.unwrap(), 0);
    assert_eq!(store.watermark().await, Some(10));
}

/// Test that notifications are routed by sender channel
/// What is tested: Items from other senders are skipped; sender matching
/// ignores case and CAIP prefix; each matching subscription gets one call
/// Why: A webhook must only receive its own channel's notifications
#[tokio::test]
async fn test_notifications_routed_by_sender() {
    let push = MockServer::start().await;
    let webhook = MockServer::start().await;

    let ours = create_feed_item(21, &DUMMY_CHANNEL_ADDR.to_uppercase().replacen("0X", "0x", 1));
    let other = create_feed_item(22, "0x00000000000000000000000000000000000000ff");
    mount_feeds(&push, json!([other, ours])).await;

    Mock::given(method("POST"))
        .and(path("/first"))
        .and(body_json(json!({ "body": ours })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&webhook)
        .await;
    Mock::given(method("POST"))
        .and(path("/second"))
        .and(body_json(json!({ "body": ours })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&webhook)
        .await;

    let config = build_test_config_with_mock_server(&push.uri());
    let store = Arc::new(SubscriptionStore::in_memory());
    store.add(&dummy_channel_caip(), &format!("{}/first", webhook.uri())).await.unwrap();
    store.add(&dummy_channel_caip(), &format!("{}/second", webhook.uri())).await.unwrap();

    let relay = NotificationRelay::new(&config.push, create_push_client(&config), store.clone()).unwrap();

    assert_eq!(relay.poll_once().await.unwrap(), 2);
    assert_eq!(store.watermark().await, Some(22));
}

/// Test that two CAIP forms of one channel deliver once
/// What is tested: The same webhook registered under `eip155:<chain>:0x..`
/// and `eip155:0x..` receives a single call for one notification
/// Why: One event must cause exactly one call per webhook
#[tokio::test]
async fn test_channel_forms_deliver_once() {
    let push = MockServer::start().await;
    let webhook = MockServer::start().await;

    let event = create_feed_item(31, DUMMY_CHANNEL_ADDR);
    mount_feeds(&push, json!([event])).await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_json(json!({ "body": event })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&webhook)
        .await;

    let config = build_test_config_with_mock_server(&push.uri());
    let store = Arc::new(SubscriptionStore::in_memory());
    let hook = format!("{}/hook", webhook.uri());
    store.add(&dummy_channel_caip(), &hook).await.unwrap();
    store.add(&format!("eip155:{}", DUMMY_CHANNEL_ADDR), &hook).await.unwrap();

    let relay = NotificationRelay::new(&config.push, create_push_client(&config), store.clone()).unwrap();

    assert_eq!(relay.poll_once().await.unwrap(), 1);
}

/// Test that a poll pages back to the watermark
/// What is tested: With two items per page and watermark 8, pages 1 to 3
/// are read, page 4 is not, and notifications 9 to 13 are each delivered once
/// Why: A burst larger than one page between polls must not be skipped
#[tokio::test]
async fn test_poll_pages_back_to_watermark() {
    let push = MockServer::start().await;
    let webhook = MockServer::start().await;

    let pages = [(1, [13, 12]), (2, [11, 10]), (3, [9, 8])];
    for (page, ids) in pages {
        let feeds: Vec<_> = ids
            .iter()
            .map(|id| create_feed_item(*id, DUMMY_CHANNEL_ADDR))
            .collect();
        Mock::given(method("GET"))
            .and(path(feeds_path()))
            .and(query_param("page", page.to_string()))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "feeds": feeds })))
            .expect(1)
            .mount(&push)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(feeds_path()))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "feeds": [] })))
        .expect(0)
        .mount(&push)
        .await;

    for id in 9..=13 {
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(json!({ "body": create_feed_item(id, DUMMY_CHANNEL_ADDR) })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&webhook)
            .await;
    }

    let mut config = build_test_config_with_mock_server(&push.uri());
    config.push.feed_limit = 2;
    let store = Arc::new(SubscriptionStore::in_memory());
    store.add(&dummy_channel_caip(), &format!("{}/hook", webhook.uri())).await.unwrap();
    store.advance_watermark(8).await.unwrap();

    let relay = NotificationRelay::new(&config.push, create_push_client(&config), store.clone()).unwrap();

    assert_eq!(relay.poll_once().await.unwrap(), 5);
    assert_eq!(store.watermark().await, Some(13));
}

/// Test that the inbox is not polled without subscriptions
/// What is tested: poll_once with an empty store makes no Push request
/// Why: There is nobody to deliver to
#[tokio::test]
async fn test_no_poll_without_subscriptions() {
    let push = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "feeds": [] })))
        .expect(0)
        .mount(&push)
        .await;

    let config = build_test_config_with_mock_server(&push.uri());
    let store = Arc::new(SubscriptionStore::in_memory());
    let relay = NotificationRelay::new(&config.push, create_push_client(&config), store).unwrap();

    assert_eq!(relay.poll_once().await.unwrap(), 0);
}

/// Test that failed deliveries are not retried
/// What is tested: Webhook 500 is logged, the watermark still advances, and
/// the next poll does not call the webhook again
/// Why: Delivery is at most once
#[tokio::test]
async fn test_failed_delivery_not_retried() {
    let push = MockServer::start().await;
    let webhook = MockServer::start().await;

    mount_feeds(&push, json!([create_feed_item(5, DUMMY_CHANNEL_ADDR)])).await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&webhook)
        .await;

    let config = build_test_config_with_mock_server(&push.uri());
    let store = Arc::new(SubscriptionStore::in_memory());
    store.add(&dummy_channel_caip(), &format!("{}/hook", webhook.uri())).await.unwrap();
    let relay = NotificationRelay::new(&config.push, create_push_client(&config), store.clone()).unwrap();

    assert_eq!(relay.poll_once().await.unwrap(), 0);
    assert_eq!(relay.poll_once().await.unwrap(), 0);
    assert_eq!(store.watermark().await, Some(5));
}

/// Test that a feed failure is an error and delivers nothing
/// What is tested: Push 503 on the feed makes poll_once fail without moving the watermark
/// Why: Unread notifications must be picked up by the next successful poll
#[tokio::test]
async fn test_feed_failure_keeps_watermark() {
    let push = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(feeds_path()))
        .respond_with(ResponseTemplate::new(503))
        .mount(&push)
        .await;

    let config = build_test_config_with_mock_server(&push.uri());
    let store = Arc::new(SubscriptionStore::in_memory());
    store.add(&dummy_channel_caip(), "http://127.0.0.1:9/hook").await.unwrap();
    let relay = NotificationRelay::new(&config.push, create_push_client(&config), store.clone()).unwrap();

    let err = relay.poll_once().await.unwrap_err();
    assert!(err.is_upstream());
    assert_eq!(store.watermark().await, None);
}

/// Test that the relay does not redeliver after a restart
/// What is tested: Watermark written by one relay is honored by a relay
/// built from the reloaded store file
/// Why: Restarts must not replay old notifications to webhooks
#[tokio::test]
async fn test_watermark_survives_restart() {
    let push = MockServer::start().await;
    let webhook = MockServer::start().await;
    let store_path = temp_store_path();

    mount_feeds(&push, json!([create_feed_item(30, DUMMY_CHANNEL_ADDR)])).await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&webhook)
        .await;

    let config = build_test_config_with_mock_server(&push.uri());

    {
        let store = Arc::new(SubscriptionStore::load(&store_path).await.unwrap());
        store.add(&dummy_channel_caip(), &format!("{}/hook", webhook.uri())).await.unwrap();
        let relay = NotificationRelay::new(&config.push, create_push_client(&config), store).unwrap();
        assert_eq!(relay.poll_once().await.unwrap(), 1);
    }

    let reloaded = Arc::new(SubscriptionStore::load(&store_path).await.unwrap());
    assert_eq!(reloaded.list().await.len(), 1);
    assert_eq!(reloaded.watermark().await, Some(30));

    let relay = NotificationRelay::new(&config.push, create_push_client(&config), reloaded).unwrap();
    assert_eq!(relay.poll_once().await.unwrap(), 0);

    let _ = std::fs::remove_dir_all(store_path.parent().unwrap());
}

/// Test that the background loop delivers without explicit polls
/// What is tested: run() picks up a notification within a few polling intervals
/// Why: Delivery must not depend on any request arriving
#[tokio::test]
async fn test_run_loop_delivers() {
    let push = MockServer::start().await;
    let webhook = MockServer::start().await;

    mount_feeds(&push, json!([create_feed_item(40, DUMMY_CHANNEL_ADDR)])).await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&webhook)
        .await;

    let config = build_test_config_with_mock_server(&push.uri());
    let store = Arc::new(SubscriptionStore::in_memory());
    store.add(&dummy_channel_caip(), &format!("{}/hook", webhook.uri())).await.unwrap();
    let relay = NotificationRelay::new(&config.push, create_push_client(&config), store.clone()).unwrap();

    let _ = tokio::time::timeout(Duration::from_millis(300), relay.run()).await;

    assert_eq!(store.watermark().await, Some(40));
}
