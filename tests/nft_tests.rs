//! Integration tests for NFT inventory aggregation

use relay::api::ApiResponse;
use relay::{NftClient, NftLookupResult};
use serde_json::json;
use std::time::{Duration, Instant};
use warp::http::StatusCode;
use warp::test::request;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    build_test_config_with_mock_server, create_test_api_server, DUMMY_OWNER_A, DUMMY_OWNER_B,
    DUMMY_OWNER_C,
};

const NFT_PATH: &str = "/nft/v1/byaddress";

/// Mount a lookup response for one owner.
async fn mount_owner(server: &MockServer, owner: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(NFT_PATH))
        .and(query_param("address", owner))
        .and(query_param("chainIds", "1,137"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

/// Test that a failing owner does not hide the others
/// What is tested: Lookups for [A, B, C] where B fails; the response waits for
/// all three, keeps request order, carries data for A and C and reports B as failed
/// Why: Dropping failures silently returned partial inventories that looked complete
#[tokio::test]
async fn test_aggregate_reports_partial_failure() {
    let server = MockServer::start().await;

    mount_owner(
        &server,
        DUMMY_OWNER_A,
        ResponseTemplate::new(200)
            .set_body_json(json!({ "assets": [{ "id": "a-1" }] }))
            .set_delay(Duration::from_millis(150)),
    )
    .await;
    mount_owner(
        &server,
        DUMMY_OWNER_B,
        ResponseTemplate::new(500).set_body_string("lookup failed"),
    )
    .await;
    mount_owner(
        &server,
        DUMMY_OWNER_C,
        ResponseTemplate::new(200).set_body_json(json!({ "assets": [{ "id": "c-1" }, { "id": "c-2" }] })),
    )
    .await;

    let config = build_test_config_with_mock_server(&server.uri());
    let (api_server, _) = create_test_api_server(&config);
    let routes = api_server.test_routes();

    let response = request()
        .method("POST")
        .path("/nfts")
        .json(&json!({ "owners": [DUMMY_OWNER_A, DUMMY_OWNER_B, DUMMY_OWNER_C] }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: ApiResponse<Vec<NftLookupResult>> = serde_json::from_slice(response.body()).unwrap();
    assert!(body.success);
    let results = body.data.unwrap();

    let owners: Vec<&str> = results.iter().map(|r| r.owner.as_str()).collect();
    assert_eq!(owners, vec![DUMMY_OWNER_A, DUMMY_OWNER_B, DUMMY_OWNER_C]);

    assert!(results[0].success);
    assert_eq!(results[0].data, Some(json!({ "assets": [{ "id": "a-1" }] })));

    assert!(!results[1].success);
    assert!(results[1].data.is_none());
    assert!(results[1].error.as_ref().unwrap().contains("500"));

    assert!(results[2].success);
    assert_eq!(results[2].data.as_ref().unwrap()["assets"].as_array().unwrap().len(), 2);
}

/// Test that the lookup carries the configured bearer token
/// What is tested: Authorization header comes from the env var named in config
/// Why: The key is a secret and must not live in the config file
#[tokio::test]
async fn test_lookup_uses_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NFT_PATH))
        .and(header("authorization", "Bearer nft-test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "assets": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = build_test_config_with_mock_server(&server.uri());
    config.nft.api_key_env = "RELAY_TEST_NFT_BEARER_TOKEN".to_string();
    std::env::set_var("RELAY_TEST_NFT_BEARER_TOKEN", "nft-test-token");

    let client = NftClient::new(config.nft.clone()).unwrap();
    let data = client.lookup(DUMMY_OWNER_A).await.unwrap();
    assert_eq!(data, json!({ "assets": [] }));
}

/// Test that an empty owner list returns an empty result
/// What is tested: POST /nfts with no owners succeeds without upstream calls
/// Why: Nothing to look up is not an error
#[tokio::test]
async fn test_aggregate_empty_owners() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = build_test_config_with_mock_server(&server.uri());
    let (api_server, _) = create_test_api_server(&config);
    let routes = api_server.test_routes();

    let response = request()
        .method("POST")
        .path("/nfts")
        .json(&json!({ "owners": [] }))
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: ApiResponse<Vec<NftLookupResult>> = serde_json::from_slice(response.body()).unwrap();
    assert!(body.data.unwrap().is_empty());
}

/// Test that lookups run with bounded concurrency and all complete
/// What is tested: Six 100 ms lookups with a limit of 2 all return data, in
/// order, and take at least three rounds of wall time
/// Why: The concurrency limit must throttle, not drop, lookups; finishing
/// faster than three rounds means more than two were in flight
#[tokio::test]
async fn test_aggregate_bounded_concurrency_completes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(NFT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "assets": [] }))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(6)
        .mount(&server)
        .await;

    let config = build_test_config_with_mock_server(&server.uri());
    assert_eq!(config.nft.max_concurrent_requests, 2);
    let client = NftClient::new(config.nft.clone()).unwrap();

    let owners: Vec<String> = (1..=6).map(|i| format!("0x{:040x}", i)).collect();
    let started = Instant::now();
    let results = client.aggregate(&owners).await;
    let elapsed = started.elapsed();

    assert!(
        elapsed >= Duration::from_millis(300),
        "6 lookups at 2 in flight finished in {:?}",
        elapsed
    );
    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(
        results.iter().map(|r| r.owner.clone()).collect::<Vec<_>>(),
        owners
    );
}
