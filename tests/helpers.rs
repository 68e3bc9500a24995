//! Shared test helpers for integration tests
//!
//! The module is organized into several categories:
//! - **Constants**: Test key, maker address and dummy addresses
//! - **Configuration Builders**: Test configurations pointed at mock servers
//! - **Server Builders**: API server and clients wired like `main` does
//! - **Payload Creators**: Default quotes and notification feed items

use relay::api::ApiServer;
use relay::config::Config;
use relay::{EvmSigner, FusionClient, NftClient, PushClient, SubscriptionStore};
use serde_json::{json, Value};
use std::sync::Arc;

// ============================================================================
// CONSTANTS
// ============================================================================

// -------------------------------- KEYS ----------------------------------

/// Maker private key (hardhat account #0, never holds real funds)
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Address derived from [`TEST_PRIVATE_KEY`]
pub const TEST_MAKER_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

// ------------------------- TOKENS AND CONTRACTS -------------------------

/// Dummy token sold by the maker
pub const DUMMY_FROM_TOKEN: &str = "0x0000000000000000000000000000000000000001";

/// Dummy token bought by the maker
pub const DUMMY_TO_TOKEN: &str = "0x0000000000000000000000000000000000000002";

/// Dummy settlement contract returned in quotes
pub const DUMMY_SETTLEMENT: &str = "0x0000000000000000000000000000000000000003";

/// Dummy whitelisted resolvers (order matters)
pub const DUMMY_RESOLVER_A: &str = "0x00000000000000000000000000000000000000a1";
pub const DUMMY_RESOLVER_B: &str = "0x00000000000000000000000000000000000000b2";

// -------------------------------- OWNERS --------------------------------

/// Dummy NFT owners
pub const DUMMY_OWNER_A: &str = "0x000000000000000000000000000000000000000a";
pub const DUMMY_OWNER_B: &str = "0x000000000000000000000000000000000000000b";
pub const DUMMY_OWNER_C: &str = "0x000000000000000000000000000000000000000c";

// ------------------------------- CHANNELS -------------------------------

/// Dummy Push channel owner address
pub const DUMMY_CHANNEL_ADDR: &str = "0x00000000000000000000000000000000000000c1";

/// Push chain ID used by test configurations
pub const TEST_PUSH_CHAIN_ID: u64 = 11155111;

/// Dummy Push communicator contract
pub const DUMMY_COMM_CONTRACT: &str = "0x0000000000000000000000000000000000000c0c";

/// [`DUMMY_CHANNEL_ADDR`] in CAIP-10 form on the Push chain
pub fn dummy_channel_caip() -> String {
    format!("eip155:{}:{}", TEST_PUSH_CHAIN_ID, DUMMY_CHANNEL_ADDR)
}

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

/// Build a test config whose upstreams point at the given base URLs.
///
/// The NFT endpoint is `{nft_url}/nft/v1/byaddress`. Polling runs every 10 ms
/// so relay tests stay fast.
pub fn build_test_config(fusion_url: &str, nft_url: &str, push_url: &str) -> Config {
    let mut config = Config::default();
    config.api.port = 0;
    config.fusion.api_url = fusion_url.to_string();
    config.fusion.network_id = 1;
    config.fusion.request_timeout_ms = 2_000;
    config.nft.api_url = format!("{}/nft/v1/byaddress", nft_url);
    config.nft.chain_ids = vec![1, 137];
    config.nft.max_concurrent_requests = 2;
    config.nft.request_timeout_ms = 2_000;
    config.push.api_url = push_url.to_string();
    config.push.chain_id = TEST_PUSH_CHAIN_ID;
    config.push.comm_contract = DUMMY_COMM_CONTRACT.to_string();
    config.push.polling_interval_ms = 10;
    config.push.request_timeout_ms = 2_000;
    config
}

/// Build a test config with every upstream pointed at the same mock server.
#[allow(dead_code)]
pub fn build_test_config_with_mock_server(base_url: &str) -> Config {
    build_test_config(base_url, base_url, base_url)
}

/// Build a test config whose upstreams are unreachable.
///
/// For tests that must be rejected before any upstream call.
#[allow(dead_code)]
pub fn build_test_config_offline() -> Config {
    build_test_config_with_mock_server("http://127.0.0.1:9")
}

// ============================================================================
// SERVER BUILDERS
// ============================================================================

/// Maker signer built from [`TEST_PRIVATE_KEY`].
pub fn test_signer() -> Arc<EvmSigner> {
    Arc::new(EvmSigner::from_hex(TEST_PRIVATE_KEY).unwrap())
}

/// Fusion client for `config`.
#[allow(dead_code)]
pub fn create_fusion_client(config: &Config) -> Arc<FusionClient> {
    Arc::new(FusionClient::new(config.fusion.clone(), test_signer()).unwrap())
}

/// Push client for `config`.
#[allow(dead_code)]
pub fn create_push_client(config: &Config) -> Arc<PushClient> {
    Arc::new(PushClient::new(config.push.clone(), test_signer()).unwrap())
}

/// Create an API server with an in-memory subscription store.
///
/// # Returns
///
/// The server and the store it shares with the notification relay
#[allow(dead_code)]
pub fn create_test_api_server(config: &Config) -> (ApiServer, Arc<SubscriptionStore>) {
    create_test_api_server_with_store(config, Arc::new(SubscriptionStore::in_memory()))
}

/// Create an API server backed by the given store.
#[allow(dead_code)]
pub fn create_test_api_server_with_store(
    config: &Config,
    store: Arc<SubscriptionStore>,
) -> (ApiServer, Arc<SubscriptionStore>) {
    let nft = Arc::new(NftClient::new(config.nft.clone()).unwrap());
    let server = ApiServer::new(
        Arc::new(config.clone()),
        create_fusion_client(config),
        nft,
        create_push_client(config),
        store.clone(),
    );
    (server, store)
}

// ============================================================================
// PAYLOAD CREATORS
// ============================================================================

/// Upstream quote without the `params` object, as the quoter returns it.
#[allow(dead_code)]
pub fn create_default_upstream_quote() -> Value {
    json!({
        "fromTokenAmount": "1000000000000000000",
        "toTokenAmount": "1800000000",
        "quoteId": "quote-1",
        "settlementAddress": DUMMY_SETTLEMENT,
        "recommended_preset": "fast",
        "presets": {
            "fast": {
                "auctionDuration": 180,
                "startAuctionIn": 24,
                "initialRateBump": 50000,
                "bankFee": "0",
                "auctionStartAmount": "1890000000",
                "auctionEndAmount": "1800000000",
                "points": [
                    { "delay": 60, "coefficient": 30000 },
                    { "delay": 60, "coefficient": 10000 }
                ]
            },
            "slow": {
                "auctionDuration": 600,
                "startAuctionIn": 12,
                "initialRateBump": 10000,
                "bankFee": "7",
                "points": []
            }
        },
        "whitelist": [DUMMY_RESOLVER_A, DUMMY_RESOLVER_B]
    })
}

/// Quote as returned by `/fusion/quote`, ready to be posted to `/fusion/order`.
#[allow(dead_code)]
pub fn create_default_quote() -> Value {
    let mut quote = create_default_upstream_quote();
    quote["params"] = json!({
        "fromTokenAddress": DUMMY_FROM_TOKEN,
        "toTokenAddress": DUMMY_TO_TOKEN,
        "amount": "1000000000000000000",
        "walletAddress": TEST_MAKER_ADDRESS
    });
    quote
}

/// Notification feed item sent by `sender`.
#[allow(dead_code)]
pub fn create_feed_item(payload_id: u64, sender: &str) -> Value {
    json!({
        "payload_id": payload_id,
        "sender": sender,
        "epoch": "2023-12-10T12:00:00.000Z",
        "source": "ETH_TEST_SEPOLIA",
        "payload": {
            "data": {
                "app": "Relay Test",
                "amsg": format!("notification {}", payload_id)
            }
        }
    })
}
