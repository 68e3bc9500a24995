//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    build_test_config, build_test_config_offline, build_test_config_with_mock_server,
    create_default_quote, create_default_upstream_quote, create_feed_item, create_fusion_client,
    create_push_client, create_test_api_server, create_test_api_server_with_store,
    dummy_channel_caip, test_signer, DUMMY_CHANNEL_ADDR, DUMMY_COMM_CONTRACT, DUMMY_FROM_TOKEN,
    DUMMY_OWNER_A, DUMMY_OWNER_B, DUMMY_OWNER_C, DUMMY_RESOLVER_A, DUMMY_RESOLVER_B,
    DUMMY_SETTLEMENT, DUMMY_TO_TOKEN, TEST_MAKER_ADDRESS, TEST_PRIVATE_KEY, TEST_PUSH_CHAIN_ID,
};
