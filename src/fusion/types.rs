//! Fusion quote and order payloads.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::serde_helpers::{string_from_any, u64_from_any};

// ============================================================================
// QUOTE
// ============================================================================

/// Parameters a quote was requested with.
///
/// The quoter does not echo these, so the relay attaches them to the quote it
/// returns; the order endpoint reads them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    pub from_token_address: String,
    pub to_token_address: String,
    #[serde(deserialize_with = "string_from_any")]
    pub amount: String,
    /// Maker wallet; the signer address is used when absent
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// Single step of an auction's price curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionPoint {
    /// Seconds since the previous point
    #[serde(deserialize_with = "u64_from_any")]
    pub delay: u64,
    /// Rate bump at this point
    #[serde(deserialize_with = "u64_from_any")]
    pub coefficient: u64,
}

/// Named bundle of auction timing and fee parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    #[serde(deserialize_with = "u64_from_any")]
    pub auction_duration: u64,
    #[serde(deserialize_with = "u64_from_any")]
    pub start_auction_in: u64,
    #[serde(deserialize_with = "u64_from_any")]
    pub initial_rate_bump: u64,
    #[serde(deserialize_with = "u64_from_any")]
    pub bank_fee: u64,
    #[serde(default)]
    pub points: Vec<AuctionPoint>,
}

/// The subset of a quote needed to build an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub params: QuoteParams,
    #[serde(deserialize_with = "string_from_any")]
    pub from_token_amount: String,
    #[serde(deserialize_with = "string_from_any")]
    pub to_token_amount: String,
    pub presets: HashMap<String, Preset>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub quote_id: Option<String>,
    #[serde(default)]
    pub settlement_address: Option<String>,
}

impl Quote {
    /// Looks up a preset by name.
    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }
}

// ============================================================================
// ORDER
// ============================================================================

/// Limit order as the relayer expects it: uint256 fields as decimal strings,
/// addresses and bytes as `0x` hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOrderStruct {
    pub salt: String,
    pub maker_asset: String,
    pub taker_asset: String,
    pub maker: String,
    pub receiver: String,
    pub allowed_sender: String,
    pub making_amount: String,
    pub taking_amount: String,
    pub offsets: String,
    pub interactions: String,
}

/// Body of the relayer's submit call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderBody<'a> {
    pub order: &'a LimitOrderStruct,
    pub signature: &'a str,
    pub quote_id: Option<&'a str>,
}

/// What the relay reports after a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    pub order_hash: String,
    pub signature: String,
    pub quote_id: Option<String>,
    pub order: LimitOrderStruct,
}
