//! Auction order construction.
//!
//! A [`FusionOrder`] combines the base order descriptor taken from a quote with
//! the auction salt and suffix taken from one of its presets, and renders the
//! limit order that gets signed and submitted.

use ethereum_types::U256;

use crate::crypto::eip712::{address_word, u256_word, Domain};
use crate::crypto::{keccak256, parse_address};
use crate::error::{RelayError, Result};
use crate::fusion::salt::AuctionSalt;
use crate::fusion::suffix::AuctionSuffix;
use crate::fusion::types::{LimitOrderStruct, Quote};

/// EIP-712 type string of the limit order.
pub const ORDER_TYPE: &str = "Order(uint256 salt,address makerAsset,address takerAsset,address maker,address receiver,address allowedSender,uint256 makingAmount,uint256 takingAmount,uint256 offsets,bytes interactions)";

/// Number of interaction fields whose end offsets are packed in `offsets`.
const INTERACTION_FIELDS: usize = 8;

/// Index of the post-interaction among the interaction fields.
const POST_INTERACTION_INDEX: usize = 7;

/// Assets, amounts and maker of an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParams {
    pub maker_asset: String,
    pub taker_asset: String,
    pub making_amount: String,
    pub taking_amount: String,
    pub maker: String,
}

/// Auction order built from a quote preset.
#[derive(Debug, Clone)]
pub struct FusionOrder {
    pub params: OrderParams,
    pub salt: AuctionSalt,
    pub suffix: AuctionSuffix,
    pub settlement: String,
}

impl FusionOrder {
    pub fn new(params: OrderParams, salt: AuctionSalt, suffix: AuctionSuffix, settlement: String) -> Self {
        Self {
            params,
            salt,
            suffix,
            settlement,
        }
    }

    /// Builds an order from `quote` using the preset named `preset_name`.
    ///
    /// Duration, start offset, rate bump, fee and points all come from that one
    /// preset; whitelist addresses come from the quote, each with allowance 0.
    ///
    /// # Arguments
    ///
    /// * `quote` - Quote previously returned by the quoter
    /// * `preset_name` - Preset to use (e.g. "fast")
    /// * `fallback_maker` - Maker used when the quote has no wallet address
    /// * `default_settlement` - Settlement used when the quote has none
    ///
    /// # Returns
    ///
    /// * `Ok(FusionOrder)` - Order ready to be rendered and signed
    /// * `Err(RelayError::InvalidInput)` - Preset missing from the quote, or its
    ///   auction end does not fit the 32-bit resolving deadline
    pub fn from_quote(
        quote: &Quote,
        preset_name: &str,
        fallback_maker: &str,
        default_settlement: &str,
    ) -> Result<Self> {
        let preset = quote.preset(preset_name).ok_or_else(|| {
            RelayError::InvalidInput(format!("Quote has no '{}' preset", preset_name))
        })?;

        let params = OrderParams {
            maker_asset: quote.params.from_token_address.clone(),
            taker_asset: quote.params.to_token_address.clone(),
            making_amount: quote.from_token_amount.clone(),
            taking_amount: quote.to_token_amount.clone(),
            maker: quote
                .params
                .wallet_address
                .clone()
                .unwrap_or_else(|| fallback_maker.to_string()),
        };

        let salt = AuctionSalt::new(
            preset.auction_duration,
            preset.start_auction_in,
            preset.initial_rate_bump,
            preset.bank_fee,
        );

        let end = preset.start_auction_in.saturating_add(preset.auction_duration);
        let deadline = u32::try_from(end).map_err(|_| {
            RelayError::InvalidInput(format!(
                "Public resolving deadline {} of preset '{}' exceeds 32 bits",
                end, preset_name
            ))
        })?;
        let suffix = AuctionSuffix::new(preset.points.clone(), &quote.whitelist, deadline);

        let settlement = quote
            .settlement_address
            .clone()
            .unwrap_or_else(|| default_settlement.to_string());

        Ok(Self::new(params, salt, suffix, settlement))
    }

    /// Renders the limit order.
    pub fn build(&self) -> Result<LimitOrder> {
        let settlement = parse_address(&self.settlement)?;

        let mut interactions = settlement.to_vec();
        interactions.extend_from_slice(&self.suffix.build()?);

        let mut lengths = [0usize; INTERACTION_FIELDS];
        lengths[POST_INTERACTION_INDEX] = interactions.len();

        Ok(LimitOrder {
            salt: self.salt.build()?,
            maker_asset: parse_address(&self.params.maker_asset)?,
            taker_asset: parse_address(&self.params.taker_asset)?,
            maker: parse_address(&self.params.maker)?,
            receiver: [0u8; 20],
            allowed_sender: settlement,
            making_amount: parse_amount("makingAmount", &self.params.making_amount)?,
            taking_amount: parse_amount("takingAmount", &self.params.taking_amount)?,
            offsets: pack_offsets(&lengths),
            interactions,
        })
    }
}

/// Limit order in its typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitOrder {
    pub salt: U256,
    pub maker_asset: [u8; 20],
    pub taker_asset: [u8; 20],
    pub maker: [u8; 20],
    pub receiver: [u8; 20],
    pub allowed_sender: [u8; 20],
    pub making_amount: U256,
    pub taking_amount: U256,
    pub offsets: U256,
    pub interactions: Vec<u8>,
}

impl LimitOrder {
    /// hashStruct(order)
    pub fn struct_hash(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(32 * 11);
        encoded.extend_from_slice(&keccak256(ORDER_TYPE.as_bytes()));
        encoded.extend_from_slice(&u256_word(self.salt));
        encoded.extend_from_slice(&address_word(&self.maker_asset));
        encoded.extend_from_slice(&address_word(&self.taker_asset));
        encoded.extend_from_slice(&address_word(&self.maker));
        encoded.extend_from_slice(&address_word(&self.receiver));
        encoded.extend_from_slice(&address_word(&self.allowed_sender));
        encoded.extend_from_slice(&u256_word(self.making_amount));
        encoded.extend_from_slice(&u256_word(self.taking_amount));
        encoded.extend_from_slice(&u256_word(self.offsets));
        encoded.extend_from_slice(&keccak256(&self.interactions));
        keccak256(&encoded)
    }

    /// EIP-712 digest of the order, i.e. the order hash.
    pub fn order_hash(&self, domain: &Domain) -> [u8; 32] {
        crate::crypto::eip712::typed_data_digest(&domain.separator(), &self.struct_hash())
    }

    /// Wire form expected by the relayer.
    pub fn to_struct(&self) -> LimitOrderStruct {
        LimitOrderStruct {
            salt: self.salt.to_string(),
            maker_asset: hex_address(&self.maker_asset),
            taker_asset: hex_address(&self.taker_asset),
            maker: hex_address(&self.maker),
            receiver: hex_address(&self.receiver),
            allowed_sender: hex_address(&self.allowed_sender),
            making_amount: self.making_amount.to_string(),
            taking_amount: self.taking_amount.to_string(),
            offsets: self.offsets.to_string(),
            interactions: format!("0x{}", hex::encode(&self.interactions)),
        }
    }
}

/// Packs cumulative end offsets of the interaction fields, 32 bits each,
/// field `i` at bits `32 * i`.
pub fn pack_offsets(lengths: &[usize; INTERACTION_FIELDS]) -> U256 {
    let mut offsets = U256::zero();
    let mut end = 0u64;
    for (i, len) in lengths.iter().enumerate() {
        end += *len as u64;
        offsets = offsets | (U256::from(end) << (32 * i as u32));
    }
    offsets
}

fn parse_amount(name: &str, value: &str) -> Result<U256> {
    U256::from_dec_str(value.trim())
        .map_err(|e| RelayError::InvalidInput(format!("Invalid {} '{}': {:?}", name, value, e)))
}

fn hex_address(address: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(address))
}
