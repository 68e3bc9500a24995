//! Auction suffix: price curve points and resolver whitelist appended to the
//! order's post-interaction.
//!
//! Encoding (all integers big-endian):
//!
//! ```text
//! points      : n × (delay u16 ‖ coefficient u24)
//! whitelist   : m × (allowance u32 ‖ address[20])
//! deadline    : u32   public resolving deadline
//! fee receiver: address[20]
//! fee ratio   : u32
//! n           : u8
//! m           : u8
//! ```

use crate::crypto::parse_address;
use crate::error::{RelayError, Result};
use crate::fusion::types::AuctionPoint;

/// A resolver allowed to fill the auction, with its allowance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub address: String,
    pub allowance: u32,
}

/// Reward points and whitelist of an auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionSuffix {
    pub points: Vec<AuctionPoint>,
    pub whitelist: Vec<WhitelistEntry>,
    pub public_resolving_deadline: u32,
    pub taker_fee_receiver: [u8; 20],
    pub taker_fee_ratio: u32,
}

impl AuctionSuffix {
    /// Creates a suffix where every whitelisted address gets a zero allowance.
    ///
    /// Whitelist order is preserved.
    pub fn new(points: Vec<AuctionPoint>, whitelist: &[String], public_resolving_deadline: u32) -> Self {
        Self {
            points,
            whitelist: whitelist
                .iter()
                .map(|address| WhitelistEntry {
                    address: address.clone(),
                    allowance: 0,
                })
                .collect(),
            public_resolving_deadline,
            taker_fee_receiver: [0u8; 20],
            taker_fee_ratio: 0,
        }
    }

    /// Encodes the suffix.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - Encoded suffix
    /// * `Err(RelayError::InvalidInput)` - Malformed address, out-of-range point, or too many entries
    pub fn build(&self) -> Result<Vec<u8>> {
        let points_len = u8::try_from(self.points.len())
            .map_err(|_| RelayError::InvalidInput(format!("Too many auction points: {}", self.points.len())))?;
        let whitelist_len = u8::try_from(self.whitelist.len())
            .map_err(|_| RelayError::InvalidInput(format!("Whitelist too long: {}", self.whitelist.len())))?;

        let mut out = Vec::with_capacity(
            self.points.len() * 5 + self.whitelist.len() * 24 + 4 + 20 + 4 + 2,
        );

        for point in &self.points {
            let delay = u16::try_from(point.delay)
                .map_err(|_| RelayError::InvalidInput(format!("Point delay {} does not fit in 16 bits", point.delay)))?;
            if point.coefficient >= 1 << 24 {
                return Err(RelayError::InvalidInput(format!(
                    "Point coefficient {} does not fit in 24 bits",
                    point.coefficient
                )));
            }
            out.extend_from_slice(&delay.to_be_bytes());
            out.extend_from_slice(&(point.coefficient as u32).to_be_bytes()[1..]);
        }

        for entry in &self.whitelist {
            out.extend_from_slice(&entry.allowance.to_be_bytes());
            out.extend_from_slice(&parse_address(&entry.address)?);
        }

        out.extend_from_slice(&self.public_resolving_deadline.to_be_bytes());
        out.extend_from_slice(&self.taker_fee_receiver);
        out.extend_from_slice(&self.taker_fee_ratio.to_be_bytes());
        out.push(points_len);
        out.push(whitelist_len);

        Ok(out)
    }
}
