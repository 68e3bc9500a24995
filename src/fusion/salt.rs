//! Auction salt: the time window and fee of an auction packed into the order salt.
//!
//! Layout, most significant bits first:
//!
//! | bits | field |
//! |------|-------|
//! | 32   | auction start time |
//! | 24   | duration |
//! | 24   | initial rate bump |
//! | 32   | bank fee |
//! | 144  | random nonce |

use ethereum_types::U256;
use rand::RngCore;

use crate::error::{RelayError, Result};

const START_TIME_BITS: u32 = 32;
const DURATION_BITS: u32 = 24;
const RATE_BUMP_BITS: u32 = 24;
const BANK_FEE_BITS: u32 = 32;
const NONCE_BITS: u32 = 144;
const NONCE_BYTES: usize = (NONCE_BITS / 8) as usize;

/// Time window and fee descriptor of an auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionSalt {
    pub duration: u64,
    pub auction_start_time: u64,
    pub initial_rate_bump: u64,
    pub bank_fee: u64,
    pub nonce: [u8; NONCE_BYTES],
}

impl AuctionSalt {
    /// Creates a salt with a fresh random nonce.
    pub fn new(duration: u64, auction_start_time: u64, initial_rate_bump: u64, bank_fee: u64) -> Self {
        let mut nonce = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self::with_nonce(duration, auction_start_time, initial_rate_bump, bank_fee, nonce)
    }

    /// Creates a salt with a caller-chosen nonce.
    pub fn with_nonce(
        duration: u64,
        auction_start_time: u64,
        initial_rate_bump: u64,
        bank_fee: u64,
        nonce: [u8; NONCE_BYTES],
    ) -> Self {
        Self {
            duration,
            auction_start_time,
            initial_rate_bump,
            bank_fee,
            nonce,
        }
    }

    /// Packs the salt into a uint256.
    ///
    /// # Returns
    ///
    /// * `Ok(U256)` - Packed salt
    /// * `Err(RelayError::InvalidInput)` - A field does not fit its bit width
    pub fn build(&self) -> Result<U256> {
        check_width("auctionStartTime", self.auction_start_time, START_TIME_BITS)?;
        check_width("auctionDuration", self.duration, DURATION_BITS)?;
        check_width("initialRateBump", self.initial_rate_bump, RATE_BUMP_BITS)?;
        check_width("bankFee", self.bank_fee, BANK_FEE_BITS)?;

        let mut salt = U256::from(self.auction_start_time);
        salt = (salt << DURATION_BITS) | U256::from(self.duration);
        salt = (salt << RATE_BUMP_BITS) | U256::from(self.initial_rate_bump);
        salt = (salt << BANK_FEE_BITS) | U256::from(self.bank_fee);
        salt = (salt << NONCE_BITS) | U256::from_big_endian(&self.nonce);
        Ok(salt)
    }

    /// Reverses [`AuctionSalt::build`].
    pub fn decode(salt: U256) -> Self {
        let mut word = [0u8; 32];
        salt.to_big_endian(&mut word);
        let mut nonce = [0u8; NONCE_BYTES];
        nonce.copy_from_slice(&word[32 - NONCE_BYTES..]);

        let rest = salt >> NONCE_BITS;
        let bank_fee = take(rest, BANK_FEE_BITS);
        let rest = rest >> BANK_FEE_BITS;
        let initial_rate_bump = take(rest, RATE_BUMP_BITS);
        let rest = rest >> RATE_BUMP_BITS;
        let duration = take(rest, DURATION_BITS);
        let auction_start_time = take(rest >> DURATION_BITS, START_TIME_BITS);

        Self {
            duration,
            auction_start_time,
            initial_rate_bump,
            bank_fee,
            nonce,
        }
    }
}

fn take(value: U256, bits: u32) -> u64 {
    let mask = (U256::one() << bits) - U256::one();
    (value & mask).low_u64()
}

fn check_width(name: &str, value: u64, bits: u32) -> Result<()> {
    if bits < 64 && value >> bits != 0 {
        return Err(RelayError::InvalidInput(format!(
            "{} {} does not fit in {} bits",
            name, value, bits
        )));
    }
    Ok(())
}
