//! Fusion swap auctions: quotes, auction order construction and submission.

pub mod client;
pub mod order;
pub mod salt;
pub mod suffix;
pub mod types;

pub use client::FusionClient;
pub use order::{FusionOrder, LimitOrder, OrderParams};
pub use salt::AuctionSalt;
pub use suffix::{AuctionSuffix, WhitelistEntry};
pub use types::{AuctionPoint, LimitOrderStruct, OrderSubmission, Preset, Quote, QuoteParams};
