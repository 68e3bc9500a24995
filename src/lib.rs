//! Relay Service Library
//!
//! This crate provides an HTTP relay in front of three upstream services:
//! Fusion swap auctions (quotes and signed order submission), an NFT inventory
//! lookup service, and the Push messaging network (gated spaces, channels and
//! channel subscriptions). Channel notifications are forwarded to registered
//! webhooks by a background relay.

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fusion;
pub mod nft;
pub mod push;
pub mod serde_helpers;
pub mod storage;

// Re-export commonly used types
pub use config::{ApiConfig, Config, FusionConfig, NftConfig, PushConfig, SignerConfig, SpaceConfig, StorageConfig};
pub use crypto::EvmSigner;
pub use error::{RelayError, Result};
pub use fusion::FusionClient;
pub use nft::{NftClient, NftLookupResult};
pub use push::{NotificationRelay, PushClient};
pub use storage::{Subscription, SubscriptionStore};
