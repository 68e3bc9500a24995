//! Push Messaging Bridge
//!
//! Client for gated spaces, channels and channel opt-in on the Push network,
//! and the relay that forwards channel notifications to registered webhooks.

pub mod client;
pub mod relay;
pub mod types;

pub use client::PushClient;
pub use relay::NotificationRelay;
pub use types::FeedItem;
