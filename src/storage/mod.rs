//! Storage Module
//!
//! Durable state kept by the relay: channel subscriptions for notification delivery.

pub mod subscriptions;

pub use subscriptions::{Subscription, SubscriptionStore};
