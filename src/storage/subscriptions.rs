//! Channel Subscription Storage Module
//!
//! Durable `channel -> webhook` delivery targets registered by
//! `/subscribeChannel`, plus the id of the last relayed notification. Entries
//! live in memory and are written to a JSON file after every mutation when a
//! path is configured, so deliveries survive restarts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::Result;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// A registered delivery target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier of the subscription
    pub id: uuid::Uuid,
    /// Channel in CAIP-10 form (e.g. "eip155:11155111:0x...")
    pub channel: String,
    /// URL that receives each notification of the channel
    pub webhook_url: String,
    /// Timestamp when the subscription was registered (Unix timestamp)
    pub created_at: u64,
}

impl Subscription {
    /// Whether a notification sent by `sender` belongs to this subscription.
    ///
    /// Compares the address part of both identifiers, case-insensitively.
    pub fn matches_sender(&self, sender: &str) -> bool {
        channel_address(&self.channel).eq_ignore_ascii_case(channel_address(sender))
    }
}

/// Strips any CAIP prefix (`eip155:` or `eip155:<chain>:`) from an identifier.
pub fn channel_address(identifier: &str) -> &str {
    identifier.rsplit(':').next().unwrap_or(identifier)
}

/// Everything that is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SubscriptionState {
    subscriptions: Vec<Subscription>,
    /// Highest notification id already relayed
    #[serde(default)]
    last_payload_id: Option<u64>,
}

// ============================================================================
// STORAGE IMPLEMENTATION
// ============================================================================

/// Subscription store shared by the API and the notification relay.
pub struct SubscriptionStore {
    /// Backing file; `None` keeps everything in memory
    path: Option<PathBuf>,
    state: RwLock<SubscriptionState>,
}

impl SubscriptionStore {
    /// Create an empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(SubscriptionState::default()),
        }
    }

    /// Open the store backed by `path`, loading existing entries if the file exists.
    ///
    /// # Returns
    ///
    /// * `Ok(SubscriptionStore)` - Store with loaded state
    /// * `Err(RelayError)` - File exists but cannot be read or parsed
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SubscriptionState::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Loaded {} subscription(s) from {}",
            state.subscriptions.len(),
            path.display()
        );

        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    /// Register `webhook_url` for `channel`.
    ///
    /// Channels are compared by address, so `eip155:<chain>:0xC1` and
    /// `eip155:0xc1` with the same webhook are one subscription and the
    /// existing entry is returned. Memory only changes once the file write
    /// succeeded.
    pub async fn add(&self, channel: &str, webhook_url: &str) -> Result<Subscription> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.subscriptions.iter().find(|s| {
            s.webhook_url == webhook_url && s.matches_sender(channel)
        }) {
            debug!("Subscription {} already registered", existing.id);
            return Ok(existing.clone());
        }

        let subscription = Subscription {
            id: uuid::Uuid::new_v4(),
            channel: channel.to_string(),
            webhook_url: webhook_url.to_string(),
            created_at: current_timestamp(),
        };
        let mut next = state.clone();
        next.subscriptions.push(subscription.clone());
        self.persist(&next).await?;
        *state = next;

        info!("Registered subscription {} for channel {}", subscription.id, channel);
        Ok(subscription)
    }

    /// All subscriptions, in registration order.
    pub async fn list(&self) -> Vec<Subscription> {
        self.state.read().await.subscriptions.clone()
    }

    /// Whether no subscription is registered.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.subscriptions.is_empty()
    }

    /// Subscriptions whose channel matches the notification sender.
    pub async fn for_sender(&self, sender: &str) -> Vec<Subscription> {
        self.state
            .read()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.matches_sender(sender))
            .cloned()
            .collect()
    }

    /// Id of the last relayed notification.
    pub async fn watermark(&self) -> Option<u64> {
        self.state.read().await.last_payload_id
    }

    /// Record that notifications up to `payload_id` have been relayed.
    ///
    /// The watermark never moves backwards.
    pub async fn advance_watermark(&self, payload_id: u64) -> Result<()> {
        let mut state = self.state.write().await;
        if state.last_payload_id.map_or(true, |current| payload_id > current) {
            let mut next = state.clone();
            next.last_payload_id = Some(payload_id);
            self.persist(&next).await?;
            *state = next;
        }
        Ok(())
    }

    async fn persist(&self, state: &SubscriptionState) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Sibling tmp file + rename keeps the file whole
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(state)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
