//! Notification relay
//!
//! Long-lived worker that forwards Push notifications to the webhooks
//! registered through `/subscribeChannel`. It polls the maker's inbox, routes
//! every notification newer than the stored watermark to the subscriptions of
//! its sender channel, and advances the watermark so nothing is delivered
//! twice. Failed deliveries are logged and not retried.
//!
//! The inbox is read newest first, page by page, until a page reaches the
//! watermark or comes back short. Bursts larger than `max_feed_pages` full
//! pages lose their oldest notifications.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::PushConfig;
use crate::error::{RelayError, Result};
use crate::push::client::PushClient;
use crate::push::types::{FeedItem, WebhookDelivery};
use crate::storage::{Subscription, SubscriptionStore};

const SERVICE: &str = "webhook";

/// Polls Push and fans notifications out to webhooks.
pub struct NotificationRelay {
    push: Arc<PushClient>,
    store: Arc<SubscriptionStore>,
    /// Client used for webhook deliveries
    client: reqwest::Client,
    polling_interval: Duration,
    feed_limit: usize,
    max_feed_pages: u32,
}

impl NotificationRelay {
    /// Create a relay sharing the API's Push client and subscription store.
    pub fn new(
        config: &PushConfig,
        push: Arc<PushClient>,
        store: Arc<SubscriptionStore>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            push,
            store,
            client,
            polling_interval: Duration::from_millis(config.polling_interval_ms),
            feed_limit: config.feed_limit as usize,
            max_feed_pages: config.max_feed_pages,
        })
    }

    /// Runs the relay until the task is dropped.
    ///
    /// Poll errors are logged and the next poll proceeds as scheduled.
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting notification relay (polling every {} ms)",
            self.polling_interval.as_millis()
        );

        loop {
            match self.poll_once().await {
                Ok(0) => {}
                Ok(delivered) => info!("Relayed {} notification(s)", delivered),
                Err(e) => error!("Error polling Push notifications: {}", e),
            }

            tokio::time::sleep(self.polling_interval).await;
        }
    }

    /// Performs a single poll and delivers every new notification.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of successful webhook deliveries
    /// * `Err(RelayError)` - Feed could not be fetched or the watermark not stored
    pub async fn poll_once(&self) -> Result<usize> {
        if self.store.is_empty().await {
            return Ok(0);
        }

        let watermark = self.store.watermark().await;
        let feeds = self.new_notifications(watermark).await?;

        debug!("{} new notification(s) since {:?}", feeds.len(), watermark);

        let mut delivered = 0;
        for item in &feeds {
            let targets = self.store.for_sender(&item.sender).await;
            if targets.is_empty() {
                debug!("No subscription for sender {}, skipping {}", item.sender, item.payload_id);
            }

            for subscription in &targets {
                match self.deliver(subscription, item).await {
                    Ok(()) => delivered += 1,
                    Err(e) => warn!(
                        "Delivery of notification {} to {} failed: {}",
                        item.payload_id, subscription.webhook_url, e
                    ),
                }
            }

            self.store.advance_watermark(item.payload_id).await?;
        }

        Ok(delivered)
    }

    /// Notifications above `watermark`, oldest first.
    async fn new_notifications(&self, watermark: Option<u64>) -> Result<Vec<FeedItem>> {
        let mut fresh = BTreeMap::new();

        for page in 1..=self.max_feed_pages {
            let items = self.push.fetch_feeds(page).await?;
            let last_page = items.len() < self.feed_limit;
            let mut reached_watermark = false;

            for item in items {
                if watermark.map_or(true, |w| item.payload_id > w) {
                    fresh.entry(item.payload_id).or_insert(item);
                } else {
                    reached_watermark = true;
                }
            }

            if reached_watermark || last_page {
                return Ok(fresh.into_values().collect());
            }
        }

        warn!(
            "Read {} feed pages without reaching notification {:?}; older notifications are skipped",
            self.max_feed_pages, watermark
        );
        Ok(fresh.into_values().collect())
    }

    async fn deliver(&self, subscription: &Subscription, item: &FeedItem) -> Result<()> {
        let response = self
            .client
            .post(&subscription.webhook_url)
            .json(&WebhookDelivery { body: item })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RelayError::from_response(SERVICE, response).await);
        }

        info!(
            "Delivered notification {} to {}",
            item.payload_id, subscription.webhook_url
        );
        Ok(())
    }
}
