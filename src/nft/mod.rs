//! NFT Inventory Aggregation
//!
//! Looks up the NFT inventory of several wallet addresses and joins the
//! outcomes. At most `max_concurrent_requests` lookups are in flight, each
//! bounded by the request timeout, and the aggregate is only returned once
//! every lookup has finished. Failed lookups are reported per owner instead of
//! being dropped.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::NftConfig;
use crate::error::{RelayError, Result};

const SERVICE: &str = "nft";

// ============================================================================
// RESULT STRUCTURES
// ============================================================================

/// Outcome of one owner's lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftLookupResult {
    /// Wallet address that was queried
    pub owner: String,
    /// Whether the lookup succeeded
    pub success: bool,
    /// Upstream inventory response (if successful)
    pub data: Option<Value>,
    /// Error message (if failed)
    pub error: Option<String>,
}

impl NftLookupResult {
    fn from_outcome(owner: String, outcome: Result<Value>) -> Self {
        match outcome {
            Ok(data) => Self {
                owner,
                success: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Self {
                owner,
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// HTTP client for the NFT by-address lookup service.
pub struct NftClient {
    config: NftConfig,
    client: reqwest::Client,
}

impl NftClient {
    /// Create a new NFT client.
    pub fn new(config: NftConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self { config, client })
    }

    /// Look up the inventory of a single owner.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - Upstream response body
    /// * `Err(RelayError)` - Upstream or transport failure
    pub async fn lookup(&self, owner: &str) -> Result<Value> {
        let chain_ids = self.config.chain_ids_param();
        let mut request = self
            .client
            .get(&self.config.api_url)
            .query(&[("chainIds", chain_ids.as_str()), ("address", owner)]);
        if let Some(key) = self.config.get_api_key() {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(RelayError::from_response(SERVICE, response).await);
        }

        Ok(response.json().await?)
    }

    /// Look up every owner and return one record per owner, in request order.
    ///
    /// Lookups run with at most `max_concurrent_requests` in flight. The
    /// returned future completes only after all of them finished.
    pub async fn aggregate(&self, owners: &[String]) -> Vec<NftLookupResult> {
        let limit = self.config.max_concurrent_requests.max(1);
        info!("Looking up NFTs for {} owner(s), {} in flight", owners.len(), limit);

        let lookups: Vec<_> = owners
            .iter()
            .cloned()
            .map(|owner| async move {
                let outcome = self.lookup(&owner).await;
                match &outcome {
                    Ok(_) => debug!("NFT lookup succeeded for {}", owner),
                    Err(e) => error!("NFT lookup failed for {}: {}", owner, e),
                }
                NftLookupResult::from_outcome(owner, outcome)
            })
            .collect();

        stream::iter(lookups).buffered(limit).collect().await
    }
}
