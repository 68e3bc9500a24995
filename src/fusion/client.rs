//! Fusion API Client
//!
//! HTTP client for the Fusion quoter (quotes) and relayer (order submission).

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::FusionConfig;
use crate::crypto::eip712::Domain;
use crate::crypto::{parse_address, EvmSigner};
use crate::error::{RelayError, Result};
use crate::fusion::order::FusionOrder;
use crate::fusion::types::{OrderSubmission, Quote, QuoteParams, SubmitOrderBody};

const SERVICE: &str = "fusion";

/// HTTP client for the Fusion quoter and relayer.
///
/// Constructed once at startup and shared between requests.
pub struct FusionClient {
    /// Fusion settings (base URL, network, signing domain)
    config: FusionConfig,
    /// Maker key used to sign orders
    signer: Arc<EvmSigner>,
    /// HTTP client instance
    client: reqwest::Client,
}

impl FusionClient {
    /// Create a new Fusion client.
    ///
    /// # Arguments
    ///
    /// * `config` - Fusion configuration
    /// * `signer` - Maker key
    ///
    /// # Returns
    ///
    /// * `Ok(FusionClient)` - New client instance
    /// * `Err(RelayError::Http)` - HTTP client could not be built
    pub fn new(config: FusionConfig, signer: Arc<EvmSigner>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            config,
            signer,
            client,
        })
    }

    fn base_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.get_api_key() {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// EIP-712 domain of the limit order protocol.
    pub fn domain(&self) -> Result<Domain> {
        Ok(Domain {
            name: self.config.domain_name.clone(),
            version: Some(self.config.domain_version.clone()),
            chain_id: self.config.network_id,
            verifying_contract: parse_address(&self.config.router_address)?,
        })
    }

    /// Request a quote for swapping `amount` of `from_token` into `to_token`.
    ///
    /// The upstream quote is returned verbatim, with a `params` object added
    /// when the upstream did not include one so the quote can be posted back
    /// to build an order.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - Upstream quote object
    /// * `Err(RelayError)` - Upstream or transport failure
    pub async fn get_quote(&self, from_token: &str, to_token: &str, amount: &str) -> Result<Value> {
        let url = format!(
            "{}/quoter/v1.0/{}/quote/receive",
            self.base_url(),
            self.config.network_id
        );
        let wallet_address = self.signer.address_hex();

        debug!("Requesting quote {} -> {} amount {}", from_token, to_token, amount);

        let response = self
            .authorize(self.client.get(&url))
            .query(&[
                ("fromTokenAddress", from_token),
                ("toTokenAddress", to_token),
                ("amount", amount),
                ("walletAddress", wallet_address.as_str()),
                ("enableEstimate", "false"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RelayError::from_response(SERVICE, response).await);
        }

        let mut quote: Value = response.json().await?;
        if let Value::Object(ref mut fields) = quote {
            if !fields.contains_key("params") {
                let params = QuoteParams {
                    from_token_address: from_token.to_string(),
                    to_token_address: to_token.to_string(),
                    amount: amount.to_string(),
                    wallet_address: Some(wallet_address),
                };
                fields.insert("params".to_string(), serde_json::to_value(params)?);
            }
        }

        Ok(quote)
    }

    /// Build the auction order for `quote` using the configured preset.
    pub fn build_order(&self, quote: &Quote) -> Result<FusionOrder> {
        let order = FusionOrder::from_quote(
            quote,
            &self.config.preset,
            &self.signer.address_hex(),
            &self.config.settlement_address,
        )?;

        if !order.params.maker.eq_ignore_ascii_case(&self.signer.address_hex()) {
            warn!(
                "Order maker {} differs from signer {}; the relayer may reject the signature",
                order.params.maker,
                self.signer.address_hex()
            );
        }

        Ok(order)
    }

    /// Build, sign and submit an auction order for `quote`.
    ///
    /// Every call produces a new order (fresh salt nonce); submitting the same
    /// quote twice yields two orders.
    ///
    /// # Returns
    ///
    /// * `Ok(OrderSubmission)` - Order hash, signature and submitted order
    /// * `Err(RelayError)` - Invalid quote, signing failure, or upstream failure
    pub async fn submit_order(&self, quote: &Quote) -> Result<OrderSubmission> {
        let order = self.build_order(quote)?.build()?;
        let domain = self.domain()?;

        let order_hash = order.order_hash(&domain);
        let signature = self.signer.sign_digest(&order_hash)?;
        let signature_hex = format!("0x{}", hex::encode(signature));
        let order_struct = order.to_struct();

        let url = format!(
            "{}/relayer/v1.0/{}/order/submit",
            self.base_url(),
            self.config.network_id
        );
        let body = SubmitOrderBody {
            order: &order_struct,
            signature: &signature_hex,
            quote_id: quote.quote_id.as_deref(),
        };

        let response = self.authorize(self.client.post(&url)).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::from_response(SERVICE, response).await);
        }

        let order_hash_hex = format!("0x{}", hex::encode(order_hash));
        info!("Submitted Fusion order {}", order_hash_hex);

        Ok(OrderSubmission {
            order_hash: order_hash_hex,
            signature: signature_hex,
            quote_id: quote.quote_id.clone(),
            order: order_struct,
        })
    }
}
