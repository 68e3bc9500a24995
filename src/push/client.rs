//! Push API Client
//!
//! Creates gated spaces and channels, checks space access, opts the maker in
//! to channels and reads the maker's notification inbox. Every mutating call
//! carries a verification proof signed with the maker key.

use base64::Engine;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::PushConfig;
use crate::crypto::eip712::Domain;
use crate::crypto::{keccak256, parse_address, EvmSigner};
use crate::error::{RelayError, Result};
use crate::push::types::{
    CreateChannelBody, CreateSpaceBody, FeedItem, FeedPage, SubscribeBody, SubscribeMessage,
};

const SERVICE: &str = "push";

/// EIP-712 domain name of the Push communicator.
const COMM_DOMAIN_NAME: &str = "EPNS COMM V1";

/// Typed-data struct used for channel opt-in proofs.
const DATA_TYPE: &str = "Data(string data)";

/// HTTP client for the Push backend.
pub struct PushClient {
    config: PushConfig,
    signer: Arc<EvmSigner>,
    client: reqwest::Client,
}

impl PushClient {
    /// Create a new Push client.
    pub fn new(config: PushConfig, signer: Arc<EvmSigner>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            config,
            signer,
            client,
        })
    }

    /// Builds `{api_url}/apis/v1/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.config.api_url)
            .map_err(|e| RelayError::InvalidInput(format!("Invalid Push URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RelayError::InvalidInput("Push URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["apis", "v1"])
            .extend(segments);
        Ok(url)
    }

    /// `eip155:<chain>:<address>` identity of the maker on the Push chain.
    fn subscriber_caip(&self) -> String {
        format!("eip155:{}:{}", self.config.chain_id, self.signer.address_hex())
    }

    /// Create a token-gated space.
    ///
    /// Speakers become admins; bare addresses are given the `eip155:` prefix.
    /// Access rule, schedule and visibility come from configuration.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - Upstream space object
    /// * `Err(RelayError)` - Signing, upstream or transport failure
    pub async fn create_space(
        &self,
        name: &str,
        description: &str,
        speakers: &[String],
    ) -> Result<Value> {
        let space = &self.config.space;
        let admins = speakers
            .iter()
            .map(|speaker| {
                if speaker.starts_with("eip155:") {
                    speaker.clone()
                } else {
                    format!("eip155:{}", speaker)
                }
            })
            .collect();

        let mut body = CreateSpaceBody {
            space_name: name.to_string(),
            space_description: description.to_string(),
            members: Vec::new(),
            space_image: None,
            admins,
            is_public: space.is_public,
            space_creator: self.signer.caip10(),
            schedule_at: space.schedule_start.to_rfc3339(),
            schedule_end: space.schedule_end.to_rfc3339(),
            rules: json!({
                "entry": {
                    "conditions": [{
                        "any": [{
                            "type": "PUSH",
                            "category": "ERC20",
                            "subcategory": "holder",
                            "data": {
                                "contract": space.access_contract,
                                "amount": space.access_amount,
                                "decimals": space.access_decimals,
                            }
                        }]
                    }]
                }
            }),
            verification_proof: None,
        };
        body.verification_proof = Some(self.payload_proof(&body)?);

        let url = self.endpoint(&["spaces"])?;
        debug!("Creating space '{}' with {} admin(s)", name, body.admins.len());
        let response = self.client.post(url).json(&body).send().await?;
        let space = read_body(response).await?;

        info!("Created Push space '{}'", name);
        Ok(space)
    }

    /// Check whether `did` may join `space_id`.
    pub async fn get_access(&self, space_id: &str, did: &str) -> Result<Value> {
        let url = self.endpoint(&["spaces", space_id, "access", did])?;
        let response = self.client.get(url).send().await?;
        read_body(response).await
    }

    /// Create a channel owned by the maker.
    ///
    /// # Arguments
    ///
    /// * `icon` - Base64 image, optionally as a `data:<mime>;base64,` URL
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - Upstream channel object
    /// * `Err(RelayError::InvalidInput)` - Icon is not valid base64
    /// * `Err(RelayError)` - Signing, upstream or transport failure
    pub async fn create_channel(
        &self,
        name: &str,
        description: &str,
        channel_url: &str,
        icon: &str,
    ) -> Result<Value> {
        let icon = decode_icon(icon)?;

        let mut body = CreateChannelBody {
            channel: self.signer.caip10(),
            name: name.to_string(),
            info: description.to_string(),
            url: channel_url.to_string(),
            icon,
            verification_proof: None,
        };
        body.verification_proof = Some(self.payload_proof(&body)?);

        let url = self.endpoint(&["channels"])?;
        let response = self.client.post(url).json(&body).send().await?;
        let channel = read_body(response).await?;

        info!("Created Push channel '{}'", name);
        Ok(channel)
    }

    /// Opt the maker in to `channel` (CAIP-10).
    ///
    /// Returns the upstream acknowledgment. Registering a webhook for the
    /// channel is the caller's concern.
    pub async fn subscribe(&self, channel: &str) -> Result<Value> {
        let message = SubscribeMessage {
            channel: channel.to_string(),
            subscriber: self.subscriber_caip(),
            action: "Subscribe".to_string(),
            user_setting: String::new(),
        };
        let data = serde_json::to_string(&message)?;
        let domain = Domain {
            name: COMM_DOMAIN_NAME.to_string(),
            version: None,
            chain_id: self.config.chain_id,
            verifying_contract: parse_address(&self.config.comm_contract)?,
        };
        let signature = self
            .signer
            .sign_typed_data(&domain.separator(), &data_struct_hash(&data))?;

        let body = SubscribeBody {
            verification_proof: format!("eip712v2:0x{}", hex::encode(signature)),
            message,
        };

        let url = self.endpoint(&["channels", channel, "subscribe"])?;
        let response = self.client.post(url).json(&body).send().await?;
        let ack = read_body(response).await?;

        info!("Subscribed {} to channel {}", self.subscriber_caip(), channel);
        Ok(ack)
    }

    /// One page of the maker's inbox, newest first, spam excluded. Pages start at 1.
    pub async fn fetch_feeds(&self, page: u32) -> Result<Vec<FeedItem>> {
        let caip = self.signer.caip10();
        let url = self.endpoint(&["users", &caip, "feeds"])?;
        let page = page.to_string();
        let limit = self.config.feed_limit.to_string();

        let response = self
            .client
            .get(url)
            .query(&[("page", page.as_str()), ("limit", limit.as_str()), ("spam", "false")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RelayError::from_response(SERVICE, response).await);
        }

        let page: FeedPage = response.json().await?;
        Ok(page.feeds)
    }

    /// `eip191:<sig>` over the hex SHA-256 of the serialized payload.
    fn payload_proof<T: Serialize>(&self, payload: &T) -> Result<String> {
        let serialized = serde_json::to_string(payload)?;
        let digest = hex::encode(Sha256::digest(serialized.as_bytes()));
        let signature = self.signer.sign_personal_message(digest.as_bytes())?;
        Ok(format!("eip191:0x{}", hex::encode(signature)))
    }
}

/// hashStruct(Data { data })
pub fn data_struct_hash(data: &str) -> [u8; 32] {
    let mut encoded = [0u8; 64];
    encoded[..32].copy_from_slice(&keccak256(DATA_TYPE.as_bytes()));
    encoded[32..].copy_from_slice(&keccak256(data.as_bytes()));
    keccak256(&encoded)
}

/// Strips an optional data-URL header and checks the rest is base64.
fn decode_icon(icon: &str) -> Result<String> {
    let encoded = match icon.split_once(";base64,") {
        Some((header, rest)) if header.starts_with("data:") => rest,
        _ => icon,
    }
    .trim();

    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| RelayError::InvalidInput(format!("Channel icon is not valid base64: {}", e)))?;
    Ok(encoded.to_string())
}

/// Reads a Push response as JSON, mapping non-2xx to [`RelayError::Upstream`].
///
/// Empty bodies become `{"status": <code>}`; non-JSON text is returned as a string.
async fn read_body(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::from_response(SERVICE, response).await);
    }

    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(json!({ "status": status.as_u16() }));
    }
    Ok(serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_data_url_header_is_stripped() {
        assert_eq!(decode_icon("data:image/png;base64,aGVsbG8=").unwrap(), "aGVsbG8=");
        assert_eq!(decode_icon("aGVsbG8=").unwrap(), "aGVsbG8=");
    }

    #[test]
    fn icon_rejects_non_base64() {
        let err = decode_icon("not base64!").unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
    }

    #[test]
    fn data_struct_hash_depends_on_data() {
        assert_ne!(data_struct_hash("{\"a\":1}"), data_struct_hash("{\"a\":2}"));
    }
}
