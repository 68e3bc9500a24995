//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the relay service.
//! Configuration includes upstream endpoints (Fusion, NFT inventory, Push),
//! network identifiers, concurrency limits and API settings. Secrets are never
//! stored in the file; the file only names the environment variables that hold them.

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all service settings.
///
/// This structure holds configuration for:
/// - API server (host, port, CORS)
/// - Signer key location (environment variable names)
/// - Fusion quoter / relayer connection and order signing domain
/// - NFT inventory lookup service
/// - Push messaging service and notification relay
/// - Subscription storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration (host, port, CORS settings)
    pub api: ApiConfig,
    /// Signer configuration (which env vars hold the maker key/address)
    #[serde(default)]
    pub signer: SignerConfig,
    /// Fusion quote and order submission settings
    pub fusion: FusionConfig,
    /// NFT inventory lookup settings
    pub nft: NftConfig,
    /// Push messaging settings
    pub push: PushConfig,
    /// Storage settings for durable subscriptions
    #[serde(default)]
    pub storage: StorageConfig,
}

/// API server configuration for external communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host address to bind the API server to
    pub host: String,
    /// Port number to bind the API server to
    pub port: u16,
    /// Allowed CORS origins for cross-origin requests ("*" allows any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

/// Location of the maker signing key.
///
/// The same key signs Fusion orders and Push verification proofs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Environment variable name containing the secp256k1 private key (hex, optional 0x)
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    /// Environment variable name containing the expected maker address (optional check)
    #[serde(default = "default_address_env")]
    pub address_env: String,
}

/// Fusion quoter and relayer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Base URL of the Fusion API (quoter and relayer live under it)
    pub api_url: String,
    /// Network (chain) ID used in API paths and the EIP-712 domain
    pub network_id: u64,
    /// Preset used to build auction orders from a quote
    #[serde(default = "default_preset")]
    pub preset: String,
    /// Limit order protocol contract used as EIP-712 verifying contract
    pub router_address: String,
    /// Settlement contract used when the quote does not carry one
    pub settlement_address: String,
    /// EIP-712 domain name of the limit order protocol
    #[serde(default = "default_domain_name")]
    pub domain_name: String,
    /// EIP-712 domain version of the limit order protocol
    #[serde(default = "default_domain_version")]
    pub domain_version: String,
    /// Environment variable holding an optional API bearer token
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Timeout for every Fusion request in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// NFT inventory lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftConfig {
    /// Full URL of the by-address lookup endpoint
    pub api_url: String,
    /// Chain IDs to query (joined with "," in the `chainIds` parameter)
    pub chain_ids: Vec<u64>,
    /// Environment variable holding the bearer token
    #[serde(default = "default_nft_api_key_env")]
    pub api_key_env: String,
    /// Maximum number of lookups in flight for one request
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    /// Timeout for a single lookup in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Push messaging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Base URL of the Push backend (e.g. "https://backend-staging.epns.io")
    pub api_url: String,
    /// Chain ID of the Push communicator contract (EIP-712 domain)
    pub chain_id: u64,
    /// Push communicator contract address (EIP-712 verifying contract)
    pub comm_contract: String,
    /// Gated space settings
    pub space: SpaceConfig,
    /// Interval between notification feed polls in milliseconds
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// Number of feed items fetched per page
    #[serde(default = "default_feed_limit")]
    pub feed_limit: u32,
    /// Pages read per poll while looking for the last relayed notification
    #[serde(default = "default_max_feed_pages")]
    pub max_feed_pages: u32,
    /// Timeout for Push and webhook requests in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Access rule, validity window and visibility applied to every created space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceConfig {
    /// CAIP-10 token contract the holder rule checks (e.g. "eip155:5:0x...")
    pub access_contract: String,
    /// Minimum token amount required to join
    pub access_amount: u64,
    /// Token decimals
    pub access_decimals: u8,
    /// Scheduled start of the space (RFC 3339)
    pub schedule_start: chrono::DateTime<chrono::Utc>,
    /// Scheduled end of the space (RFC 3339)
    pub schedule_end: chrono::DateTime<chrono::Utc>,
    /// Whether spaces are public
    #[serde(default)]
    pub is_public: bool,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding channel subscriptions; in-memory only when unset
    #[serde(default)]
    pub subscriptions_path: Option<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_private_key_env() -> String {
    "MAKER_PRIVATE_KEY".to_string()
}

fn default_address_env() -> String {
    "MAKER_ADDRESS".to_string()
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_domain_name() -> String {
    "1inch Aggregation Router".to_string()
}

fn default_domain_version() -> String {
    "5".to_string()
}

fn default_nft_api_key_env() -> String {
    "NFT_API_KEY".to_string()
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_polling_interval_ms() -> u64 {
    5_000
}

fn default_feed_limit() -> u32 {
    20
}

fn default_max_feed_pages() -> u32 {
    10
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            private_key_env: default_private_key_env(),
            address_env: default_address_env(),
        }
    }
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl SignerConfig {
    /// Loads the private key from the environment variable.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The private key (hex encoded)
    /// * `Err(anyhow::Error)` - Variable not set
    pub fn get_private_key(&self) -> anyhow::Result<String> {
        std::env::var(&self.private_key_env).map_err(|_| {
            anyhow::anyhow!(
                "Environment variable '{}' not set. Please set it with the maker's secp256k1 private key (hex encoded).",
                self.private_key_env
            )
        })
    }

    /// Loads the expected maker address, if the variable is set.
    pub fn get_expected_address(&self) -> Option<String> {
        std::env::var(&self.address_env).ok()
    }
}

impl FusionConfig {
    /// Reads the optional bearer token for the Fusion API.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
    }
}

impl NftConfig {
    /// Reads the bearer token for the NFT lookup service.
    pub fn get_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok()
    }

    /// Renders the `chainIds` query value.
    pub fn chain_ids_param(&self) -> String {
        self.chain_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// This function ensures that:
    /// - All upstream URLs parse
    /// - Contract addresses are 20-byte 0x-prefixed hex
    /// - The preset name is not empty
    /// - NFT concurrency is at least 1 and at least one chain ID is set
    /// - The space schedule ends after it starts
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Configuration is valid
    /// - `Err(anyhow::Error)` - Validation failed
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("fusion.api_url", &self.fusion.api_url),
            ("nft.api_url", &self.nft.api_url),
            ("push.api_url", &self.push.api_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("Configuration error: {} '{}' is not a valid URL: {}", name, value, e))?;
        }

        validate_evm_address(&self.fusion.router_address)
            .context("Configuration error: invalid fusion.router_address")?;
        validate_evm_address(&self.fusion.settlement_address)
            .context("Configuration error: invalid fusion.settlement_address")?;
        validate_evm_address(&self.push.comm_contract)
            .context("Configuration error: invalid push.comm_contract")?;

        if self.fusion.preset.trim().is_empty() {
            anyhow::bail!("Configuration error: fusion.preset must not be empty");
        }
        if self.nft.max_concurrent_requests == 0 {
            anyhow::bail!("Configuration error: nft.max_concurrent_requests must be at least 1");
        }
        if self.nft.chain_ids.is_empty() {
            anyhow::bail!("Configuration error: nft.chain_ids must contain at least one chain ID");
        }
        if self.push.space.schedule_end <= self.push.space.schedule_start {
            anyhow::bail!(
                "Configuration error: push.space.schedule_end ({}) must be after schedule_start ({})",
                self.push.space.schedule_end,
                self.push.space.schedule_start
            );
        }
        if self.push.feed_limit == 0 {
            anyhow::bail!("Configuration error: push.feed_limit must be at least 1");
        }
        if self.push.max_feed_pages == 0 {
            anyhow::bail!("Configuration error: push.max_feed_pages must be at least 1");
        }

        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// Uses the provided path, else `RELAY_CONFIG_PATH`, else `config/relay.toml`.
    ///
    /// # Returns
    ///
    /// - `Ok(Config)` - Successfully loaded and validated configuration
    /// - `Err(anyhow::Error)` - File missing, unparsable, or invalid
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var("RELAY_CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/relay.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read configuration file '{}'", config_path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse configuration file '{}'", config_path))?;
            config.validate()?;
            Ok(config)
        } else {
            // Configuration file doesn't exist - user needs to copy template
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/relay.template.toml config/relay.toml\n\
                Then edit config/relay.toml with your actual values.",
                config_path
            ))
        }
    }

    /// Loads configuration from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Creates a default configuration with placeholder values.
    ///
    /// Suitable for local development and tests. Network identifiers and
    /// contract addresses must be reviewed before production use.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                cors_origins: default_cors_origins(),
            },
            signer: SignerConfig::default(),
            fusion: FusionConfig {
                api_url: "https://fusion.1inch.io".to_string(),
                network_id: 1,
                preset: default_preset(),
                router_address: "0x1111111254eeb25477b68fb85ed929f73a960582".to_string(),
                settlement_address: "0xa88800cd213da5ae406ce248380802bd53b47647".to_string(),
                domain_name: default_domain_name(),
                domain_version: default_domain_version(),
                api_key_env: None,
                request_timeout_ms: default_request_timeout_ms(),
            },
            nft: NftConfig {
                api_url: "https://api.1inch.dev/nft/v1/byaddress".to_string(),
                chain_ids: vec![1],
                api_key_env: default_nft_api_key_env(),
                max_concurrent_requests: default_max_concurrent_requests(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            push: PushConfig {
                api_url: "https://backend-staging.epns.io".to_string(),
                chain_id: 11155111,
                comm_contract: "0x0c34d54a09cfe75bccd878a469206ae77e0fe6e7".to_string(),
                space: SpaceConfig {
                    access_contract: "eip155:5:0x2b9bE9259a4F5Ba6344c1b1c07911539642a2D33".to_string(),
                    access_amount: 1000,
                    access_decimals: 18,
                    schedule_start: chrono::DateTime::parse_from_rfc3339("2023-12-09T00:00:00Z")
                        .map(|dt| dt.with_timezone(&chrono::Utc))
                        .unwrap_or_else(|_| chrono::Utc::now()),
                    schedule_end: chrono::DateTime::parse_from_rfc3339("2023-12-11T00:00:00Z")
                        .map(|dt| dt.with_timezone(&chrono::Utc))
                        .unwrap_or_else(|_| chrono::Utc::now() + chrono::Duration::days(2)),
                    is_public: false,
                },
                polling_interval_ms: default_polling_interval_ms(),
                feed_limit: default_feed_limit(),
                max_feed_pages: default_max_feed_pages(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            storage: StorageConfig::default(),
        }
    }
}

/// Validates a `0x`-prefixed 20-byte hex address.
///
/// # Arguments
///
/// * `address` - Address string to check
///
/// # Returns
///
/// - `Ok(())` - Address is well-formed
/// - `Err(anyhow::Error)` - Address is malformed
pub fn validate_evm_address(address: &str) -> anyhow::Result<()> {
    let stripped = address
        .strip_prefix("0x")
        .ok_or_else(|| anyhow::anyhow!("Address must be 0x-prefixed hex string"))?;
    let bytes = hex::decode(stripped).map_err(|_| anyhow::anyhow!("Invalid hex address"))?;
    if bytes.len() != 20 {
        anyhow::bail!("Invalid address length: expected 20 bytes, got {}", bytes.len());
    }
    Ok(())
}
