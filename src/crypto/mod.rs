//! Cryptographic Operations Module
//!
//! Holds the maker's secp256k1 key and produces the Ethereum-style signatures
//! needed by the upstream services: EIP-712 typed-data signatures for Fusion
//! orders and Push subscriptions, EIP-191 personal signatures for Push
//! verification proofs.
//!
//! ## Security Requirements
//!
//! Private keys must never be exposed or logged.

pub mod eip712;

use k256::ecdsa::{SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use tracing::info;

use crate::config::SignerConfig;
use crate::error::{RelayError, Result};

/// Computes keccak256 of the input.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Parses a `0x`-prefixed (or bare) 20-byte hex address.
pub fn parse_address(address: &str) -> Result<[u8; 20]> {
    let stripped = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(stripped)
        .map_err(|e| RelayError::InvalidInput(format!("Invalid address '{}': {}", address, e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        RelayError::InvalidInput(format!(
            "Invalid address '{}': expected 20 bytes, got {}",
            address,
            b.len()
        ))
    })
}

// ============================================================================
// SIGNER
// ============================================================================

/// Maker key used for all signatures issued by the relay.
///
/// Constructed once at process start and shared by reference.
pub struct EvmSigner {
    signing_key: SigningKey,
    address: [u8; 20],
}

impl std::fmt::Debug for EvmSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSigner")
            .field("address", &self.address_hex())
            .finish_non_exhaustive()
    }
}

impl EvmSigner {
    /// Creates a signer from a hex-encoded private key (with or without `0x`).
    ///
    /// # Arguments
    ///
    /// * `private_key_hex` - 32-byte secp256k1 secret as hex
    ///
    /// # Returns
    ///
    /// * `Ok(EvmSigner)` - Signer with its derived address
    /// * `Err(RelayError::Signing)` - Key is not valid hex or not a valid scalar
    pub fn from_hex(private_key_hex: &str) -> Result<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let key_bytes = hex::decode(key_hex)
            .map_err(|e| RelayError::Signing(format!("Private key is not valid hex: {}", e)))?;
        if key_bytes.len() != 32 {
            return Err(RelayError::Signing(format!(
                "Invalid private key length: expected 32 bytes, got {}",
                key_bytes.len()
            )));
        }

        let signing_key = SigningKey::from_slice(&key_bytes)
            .map_err(|e| RelayError::Signing(format!("Failed to create ECDSA signing key: {}", e)))?;
        let address = ethereum_address(signing_key.verifying_key());

        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Loads the signer from the environment variables named in the config.
    ///
    /// When the address variable is set, it must match the address derived
    /// from the private key.
    pub fn from_config(config: &SignerConfig) -> anyhow::Result<Self> {
        let private_key = config.get_private_key()?;
        let signer = Self::from_hex(&private_key)?;

        if let Some(expected) = config.get_expected_address() {
            if !expected.trim().eq_ignore_ascii_case(&signer.address_hex()) {
                anyhow::bail!(
                    "Address mismatch: environment variable '{}' has {}, but private key corresponds to {}",
                    config.address_env,
                    expected.trim(),
                    signer.address_hex()
                );
            }
        }

        info!("Signer initialized for maker {}", signer.address_hex());
        Ok(signer)
    }

    /// Raw 20-byte Ethereum address.
    pub fn address(&self) -> [u8; 20] {
        self.address
    }

    /// Lowercase `0x`-prefixed address.
    pub fn address_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address))
    }

    /// CAIP-10 account identifier (`eip155:0x...`) as used by Push.
    pub fn caip10(&self) -> String {
        format!("eip155:{}", self.address_hex())
    }

    /// Signs a 32-byte digest and returns `r || s || v` with `v` in {27, 28}.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 65]> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| RelayError::Signing(format!("Failed to sign precomputed hash: {}", e)))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte() + 27;
        Ok(out)
    }

    /// EIP-191 personal signature over `message`.
    ///
    /// keccak256("\x19Ethereum Signed Message:\n" || len || message)
    pub fn sign_personal_message(&self, message: &[u8]) -> Result<[u8; 65]> {
        self.sign_digest(&personal_message_hash(message))
    }

    /// EIP-712 signature for a struct hash under the given domain separator.
    pub fn sign_typed_data(&self, domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> Result<[u8; 65]> {
        self.sign_digest(&eip712::typed_data_digest(domain_separator, struct_hash))
    }
}

/// Hash signed by `personal_sign` for the given message.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut prefixed = Vec::with_capacity(prefix.len() + message.len());
    prefixed.extend_from_slice(prefix.as_bytes());
    prefixed.extend_from_slice(message);
    keccak256(&prefixed)
}

/// Ethereum address of a public key: keccak256(uncompressed_point[1..])[12..].
fn ethereum_address(verifying_key: &VerifyingKey) -> [u8; 20] {
    let point = verifying_key.to_encoded_point(false);
    // Uncompressed format: 0x04 || x (32 bytes) || y (32 bytes)
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Recovers the signer address from a 65-byte `r || s || v` signature.
pub fn recover_address(digest: &[u8; 32], signature: &[u8; 65]) -> Result<[u8; 20]> {
    let sig = k256::ecdsa::Signature::from_slice(&signature[..64])
        .map_err(|e| RelayError::Signing(format!("Invalid signature: {}", e)))?;
    let recovery_id = k256::ecdsa::RecoveryId::try_from(signature[64].wrapping_sub(27))
        .map_err(|e| RelayError::Signing(format!("Invalid recovery id: {}", e)))?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| RelayError::Signing(format!("Recovery failed: {}", e)))?;
    Ok(ethereum_address(&key))
}
