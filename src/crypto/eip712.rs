//! EIP-712 typed-data hashing helpers.

use ethereum_types::U256;

use super::keccak256;

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const DOMAIN_TYPE_NO_VERSION: &str =
    "EIP712Domain(string name,uint256 chainId,address verifyingContract)";

/// Signing domain of a typed-data message.
///
/// Some protocols (Push) omit the version; the domain type string follows.
#[derive(Debug, Clone)]
pub struct Domain {
    pub name: String,
    pub version: Option<String>,
    pub chain_id: u64,
    pub verifying_contract: [u8; 20],
}

impl Domain {
    /// hashStruct(domain)
    pub fn separator(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(32 * 5);
        let type_string = match self.version {
            Some(_) => DOMAIN_TYPE,
            None => DOMAIN_TYPE_NO_VERSION,
        };
        encoded.extend_from_slice(&keccak256(type_string.as_bytes()));
        encoded.extend_from_slice(&keccak256(self.name.as_bytes()));
        if let Some(version) = &self.version {
            encoded.extend_from_slice(&keccak256(version.as_bytes()));
        }
        encoded.extend_from_slice(&u256_word(U256::from(self.chain_id)));
        encoded.extend_from_slice(&address_word(&self.verifying_contract));
        keccak256(&encoded)
    }
}

/// keccak256("\x19\x01" || domainSeparator || structHash)
pub fn typed_data_digest(domain_separator: &[u8; 32], struct_hash: &[u8; 32]) -> [u8; 32] {
    let mut data = [0u8; 66];
    data[0] = 0x19;
    data[1] = 0x01;
    data[2..34].copy_from_slice(domain_separator);
    data[34..].copy_from_slice(struct_hash);
    keccak256(&data)
}

/// ABI word for a uint256.
pub fn u256_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// ABI word for an address (left-padded).
pub fn address_word(address: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}
