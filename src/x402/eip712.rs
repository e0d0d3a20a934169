//! EIP-712 typed-data hashing for EIP-3009 `TransferWithAuthorization`

use crate::error::{Error, Result};
use sha3::{Digest, Keccak256};

const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

const TRANSFER_WITH_AUTHORIZATION_TYPE: &str = "TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)";

/// 20-byte EVM address
pub type Address = [u8; 20];

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

fn word_u128(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

/// Parse a `0x`-prefixed (or bare) hex address
pub fn parse_address(s: &str) -> Result<Address> {
    let hex_str = s.trim().trim_start_matches("0x").trim_start_matches("0X");
    let bytes = hex::decode(hex_str).map_err(|_| Error::UnsupportedPayment {
        reason: format!("invalid address {:?}", s),
    })?;
    bytes.try_into().map_err(|_| Error::UnsupportedPayment {
        reason: format!("address {:?} is not 20 bytes", s),
    })
}

/// EIP-55 mixed-case checksum encoding
pub fn to_checksum_address(address: &Address) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// EIP-712 domain of the token contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    pub fn separator(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(32 * 5);
        encoded.extend_from_slice(&keccak256(DOMAIN_TYPE.as_bytes()));
        encoded.extend_from_slice(&keccak256(self.name.as_bytes()));
        encoded.extend_from_slice(&keccak256(self.version.as_bytes()));
        encoded.extend_from_slice(&word_u128(self.chain_id as u128));
        encoded.extend_from_slice(&word_address(&self.verifying_contract));
        keccak256(&encoded)
    }
}

/// EIP-3009 transfer authorisation message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferWithAuthorization {
    pub from: Address,
    pub to: Address,
    pub value: u128,
    pub valid_after: u64,
    pub valid_before: u64,
    pub nonce: [u8; 32],
}

impl TransferWithAuthorization {
    pub fn struct_hash(&self) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(32 * 7);
        encoded.extend_from_slice(&keccak256(TRANSFER_WITH_AUTHORIZATION_TYPE.as_bytes()));
        encoded.extend_from_slice(&word_address(&self.from));
        encoded.extend_from_slice(&word_address(&self.to));
        encoded.extend_from_slice(&word_u128(self.value));
        encoded.extend_from_slice(&word_u128(self.valid_after as u128));
        encoded.extend_from_slice(&word_u128(self.valid_before as u128));
        encoded.extend_from_slice(&self.nonce);
        keccak256(&encoded)
    }

    /// Digest to sign: keccak256("\x19\x01" || domainSeparator || structHash)
    pub fn signing_hash(&self, domain: &Domain) -> [u8; 32] {
        let mut encoded = Vec::with_capacity(66);
        encoded.extend_from_slice(&[0x19, 0x01]);
        encoded.extend_from_slice(&domain.separator());
        encoded.extend_from_slice(&self.struct_hash());
        keccak256(&encoded)
    }
}

/// Chain id of an x402 network name
pub fn chain_id(network: &str) -> Option<u64> {
    if let Some(id) = network.strip_prefix("eip155:") {
        return id.parse().ok();
    }
    match network {
        "base" => Some(8453),
        "base-sepolia" => Some(84532),
        "avalanche" => Some(43114),
        "avalanche-fuji" => Some(43113),
        "polygon" => Some(137),
        "polygon-amoy" => Some(80002),
        "sei" => Some(1329),
        "sei-testnet" => Some(1328),
        "iotex" => Some(4689),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_type_hashes() {
        assert_eq!(
            hex::encode(keccak256(DOMAIN_TYPE.as_bytes())),
            "8b73c3c69bb8fe3d512ecc4cf759cc79239f7b179b0ffacaa9a75d522b39400f"
        );
        assert_eq!(
            hex::encode(keccak256(TRANSFER_WITH_AUTHORIZATION_TYPE.as_bytes())),
            "7c7c6cdb67a18743f49ec6fa9b35f50d52ed05cbed4cc592e13b44501c1a2267"
        );
    }

    #[test]
    fn test_checksum_address() {
        let address = parse_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(
            to_checksum_address(&address),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn test_parse_address_rejects_bad_input() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not hex").is_err());
    }

    #[test]
    fn test_chain_ids() {
        assert_eq!(chain_id("base"), Some(8453));
        assert_eq!(chain_id("base-sepolia"), Some(84532));
        assert_eq!(chain_id("eip155:8453"), Some(8453));
        assert_eq!(chain_id("solana"), None);
    }

    #[test]
    fn test_signing_hash_depends_on_domain() {
        let message = TransferWithAuthorization {
            from: [1u8; 20],
            to: [2u8; 20],
            value: 10_000,
            valid_after: 0,
            valid_before: 1_000,
            nonce: [3u8; 32],
        };
        let base = Domain {
            name: "USD Coin".to_string(),
            version: "2".to_string(),
            chain_id: 8453,
            verifying_contract: [4u8; 20],
        };
        let sepolia = Domain {
            chain_id: 84532,
            ..base.clone()
        };
        assert_ne!(message.signing_hash(&base), message.signing_hash(&sepolia));
        assert_eq!(message.signing_hash(&base), message.signing_hash(&base));
    }

    fn usdc_base() -> Domain {
        Domain {
            name: "USD Coin".to_string(),
            version: "2".to_string(),
            chain_id: 8453,
            verifying_contract: parse_address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")
                .unwrap(),
        }
    }

    #[test]
    fn test_usdc_base_domain_separator() {
        // DOMAIN_SEPARATOR() of the USDC contract on Base
        assert_eq!(
            hex::encode(usdc_base().separator()),
            "02fa7265e7c5d81118673727957699e4d68f74cd74b7db77da710fe8a2c7834f"
        );
    }

    #[test]
    fn test_transfer_with_authorization_digest() {
        let message = TransferWithAuthorization {
            from: parse_address("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23").unwrap(),
            to: parse_address("0x209693Bc6afc0C5328bA36FaF03C514EF312287C").unwrap(),
            value: 10_000,
            valid_after: 1_699_999_940,
            valid_before: 1_700_000_300,
            nonce: [7u8; 32],
        };
        assert_eq!(
            hex::encode(message.struct_hash()),
            "22ec03b779c8590fbc8aceee20d1f7a5bce5de9e8ed15187d7dcc18253d828c9"
        );
        assert_eq!(
            hex::encode(message.signing_hash(&usdc_base())),
            "dd6224f5775ec59da142ce287b4998635ed9507835feb57afd9d6f479bc42b9c"
        );
    }
}
