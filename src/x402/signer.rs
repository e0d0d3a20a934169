//! EVM payment signer for the x402 `exact` scheme

use crate::error::{Error, Result};
use crate::x402::eip712::{
    chain_id, keccak256, parse_address, to_checksum_address, Address, Domain,
    TransferWithAuthorization,
};
use crate::x402::types::{Authorization, ExactEvmPayload, PaymentPayload, PaymentRequirements};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

const DEFAULT_TOKEN_NAME: &str = "USD Coin";
const DEFAULT_TOKEN_VERSION: &str = "2";

/// Authorisations become valid slightly in the past to absorb clock skew
const VALID_AFTER_SKEW_SECS: i64 = 60;

/// Signs EIP-3009 transfer authorisations with a secp256k1 key
#[derive(Clone)]
pub struct EvmSigner {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for EvmSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSigner")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl EvmSigner {
    /// Parse a hex private key (with or without `0x`)
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let trimmed = private_key.trim();
        let hex_str = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(hex_str).map_err(|_| Error::PaymentRequired {
            reason: "invalid payment proof: private key is not hex".to_string(),
        })?;
        if bytes.len() != 32 {
            return Err(Error::PaymentRequired {
                reason: format!(
                    "invalid payment proof: private key must be 32 bytes, got {}",
                    bytes.len()
                ),
            });
        }

        let key = SigningKey::from_slice(&bytes).map_err(|_| Error::PaymentRequired {
            reason: "invalid payment proof: not a valid secp256k1 key".to_string(),
        })?;
        let address = address_of(&key);

        Ok(Self { key, address })
    }

    /// Checksummed address of the payer
    pub fn address(&self) -> String {
        to_checksum_address(&self.address)
    }

    /// Sign a 32-byte digest, returning `r || s || v` with `v` in {27, 28}
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; 65]> {
        let (signature, recovery_id) =
            self.key
                .sign_prehash_recoverable(digest)
                .map_err(|e| Error::Signing {
                    reason: e.to_string(),
                })?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = 27 + recovery_id.to_byte();
        Ok(out)
    }

    /// Build and sign the payment for `requirements`, valid from `now`
    pub fn authorize(
        &self,
        requirements: &PaymentRequirements,
        x402_version: u32,
        now: i64,
    ) -> Result<PaymentPayload> {
        let chain_id = chain_id(&requirements.network).ok_or_else(|| Error::UnsupportedPayment {
            reason: format!("unknown network {:?}", requirements.network),
        })?;

        let domain = Domain {
            name: requirements
                .extra_str("name")
                .unwrap_or(DEFAULT_TOKEN_NAME)
                .to_string(),
            version: requirements
                .extra_str("version")
                .unwrap_or(DEFAULT_TOKEN_VERSION)
                .to_string(),
            chain_id,
            verifying_contract: parse_address(&requirements.asset)?,
        };

        let valid_after = (now - VALID_AFTER_SKEW_SECS).max(0) as u64;
        let valid_before = (now.max(0) as u64)
            .checked_add(requirements.max_timeout_seconds)
            .ok_or_else(|| Error::UnsupportedPayment {
                reason: format!(
                    "maxTimeoutSeconds {} out of range",
                    requirements.max_timeout_seconds
                ),
            })?;

        let message = TransferWithAuthorization {
            from: self.address,
            to: parse_address(&requirements.pay_to)?,
            value: requirements.amount()?,
            valid_after,
            valid_before,
            nonce: random_nonce(),
        };

        let signature = self.sign_digest(&message.signing_hash(&domain))?;

        Ok(PaymentPayload {
            x402_version,
            scheme: requirements.scheme.clone(),
            network: requirements.network.clone(),
            payload: ExactEvmPayload {
                signature: format!("0x{}", hex::encode(signature)),
                authorization: Authorization {
                    from: self.address(),
                    to: requirements.pay_to.clone(),
                    value: message.value.to_string(),
                    valid_after: valid_after.to_string(),
                    valid_before: valid_before.to_string(),
                    nonce: format!("0x{}", hex::encode(message.nonce)),
                },
            },
        })
    }
}

fn address_of(key: &SigningKey) -> Address {
    let public = k256::PublicKey::from(key.verifying_key());
    let point = public.to_encoded_point(false);
    // Uncompressed SEC1 point: 0x04 || X || Y
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// 32 random bytes from two v4 UUIDs
fn random_nonce() -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed[..16].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    seed[16..].copy_from_slice(uuid::Uuid::new_v4().as_bytes());
    keccak256(&seed)
}
