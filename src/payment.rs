//! Payment gate in front of `parse_pdf`

use crate::config::PaymentConfig;
use crate::error::{Error, Result};
use crate::x402::EvmSigner;

/// Turns the caller's payment proof into a signer, or rejects the call
#[derive(Debug, Clone)]
pub struct PaymentGate {
    require_payment: bool,
    default_proof: Option<String>,
}

impl PaymentGate {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            require_payment: config.require_payment,
            default_proof: config.default_private_key.clone(),
        }
    }

    pub fn require_payment(&self) -> bool {
        self.require_payment
    }

    /// Check the proof before any conversion work happens.
    ///
    /// A supplied proof must always be valid; a missing one is only an error
    /// when payment is required.
    pub fn authorize(&self, proof: Option<&str>) -> Result<Option<EvmSigner>> {
        let proof = proof
            .filter(|p| !p.trim().is_empty())
            .or(self.default_proof.as_deref());

        match proof {
            Some(proof) => {
                let signer = EvmSigner::from_hex(proof)?;
                tracing::info!(payer = %signer.address(), "payment credential accepted");
                Ok(Some(signer))
            }
            None if self.require_payment => Err(Error::PaymentRequired {
                reason: "payment proof required".to_string(),
            }),
            None => Ok(None),
        }
    }
}
