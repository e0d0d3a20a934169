//! x402 payment protocol, client side
//!
//! Covers the EVM `exact` scheme: requirement selection, EIP-3009
//! authorisation signing and the `X-PAYMENT` / `X-PAYMENT-RESPONSE` headers.

pub mod client;
pub mod eip712;
pub mod selector;
pub mod signer;
pub mod types;

pub use client::{PaidResponse, X402Client};
pub use selector::RequirementSelector;
pub use signer::EvmSigner;
pub use types::{
    PaymentPayload, PaymentRequiredResponse, PaymentRequirements, SettleResponse, X_PAYMENT,
    X_PAYMENT_RESPONSE,
};

/// JSON-RPC error code for payment required
pub const PAYMENT_REQUIRED_CODE: i32 = 402;
