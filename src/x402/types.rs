//! x402 wire types and header codecs

use crate::error::{Error, Result};
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Request header carrying the signed payment
pub const X_PAYMENT: &str = "X-PAYMENT";

/// Response header carrying the settlement result
pub const X_PAYMENT_RESPONSE: &str = "X-PAYMENT-RESPONSE";

/// One way the resource server is willing to be paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    #[serde(deserialize_with = "deserialize_network")]
    pub network: String,
    #[serde(
        alias = "max_amount_required",
        deserialize_with = "deserialize_amount"
    )]
    pub max_amount_required: String,
    pub resource: String,
    pub description: String,
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    #[serde(
        default,
        alias = "output_schema",
        skip_serializing_if = "Option::is_none"
    )]
    pub output_schema: Option<Value>,
    #[serde(alias = "pay_to")]
    pub pay_to: String,
    #[serde(alias = "max_timeout_seconds")]
    pub max_timeout_seconds: u64,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl PaymentRequirements {
    /// Required amount in the asset's base units (empty means zero)
    pub fn amount(&self) -> Result<u128> {
        parse_amount(&self.max_amount_required)
            .map_err(|reason| Error::UnsupportedPayment { reason })
    }

    /// String field of `extra`, if present
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.as_ref()?.get(key)?.as_str()
    }
}

/// Normalize network aliases to x402 network names
pub fn normalize_network(network: &str) -> String {
    match network {
        "eip155:8453" => "base".to_string(),
        other => other.to_string(),
    }
}

fn parse_amount(value: &str) -> std::result::Result<u128, String> {
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse::<u128>()
        .map_err(|_| "max_amount_required must be an integer encoded as a string".to_string())
}

fn deserialize_network<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let network = String::deserialize(deserializer)?;
    Ok(normalize_network(&network))
}

fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = String::deserialize(deserializer)?;
    parse_amount(&amount).map_err(serde::de::Error::custom)?;
    Ok(amount)
}

/// Body of an HTTP 402 response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredResponse {
    #[serde(alias = "x402_version")]
    pub x402_version: u32,
    pub accepts: Vec<PaymentRequirements>,
    #[serde(default)]
    pub error: String,
}

/// EIP-3009 authorisation fields, as decimal / hex strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub from: String,
    pub to: String,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    pub nonce: String,
}

/// Payload of the `exact` scheme on EVM networks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExactEvmPayload {
    pub signature: String,
    pub authorization: Authorization,
}

/// Signed payment sent in the `X-PAYMENT` header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: ExactEvmPayload,
}

impl PaymentPayload {
    /// Encode as an `X-PAYMENT` header value
    pub fn to_header(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    /// Decode an `X-PAYMENT` header value
    pub fn from_header(header: &str) -> Result<Self> {
        let json = base64::engine::general_purpose::STANDARD.decode(header.trim())?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Settlement result returned in `X-PAYMENT-RESPONSE`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl SettleResponse {
    /// Encode as an `X-PAYMENT-RESPONSE` header value
    pub fn to_header(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    /// Decode an `X-PAYMENT-RESPONSE` header value
    pub fn from_header(header: &str) -> Result<Self> {
        let json = base64::engine::general_purpose::STANDARD.decode(header.trim())?;
        Ok(serde_json::from_slice(&json)?)
    }
}
