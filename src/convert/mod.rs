//! Conversion backends behind the `parse_pdf` tool

mod local;
mod remote;

pub use local::LocalParser;
pub use remote::RemoteParser;

use crate::error::Result;
use crate::source::DocumentSource;
use crate::x402::EvmSigner;
use async_trait::async_trait;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output format of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured JSON document
    Json,
    /// Markdown text
    Markdown,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single conversion job
#[derive(Debug, Clone)]
pub struct ParseRequest {
    pub source: DocumentSource,
    pub format: OutputFormat,
    /// Ask the remote service to use its vision-language model
    pub vlm: bool,
}

/// Payment credentials available to a backend for one call
#[derive(Debug, Clone, Default)]
pub struct PaymentContext {
    pub signer: Option<EvmSigner>,
    /// Per-call network filter, overriding the configured one
    pub network: Option<String>,
}

/// Converted document content
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParsedContent {
    Json(serde_json::Value),
    Markdown(String),
}

impl ParsedContent {
    /// Format this content is in
    pub fn format(&self) -> OutputFormat {
        match self {
            ParsedContent::Json(_) => OutputFormat::Json,
            ParsedContent::Markdown(_) => OutputFormat::Markdown,
        }
    }
}

/// Result of a conversion
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub content: ParsedContent,
    pub page_count: Option<u32>,
    /// Settlement transaction of the payment, if one was made
    pub transaction: Option<String>,
}

/// A PDF-to-JSON/Markdown conversion backend
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Reject requests this backend cannot serve, before payment is checked
    fn validate(&self, _request: &ParseRequest) -> Result<()> {
        Ok(())
    }

    async fn parse(&self, request: &ParseRequest, payment: &PaymentContext) -> Result<ParseOutput>;
}
