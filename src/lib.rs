//! ParsePro MCP Server Library
//!
//! This crate provides a single MCP tool:
//! - `parse_pdf`: Convert a PDF document to JSON or Markdown, paid with x402
//!
//! Conversion runs either on the remote NetMind ParsePro service or locally
//! with PDFium.

pub mod config;
pub mod convert;
pub mod error;
pub mod payment;
pub mod pdf;
pub mod server;
pub mod source;
pub mod x402;

pub use config::{Backend, PaymentConfig, ServerConfig};
pub use convert::{DocumentParser, OutputFormat, ParseOutput, ParseRequest, ParsedContent};
pub use error::{Error, ErrorKind, Result};
pub use server::{
    run_server, run_server_with_config, ParsePdfParams, ParsePdfResult, ParseProServer,
};
pub use source::DocumentSource;
