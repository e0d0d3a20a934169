//! Error types for the ParsePro MCP server

use thiserror::Error;

/// Result type alias for the ParsePro MCP server
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-facing classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Payment proof missing, invalid, or not accepted by the service
    PaymentRequired,
    /// The document could not be converted
    ConversionFailed,
    /// The call arguments were rejected before any work happened
    InvalidRequest,
}

impl ErrorKind {
    /// Stable identifier sent to clients in error data
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PaymentRequired => "payment_required",
            ErrorKind::ConversionFailed => "conversion_failed",
            ErrorKind::InvalidRequest => "invalid_request",
        }
    }
}

/// Error types for the ParsePro MCP server
#[derive(Error, Debug)]
pub enum Error {
    /// Payment gate rejected the call
    #[error("Payment required: {reason}")]
    PaymentRequired { reason: String },

    /// No acceptable x402 payment requirement was offered
    #[error("No supported payment requirements: {reason}")]
    UnsupportedPayment { reason: String },

    /// Requested payment exceeds the configured limit
    #[error("Payment amount {amount} exceeds maximum {max_value}")]
    PaymentAmountExceeded { amount: u128, max_value: u128 },

    /// Payment signing failed
    #[error("Payment signing failed: {reason}")]
    Signing { reason: String },

    /// Remote conversion service answered with a failure
    #[error("Conversion service failed with status {status}: {body}")]
    RemoteService { status: u16, body: String },

    /// Conversion output could not be shaped into the requested format
    #[error("Conversion failed: {reason}")]
    ConversionFailed { reason: String },

    /// Invalid tool argument
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration for {key}: {reason}")]
    Config { key: String, reason: String },

    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is password protected
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Source resolution error
    #[error("Failed to resolve source: {reason}")]
    SourceResolution { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// SSRF blocked (URL resolves to private/reserved IP)
    #[error("SSRF blocked: {url}")]
    SsrfBlocked { url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },
}

impl Error {
    /// Classify the error for the tool response
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PaymentRequired { .. }
            | Error::UnsupportedPayment { .. }
            | Error::PaymentAmountExceeded { .. }
            | Error::Signing { .. } => ErrorKind::PaymentRequired,
            Error::InvalidArgument { .. }
            | Error::Config { .. }
            | Error::PathAccessDenied { .. } => ErrorKind::InvalidRequest,
            _ => ErrorKind::ConversionFailed,
        }
    }

    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, keys, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PaymentRequired { reason } => format!("Payment required: {}", reason),
            Error::UnsupportedPayment { .. } => {
                "Payment required: no supported payment requirements".to_string()
            }
            Error::PaymentAmountExceeded { amount, max_value } => format!(
                "Payment required: amount {} exceeds maximum {}",
                amount, max_value
            ),
            Error::Signing { .. } => "Payment required: could not sign payment".to_string(),
            Error::RemoteService { status, .. } => {
                format!("Conversion failed: service returned status {}", status)
            }
            Error::ConversionFailed { reason } => format!("Conversion failed: {}", reason),
            Error::InvalidArgument { reason } => format!("Invalid argument: {}", reason),
            Error::Config { key, .. } => format!("Invalid configuration: {}", key),
            Error::PdfNotFound { .. } => "Conversion failed: PDF not found".to_string(),
            Error::InvalidPdf { .. } => "Conversion failed: invalid PDF file".to_string(),
            Error::PasswordRequired => {
                "Conversion failed: PDF is password protected".to_string()
            }
            Error::SourceResolution { .. } => {
                "Conversion failed: could not resolve PDF source".to_string()
            }
            Error::Base64Decode(_) => "Conversion failed: invalid base64 data".to_string(),
            Error::HttpRequest(_) => "Conversion failed: HTTP request failed".to_string(),
            Error::Io(_) => "Conversion failed: I/O error".to_string(),
            Error::Pdfium { .. } => "Conversion failed: PDF processing error".to_string(),
            Error::Serialization(_) => "Conversion failed: serialization error".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::SsrfBlocked { .. } => "Conversion failed: URL not allowed".to_string(),
            Error::DownloadTooLarge { max_size, .. } => format!(
                "Conversion failed: download exceeds maximum size of {} bytes",
                max_size
            ),
        }
    }
}
