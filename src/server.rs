//! MCP server exposing the `parse_pdf` tool

use crate::config::{Backend, ServerConfig};
use crate::convert::{
    DocumentParser, LocalParser, OutputFormat, ParseRequest, ParsedContent, PaymentContext,
    RemoteParser,
};
use crate::error::{self, Error, ErrorKind};
use crate::payment::PaymentGate;
use crate::source::DocumentSource;
use crate::x402::PAYMENT_REQUIRED_CODE;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
    ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

/// ParsePro MCP Server
#[derive(Clone)]
pub struct ParseProServer {
    parser: Arc<dyn DocumentParser>,
    gate: Arc<PaymentGate>,
    tool_router: ToolRouter<Self>,
    /// Server configuration
    config: Arc<ServerConfig>,
}

// ============================================================================
// Request/Response types for parse_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ParsePdfParams {
    /// PDF source: a URL string, or one of {"url": ...}, {"path": ...}, {"base64": ...}
    #[serde(alias = "url")]
    pub source: DocumentSource,

    /// Output format: "json" or "markdown"
    pub format: OutputFormat,

    /// Use the vision-language model (remote backend only)
    #[serde(default)]
    pub vlm: bool,

    /// Hex-encoded EVM private key used to sign the x402 payment
    #[serde(default)]
    pub private_key: Option<String>,

    /// x402 network to pay on (e.g. "base"), overriding the server default
    #[serde(default, alias = "custom_network_filter")]
    pub network: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParsePdfResult {
    pub source: String,
    pub format: OutputFormat,
    pub content: ParsedContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Settlement transaction hash of the payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
}

/// Map an error to a JSON-RPC error carrying its kind
pub fn to_mcp_error(error: &Error) -> McpError {
    let kind = error.kind();
    let data = Some(serde_json::json!({ "kind": kind.as_str() }));
    let message = error.client_message();

    match kind {
        ErrorKind::PaymentRequired => {
            McpError::new(ErrorCode(PAYMENT_REQUIRED_CODE), message, data)
        }
        ErrorKind::InvalidRequest => McpError::invalid_params(message, data),
        ErrorKind::ConversionFailed => McpError::internal_error(message, data),
    }
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl ParseProServer {
    /// Create a server with the backend selected by `config`
    pub fn new(config: ServerConfig) -> error::Result<Self> {
        let parser: Arc<dyn DocumentParser> = match config.backend {
            Backend::Remote => Arc::new(RemoteParser::new(&config)?),
            Backend::Local => Arc::new(LocalParser::new(&config)),
        };
        Ok(Self::with_parser(config, parser))
    }

    /// Create a server around an existing backend
    pub fn with_parser(config: ServerConfig, parser: Arc<dyn DocumentParser>) -> Self {
        Self {
            gate: Arc::new(PaymentGate::new(&config.payment)),
            parser,
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Parse a PDF document to JSON or Markdown
    #[tool(
        description = "Parse PDF document to json or markdown.

Source: a URL string, or one of {\"url\": \"https://...\"}, {\"path\": \"/absolute/path.pdf\"}, {\"base64\": \"...\"}. The remote ParsePro backend only accepts http(s) URLs.

Payment: the call is paid via x402; pass private_key (hex EVM key) unless the server has a default key configured."
    )]
    async fn parse_pdf(
        &self,
        Parameters(params): Parameters<ParsePdfParams>,
    ) -> Result<CallToolResult, McpError> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("parse_pdf", %request_id, backend = self.parser.name());

        async move {
            tracing::info!(
                source = %params.source.display_name(),
                format = %params.format,
                vlm = params.vlm,
                "parse_pdf called"
            );

            match self.process_parse_pdf(params).await {
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result)
                        .map_err(|e| to_mcp_error(&Error::from(e)))?;
                    Ok(CallToolResult::success(vec![Content::text(text)]))
                }
                Err(e) => {
                    tracing::warn!(error = %e, kind = e.kind().as_str(), "parse_pdf failed");
                    Err(to_mcp_error(&e))
                }
            }
        }
        .instrument(span)
        .await
    }
}

impl ParseProServer {
    /// Check payment, validate, convert
    pub async fn process_parse_pdf(&self, params: ParsePdfParams) -> error::Result<ParsePdfResult> {
        // Payment is checked before any argument is inspected
        let signer = self.gate.authorize(params.private_key.as_deref())?;

        let request = ParseRequest {
            source: params.source,
            format: params.format,
            vlm: params.vlm,
        };
        self.parser.validate(&request)?;

        let payment = PaymentContext {
            signer,
            network: params.network,
        };

        let output = self.parser.parse(&request, &payment).await?;

        if output.content.format() != request.format {
            return Err(Error::ConversionFailed {
                reason: format!(
                    "backend returned {} for a {} request",
                    output.content.format(),
                    request.format
                ),
            });
        }

        Ok(ParsePdfResult {
            source: request.source.display_name(),
            format: request.format,
            content: output.content,
            page_count: output.page_count,
            transaction: output.transaction,
        })
    }
}

#[tool_handler]
impl ServerHandler for ParseProServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "ParsePro MCP Server converts PDF documents to JSON or Markdown. \
                 Calls are paid with x402."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server with configuration from the environment
pub async fn run_server() -> anyhow::Result<()> {
    run_server_with_config(ServerConfig::from_env()?).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> anyhow::Result<()> {
    let server = ParseProServer::new(config)?;

    tracing::info!(
        backend = server.parser.name(),
        require_payment = server.gate.require_payment(),
        timeout_secs = server.config().request_timeout.as_secs(),
        "ParsePro MCP Server ready, waiting for connections..."
    );

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ParseOutput;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    enum Reply {
        Matching,
        Fixed(ParsedContent),
        Fail,
    }

    struct CountingParser {
        calls: Arc<AtomicUsize>,
        reply: Reply,
    }

    #[async_trait]
    impl DocumentParser for CountingParser {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn parse(
            &self,
            request: &ParseRequest,
            payment: &PaymentContext,
        ) -> error::Result<ParseOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let content = match &self.reply {
                Reply::Matching => match request.format {
                    OutputFormat::Json => {
                        ParsedContent::Json(serde_json::json!({"text": "Hello World"}))
                    }
                    OutputFormat::Markdown => ParsedContent::Markdown("Hello World".to_string()),
                },
                Reply::Fixed(content) => content.clone(),
                Reply::Fail => {
                    return Err(Error::InvalidPdf {
                        reason: "broken xref".to_string(),
                    })
                }
            };
            Ok(ParseOutput {
                content,
                page_count: Some(1),
                transaction: payment.signer.as_ref().map(|_| "0xabc".to_string()),
            })
        }
    }

    fn server(require_payment: bool, reply: Reply) -> (ParseProServer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut config = ServerConfig::default();
        config.payment.require_payment = require_payment;
        let parser = Arc::new(CountingParser {
            calls: calls.clone(),
            reply,
        });
        (ParseProServer::with_parser(config, parser), calls)
    }

    fn params(format: OutputFormat, private_key: Option<&str>) -> ParsePdfParams {
        ParsePdfParams {
            source: DocumentSource::Url {
                url: "https://example.com/sample.pdf".to_string(),
            },
            format,
            vlm: false,
            private_key: private_key.map(str::to_string),
            network: None,
        }
    }

    #[tokio::test]
    async fn test_missing_proof_never_reaches_parser() {
        let (server, calls) = server(true, Reply::Matching);
        let err = server
            .process_parse_pdf(params(OutputFormat::Json, None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentRequired);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_proof_never_reaches_parser() {
        for require_payment in [true, false] {
            let (server, calls) = server(require_payment, Reply::Matching);
            let err = server
                .process_parse_pdf(params(OutputFormat::Markdown, Some("0xdeadbeef")))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PaymentRequired);
            assert_eq!(calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_paid_call_returns_requested_format() {
        let (server, calls) = server(true, Reply::Matching);

        let json = server
            .process_parse_pdf(params(OutputFormat::Json, Some(TEST_KEY)))
            .await
            .unwrap();
        assert!(matches!(json.content, ParsedContent::Json(_)));
        assert_eq!(json.format, OutputFormat::Json);
        assert_eq!(json.transaction.as_deref(), Some("0xabc"));

        let md = server
            .process_parse_pdf(params(OutputFormat::Markdown, Some(TEST_KEY)))
            .await
            .unwrap();
        assert_eq!(md.content, ParsedContent::Markdown("Hello World".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gate_disabled_without_proof() {
        let (server, calls) = server(false, Reply::Matching);
        let result = server
            .process_parse_pdf(params(OutputFormat::Json, None))
            .await
            .unwrap();
        assert_eq!(result.transaction, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_format_mismatch_rejected() {
        let (server, _) = server(
            false,
            Reply::Fixed(ParsedContent::Markdown("# Title".to_string())),
        );
        let err = server
            .process_parse_pdf(params(OutputFormat::Json, None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailed);
    }

    #[tokio::test]
    async fn test_conversion_failure() {
        let (server, calls) = server(false, Reply::Fail);
        let err = server
            .process_parse_pdf(params(OutputFormat::Markdown, None))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unpaid_call_with_bad_url_is_payment_required() {
        let server = ParseProServer::new(ServerConfig::default()).unwrap();
        let mut p = params(OutputFormat::Json, None);
        p.source = DocumentSource::Url {
            url: "ftp://example.com/a.pdf".to_string(),
        };

        let err = server.process_parse_pdf(p).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentRequired);
    }

    #[tokio::test]
    async fn test_invalid_proof_with_unsupported_source_is_payment_required() {
        let server = ParseProServer::new(ServerConfig::default()).unwrap();
        let mut p = params(OutputFormat::Json, Some("0xdeadbeef"));
        p.source = DocumentSource::Path {
            path: "/tmp/a.pdf".to_string(),
        };

        let err = server.process_parse_pdf(p).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PaymentRequired);
    }

    #[tokio::test]
    async fn test_paid_call_with_bad_url_is_invalid_request() {
        let server = ParseProServer::new(ServerConfig::default()).unwrap();
        let mut p = params(OutputFormat::Json, Some(TEST_KEY));
        p.source = DocumentSource::Url {
            url: "ftp://example.com/a.pdf".to_string(),
        };

        let err = server.process_parse_pdf(p).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_params_accept_legacy_argument_names() {
        let p: ParsePdfParams = serde_json::from_value(serde_json::json!({
            "private_key": TEST_KEY,
            "url": "https://example.com/a.pdf",
            "format": "markdown",
            "vlm": true,
            "custom_network_filter": "base"
        }))
        .unwrap();
        assert_eq!(
            p.source,
            DocumentSource::Url {
                url: "https://example.com/a.pdf".to_string()
            }
        );
        assert_eq!(p.format, OutputFormat::Markdown);
        assert!(p.vlm);
        assert_eq!(p.network.as_deref(), Some("base"));
    }

    #[test]
    fn test_params_schema_allows_string_source() {
        let schema = serde_json::to_string(&rmcp::schemars::schema_for!(ParsePdfParams)).unwrap();
        assert!(schema.contains("http(s) URL or file path of the PDF"));
    }

    #[test]
    fn test_params_reject_unknown_format() {
        let result = serde_json::from_value::<ParsePdfParams>(serde_json::json!({
            "source": {"path": "/tmp/a.pdf"},
            "format": "html"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_error_mapping() {
        let payment = to_mcp_error(&Error::PaymentRequired {
            reason: "payment proof required".to_string(),
        });
        assert_eq!(payment.code, ErrorCode(PAYMENT_REQUIRED_CODE));
        assert_eq!(
            payment.data,
            Some(serde_json::json!({"kind": "payment_required"}))
        );

        let conversion = to_mcp_error(&Error::InvalidPdf {
            reason: "/secret/path.pdf".to_string(),
        });
        assert_eq!(conversion.code, ErrorCode::INTERNAL_ERROR);
        assert!(!conversion.message.contains("/secret"));

        let invalid = to_mcp_error(&Error::InvalidArgument {
            reason: "bad url".to_string(),
        });
        assert_eq!(invalid.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_single_tool_registered() {
        let (server, _) = server(true, Reply::Matching);
        let tools = server.tool_router.list_all();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "parse_pdf");
        assert!(server.get_info().capabilities.tools.is_some());
    }
}
