//! In-process conversion with PDFium

use super::{DocumentParser, OutputFormat, ParseOutput, ParseRequest, ParsedContent, PaymentContext};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::pdf::{LayoutConfig, PdfMetadataInfo, PdfReader};
use crate::source::SourceResolver;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct PageText {
    page: u32,
    text: String,
}

#[derive(Debug, Serialize)]
struct JsonDocument {
    text: String,
    page_count: u32,
    metadata: PdfMetadataInfo,
    pages: Vec<PageText>,
}

/// Converts PDFs locally from a path, URL or base64 payload
#[derive(Debug, Clone)]
pub struct LocalParser {
    resolver: SourceResolver,
    layout: LayoutConfig,
}

impl LocalParser {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            resolver: SourceResolver::new(config),
            layout: LayoutConfig::default(),
        }
    }

    /// Convert PDF bytes; blocking, run off the async runtime
    pub fn convert_bytes(
        data: &[u8],
        format: OutputFormat,
        layout: LayoutConfig,
    ) -> Result<ParseOutput> {
        let reader = PdfReader::open_bytes(data, layout)?;
        let page_count = reader.page_count();

        let content = match format {
            OutputFormat::Markdown => ParsedContent::Markdown(reader.to_markdown()),
            OutputFormat::Json => {
                let pages: Vec<PageText> = reader
                    .extract_all_text()
                    .into_iter()
                    .map(|(page, text)| PageText { page, text })
                    .collect();
                let text = pages
                    .iter()
                    .map(|p| p.text.as_str())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n");

                let doc = JsonDocument {
                    text,
                    page_count,
                    metadata: reader.metadata().clone(),
                    pages,
                };
                ParsedContent::Json(serde_json::to_value(doc)?)
            }
        };

        Ok(ParseOutput {
            content,
            page_count: Some(page_count),
            transaction: None,
        })
    }
}

#[async_trait]
impl DocumentParser for LocalParser {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn parse(
        &self,
        request: &ParseRequest,
        _payment: &PaymentContext,
    ) -> Result<ParseOutput> {
        if request.vlm {
            tracing::debug!("vlm has no effect on local conversion");
        }

        let resolved = self.resolver.resolve(&request.source).await?;
        tracing::debug!(
            source = %resolved.source_name,
            bytes = resolved.data.len(),
            "resolved PDF source"
        );

        let format = request.format;
        let layout = self.layout.clone();
        tokio::task::spawn_blocking(move || Self::convert_bytes(&resolved.data, format, layout))
            .await
            .map_err(|e| Error::ConversionFailed {
                reason: format!("conversion task failed: {}", e),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DocumentSource;

    #[tokio::test]
    async fn test_non_pdf_bytes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"just some text").unwrap();

        let parser = LocalParser::new(&ServerConfig::local());
        let request = ParseRequest {
            source: DocumentSource::Path {
                path: path.display().to_string(),
            },
            format: OutputFormat::Json,
            vlm: false,
        };

        let err = parser
            .parse(&request, &PaymentContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPdf { .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let parser = LocalParser::new(&ServerConfig::local());
        let request = ParseRequest {
            source: DocumentSource::Path {
                path: "/nonexistent/file.pdf".to_string(),
            },
            format: OutputFormat::Markdown,
            vlm: false,
        };

        let err = parser
            .parse(&request, &PaymentContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PdfNotFound { .. }));
    }
}
