//! PDF reader wrapper for PDFium

use crate::error::{Error, Result};
use crate::pdf::layout::{layout_page, page_text, CharInfo, LayoutConfig, PageLayout};
use crate::pdf::markdown::render_markdown;
use pdfium_render::prelude::*;
use serde::Serialize;

/// Get PDFium instance (creates new instance each time - PDFium is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Whether the PDFium shared library can be bound in this process
pub fn pdfium_available() -> bool {
    create_pdfium().is_ok()
}

/// PDF metadata
#[derive(Debug, Clone, Default, Serialize)]
pub struct PdfMetadataInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// PDF reader using PDFium
///
/// All pages are laid out when the document is opened; the PDFium handle is
/// dropped before `open_bytes` returns.
pub struct PdfReader {
    metadata: PdfMetadataInfo,
    pages: Vec<PageLayout>,
    config: LayoutConfig,
}

impl PdfReader {
    /// Open a PDF from bytes
    pub fn open_bytes(data: &[u8], config: LayoutConfig) -> Result<Self> {
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::InvalidPdf {
                reason: "Not a valid PDF file".to_string(),
            });
        }

        let pdfium = create_pdfium()?;

        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(Self::map_pdfium_error)?;

        if document.pages().len() == 0 {
            return Err(Error::InvalidPdf {
                reason: "Document has no pages".to_string(),
            });
        }

        let metadata = Self::extract_metadata(&document);
        let pages = Self::layout_all_pages(&document, &config)?;

        Ok(Self {
            metadata,
            pages,
            config,
        })
    }

    fn extract_metadata(document: &PdfDocument) -> PdfMetadataInfo {
        let meta = document.metadata();
        let tag = |t: PdfDocumentMetadataTagType| meta.get(t).map(|t| t.value().to_string());
        PdfMetadataInfo {
            title: tag(PdfDocumentMetadataTagType::Title),
            author: tag(PdfDocumentMetadataTagType::Author),
            subject: tag(PdfDocumentMetadataTagType::Subject),
            creator: tag(PdfDocumentMetadataTagType::Creator),
            producer: tag(PdfDocumentMetadataTagType::Producer),
            creation_date: tag(PdfDocumentMetadataTagType::CreationDate),
            modification_date: tag(PdfDocumentMetadataTagType::ModificationDate),
        }
    }

    fn layout_all_pages(document: &PdfDocument, config: &LayoutConfig) -> Result<Vec<PageLayout>> {
        let pages = document.pages();
        let mut layouts = Vec::with_capacity(pages.len() as usize);

        for index in 0..pages.len() {
            let page = pages.get(index).map_err(|e| Error::Pdfium {
                reason: format!("Failed to get page {}: {}", index + 1, e),
            })?;

            let chars = Self::collect_chars_with_info(&page);
            layouts.push(layout_page(
                index as u32 + 1,
                chars,
                page.width().value,
                config,
            ));
        }

        Ok(layouts)
    }

    /// Collect character information from page text
    fn collect_chars_with_info(page: &PdfPage) -> Vec<CharInfo> {
        let text_obj = match page.text() {
            Ok(t) => t,
            Err(_) => return Vec::new(),
        };

        let mut chars = Vec::new();

        for segment in text_obj.segments().iter() {
            if let Ok(char_iter) = segment.chars() {
                for char_result in char_iter.iter() {
                    if let Some(c) = char_result.unicode_char() {
                        if let Ok(bounds) = char_result.loose_bounds() {
                            chars.push(CharInfo {
                                char: c,
                                x: bounds.left().value,
                                y: bounds.top().value,
                                width: bounds.width().value,
                                height: bounds.height().value,
                            });
                        }
                    }
                }
            }
        }

        chars
    }

    /// Map PDFium errors to our error type
    fn map_pdfium_error(err: PdfiumError) -> Error {
        match err {
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
                Error::PasswordRequired
            }
            PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError) => {
                Error::InvalidPdf {
                    reason: "Malformed PDF structure".to_string(),
                }
            }
            _ => Error::Pdfium {
                reason: format!("{}", err),
            },
        }
    }

    /// Get the number of pages
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get PDF metadata
    pub fn metadata(&self) -> &PdfMetadataInfo {
        &self.metadata
    }

    /// Extract text from all pages as (page number, text)
    pub fn extract_all_text(&self) -> Vec<(u32, String)> {
        self.pages
            .iter()
            .map(|layout| (layout.page, page_text(layout, &self.config)))
            .collect()
    }

    /// Render the document as Markdown
    pub fn to_markdown(&self) -> String {
        render_markdown(&self.pages, &self.config)
    }
}
