//! PDF processing layer
//!
//! PDFium supplies positioned characters; layout and Markdown rendering are
//! pure functions over those characters.

pub mod layout;
pub mod markdown;
mod reader;

pub use layout::{CharInfo, LayoutConfig, LineInfo, PageLayout};
pub use markdown::render_markdown;
pub use reader::{pdfium_available, PdfMetadataInfo, PdfReader};
