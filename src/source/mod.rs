//! Source resolution

pub mod document;
pub mod resolver;

pub use document::DocumentSource;
pub use resolver::{resolve_base64, resolve_path, resolve_url, ResolvedPdf, SourceResolver};
