//! Document reference accepted by `parse_pdf`

use rmcp::schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::Serialize;
use std::borrow::Cow;

/// Reference to the PDF to parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DocumentSource {
    /// File path (absolute or relative)
    Path {
        /// Path to the PDF file
        path: String,
    },
    /// URL to fetch the PDF from
    Url {
        /// URL of the PDF file
        url: String,
    },
    /// Base64 encoded PDF data
    Base64 {
        /// Base64 encoded PDF content
        base64: String,
    },
}

impl DocumentSource {
    /// Name used in logs and results; never contains payload data
    pub fn display_name(&self) -> String {
        match self {
            DocumentSource::Path { path } => path.clone(),
            DocumentSource::Url { url } => url.clone(),
            DocumentSource::Base64 { .. } => "<base64>".to_string(),
        }
    }

    /// URL of the document, if it is referenced by URL
    pub fn as_url(&self) -> Option<&str> {
        match self {
            DocumentSource::Url { url } => Some(url.as_str()),
            _ => None,
        }
    }
}

// Advertises the bare-string shorthand accepted by `Deserialize`
impl JsonSchema for DocumentSource {
    fn schema_name() -> Cow<'static, str> {
        "DocumentSource".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "anyOf": [
                {
                    "type": "string",
                    "description": "http(s) URL or file path of the PDF"
                },
                {
                    "type": "object",
                    "properties": {
                        "url": { "type": "string", "description": "URL of the PDF file" }
                    },
                    "required": ["url"]
                },
                {
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Path to the PDF file" }
                    },
                    "required": ["path"]
                },
                {
                    "type": "object",
                    "properties": {
                        "base64": {
                            "type": "string",
                            "description": "Base64 encoded PDF content"
                        }
                    },
                    "required": ["base64"]
                }
            ]
        })
    }
}

impl<'de> serde::Deserialize<'de> for DocumentSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        // A bare string is shorthand for a URL or a path
        if let Some(s) = value.as_str() {
            return Ok(if s.starts_with("http://") || s.starts_with("https://") {
                DocumentSource::Url { url: s.to_string() }
            } else {
                DocumentSource::Path {
                    path: s.to_string(),
                }
            });
        }

        let obj = value.as_object().ok_or_else(|| {
            serde::de::Error::custom(format!(
                "Invalid source: expected an object with one of \"path\", \"url\", or \"base64\", but got {}",
                match &value {
                    serde_json::Value::Array(_) => "an array",
                    serde_json::Value::Number(_) => "a number",
                    serde_json::Value::Bool(_) => "a boolean",
                    serde_json::Value::Null => "null",
                    _ => "unknown type",
                }
            ))
        })?;

        for key in ["path", "url", "base64"] {
            if let Some(v) = obj.get(key) {
                let s = v.as_str().ok_or_else(|| {
                    serde::de::Error::custom(format!("\"{}\" must be a string", key))
                })?;
                let s = s.to_string();
                return Ok(match key {
                    "path" => DocumentSource::Path { path: s },
                    "url" => DocumentSource::Url { url: s },
                    _ => DocumentSource::Base64 { base64: s },
                });
            }
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(serde::de::Error::custom(format!(
            "Invalid source: expected an object with one of \"path\", \"url\", or \"base64\", but got keys: {:?}",
            keys
        )))
    }
}
