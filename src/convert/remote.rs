//! Conversion through the NetMind ParsePro x402 service

use super::{
    DocumentParser, OutputFormat, ParseOutput, ParseRequest, ParsedContent, PaymentContext,
};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::x402::{RequirementSelector, X402Client};
use async_trait::async_trait;
use serde::Serialize;

/// Longest service error body kept in an error
const MAX_ERROR_BODY: usize = 512;

/// Object fields that may carry the Markdown text
const MARKDOWN_FIELDS: [&str; 4] = ["markdown", "content", "result", "data"];

#[derive(Debug, Serialize)]
struct RemoteParseBody<'a> {
    url: &'a str,
    format: &'a str,
    vlm: bool,
}

/// Sends the document URL to the remote service, paying with x402
pub struct RemoteParser {
    http: reqwest::Client,
    endpoint_url: String,
    selector: RequirementSelector,
}

impl RemoteParser {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint_url: config.endpoint_url(),
            selector: RequirementSelector::new(
                config.payment.network_filter.clone(),
                config.payment.scheme_filter.clone(),
                config.payment.max_value,
            ),
        })
    }
}

/// Shape a successful service body into the requested format
pub(crate) fn shape_body(body: &str, format: OutputFormat) -> Result<ParsedContent> {
    if body.trim().is_empty() {
        return Err(Error::ConversionFailed {
            reason: "service returned an empty body".to_string(),
        });
    }

    let parsed = serde_json::from_str::<serde_json::Value>(body);

    match format {
        OutputFormat::Json => parsed
            .map(ParsedContent::Json)
            .map_err(|e| Error::ConversionFailed {
                reason: format!("service did not return JSON: {}", e),
            }),
        OutputFormat::Markdown => match parsed {
            Err(_) => Ok(ParsedContent::Markdown(body.to_string())),
            Ok(serde_json::Value::String(text)) => Ok(ParsedContent::Markdown(text)),
            Ok(serde_json::Value::Object(map)) => MARKDOWN_FIELDS
                .iter()
                .find_map(|field| map.get(*field).and_then(|v| v.as_str()))
                .map(|text| ParsedContent::Markdown(text.to_string()))
                .ok_or_else(|| Error::ConversionFailed {
                    reason: "service response carries no Markdown text".to_string(),
                }),
            Ok(_) => Err(Error::ConversionFailed {
                reason: "service response carries no Markdown text".to_string(),
            }),
        },
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[async_trait]
impl DocumentParser for RemoteParser {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn validate(&self, request: &ParseRequest) -> Result<()> {
        match request.source.as_url() {
            Some(url) if url.starts_with("http") => Ok(()),
            Some(_) => Err(Error::InvalidArgument {
                reason: "PDF URL must be a valid URL starting with http or https".to_string(),
            }),
            None => Err(Error::InvalidArgument {
                reason: "remote conversion only accepts URL sources".to_string(),
            }),
        }
    }

    async fn parse(&self, request: &ParseRequest, payment: &PaymentContext) -> Result<ParseOutput> {
        self.validate(request)?;
        let url = request.source.as_url().unwrap_or_default();

        let client = X402Client::new(
            self.http.clone(),
            payment.signer.clone(),
            self.selector.clone().with_network(payment.network.clone()),
        );

        let body = RemoteParseBody {
            url,
            format: request.format.as_str(),
            vlm: request.vlm,
        };
        let response = client.post_json(&self.endpoint_url, &body).await?;

        if !response.status.is_success() {
            return Err(Error::RemoteService {
                status: response.status.as_u16(),
                body: truncate(&response.body),
            });
        }

        let content = shape_body(&response.body, request.format)?;

        Ok(ParseOutput {
            content,
            page_count: None,
            transaction: response.transaction().map(str::to_string),
        })
    }
}
