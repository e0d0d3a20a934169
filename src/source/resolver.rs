//! Source resolution for PDF data

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::source::DocumentSource;
use base64::Engine;
use futures_util::StreamExt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved PDF data
#[derive(Debug)]
pub struct ResolvedPdf {
    pub data: Vec<u8>,
    pub source_name: String,
}

/// Turns a [`DocumentSource`] into PDF bytes, applying the configured
/// path sandbox, SSRF guard and download limit
#[derive(Debug, Clone)]
pub struct SourceResolver {
    resource_dirs: Vec<String>,
    allow_private_urls: bool,
    max_download_bytes: u64,
    timeout: Duration,
}

impl SourceResolver {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            resource_dirs: config.resource_dirs.clone(),
            allow_private_urls: config.allow_private_urls,
            max_download_bytes: config.max_download_bytes,
            timeout: config.request_timeout,
        }
    }

    /// Resolve any source kind to PDF bytes
    pub async fn resolve(&self, source: &DocumentSource) -> Result<ResolvedPdf> {
        match source {
            DocumentSource::Path { path } => {
                let path = self.validate_path_access(path)?;
                resolve_path(path)
            }
            DocumentSource::Base64 { base64 } => resolve_base64(base64),
            DocumentSource::Url { url } => {
                resolve_url(
                    url,
                    self.allow_private_urls,
                    self.max_download_bytes,
                    self.timeout,
                )
                .await
            }
        }
    }

    /// Validate that a path is within allowed resource directories.
    /// If no resource_dirs are configured, all paths are allowed.
    pub fn validate_path_access(&self, path: &str) -> Result<PathBuf> {
        if self.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let canonical = std::fs::canonicalize(path).map_err(|_| Error::PathAccessDenied {
            path: path.to_string(),
        })?;

        for dir in &self.resource_dirs {
            if let Ok(canonical_dir) = std::fs::canonicalize(dir) {
                if canonical.starts_with(&canonical_dir) {
                    return Ok(canonical);
                }
            }
        }

        Err(Error::PathAccessDenied {
            path: path.to_string(),
        })
    }
}

fn check_pdf_header(data: &[u8], what: &str) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: format!("{} is not a valid PDF file", what),
        });
    }
    Ok(())
}

/// Resolve a file path to PDF data
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<ResolvedPdf> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Error::PdfNotFound {
            path: path.display().to_string(),
        });
    }

    let data = std::fs::read(path)?;
    check_pdf_header(&data, "File")?;

    Ok(ResolvedPdf {
        data,
        source_name: path.display().to_string(),
    })
}

/// Resolve base64 encoded data to PDF data
pub fn resolve_base64(base64_data: &str) -> Result<ResolvedPdf> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data.trim())?;
    check_pdf_header(&data, "Decoded data")?;

    Ok(ResolvedPdf {
        data,
        source_name: "<base64>".to_string(),
    })
}

/// Check if an IP address is private/reserved (loopback, link-local, private ranges, etc.)
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local() // 169.254/16, cloud metadata
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64 // CGNAT 100.64/10
        }
        IpAddr::V6(v6) => {
            // ::ffff:a.b.c.d reaches the IPv4 host
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(v4));
            }
            v6.is_loopback() || v6.is_unspecified() || {
                let segments = v6.segments();
                // fc00::/7 unique local, fe80::/10 link-local
                (segments[0] & 0xFE00) == 0xFC00 || (segments[0] & 0xFFC0) == 0xFE80
            }
        }
    }
}

/// Check URL for SSRF by resolving DNS and verifying IPs are public
async fn check_ssrf(url_str: &str) -> Result<()> {
    let parsed = url::Url::parse(url_str).map_err(|e| Error::SourceResolution {
        reason: format!("Invalid URL: {}", e),
    })?;

    let port = parsed.port_or_known_default().unwrap_or(443);

    let ips: Vec<IpAddr> = match parsed.host() {
        Some(url::Host::Ipv4(v4)) => vec![IpAddr::V4(v4)],
        Some(url::Host::Ipv6(v6)) => vec![IpAddr::V6(v6)],
        Some(url::Host::Domain(domain)) => tokio::net::lookup_host((domain, port))
            .await
            .map_err(|e| Error::SourceResolution {
                reason: format!("DNS resolution failed for {}: {}", domain, e),
            })?
            .map(|addr| addr.ip())
            .collect(),
        None => {
            return Err(Error::SourceResolution {
                reason: "URL has no host".to_string(),
            })
        }
    };

    if ips.iter().any(is_private_ip) {
        return Err(Error::SsrfBlocked {
            url: url_str.to_string(),
        });
    }

    Ok(())
}

/// Resolve a URL to PDF data with SSRF protection and download size limits
pub async fn resolve_url(
    url: &str,
    allow_private_urls: bool,
    max_download_bytes: u64,
    timeout: Duration,
) -> Result<ResolvedPdf> {
    if !allow_private_urls {
        check_ssrf(url).await?;
    }

    // Redirect targets would skip the address check
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(Error::SourceResolution {
            reason: format!("HTTP request failed with status: {}", response.status()),
        });
    }

    // Early rejection on declared length
    if let Some(content_length) = response.content_length() {
        if content_length > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: content_length,
                max_size: max_download_bytes,
            });
        }
    }

    let mut data = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        data.extend_from_slice(&chunk);
        if data.len() as u64 > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: data.len() as u64,
                max_size: max_download_bytes,
            });
        }
    }

    check_pdf_header(&data, "Downloaded data")?;

    Ok(ResolvedPdf {
        data,
        source_name: url.to_string(),
    })
}
