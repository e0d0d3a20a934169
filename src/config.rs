//! Server configuration
//!
//! All settings are read once at start-up from the environment.

use crate::error::{Error, Result};
use std::str::FromStr;
use std::time::Duration;

/// Default ParsePro service host
pub const DEFAULT_BASE_URL: &str = "https://x402.api.netmind.ai";

/// Default ParsePro parse endpoint
pub const DEFAULT_ENDPOINT: &str = "/inference-api/agent/v1/parse-pdf";

/// Which conversion backend serves `parse_pdf`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The NetMind ParsePro x402 service
    Remote,
    /// In-process conversion with PDFium
    Local,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(Backend::Remote),
            "local" => Ok(Backend::Local),
            other => Err(format!("expected \"remote\" or \"local\", got {:?}", other)),
        }
    }
}

/// x402 payment settings
#[derive(Debug, Clone, Default)]
pub struct PaymentConfig {
    /// Reject calls without a valid payment proof
    pub require_payment: bool,
    /// Credential used when a call does not carry one
    pub default_private_key: Option<String>,
    /// Only accept requirements on this network (e.g. "base")
    pub network_filter: Option<String>,
    /// Only accept requirements with this scheme
    pub scheme_filter: Option<String>,
    /// Maximum amount to authorise, in the asset's base units
    pub max_value: Option<u128>,
}

/// Security and resource configuration for the ParsePro MCP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Conversion backend
    pub backend: Backend,
    /// Remote service base URL
    pub base_url: String,
    /// Remote parse endpoint path
    pub endpoint: String,
    /// Remote request timeout
    pub request_timeout: Duration,
    /// Payment gate settings
    pub payment: PaymentConfig,
    /// Directories local paths must live in (empty allows all)
    pub resource_dirs: Vec<String>,
    /// Allow URLs that resolve to private/reserved IPs (default: false)
    pub allow_private_urls: bool,
    /// Maximum download size in bytes for URL sources (default: 100MB)
    pub max_download_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Remote,
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(60),
            payment: PaymentConfig {
                require_payment: true,
                ..PaymentConfig::default()
            },
            resource_dirs: Vec::new(),
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
        }
    }
}

impl ServerConfig {
    /// Configuration for the in-process backend with payment gating off
    pub fn local() -> Self {
        Self {
            backend: Backend::Local,
            payment: PaymentConfig::default(),
            ..Self::default()
        }
    }

    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("PARSEPRO_BACKEND") {
            Some(v) => parse_value("PARSEPRO_BACKEND", &v)?,
            None => Backend::Remote,
        };

        let mut config = match backend {
            Backend::Remote => Self::default(),
            Backend::Local => Self::local(),
        };

        if let Some(v) = get("PARSEPRO_BASE_URL") {
            url::Url::parse(&v).map_err(|e| Error::Config {
                key: "PARSEPRO_BASE_URL".to_string(),
                reason: e.to_string(),
            })?;
            config.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("PARSEPRO_ENDPOINT") {
            config.endpoint = if v.starts_with('/') {
                v
            } else {
                format!("/{}", v)
            };
        }
        if let Some(v) = get("HTTPX_DEFAULT_TIMEOUT") {
            let secs: u64 = parse_value("HTTPX_DEFAULT_TIMEOUT", &v)?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("PARSEPRO_REQUIRE_PAYMENT") {
            config.payment.require_payment = parse_bool("PARSEPRO_REQUIRE_PAYMENT", &v)?;
        }
        config.payment.default_private_key = get("PARSEPRO_PRIVATE_KEY");
        config.payment.network_filter = get("PARSEPRO_NETWORK");
        config.payment.scheme_filter = get("PARSEPRO_SCHEME");
        if let Some(v) = get("PARSEPRO_MAX_PAYMENT") {
            config.payment.max_value = Some(parse_value("PARSEPRO_MAX_PAYMENT", &v)?);
        }
        if let Some(v) = get("PARSEPRO_RESOURCE_DIRS") {
            config.resource_dirs = v
                .split(':')
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("PARSEPRO_ALLOW_PRIVATE_URLS") {
            config.allow_private_urls = parse_bool("PARSEPRO_ALLOW_PRIVATE_URLS", &v)?;
        }
        if let Some(v) = get("PARSEPRO_MAX_DOWNLOAD_BYTES") {
            config.max_download_bytes = parse_value("PARSEPRO_MAX_DOWNLOAD_BYTES", &v)?;
        }

        Ok(config)
    }

    /// Full URL of the remote parse endpoint
    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint)
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| Error::Config {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config {
            key: key.to_string(),
            reason: format!("expected a boolean, got {:?}", other),
        }),
    }
}
