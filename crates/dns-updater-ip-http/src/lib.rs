// # HTTP IP Resolver
//
// This crate provides the IP-echo resolver for the DNS updater.
//
// ## Purpose
//
// Asks an external "what is my IP" service for the caller's public address,
// once per reconciliation cycle. Nothing is cached between calls.
//
// ## Supported Response Formats
//
// Tried in order:
// - Bare address: `203.0.113.7` (api.ipify.org, icanhazip.com, ifconfig.me/ip)
// - Cloudflare trace: `key=value` lines including `ip=203.0.113.7`
//   (https://cloudflare.com/cdn-cgi/trace, the default)
// - JSON object with an `ip` field: `{"ip":"203.0.113.7"}` (api.ipify.org?format=json)

use dns_updater_core::config::{IpSourceConfig, IpVersion};
use dns_updater_core::traits::IpResolver;
use dns_updater_core::{Error, Result};

use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Deserialize)]
struct JsonIp {
    ip: String,
}

/// HTTP-based public IP resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL to fetch IP from
    url: String,

    /// Host of `url`, for log lines
    name: String,

    /// Accepted IP version
    version: IpVersion,

    /// HTTP client (carries the per-request timeout)
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a new HTTP IP resolver
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    /// - `version`: IP version to accept
    /// - `timeout`: Per-request timeout
    pub fn new(url: impl Into<String>, version: IpVersion, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| Error::config(format!("Invalid IP source URL '{}': {}", url, e)))?;
        let name = parsed.host_str().unwrap_or(url.as_str()).to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url,
            name,
            version,
            client,
        })
    }

    /// Create a resolver from configuration
    pub fn from_config(config: &IpSourceConfig) -> Result<Self> {
        Self::new(config.url.clone(), config.version, config.timeout())
    }

    /// Fetch the response body from the echo service
    async fn fetch_body(&self) -> Result<String> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::network(format!("Request to {} timed out: {}", self.name, e))
            } else {
                Error::network(format!("Request to {} failed: {}", self.name, e))
            }
        })?;

        if !response.status().is_success() {
            return Err(Error::network(format!(
                "{} answered with HTTP {}",
                self.name,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response from {}: {}", self.name, e)))
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        let body = self.fetch_body().await?;

        let ip = parse_ip_body(&body).ok_or_else(|| {
            Error::network(format!(
                "IP address not found in response from {}: {:?}",
                self.name,
                truncate(&body, 64)
            ))
        })?;

        if !self.version.accepts(&ip) {
            return Err(Error::network(format!(
                "Expected {:?} address from {}, got: {}",
                self.version, self.name, ip
            )));
        }

        tracing::debug!("{} reported public IP {}", self.name, ip);
        Ok(ip)
    }

    fn resolver_name(&self) -> &str {
        &self.name
    }
}

/// Extract an IP address from an echo-service response body
///
/// Returns `None` when no supported format yields a valid address.
pub fn parse_ip_body(body: &str) -> Option<IpAddr> {
    let trimmed = body.trim();

    // Bare address
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Some(ip);
    }

    // Cloudflare trace format
    if let Some(ip) = trimmed
        .lines()
        .filter_map(|line| line.trim().strip_prefix("ip="))
        .find_map(|value| value.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    // JSON object
    serde_json::from_str::<JsonIp>(trimmed)
        .ok()
        .and_then(|json| json.ip.trim().parse::<IpAddr>().ok())
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
