// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 client for the DNS updater.
//
// ## Behaviour
//
// - One HTTP request per call (plus one per extra page when listing)
// - Errors are classified and returned to the engine; there is no retry here
// - Dry-run mode lists normally and only logs the intended PATCH
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Constructing a provider with an empty token is a configuration error
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=N&per_page=100`
// - Get DNS Record: GET `/zones/:zone_id/dns_records/:record_id`
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dns_updater_core::config::{Credentials, DEFAULT_API_BASE, ProviderConfig};
use dns_updater_core::traits::{DnsProvider, DnsRecord};
use dns_updater_core::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::time::Duration;

const PROVIDER_NAME: &str = "cloudflare";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing
const PAGE_SIZE: u32 = 100;

/// Upper bound on pages followed in a single listing
const MAX_PAGES: u32 = 500;

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,

    #[serde(default)]
    errors: Vec<ApiMessage>,

    result: Option<T>,

    result_info: Option<ResultInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,

    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default)]
    total_pages: u32,
}

/// Cloudflare DNS provider
///
/// Stateless apart from the HTTP client. All scheduling is owned by
/// `ReconcileEngine`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (listing, record lookup)
/// - Log the intended PATCH payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PATCH updates
    dry_run: bool,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider against the public API
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `dry_run`: If true, perform GET requests but skip PATCH updates
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the token is empty or the HTTP client
    /// cannot be built.
    pub fn new(api_token: impl Into<String>, dry_run: bool) -> Result<Self> {
        Self::with_settings(api_token, DEFAULT_API_BASE, DEFAULT_HTTP_TIMEOUT, dry_run)
    }

    /// Create a provider from validated configuration
    pub fn from_config(credentials: &Credentials, config: &ProviderConfig) -> Result<Self> {
        let provider = Self::with_settings(
            credentials.api_token.clone(),
            &config.api_base,
            config.timeout(),
            config.dry_run,
        )?;

        if provider.dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(provider)
    }

    fn with_settings(
        api_token: impl Into<String>,
        api_base: &str,
        timeout: Duration,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    /// Point the provider at a different API base (tests, proxies)
    pub fn with_api_base(mut self, api_base: impl AsRef<str>) -> Self {
        self.api_base = api_base.as_ref().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, zone_id)
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!("{}/zones/{}/dns_records/{}", self.api_base, zone_id, record_id)
    }

    /// Send a prepared request and unwrap the Cloudflare envelope
    ///
    /// `what` names the target for not-found messages.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<ApiResponse<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::network(format!("Cloudflare request timed out: {}", e))
                } else {
                    Error::network(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(map_status(status, &body, what));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            Error::provider(PROVIDER_NAME, format!("Failed to parse response: {}", e))
        })?;

        if !envelope.success {
            return Err(Error::provider(
                PROVIDER_NAME,
                format!("API reported failure: {}", describe_errors(&envelope.errors)),
            ));
        }

        Ok(envelope)
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let request = self.client.get(self.record_url(zone_id, record_id));
        let envelope: ApiResponse<DnsRecord> = self
            .send(request, &format!("DNS record {}", record_id))
            .await?;

        envelope.result.ok_or_else(|| {
            Error::provider(PROVIDER_NAME, "Invalid response format: missing result")
        })
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// List every record in the zone
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?page=1&per_page=100
    /// Authorization: Bearer <token>
    /// ```
    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>> {
        let url = self.records_url(zone_id);
        let what = format!("Zone {}", zone_id);
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let request = self
                .client
                .get(&url)
                .query(&[("page", page), ("per_page", PAGE_SIZE)]);
            let envelope: ApiResponse<Vec<DnsRecord>> = self.send(request, &what).await?;

            let batch = envelope.result.ok_or_else(|| {
                Error::provider(PROVIDER_NAME, "Invalid response format: result is not an array")
            })?;
            records.extend(batch);

            let total_pages = envelope.result_info.map_or(1, |info| info.total_pages);
            if !has_more_pages(page, total_pages, zone_id) {
                break;
            }
            page += 1;
        }

        tracing::debug!(
            "Listed {} records in zone {} ({} pages)",
            records.len(),
            zone_id,
            page
        );
        Ok(records)
    }

    /// Point one record at a new IP address
    ///
    /// # API Call
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// Authorization: Bearer <token>
    ///
    /// { "content": "1.2.3.4" }
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        new_ip: IpAddr,
    ) -> Result<DnsRecord> {
        let url = self.record_url(zone_id, record_id);
        let payload = serde_json::json!({ "content": new_ip.to_string() });

        if self.dry_run {
            let mut record = self.get_record(zone_id, record_id).await?;
            tracing::info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                url,
                payload
            );
            record.content = new_ip.to_string();
            return Ok(record);
        }

        let request = self.client.patch(&url).json(&payload);
        let envelope: ApiResponse<DnsRecord> = self
            .send(request, &format!("DNS record {}", record_id))
            .await?;

        envelope.result.ok_or_else(|| {
            Error::provider(PROVIDER_NAME, "Invalid response format: missing result")
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}

/// Map a non-success HTTP status to an updater error
/// Whether the listing should request the page after `page`
///
/// Stops at `MAX_PAGES` even when the zone reports more, and says so.
fn has_more_pages(page: u32, total_pages: u32, zone_id: &str) -> bool {
    if page >= total_pages {
        return false;
    }
    if page >= MAX_PAGES {
        tracing::warn!(
            "Zone {} reports {} pages of records, only the first {} were listed",
            zone_id,
            total_pages,
            MAX_PAGES
        );
        return false;
    }
    true
}

fn map_status(status: StatusCode, body: &str, what: &str) -> Error {
    let detail = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .ok()
        .filter(|envelope| !envelope.errors.is_empty())
        .map(|envelope| describe_errors(&envelope.errors))
        .unwrap_or_else(|| body.chars().take(200).collect());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {} - {}",
            status, detail
        )),
        404 => Error::not_found(format!("{} not found: {}", what, detail)),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("Cloudflare server error (transient): {} - {}", status, detail),
        ),
        _ => Error::provider(
            PROVIDER_NAME,
            format!("Request failed: {} - {}", status, detail),
        ),
    }
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
