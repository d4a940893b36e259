// # DNS Provider Trait
//
// Defines the interface for listing and updating DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `dns-updater-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dns_updater_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     for record in provider.list_records("zone-id").await? {
//         println!("{} {} -> {}", record.record_type, record.name, record.content);
//     }
//
//     provider
//         .update_record("zone-id", "record-id", std::net::IpAddr::from([1, 2, 3, 4]))
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A DNS record as reported by the provider
///
/// The provider owns the record; the engine only holds this transient copy
/// for the duration of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Opaque provider-assigned identifier
    pub id: String,

    /// Fully-qualified name or wildcard pattern
    pub name: String,

    /// Record type (A, AAAA, CNAME, ...)
    #[serde(rename = "type")]
    pub record_type: String,

    /// Current target value
    pub content: String,

    /// Zone the record belongs to, when the provider reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,

    /// Time-to-live, when the provider reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Cloudflare proxy flag, when the provider reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

impl DnsRecord {
    /// Create a record with only the fields the engine relies on
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        record_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            record_type: record_type.into(),
            content: content.into(),
            zone_id: None,
            ttl: None,
            proxied: None,
        }
    }

    /// Whether this record's type is the address type for `ip`'s family
    pub fn matches_family(&self, ip: &IpAddr) -> bool {
        match ip {
            IpAddr::V4(_) => self.record_type.eq_ignore_ascii_case("A"),
            IpAddr::V6(_) => self.record_type.eq_ignore_ascii_case("AAAA"),
        }
    }

    /// Whether the record's content already equals `ip`
    ///
    /// Contents are compared as addresses when they parse, so `::1` and
    /// `0:0:0:0:0:0:0:1` are equal.
    pub fn points_to(&self, ip: &IpAddr) -> bool {
        match self.content.trim().parse::<IpAddr>() {
            Ok(current) => current == *ip,
            Err(_) => self.content.trim() == ip.to_string(),
        }
    }
}

/// Trait for DNS provider implementations
///
/// # Contract
///
/// - Every call is one discrete, authenticated request (pagination aside)
/// - No retry or backoff: errors go back to the engine, which logs them and
///   tries again on the next tick
/// - No decision about *whether* to update: the engine compares contents
///   and only calls [`DnsProvider::update_record`] for mismatches
///
/// # Error mapping
///
/// | Condition                  | Error                         |
/// |----------------------------|-------------------------------|
/// | token rejected (401/403)   | `Error::Authentication`       |
/// | zone/record gone (404)     | `Error::NotFound`             |
/// | throttled (429)            | `Error::RateLimited`          |
/// | transport failure/timeout  | `Error::Network`              |
/// | anything else              | `Error::Provider`             |
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record in the zone, regardless of type
    ///
    /// # Parameters
    ///
    /// - `zone_id`: The provider's zone identifier
    async fn list_records(&self, zone_id: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Point one record at a new address
    ///
    /// Only the record's content changes; name, type, TTL and proxy flag are
    /// left as they are.
    ///
    /// # Parameters
    ///
    /// - `zone_id`: The provider's zone identifier
    /// - `record_id`: The record's provider-assigned identifier
    /// - `new_ip`: The address to set
    ///
    /// # Returns
    ///
    /// - `Ok(DnsRecord)`: The record as the provider reports it after the update
    /// - `Err(Error)`: If the update failed
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        new_ip: IpAddr,
    ) -> Result<DnsRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
