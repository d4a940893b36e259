//! Configuration types for the DNS updater
//!
//! One [`UpdaterConfig`] is built at start-up, validated, and then passed by
//! reference to everything that needs it. Every section except the
//! credentials has serde defaults, so a configuration file only has to name
//! the token and the zone.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Cloudflare API v4 base URL
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default IP-echo endpoint (Cloudflare trace, `key=value` lines)
pub const DEFAULT_IP_ECHO_URL: &str = "https://cloudflare.com/cdn-cgi/trace";

/// Default log file, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "dns_updater.log";

/// Shortest accepted polling interval
pub const MIN_INTERVAL_SECS: u64 = 10;

/// Longest accepted polling interval (one day)
pub const MAX_INTERVAL_SECS: u64 = 86_400;

const PLACEHOLDER_TOKENS: &[&str] = &["your_token", "replace_me", "changeme", "<token>"];

/// Main updater configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Provider credentials (required)
    #[serde(default)]
    pub credentials: Credentials,

    /// Where the public IP comes from
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// DNS provider client settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Reconciliation loop settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log sink settings
    #[serde(default)]
    pub log: LogConfig,
}

impl UpdaterConfig {
    /// Create a configuration with defaults and the given credentials
    pub fn new(api_token: impl Into<String>, zone_id: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(api_token, zone_id),
            ..Self::default()
        }
    }

    /// Validate the configuration
    ///
    /// Called once before the loop starts; any error here is fatal.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.credentials.validate()?;
        self.ip_source.validate()?;
        self.provider.validate()?;
        self.engine.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

/// Static provider credentials
///
/// The `Debug` implementation never exposes the API token.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Cloudflare API token with Zone:DNS:Edit permission
    #[serde(default)]
    pub api_token: String,

    /// Zone whose records are reconciled
    #[serde(default)]
    pub zone_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .finish()
    }
}

impl Credentials {
    pub fn new(api_token: impl Into<String>, zone_id: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            zone_id: zone_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.trim().is_empty() {
            return Err(crate::Error::config(
                "Cloudflare API token not set. Set CLOUDFLARE_API_TOKEN or credentials.api_token",
            ));
        }

        let token_lower = self.api_token.to_lowercase();
        if PLACEHOLDER_TOKENS.iter().any(|p| token_lower.contains(p)) || token_lower == "token" {
            return Err(crate::Error::config(
                "Cloudflare API token appears to be a placeholder. \
                Use an actual API token from the Cloudflare dashboard",
            ));
        }

        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config(
                "Cloudflare zone ID not set. Set CLOUDFLARE_ZONE_ID or credentials.zone_id",
            ));
        }

        if self.zone_id.contains('/') {
            return Err(crate::Error::config(format!(
                "Cloudflare zone ID contains invalid characters: {}",
                self.zone_id
            )));
        }

        Ok(())
    }
}

/// IP version the resolver accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only
    #[default]
    V4,
    /// IPv6 only
    V6,
    /// Whatever the echo service reports
    Any,
}

impl IpVersion {
    /// Whether `ip` belongs to this version
    pub fn accepts(&self, ip: &std::net::IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
            IpVersion::Any => true,
        }
    }
}

impl FromStr for IpVersion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v4" | "4" | "ipv4" => Ok(IpVersion::V4),
            "v6" | "6" | "ipv6" => Ok(IpVersion::V6),
            "any" | "both" => Ok(IpVersion::Any),
            other => Err(crate::Error::config(format!(
                "IP version '{}' is not valid. Valid versions: v4, v6, any",
                other
            ))),
        }
    }
}

/// IP-echo source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// URL of the IP-echo endpoint
    #[serde(default = "default_ip_echo_url")]
    pub url: String,

    /// Accepted IP version
    #[serde(default)]
    pub version: IpVersion,

    /// Per-request timeout in seconds
    #[serde(default = "default_ip_timeout_secs")]
    pub timeout_secs: u64,
}

impl IpSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        let url = url::Url::parse(&self.url).map_err(|e| {
            crate::Error::config(format!("IP source URL '{}' is invalid: {}", self.url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(crate::Error::config(format!(
                "IP source URL must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }

        if self.timeout_secs == 0 {
            return Err(crate::Error::config("IP source timeout must be > 0"));
        }

        Ok(())
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            url: default_ip_echo_url(),
            version: IpVersion::default(),
            timeout_secs: default_ip_timeout_secs(),
        }
    }
}

/// DNS provider client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL, without trailing slash
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// List records but only log intended updates
    #[serde(default)]
    pub dry_run: bool,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the provider configuration
    ///
    /// The bearer token travels with every request, so plain HTTP is only
    /// accepted for loopback hosts.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let url = url::Url::parse(&self.api_base).map_err(|e| {
            crate::Error::config(format!(
                "Provider API base '{}' is invalid: {}",
                self.api_base, e
            ))
        })?;

        match url.scheme() {
            "https" => {}
            "http" if is_loopback(&url) => {}
            _ => {
                return Err(crate::Error::config(format!(
                    "Provider API base must use an encrypted protocol (HTTPS). Got: {}",
                    self.api_base
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Provider timeout must be > 0"));
        }

        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: default_provider_timeout_secs(),
            dry_run: false,
        }
    }
}

fn is_loopback(url: &url::Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost",
        Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
        Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

/// Which listed records the loop manages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFilter {
    /// Only address records matching the resolved IP's family (A or AAAA)
    #[default]
    Address,
    /// Every record the provider lists, regardless of type
    All,
}

impl FromStr for RecordFilter {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "address" => Ok(RecordFilter::Address),
            "all" => Ok(RecordFilter::All),
            other => Err(crate::Error::config(format!(
                "Record filter '{}' is not valid. Valid filters: address, all",
                other
            ))),
        }
    }
}

/// Reconciliation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between the start of two cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Which records are managed
    #[serde(default)]
    pub record_filter: RecordFilter,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&self.interval_secs) {
            return Err(crate::Error::config(format!(
                "Polling interval must be between {} and {} seconds. Got: {}",
                MIN_INTERVAL_SECS, MAX_INTERVAL_SECS, self.interval_secs
            )));
        }

        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            record_filter: RecordFilter::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Log sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Append-only log file
    #[serde(default = "default_log_file")]
    pub path: PathBuf,

    /// Minimum level written (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Mirror log lines to stderr
    #[serde(default = "default_console")]
    pub console: bool,
}

impl LogConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.path.as_os_str().is_empty() {
            return Err(crate::Error::config("Log file path cannot be empty"));
        }

        if self.path.file_name().is_none() {
            return Err(crate::Error::config(format!(
                "Log file path must name a file. Got: {}",
                self.path.display()
            )));
        }

        match self.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(crate::Error::config(format!(
                "Log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                self.level
            ))),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_file(),
            level: default_log_level(),
            console: default_console(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_ip_echo_url() -> String {
    DEFAULT_IP_ECHO_URL.to_string()
}

fn default_ip_timeout_secs() -> u64 {
    10
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    30 * 60
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_console() -> bool {
    true
}
