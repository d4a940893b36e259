//! Core traits for the DNS updater
//!
//! This module defines the abstract interfaces the engine is built on.
//!
//! - [`IpResolver`]: Detect the current public IP address
//! - [`DnsProvider`]: List and update DNS records via provider APIs
//! - [`Ticker`]: Wake the reconciliation loop

pub mod ip_resolver;
pub mod dns_provider;
pub mod ticker;

pub use ip_resolver::IpResolver;
pub use dns_provider::{DnsProvider, DnsRecord};
pub use ticker::Ticker;
