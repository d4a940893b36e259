// # dns-updater-core
//
// Core library for the public-IP DNS updater.
//
// ## Architecture Overview
//
// This library provides the reconciliation logic for keeping a zone's
// address records pointed at the caller's public IP:
// - **IpResolver**: Trait for detecting the current public IP
// - **DnsProvider**: Trait for listing and updating DNS records via provider APIs
// - **Ticker**: Trait for the timer that wakes the loop
// - **ReconcileEngine**: Core engine that runs resolve → list → update cycles
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from HTTP implementations
// 2. **Best-Effort Sweeps**: A failure is logged and the loop moves on
// 3. **Provider Is the Memory**: Nothing is persisted locally; the zone's records are the state
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: Records already at the right address are never written

pub mod traits;
pub mod engine;
pub mod schedule;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpResolver, DnsProvider, DnsRecord, Ticker};
pub use engine::{ReconcileEngine, EngineEvent, EngineState, CycleReport, CycleOutcome, RecordStatus};
pub use schedule::IntervalTicker;
pub use config::{UpdaterConfig, Credentials, IpSourceConfig, ProviderConfig, EngineConfig, LogConfig};
pub use error::{Error, ErrorKind, Result};
