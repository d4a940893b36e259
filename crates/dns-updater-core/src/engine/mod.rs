//! Core reconciliation engine
//!
//! The ReconcileEngine is responsible for:
//! - Waking up on every tick of its Ticker
//! - Resolving the current public IP via IpResolver
//! - Listing the zone's records via DnsProvider
//! - Updating every managed record whose content differs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Ticker    │──── tick ────┐
//! └─────────────┘              │
//!                              ▼
//!                     ┌─────────────────┐
//!                     │ ReconcileEngine │
//!                     └─────────────────┘
//!                              │
//!         ┌────────────────────┼────────────────────┐
//!         │                    │                    │
//!         ▼                    ▼                    ▼
//! ┌─────────────┐      ┌──────────────┐     ┌─────────────┐
//! │ IpResolver  │      │ DnsProvider  │     │   Events    │
//! │ (resolve)   │      │ (list/update)│     │  (notify)   │
//! └─────────────┘      └──────────────┘     └─────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Resolve the public IP; on failure log and go back to Idle
//! 2. List the zone's records; on failure log and go back to Idle
//! 3. For each managed record, sequentially: skip if it already points at
//!    the IP, otherwise update it; one failure never stops the others
//! 4. Wait for the next tick

mod report;

pub use report::{CycleOutcome, CycleReport, RecordOutcome, RecordStatus};

use crate::config::{RecordFilter, UpdaterConfig};
use crate::error::{ErrorKind, Result};
use crate::traits::{DnsProvider, DnsRecord, IpResolver, Ticker};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

/// Events emitted by the ReconcileEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started { zone_id: String },

    /// A tick fired and a cycle began
    CycleStarted,

    /// Public IP resolved
    IpResolved { ip: IpAddr },

    /// Public IP could not be resolved; the cycle is abandoned
    IpResolutionFailed { kind: ErrorKind, error: String },

    /// Zone records listed
    RecordsListed { count: usize },

    /// Zone records could not be listed; the cycle is abandoned
    ListingFailed { kind: ErrorKind, error: String },

    /// Record already points at the resolved IP
    UpdateSkipped {
        record_name: String,
        current_ip: IpAddr,
    },

    /// Record updated
    UpdateSucceeded {
        record_name: String,
        new_ip: IpAddr,
        previous_content: String,
    },

    /// Record update failed
    UpdateFailed {
        record_name: String,
        kind: ErrorKind,
        error: String,
    },

    /// Cycle over, engine back to Idle
    CycleFinished { updated: usize, failed: usize },

    /// Engine stopped
    Stopped { reason: String },
}

/// Loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for the next tick
    Idle,
    /// Inside a cycle
    Reconciling,
}

/// Holds the Reconciling state for as long as it lives
///
/// Lowered on drop, so a cycle cancelled at an await point still leaves the
/// engine Idle.
struct ReconcilingFlag<'a>(&'a AtomicBool);

impl<'a> ReconcilingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for ReconcilingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Core reconciliation engine
///
/// ## Lifecycle
///
/// 1. Create with [`ReconcileEngine::new()`]
/// 2. Start with [`ReconcileEngine::run()`]
/// 3. Engine runs until shutdown signal received (or the ticker ends)
///
/// ## Threading
///
/// Everything runs on the caller's task: one cycle at a time, one record
/// at a time. Nothing is spawned.
pub struct ReconcileEngine {
    /// Public IP source
    resolver: Box<dyn IpResolver>,

    /// DNS provider for listing and updating records
    provider: Box<dyn DnsProvider>,

    /// Wake-up source
    ticker: Box<dyn Ticker>,

    /// Zone whose records are reconciled
    zone_id: String,

    /// Which listed records are managed
    record_filter: RecordFilter,

    /// Provider only pretends to write
    dry_run: bool,

    /// True while a cycle runs
    reconciling: AtomicBool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconcileEngine {
    /// Create a new reconciliation engine
    ///
    /// # Parameters
    ///
    /// - `resolver`: IP resolver implementation
    /// - `provider`: DNS provider implementation
    /// - `ticker`: Ticker that paces the cycles
    /// - `config`: Updater configuration (validated here)
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Box<dyn IpResolver>,
        provider: Box<dyn DnsProvider>,
        ticker: Box<dyn Ticker>,
        config: &UpdaterConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            resolver,
            provider,
            ticker,
            zone_id: config.credentials.zone_id.clone(),
            record_filter: config.engine.record_filter,
            dry_run: config.provider.dry_run,
            reconciling: AtomicBool::new(false),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Current loop state
    pub fn state(&self) -> EngineState {
        if self.reconciling.load(Ordering::SeqCst) {
            EngineState::Reconciling
        } else {
            EngineState::Idle
        }
    }

    /// Run the engine until Ctrl-C
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the engine until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// The daemon wires SIGTERM/SIGINT into this; tests use it for
    /// controlled shutdown. Shutdown also interrupts a running cycle at its
    /// next await point; records already updated stay updated.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        info!(
            "Starting reconciliation for zone {} via {} (record filter: {:?})",
            self.zone_id,
            self.provider.provider_name(),
            self.record_filter
        );
        self.emit_event(EngineEvent::Started {
            zone_id: self.zone_id.clone(),
        });

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut ticks = self.ticker.ticks();

        let reason = loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break "Shutdown signal",

                tick = ticks.next() => match tick {
                    Some(()) => {
                        // Shutdown abandons a cycle in flight
                        tokio::select! {
                            biased;

                            _ = &mut shutdown => break "Shutdown signal",

                            _ = self.reconcile_once() => {}
                        }
                    }
                    None => break "Ticker exhausted",
                },
            }
        };

        info!("Engine stopped: {}", reason);
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });

        Ok(())
    }

    /// Run one reconciliation cycle
    ///
    /// Never fails: every error is logged, emitted as an event, and recorded
    /// in the returned report.
    pub async fn reconcile_once(&self) -> CycleReport {
        let reconciling = ReconcilingFlag::raise(&self.reconciling);
        self.emit_event(EngineEvent::CycleStarted);

        let report = self.run_cycle().await;

        drop(reconciling);
        debug!(
            "Cycle finished: {} updated, {} unchanged, {} failed, {} ignored",
            report.updated_count(),
            report.unchanged_count(),
            report.failed_count(),
            report.ignored_count()
        );
        self.emit_event(EngineEvent::CycleFinished {
            updated: report.updated_count(),
            failed: report.failed_count(),
        });

        report
    }

    async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::new(chrono::Utc::now());

        // Step 1: public IP
        let ip = match self.resolver.resolve().await {
            Ok(ip) => {
                info!("Current IP address: {}", ip);
                self.emit_event(EngineEvent::IpResolved { ip });
                ip
            }
            Err(e) => {
                error!(
                    "Failed to fetch current IP address from {} ({}): {}",
                    self.resolver.resolver_name(),
                    e.kind(),
                    e
                );
                self.emit_event(EngineEvent::IpResolutionFailed {
                    kind: e.kind(),
                    error: e.to_string(),
                });
                report.outcome = CycleOutcome::ResolverFailed {
                    kind: e.kind(),
                    error: e.to_string(),
                };
                return report;
            }
        };
        report.public_ip = Some(ip);

        // Step 2: zone records
        let records = match self.provider.list_records(&self.zone_id).await {
            Ok(records) => {
                info!("DNS records fetched successfully ({} records)", records.len());
                self.emit_event(EngineEvent::RecordsListed {
                    count: records.len(),
                });
                records
            }
            Err(e) => {
                error!(
                    "Failed to fetch DNS records for zone {} ({}): {}",
                    self.zone_id,
                    e.kind(),
                    e
                );
                self.emit_event(EngineEvent::ListingFailed {
                    kind: e.kind(),
                    error: e.to_string(),
                });
                report.outcome = CycleOutcome::ListingFailed {
                    kind: e.kind(),
                    error: e.to_string(),
                };
                return report;
            }
        };

        // Step 3: sequential sweep
        for record in records {
            let outcome = self.reconcile_record(record, ip).await;
            report.records.push(outcome);
        }

        report
    }

    /// Bring one record in line with `ip`
    async fn reconcile_record(&self, mut record: DnsRecord, ip: IpAddr) -> RecordOutcome {
        if !self.is_managed(&record, &ip) {
            debug!(
                "Skipping {} record {} (not managed under {:?} filter)",
                record.record_type, record.name, self.record_filter
            );
            return RecordOutcome {
                record,
                status: RecordStatus::Ignored,
            };
        }

        if record.points_to(&ip) {
            info!("No change needed for record {} (already {})", record.name, ip);
            self.emit_event(EngineEvent::UpdateSkipped {
                record_name: record.name.clone(),
                current_ip: ip,
            });
            return RecordOutcome {
                record,
                status: RecordStatus::Unchanged,
            };
        }

        match self
            .provider
            .update_record(&self.zone_id, &record.id, ip)
            .await
        {
            Ok(updated) => {
                let previous_content = std::mem::replace(&mut record.content, updated.content);
                if self.dry_run {
                    info!(
                        "[DRY-RUN] Would update record {} to IP {} (was {})",
                        record.name, ip, previous_content
                    );
                } else {
                    info!(
                        "Successfully updated record {} to IP {} (was {})",
                        record.name, ip, previous_content
                    );
                }
                self.emit_event(EngineEvent::UpdateSucceeded {
                    record_name: record.name.clone(),
                    new_ip: ip,
                    previous_content: previous_content.clone(),
                });
                RecordOutcome {
                    record,
                    status: RecordStatus::Updated { previous_content },
                }
            }
            Err(e) => {
                error!(
                    "Failed to update record {} ({}): {}",
                    record.name,
                    e.kind(),
                    e
                );
                self.emit_event(EngineEvent::UpdateFailed {
                    record_name: record.name.clone(),
                    kind: e.kind(),
                    error: e.to_string(),
                });
                RecordOutcome {
                    record,
                    status: RecordStatus::Failed {
                        kind: e.kind(),
                        error: e.to_string(),
                    },
                }
            }
        }
    }

    fn is_managed(&self, record: &DnsRecord, ip: &IpAddr) -> bool {
        match self.record_filter {
            RecordFilter::Address => record.matches_family(ip),
            RecordFilter::All => true,
        }
    }

    /// Emit an engine event
    ///
    /// A full channel drops the event with a warning rather than stalling
    /// the loop; a closed channel (nobody listening) is ignored.
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_event_equality() {
        let event = EngineEvent::UpdateSkipped {
            record_name: "example.com".to_string(),
            current_ip: IpAddr::from([1, 2, 3, 4]),
        };

        assert_eq!(event.clone(), event);
        assert_ne!(
            event,
            EngineEvent::UpdateSkipped {
                record_name: "www.example.com".to_string(),
                current_ip: IpAddr::from([1, 2, 3, 4]),
            }
        );
    }
}
