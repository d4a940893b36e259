//! Test doubles and common utilities for engine contract tests
//!
//! These doubles count every call the engine makes so tests can assert on
//! exactly which network operations a cycle would have performed.

#![allow(dead_code)]

use dns_updater_core::config::UpdaterConfig;
use dns_updater_core::error::{Error, ErrorKind, Result};
use dns_updater_core::traits::{DnsProvider, DnsRecord, IpResolver, Ticker};
use dns_updater_core::EngineEvent;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, mpsc};
use tokio_stream::Stream;

pub const TEST_TOKEN: &str = "0123456789abcdef0123456789abcdef01234567";
pub const TEST_ZONE: &str = "023e105f4ecef8ad9ca31a8372d0c353";

/// Build the error a real client would return for `kind`
pub fn error_for(kind: ErrorKind) -> Error {
    match kind {
        ErrorKind::Authentication => Error::auth("Invalid API token (403)"),
        ErrorKind::NotFound => Error::not_found("DNS record not found"),
        ErrorKind::RateLimited => Error::rate_limited("Too many requests (429)"),
        ErrorKind::Network => Error::network("request timed out"),
        ErrorKind::Config => Error::config("bad config"),
        ErrorKind::Provider => Error::provider("mock", "server error (500)"),
    }
}

/// An IpResolver that plays back a script of answers
///
/// `None` entries fail with a network error. The last entry repeats once
/// the script runs out.
pub struct ScriptedResolver {
    script: Mutex<VecDeque<Option<IpAddr>>>,
    last: Mutex<Option<IpAddr>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn new(script: Vec<Option<IpAddr>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answers `ip`
    pub fn fixed(ip: IpAddr) -> Self {
        Self::new(vec![Some(ip)])
    }

    /// Always fails
    pub fn failing() -> Self {
        Self::new(vec![None])
    }

    /// Shared handle on the call counter
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl IpResolver for ScriptedResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let answer = {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            match script.pop_front() {
                Some(answer) => {
                    *last = answer;
                    answer
                }
                None => *last,
            }
        };

        answer.ok_or_else(|| error_for(ErrorKind::Network))
    }

    fn resolver_name(&self) -> &str {
        "scripted"
    }
}

/// An IpResolver that blocks until released, to observe the engine mid-cycle
pub struct GatedResolver {
    ip: IpAddr,
    gate: Arc<Notify>,
}

impl GatedResolver {
    pub fn new(ip: IpAddr) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (
            Self {
                ip,
                gate: Arc::clone(&gate),
            },
            gate,
        )
    }
}

#[async_trait::async_trait]
impl IpResolver for GatedResolver {
    async fn resolve(&self) -> Result<IpAddr> {
        self.gate.notified().await;
        Ok(self.ip)
    }
}

/// A fake zone that applies updates in memory and counts calls
///
/// Clones share state, so a test can keep one handle and give the engine
/// another.
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    zone: Arc<Mutex<Vec<DnsRecord>>>,
    list_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
    updated_ids: Arc<Mutex<Vec<String>>>,
    failing_ids: Arc<Mutex<HashMap<String, ErrorKind>>>,
    list_failure: Arc<Mutex<Option<ErrorKind>>>,
}

impl MockDnsProvider {
    pub fn new(records: Vec<DnsRecord>) -> Self {
        Self {
            zone: Arc::new(Mutex::new(records)),
            ..Self::default()
        }
    }

    /// Make every update of `record_id` fail with `kind`
    pub fn fail_updates_of(&self, record_id: &str, kind: ErrorKind) {
        self.failing_ids
            .lock()
            .unwrap()
            .insert(record_id.to_string(), kind);
    }

    /// Make listing fail with `kind`
    pub fn fail_listing(&self, kind: ErrorKind) {
        *self.list_failure.lock().unwrap() = Some(kind);
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn update_call_count(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Record IDs passed to update_record(), in call order
    pub fn updated_ids(&self) -> Vec<String> {
        self.updated_ids.lock().unwrap().clone()
    }

    /// Current content of a record in the fake zone
    pub fn content_of(&self, record_id: &str) -> Option<String> {
        self.zone
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == record_id)
            .map(|r| r.content.clone())
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(&self, _zone_id: &str) -> Result<Vec<DnsRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(kind) = *self.list_failure.lock().unwrap() {
            return Err(error_for(kind));
        }

        Ok(self.zone.lock().unwrap().clone())
    }

    async fn update_record(
        &self,
        _zone_id: &str,
        record_id: &str,
        new_ip: IpAddr,
    ) -> Result<DnsRecord> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.updated_ids.lock().unwrap().push(record_id.to_string());

        if let Some(kind) = self.failing_ids.lock().unwrap().get(record_id).copied() {
            return Err(error_for(kind));
        }

        let mut zone = self.zone.lock().unwrap();
        let record = zone
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| error_for(ErrorKind::NotFound))?;
        record.content = new_ip.to_string();

        Ok(record.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A ticker fed by the test
pub struct ManualTicker {
    rx: Mutex<Option<mpsc::UnboundedReceiver<()>>>,
}

impl ManualTicker {
    pub fn new() -> (Self, mpsc::UnboundedSender<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl Ticker for ManualTicker {
    fn ticks(&self) -> Pin<Box<dyn Stream<Item = ()> + Send + 'static>> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .expect("ticks() can only be called once");
        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

/// A ticker that fires `n` times and then ends, stopping the loop
pub struct FiniteTicker(pub usize);

impl Ticker for FiniteTicker {
    fn ticks(&self) -> Pin<Box<dyn Stream<Item = ()> + Send + 'static>> {
        Box::pin(tokio_stream::iter(vec![(); self.0]))
    }
}

/// Minimal valid configuration for tests
pub fn test_config() -> UpdaterConfig {
    let mut config = UpdaterConfig::new(TEST_TOKEN, TEST_ZONE);
    config.engine.event_channel_capacity = 100;
    config
}

/// An A record with the given content
pub fn a_record(id: &str, name: &str, content: &str) -> DnsRecord {
    let mut record = DnsRecord::new(id, name, "A", content);
    record.zone_id = Some(TEST_ZONE.to_string());
    record.ttl = Some(1);
    record.proxied = Some(false);
    record
}

/// Collect every event currently queued
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Poll `cond` until it holds, failing the test after two seconds
pub async fn wait_until(cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 2 seconds"
        );
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }
}
