//! Per-cycle reporting
//!
//! A [`CycleReport`] records what one reconciliation pass did. Records in
//! the report carry their content as it stood at the end of the cycle, so a
//! successfully updated record shows the new address.

use crate::error::ErrorKind;
use crate::traits::DnsRecord;
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every managed record was examined
    Completed,
    /// The public IP could not be resolved; nothing else was attempted
    ResolverFailed { kind: ErrorKind, error: String },
    /// The zone's records could not be listed; no update was attempted
    ListingFailed { kind: ErrorKind, error: String },
}

/// What happened to one listed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    /// Content already matched the resolved IP; no update was sent
    Unchanged,
    /// Content was changed by the provider
    Updated { previous_content: String },
    /// Not managed under the configured record filter
    Ignored,
    /// The update call failed; the record was left as it was
    Failed { kind: ErrorKind, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub record: DnsRecord,
    pub status: RecordStatus,
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub public_ip: Option<IpAddr>,
    pub outcome: CycleOutcome,
    pub records: Vec<RecordOutcome>,
}

impl CycleReport {
    pub(crate) fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            public_ip: None,
            outcome: CycleOutcome::Completed,
            records: Vec::new(),
        }
    }

    /// Whether the cycle got past resolving and listing
    pub fn is_complete(&self) -> bool {
        self.outcome == CycleOutcome::Completed
    }

    pub fn updated_count(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Updated { .. }))
    }

    pub fn unchanged_count(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Unchanged))
    }

    pub fn ignored_count(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Ignored))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Failed { .. }))
    }

    /// Look up a record's outcome by name
    ///
    /// Returns the first match; a zone may hold an A and an AAAA record
    /// under the same name.
    pub fn record(&self, name: &str) -> Option<&RecordOutcome> {
        self.records.iter().find(|o| o.record.name == name)
    }

    fn count(&self, pred: impl Fn(&RecordStatus) -> bool) -> usize {
        self.records.iter().filter(|o| pred(&o.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut report = CycleReport::new(Utc::now());
        report.records = vec![
            RecordOutcome {
                record: DnsRecord::new("1", "a.example.com", "A", "1.2.3.4"),
                status: RecordStatus::Updated {
                    previous_content: "9.9.9.9".to_string(),
                },
            },
            RecordOutcome {
                record: DnsRecord::new("2", "b.example.com", "A", "1.2.3.4"),
                status: RecordStatus::Unchanged,
            },
            RecordOutcome {
                record: DnsRecord::new("3", "c.example.com", "A", "9.9.9.9"),
                status: RecordStatus::Failed {
                    kind: ErrorKind::RateLimited,
                    error: "Rate limited: 429".to_string(),
                },
            },
        ];

        assert!(report.is_complete());
        assert_eq!(report.updated_count(), 1);
        assert_eq!(report.unchanged_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.ignored_count(), 0);
        assert_eq!(
            report.record("b.example.com").map(|o| &o.status),
            Some(&RecordStatus::Unchanged)
        );
        assert!(report.record("missing.example.com").is_none());
    }
}
