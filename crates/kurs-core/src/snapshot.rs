// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! The published result of a cycle.

use crate::registry::Registry;
use crate::types::{KursError, KursResult, ProvenanceTag, RateRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Origin label when only bank pages contributed.
pub const ORIGIN_WEB: &str = "web-only";
/// Origin label when the channel filled at least one record.
pub const ORIGIN_WEB_CHANNEL: &str = "web+channel";

/// Per-snapshot tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Both buy and sell known.
    pub full: usize,
    /// Exactly one side known.
    pub partial: usize,
    /// Neither side known.
    pub failed: usize,
    /// `full + partial`.
    pub resolved: usize,
    pub total: usize,
}

impl Counts {
    pub fn of(records: &[RateRecord]) -> Self {
        let full = records.iter().filter(|r| r.is_full()).count();
        let partial = records.iter().filter(|r| r.is_partial()).count();
        Self {
            full,
            partial,
            failed: records.len() - full - partial,
            resolved: full + partial,
            total: records.len(),
        }
    }
}

/// One record per registry source, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub records: Vec<RateRecord>,
    pub captured_at: Option<DateTime<Utc>>,
    /// Local date of the cycle, `dd.mm.yyyy`.
    pub post_date: Option<String>,
    pub counts: Counts,
    pub duration_ms: u64,
    pub origin: String,
}

impl Snapshot {
    /// The state before any cycle has committed.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Order `results` by the registry; sources without a result get an
    /// empty `none` record.
    pub fn assemble(
        registry: &Registry,
        mut results: HashMap<String, RateRecord>,
        captured_at: DateTime<Utc>,
        post_date: String,
        duration: Duration,
        origin: &str,
    ) -> Self {
        let records: Vec<RateRecord> = registry
            .iter()
            .map(|s| {
                results
                    .remove(&s.name)
                    .unwrap_or_else(|| RateRecord::empty(&s.name, ProvenanceTag::None))
            })
            .collect();
        Self {
            counts: Counts::of(&records),
            records,
            captured_at: Some(captured_at),
            post_date: Some(post_date),
            duration_ms: duration.as_millis() as u64,
            origin: origin.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn meets_threshold(&self, min_success: usize) -> bool {
        self.counts.resolved >= min_success
    }

    /// `Err(InsufficientCycle)` when too few sources resolved to publish.
    pub fn check_threshold(&self, min_success: usize) -> KursResult<()> {
        if self.meets_threshold(min_success) {
            Ok(())
        } else {
            Err(KursError::InsufficientCycle {
                resolved: self.counts.resolved,
                required: min_success,
            })
        }
    }

    /// Whole minutes since capture.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        self.captured_at.map(|t| (now - t).num_minutes())
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| !r.is_resolved())
            .map(|r| r.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Provenance, SourceDescriptor};

    fn registry() -> Registry {
        Registry::new(vec![
            SourceDescriptor::fetched("A", "https://a.test/"),
            SourceDescriptor::fetched("B", "https://b.test/"),
            SourceDescriptor::rendered("C", "https://c.test/", 0),
        ])
        .unwrap()
    }

    fn rec(name: &str, buy: Option<i64>, sell: Option<i64>) -> RateRecord {
        RateRecord {
            name: name.into(),
            buy,
            sell,
            provenance: Provenance::of(ProvenanceTag::Own),
        }
    }

    #[test]
    fn test_assemble_orders_by_registry_and_counts() {
        let mut results = HashMap::new();
        results.insert("C".to_string(), rec("C", Some(12100), None));
        results.insert("A".to_string(), rec("A", Some(12100), Some(12200)));
        let snap = Snapshot::assemble(
            &registry(),
            results,
            Utc::now(),
            "16.10.2026".into(),
            Duration::from_millis(1500),
            ORIGIN_WEB,
        );
        let names: Vec<_> = snap.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
        assert_eq!(snap.records[1].provenance.to_string(), "none");
        assert_eq!(
            snap.counts,
            Counts {
                full: 1,
                partial: 1,
                failed: 1,
                resolved: 2,
                total: 3
            }
        );
        assert_eq!(snap.failed_names(), ["B"]);
        assert!(snap.meets_threshold(2));
        assert!(matches!(
            snap.check_threshold(3),
            Err(KursError::InsufficientCycle {
                resolved: 2,
                required: 3
            })
        ));
    }

    #[test]
    fn test_empty_snapshot_round_trips() {
        let empty = Snapshot::empty();
        assert!(empty.is_empty());
        let json = serde_json::to_string(&empty).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, empty);
    }
}
