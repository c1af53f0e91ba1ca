// Copyright 2026 Kurs Contributors
// SPDX-License-Identifier: Apache-2.0

//! Field-level merging of results from successive acquisition stages.
//!
//! A stage may only fill fields that are still empty; a value found by an
//! earlier stage is never replaced. Every stage that contributes a value
//! adds its tag to the record's provenance.

use crate::channel::ChannelQuotes;
use crate::normalize::RateBand;
use crate::types::{Provenance, ProvenanceTag, RateRecord, RawExtraction};
use tracing::debug;

/// Records that are empty or one-sided.
pub fn needs_reconciliation(record: &RateRecord) -> bool {
    !record.is_full()
}

pub fn any_incomplete(records: &[RateRecord]) -> bool {
    records.iter().any(needs_reconciliation)
}

/// Fill the record's empty fields from `buy`/`sell`.
///
/// Returns whether anything was filled; only then is `tag` recorded, and
/// the `none`/`error` markers of an unresolved record are cleared.
pub fn merge_missing(
    record: &mut RateRecord,
    buy: Option<i64>,
    sell: Option<i64>,
    tag: ProvenanceTag,
) -> bool {
    let mut filled = false;
    if record.buy.is_none() && buy.is_some() {
        record.buy = buy;
        filled = true;
    }
    if record.sell.is_none() && sell.is_some() {
        record.sell = sell;
        filled = true;
    }
    if filled {
        record.provenance.remove(ProvenanceTag::None);
        record.provenance.remove(ProvenanceTag::Error);
        record.provenance.insert(tag);
    }
    filled
}

/// Merge a stage's validated extraction into `record`.
pub fn merge_extraction(
    record: &mut RateRecord,
    raw: &RawExtraction,
    tag: ProvenanceTag,
    band: &RateBand,
) -> bool {
    let v = band.validate_and_fix(&record.name, raw.buy, raw.sell);
    let filled = merge_missing(record, v.buy, v.sell, tag);
    if filled && v.swapped {
        record.provenance.insert(ProvenanceTag::SwapFix);
    }
    filled
}

/// Re-apply the band and ordering rules after merging, and make sure an
/// unresolved record says why.
pub fn finalize(record: &mut RateRecord, band: &RateBand) {
    let v = band.validate_and_fix(&record.name, record.buy, record.sell);
    record.buy = v.buy;
    record.sell = v.sell;
    if v.swapped {
        record.provenance.insert(ProvenanceTag::SwapFix);
    }
    if !record.is_resolved() && !record.provenance.contains(ProvenanceTag::Error) {
        record.provenance = Provenance::of(ProvenanceTag::None);
    }
}

/// Fill incomplete records from channel quotes. Returns how many records
/// gained a value.
pub fn apply_channel(records: &mut [RateRecord], quotes: &ChannelQuotes, band: &RateBand) -> usize {
    let mut improved = 0;
    for record in records.iter_mut().filter(|r| needs_reconciliation(r)) {
        let (buy, sell) = quotes.quote(&record.name);
        if merge_missing(record, buy, sell, ProvenanceTag::Channel) {
            finalize(record, band);
            debug!(source = %record.name, buy = ?record.buy, sell = ?record.sell, provenance = %record.provenance, "filled from channel");
            improved += 1;
        }
    }
    improved
}
