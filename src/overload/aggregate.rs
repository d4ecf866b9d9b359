//! Daily overload aggregation
//!
//! Collapses every flag of a date into one capped score plus the sorted union
//! of flag types and affected lifts.

use super::{FlagType, OverloadFlag};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Overload summary of one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyOverloadRecord {
    pub date: NaiveDate,

    /// min(cap, sum of severities)
    pub overload_score: u32,
    pub overload_flags: BTreeSet<FlagType>,
    pub overload_lifts: BTreeSet<String>,
}

impl DailyOverloadRecord {
    /// Record for a date without flags
    pub fn none(date: NaiveDate) -> Self {
        Self {
            date,
            overload_score: 0,
            overload_flags: BTreeSet::new(),
            overload_lifts: BTreeSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.overload_score > 0
    }

    /// Pipe-joined flag names in alphabetical order, or "NONE"
    pub fn flags_label(&self) -> String {
        if self.overload_flags.is_empty() {
            return "NONE".to_string();
        }
        let mut names: Vec<&str> = self.overload_flags.iter().map(|f| f.as_str()).collect();
        names.sort_unstable();
        names.join("|")
    }

    /// Pipe-joined lift names, empty when none
    pub fn lifts_label(&self) -> String {
        self.overload_lifts
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Aggregate flags into one record per flagged date, sorted by date
pub fn aggregate_daily(flags: &[OverloadFlag], cap: u32) -> Vec<DailyOverloadRecord> {
    let mut days: BTreeMap<NaiveDate, DailyOverloadRecord> = BTreeMap::new();
    let mut totals: BTreeMap<NaiveDate, u32> = BTreeMap::new();

    for flag in flags {
        let record = days
            .entry(flag.date)
            .or_insert_with(|| DailyOverloadRecord::none(flag.date));
        record.overload_flags.insert(flag.flag_type);
        record.overload_lifts.insert(flag.exercise.clone());
        let total = totals.entry(flag.date).or_insert(0);
        *total = total.saturating_add(flag.severity);
    }

    days.into_iter()
        .map(|(date, mut record)| {
            record.overload_score = totals.get(&date).copied().unwrap_or(0).min(cap);
            record
        })
        .collect()
}

/// Record for `date`, falling back to an empty one
pub fn lookup(records: &[DailyOverloadRecord], date: NaiveDate) -> DailyOverloadRecord {
    records
        .binary_search_by_key(&date, |r| r.date)
        .map(|idx| records[idx].clone())
        .unwrap_or_else(|_| DailyOverloadRecord::none(date))
}
