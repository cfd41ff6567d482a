//! Change classification of compared entries

use crate::compare::{compare_reports, removed_fixtures, ComparedEntry, ComparedReport};
use crate::data::Report;
use serde::{Deserialize, Serialize};

/// Classification label of a fixture between two reports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    New,
    Changed,
    Unchanged,
    Removed,
}

/// Label a compared entry
///
/// Entries come from the current report, so this never yields
/// [`ChangeKind::Removed`]. An entry that grew from a 0 B baseline is
/// `Changed` even though its deltas are zero.
pub fn classify(entry: &ComparedEntry) -> ChangeKind {
    if entry.diff.empty {
        ChangeKind::New
    } else if entry.is_changed() || entry.grew_from_zero() {
        ChangeKind::Changed
    } else {
        ChangeKind::Unchanged
    }
}

/// Entries worth presenting, in the order of the compared report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChangedEntries {
    pub changed_entries: Vec<ComparedEntry>,
    /// Number of dropped entries with identical sizes
    pub unchanged_count: usize,
    /// Dropped entries whose baseline was 0 B and that now have a size
    #[serde(default)]
    pub grown_from_zero: Vec<ComparedEntry>,
}

impl ChangedEntries {
    pub fn is_empty(&self) -> bool {
        self.changed_entries.is_empty()
    }

    pub fn new_entries(&self) -> impl Iterator<Item = &ComparedEntry> {
        self.changed_entries.iter().filter(|e| e.diff.empty)
    }
}

/// Keep new fixtures and fixtures whose size moved
///
/// Entries with zero deltas are never kept. Those that grew from a 0 B
/// baseline are set aside in `grown_from_zero` rather than counted as
/// unchanged.
pub fn changed_only(report: &ComparedReport) -> ChangedEntries {
    let mut changes = ChangedEntries::default();
    for entry in report.iter() {
        if entry.is_changed() {
            changes.changed_entries.push(entry.clone());
        } else if entry.grew_from_zero() {
            changes.grown_from_zero.push(entry.clone());
        } else {
            changes.unchanged_count += 1;
        }
    }
    changes
}

/// Label every fixture of both reports by path
///
/// Current fixtures come first in current order, followed by removed
/// fixtures in baseline order.
pub fn classify_reports(baseline: &Report, current: &Report) -> Vec<(String, ChangeKind)> {
    let compared = compare_reports(baseline, current);
    let removed = removed_fixtures(baseline, current);

    compared
        .iter()
        .map(|entry| (entry.path.clone(), classify(entry)))
        .chain(
            removed
                .into_iter()
                .map(|record| (record.path.clone(), ChangeKind::Removed)),
        )
        .collect()
}
