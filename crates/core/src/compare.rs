//! Size report comparison logic

use crate::data::{MeasurementRecord, Report};
use crate::diff::{calculate_diff, DiffByMetric};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Directory name that marks where fixtures live inside a package
const FIXTURES_DIR: &str = "bundle-size";

/// Diffs of both metrics for one fixture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryDiff {
    pub minified: DiffByMetric,
    pub gzip: DiffByMetric,
    /// The fixture has no baseline counterpart
    pub empty: bool,
}

/// A current measurement merged with its baseline counterpart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComparedEntry {
    pub name: String,
    pub package_name: String,
    pub path: String,
    pub minified_size: u64,
    pub gzipped_size: u64,
    pub diff: EntryDiff,
}

impl ComparedEntry {
    /// New fixture, or either metric moved
    pub fn is_changed(&self) -> bool {
        self.diff.empty || self.diff.minified.delta != 0 || self.diff.gzip.delta != 0
    }

    /// Existing fixture measured at 0 B in the baseline that now has a size
    ///
    /// Its metric diffs are empty, so the deltas say nothing about it.
    pub fn grew_from_zero(&self) -> bool {
        !self.diff.empty
            && ((self.diff.minified.empty && self.minified_size > 0)
                || (self.diff.gzip.empty && self.gzipped_size > 0))
    }

    /// Minified growth relative to the baseline, in percent
    pub fn minified_change_percent(&self) -> Option<f64> {
        let before = self.diff.minified.before(self.minified_size)?;
        if before == 0 {
            return None;
        }
        Some(self.diff.minified.delta as f64 * 100.0 / before as f64)
    }
}

/// Result of comparing a current report against a baseline
///
/// One entry per current measurement, in the current report's order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct ComparedReport {
    entries: Vec<ComparedEntry>,
}

impl ComparedReport {
    pub fn entries(&self) -> &[ComparedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComparedEntry> {
        self.entries.iter()
    }
}

/// Derive the owning package name from a fixture path
///
/// The segment before a `bundle-size` directory wins
/// (`packages/react-button/bundle-size/Button.fixture.js` gives
/// `react-button`). Otherwise the file's parent directory is used, and a
/// path without directories gives an empty string.
pub fn package_name_from_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let segments: Vec<&str> = normalized
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();

    if let Some(pos) = segments.iter().rposition(|s| *s == FIXTURES_DIR) {
        if pos > 0 {
            return segments[pos - 1].to_string();
        }
    }

    if segments.len() >= 2 {
        return segments[segments.len() - 2].to_string();
    }

    String::new()
}

fn compare_record(
    baseline: Option<&MeasurementRecord>,
    current: &MeasurementRecord,
) -> ComparedEntry {
    let diff = match baseline {
        Some(before) => EntryDiff {
            minified: calculate_diff(Some(before.minified_size), current.minified_size),
            gzip: calculate_diff(Some(before.gzipped_size), current.gzipped_size),
            empty: false,
        },
        None => EntryDiff {
            minified: DiffByMetric::empty(),
            gzip: DiffByMetric::empty(),
            empty: true,
        },
    };

    ComparedEntry {
        name: current.name.clone(),
        package_name: package_name_from_path(&current.path),
        path: current.path.clone(),
        minified_size: current.minified_size,
        gzipped_size: current.gzipped_size,
        diff,
    }
}

/// Compare a current report against a baseline report
///
/// Fixtures only present in the baseline are not part of the result; see
/// [`removed_fixtures`].
pub fn compare_reports(baseline: &Report, current: &Report) -> ComparedReport {
    let baseline_map: HashMap<&str, &MeasurementRecord> = baseline
        .records()
        .iter()
        .map(|r| (r.path.as_str(), r))
        .collect();

    let entries = current
        .records()
        .iter()
        .map(|record| compare_record(baseline_map.get(record.path.as_str()).copied(), record))
        .collect();

    ComparedReport { entries }
}

/// Baseline measurements whose path no longer exists in the current report
pub fn removed_fixtures<'a>(baseline: &'a Report, current: &Report) -> Vec<&'a MeasurementRecord> {
    let current_paths: HashSet<&str> = current.records().iter().map(|r| r.path.as_str()).collect();

    baseline
        .records()
        .iter()
        .filter(|r| !current_paths.contains(r.path.as_str()))
        .collect()
}
