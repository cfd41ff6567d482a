//! Per-metric size difference between a baseline and a current measurement

use serde::{Deserialize, Serialize};

/// Difference of one metric (minified or gzipped size)
///
/// `empty` means there was nothing to compare against; `delta` and
/// `percent` are then zero and blank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DiffByMetric {
    pub delta: i64,
    pub percent: String,
    pub empty: bool,
}

impl DiffByMetric {
    /// Diff for a metric without a usable baseline
    pub fn empty() -> Self {
        Self {
            delta: 0,
            percent: String::new(),
            empty: true,
        }
    }

    /// Baseline size this diff was computed from, given the current size
    pub fn before(&self, after: u64) -> Option<u64> {
        if self.empty {
            return None;
        }
        let before = i128::from(after) - i128::from(self.delta);
        u64::try_from(before).ok()
    }
}

/// Compute the diff between an optional baseline size and the current size
///
/// A missing or zero baseline yields [`DiffByMetric::empty`]. Never panics.
pub fn calculate_diff(before: Option<u64>, after: u64) -> DiffByMetric {
    let before = match before {
        Some(before) if before > 0 => before,
        _ => return DiffByMetric::empty(),
    };

    let delta = i128::from(after) - i128::from(before);
    let delta = delta.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;

    DiffByMetric {
        delta,
        percent: format_percent(delta, before),
        empty: false,
    }
}

/// Format `delta / before` as a signed percentage rounded to two decimals
fn format_percent(delta: i64, before: u64) -> String {
    let ratio = delta as f64 * 100.0 / before as f64;
    let mut rounded = (ratio * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // avoid "-0%"
        rounded = 0.0;
    }

    if delta > 0 {
        format!("+{}%", rounded)
    } else {
        format!("{}%", rounded)
    }
}
