//! bundle-size-core - Fixture contract and size report comparison
//!
//! This crate holds everything that does not need a bundler or an async
//! runtime, so the CLI and any other front end share the same rules.
//!
//! # Features
//!
//! - Extract literal metadata from a fixture's default export and strip it
//! - Size reports keyed by fixture path, stored as JSON
//! - Per-metric diffs with percentage change
//! - Comparison of a current report against a baseline
//! - Change classification and text / markdown / JSON rendering
//!
//! # Example
//!
//! ```
//! use bundle_size_core::{changed_only, compare_reports, MeasurementRecord, Report};
//!
//! let baseline = Report::new(vec![MeasurementRecord::new("A", "a.fixture.js", 100, 50)]).unwrap();
//! let current = Report::new(vec![MeasurementRecord::new("A", "a.fixture.js", 120, 50)]).unwrap();
//!
//! let changes = changed_only(&compare_reports(&baseline, &current));
//! assert_eq!(changes.changed_entries[0].diff.minified.percent, "+20%");
//! ```

pub mod classify;
pub mod compare;
pub mod data;
pub mod diff;
pub mod error;
pub mod fixture;
pub mod reporter;

pub use classify::{changed_only, classify, classify_reports, ChangeKind, ChangedEntries};
pub use compare::{
    compare_reports, package_name_from_path, removed_fixtures, ComparedEntry, ComparedReport,
    EntryDiff,
};
pub use data::{FixtureMetadata, MeasurementRecord, PreparedFixture, Report};
pub use diff::{calculate_diff, DiffByMetric};
pub use error::{Error, ExtractionFailure, Result};
pub use fixture::{strip_fixture_metadata, StrippedFixture};
