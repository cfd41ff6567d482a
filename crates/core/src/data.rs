//! Data structures for fixtures, measurements and size reports

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Declarative metadata taken from a fixture's default export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureMetadata {
    /// Human readable fixture name
    pub name: String,
    /// Any other fields, kept as written
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A fixture whose metadata has been stripped and written to the output root
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFixture {
    /// Location of the transformed source consumed by the build engine
    pub absolute_path: PathBuf,
    /// Fixture path relative to the invocation root, `/`-separated
    pub relative_path: String,
    /// Name from the fixture metadata
    pub name: String,
}

/// Measured size of a single fixture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    pub name: String,
    pub path: String,
    pub minified_size: u64,
    pub gzipped_size: u64,
}

impl MeasurementRecord {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        minified_size: u64,
        gzipped_size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            minified_size,
            gzipped_size,
        }
    }
}

/// Ordered collection of measurements, unique by `path`
///
/// Serialized as a bare JSON array of [`MeasurementRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(try_from = "Vec<MeasurementRecord>", into = "Vec<MeasurementRecord>")]
pub struct Report {
    records: Vec<MeasurementRecord>,
}

impl Report {
    /// Build a report, rejecting duplicate paths
    pub fn new(records: Vec<MeasurementRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.path.as_str()) {
                return Err(Error::DuplicatePath(record.path.clone()));
            }
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&MeasurementRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    /// Parse a report from its JSON form
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a report from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_json(&content)
    }

    /// Save the report as JSON
    ///
    /// The file is written next to its destination and renamed into place,
    /// so an interrupted write never leaves a truncated report behind.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::FileWriteError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        std::fs::write(&staging, content).map_err(|e| Error::FileWriteError {
            path: staging.display().to_string(),
            source: e,
        })?;
        std::fs::rename(&staging, path).map_err(|e| Error::FileWriteError {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }
}

impl TryFrom<Vec<MeasurementRecord>> for Report {
    type Error = Error;

    fn try_from(records: Vec<MeasurementRecord>) -> Result<Self> {
        Self::new(records)
    }
}

impl From<Report> for Vec<MeasurementRecord> {
    fn from(report: Report) -> Self {
        report.records
    }
}
