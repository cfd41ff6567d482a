//! File system operations for fixture discovery and build output

use crate::error::{Error, Result};
use std::path::{Component, Path};
use tracing::debug;

/// Default glob for fixture files, relative to the invocation root
pub const DEFAULT_FIXTURE_PATTERN: &str = "bundle-size/*.fixture.js";

/// Remove the output directory if present and recreate it empty
pub fn clear_output_dir(out_dir: &Path, root: &Path) -> Result<()> {
    if root.starts_with(out_dir) {
        return Err(Error::Validation(format!(
            "Refusing to clear '{}': it contains the project root",
            out_dir.display()
        )));
    }

    if out_dir.exists() {
        debug!("Removing previous output in {}", out_dir.display());
        std::fs::remove_dir_all(out_dir).map_err(|e| Error::FileWrite {
            path: out_dir.display().to_string(),
            source: e,
        })?;
    }

    ensure_dir_exists(out_dir)
}

/// Find fixture files matching `pattern` under `root`
///
/// Returns sorted `/`-separated paths relative to `root`. Finding nothing is
/// an error.
pub fn discover_fixtures(root: &Path, pattern: &str) -> Result<Vec<String>> {
    // the root itself is matched literally
    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        pattern.trim_start_matches("./")
    );

    let mut fixtures = Vec::new();
    for entry in glob::glob(&full_pattern)? {
        let path = entry.map_err(|e| Error::FileRead {
            path: e.path().display().to_string(),
            source: e.into_error(),
        })?;
        if !path.is_file() {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path);
        fixtures.push(to_slash_path(relative));
    }

    if fixtures.is_empty() {
        return Err(Error::Validation(format!(
            "No fixtures matching '{}' found in {}",
            pattern,
            root.display()
        )));
    }

    fixtures.sort();
    debug!("Discovered {} fixture(s)", fixtures.len());
    Ok(fixtures)
}

/// Join path components with `/` regardless of platform
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Create directory if it doesn't exist
pub fn ensure_dir_exists(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::FileWrite {
        path: dir.display().to_string(),
        source: e,
    })
}
