//! Fixture preparation: strip metadata and stage the code for the bundler

use crate::error::{Error, Result};
use bundle_size_core::{strip_fixture_metadata, PreparedFixture};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

/// Read one fixture, strip its metadata and write the remaining code
/// under `out_root` at the same relative path
pub async fn prepare_fixture(
    root: &Path,
    fixture: &str,
    out_root: &Path,
) -> Result<PreparedFixture> {
    let source_path = root.join(fixture);
    let source = tokio::fs::read_to_string(&source_path)
        .await
        .map_err(|e| Error::FileRead {
            path: source_path.display().to_string(),
            source: e,
        })?;

    let stripped = strip_fixture_metadata(&source).map_err(|e| Error::Prepare {
        fixture: fixture.to_string(),
        source: e,
    })?;

    let output_path = out_root.join(fixture);
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::FileWrite {
                path: parent.display().to_string(),
                source: e,
            })?;
    }
    tokio::fs::write(&output_path, stripped.code)
        .await
        .map_err(|e| Error::FileWrite {
            path: output_path.display().to_string(),
            source: e,
        })?;

    debug!("Prepared {} as '{}'", fixture, stripped.metadata.name);

    Ok(PreparedFixture {
        absolute_path: output_path,
        relative_path: fixture.to_string(),
        name: stripped.metadata.name,
    })
}

/// Prepare all fixtures concurrently
///
/// Results keep the order of `fixtures`. The first failure aborts the
/// remaining tasks and is returned.
pub async fn prepare_fixtures(
    root: &Path,
    fixtures: &[String],
    out_root: &Path,
) -> Result<Vec<PreparedFixture>> {
    let root: Arc<PathBuf> = Arc::new(root.to_path_buf());
    let out_root: Arc<PathBuf> = Arc::new(out_root.to_path_buf());

    let mut tasks = JoinSet::new();
    for (index, fixture) in fixtures.iter().enumerate() {
        let root = Arc::clone(&root);
        let out_root = Arc::clone(&out_root);
        let fixture = fixture.clone();
        tasks.spawn(async move {
            prepare_fixture(&root, &fixture, &out_root)
                .await
                .map(|prepared| (index, prepared))
        });
    }

    let mut slots: Vec<Option<PreparedFixture>> = vec![None; fixtures.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok((index, prepared)) => slots[index] = Some(prepared),
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
