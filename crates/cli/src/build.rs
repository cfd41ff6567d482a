//! Bundling prepared fixtures and measuring the output

use crate::config::{BundlerConfig, ConfigTransform};
use crate::error::{Error, Result};
use bundle_size_core::{MeasurementRecord, PreparedFixture};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Sizes of one bundled fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOutput {
    pub minified_size: u64,
    pub gzipped_size: u64,
}

/// Something able to bundle a prepared fixture.
///
/// Builds are blocking and run on the blocking thread pool.
pub trait BuildEngine: Send + Sync {
    fn build(&self, fixture: &PreparedFixture, transform: &ConfigTransform) -> Result<BuildOutput>;
}

/// Build engine spawning the configured bundler executable
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandBuildEngine;

impl CommandBuildEngine {
    /// Where the bundle for a prepared fixture is written
    pub fn output_path(input: &Path) -> PathBuf {
        input.with_extension("output.js")
    }
}

impl BuildEngine for CommandBuildEngine {
    fn build(&self, fixture: &PreparedFixture, transform: &ConfigTransform) -> Result<BuildOutput> {
        let config = transform(BundlerConfig::default());
        let input = &fixture.absolute_path;
        let output = Self::output_path(input);

        debug!("Running {} for {}", config.command, fixture.relative_path);

        let result = Command::new(&config.command)
            .args(config.resolved_args(input, &output))
            .envs(&config.env)
            .output()
            .map_err(|e| Error::Build {
                fixture: fixture.relative_path.clone(),
                message: format!("failed to run '{}': {}", config.command, e),
            })?;

        if !result.status.success() {
            return Err(Error::Build {
                fixture: fixture.relative_path.clone(),
                message: format!(
                    "'{}' exited with {}: {}",
                    config.command,
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            });
        }

        let bundle = std::fs::read(&output).map_err(|e| Error::FileRead {
            path: output.display().to_string(),
            source: e,
        })?;

        let gzipped_size = gzip_size(&bundle).map_err(|e| Error::Build {
            fixture: fixture.relative_path.clone(),
            message: format!("gzip compression failed: {}", e),
        })?;

        Ok(BuildOutput {
            minified_size: bundle.len() as u64,
            gzipped_size,
        })
    }
}

/// Length of `bytes` after gzip compression at the highest level
pub fn gzip_size(bytes: &[u8]) -> std::io::Result<u64> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?.len() as u64)
}

/// Wait for a free build slot
async fn acquire_build_slot(
    semaphore: Arc<Semaphore>,
    fixture: &str,
) -> Result<OwnedSemaphorePermit> {
    semaphore.acquire_owned().await.map_err(|_| Error::Build {
        fixture: fixture.to_string(),
        message: "build queue closed before the build could start".to_string(),
    })
}

/// Build all prepared fixtures with at most `concurrency` builds in flight
///
/// Records come back in the order of `fixtures`. The first failure aborts the
/// remaining builds.
pub async fn build_fixtures(
    engine: Arc<dyn BuildEngine>,
    fixtures: Vec<PreparedFixture>,
    transform: ConfigTransform,
    concurrency: usize,
) -> Result<Vec<MeasurementRecord>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = fixtures.len();

    let mut tasks = JoinSet::new();
    for (index, fixture) in fixtures.into_iter().enumerate() {
        let engine = Arc::clone(&engine);
        let transform = Arc::clone(&transform);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = acquire_build_slot(semaphore, &fixture.relative_path).await?;
            let output = tokio::task::spawn_blocking(move || {
                engine
                    .build(&fixture, &transform)
                    .map(|output| (fixture, output))
            })
            .await??;
            Ok::<_, Error>((index, output))
        });
    }

    let mut slots: Vec<Option<MeasurementRecord>> = vec![None; total];
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok((index, (fixture, output))) => {
                info!(
                    "{}: {} B minified, {} B gzipped",
                    fixture.relative_path, output.minified_size, output.gzipped_size
                );
                slots[index] = Some(MeasurementRecord::new(
                    fixture.name,
                    fixture.relative_path,
                    output.minified_size,
                    output.gzipped_size,
                ));
            }
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Reports sizes derived from the fixture name and tracks parallelism
    #[derive(Default)]
    struct FakeEngine {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl BuildEngine for FakeEngine {
        fn build(
            &self,
            fixture: &PreparedFixture,
            transform: &ConfigTransform,
        ) -> Result<BuildOutput> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            // later fixtures finish first
            let weight = 10 - fixture.name.len().min(10) as u64;
            std::thread::sleep(Duration::from_millis(weight * 3));
            self.running.fetch_sub(1, Ordering::SeqCst);

            if fixture.name.contains("broken") {
                return Err(Error::Build {
                    fixture: fixture.relative_path.clone(),
                    message: "syntax error".to_string(),
                });
            }

            let config = transform(BundlerConfig::default());
            Ok(BuildOutput {
                minified_size: fixture.name.len() as u64 * 100 + config.args.len() as u64,
                gzipped_size: fixture.name.len() as u64 * 10,
            })
        }
    }

    fn prepared(name: &str) -> PreparedFixture {
        PreparedFixture {
            absolute_path: PathBuf::from(format!("/out/bundle-size/{}.fixture.js", name)),
            relative_path: format!("bundle-size/{}.fixture.js", name),
            name: name.to_string(),
        }
    }

    fn identity() -> ConfigTransform {
        Arc::new(|config: BundlerConfig| config)
    }

    #[tokio::test]
    async fn test_build_fixtures_preserves_order() {
        let engine = Arc::new(FakeEngine::default());
        let fixtures = vec![prepared("a"), prepared("bbbb"), prepared("cccccccc")];

        let records = build_fixtures(engine, fixtures, identity(), 4).await.unwrap();
        let default_args = BundlerConfig::default().args.len() as u64;

        assert_eq!(
            records,
            vec![
                MeasurementRecord::new("a", "bundle-size/a.fixture.js", 100 + default_args, 10),
                MeasurementRecord::new(
                    "bbbb",
                    "bundle-size/bbbb.fixture.js",
                    400 + default_args,
                    40,
                ),
                MeasurementRecord::new(
                    "cccccccc",
                    "bundle-size/cccccccc.fixture.js",
                    800 + default_args,
                    80,
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_build_fixtures_respects_concurrency() {
        let engine = Arc::new(FakeEngine::default());
        let fixtures: Vec<PreparedFixture> = (0..6).map(|i| prepared(&format!("f{}", i))).collect();

        build_fixtures(engine.clone(), fixtures, identity(), 2).await.unwrap();
        assert!(engine.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_build_fixtures_applies_transform() {
        let engine = Arc::new(FakeEngine::default());
        let transform: ConfigTransform = Arc::new(|mut config: BundlerConfig| {
            config.args = vec!["{input}".to_string()];
            config
        });

        let records = build_fixtures(engine, vec![prepared("a")], transform, 1).await.unwrap();
        assert_eq!(records[0].minified_size, 101);
    }

    #[tokio::test]
    async fn test_build_fixtures_fails_fast() {
        let engine = Arc::new(FakeEngine::default());
        let fixtures = vec![prepared("a"), prepared("broken"), prepared("c")];

        let err = build_fixtures(engine, fixtures, identity(), 2).await.unwrap_err();
        assert!(err.to_string().contains("bundle-size/broken.fixture.js"));
    }

    #[tokio::test]
    async fn test_closed_build_queue_is_a_build_error() {
        let semaphore = Arc::new(Semaphore::new(1));
        semaphore.close();

        let err = acquire_build_slot(semaphore, "bundle-size/a.fixture.js")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Build { ref fixture, .. } if fixture == "bundle-size/a.fixture.js"
        ));
    }

    #[test]
    fn test_command_engine_reports_missing_executable() {
        let transform: ConfigTransform = Arc::new(|mut config: BundlerConfig| {
            config.command = "bundle-size-no-such-bundler".to_string();
            config
        });

        let err = CommandBuildEngine.build(&prepared("a"), &transform).unwrap_err();
        assert!(matches!(err, Error::Build { .. }));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            CommandBuildEngine::output_path(Path::new("/out/bundle-size/a.fixture.js")),
            PathBuf::from("/out/bundle-size/a.fixture.output.js")
        );
    }

    #[test]
    fn test_gzip_size() {
        let input = "export const x = 1;".repeat(100);
        let size = gzip_size(input.as_bytes()).unwrap();
        assert!(size > 0);
        assert!(size < input.len() as u64);

        // the measured size corresponds to a valid gzip stream
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(input.as_bytes()).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(compressed.len() as u64, size);
        let mut decoded = String::new();
        GzDecoder::new(compressed.as_slice()).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, input);
    }
}
