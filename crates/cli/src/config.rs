//! Project configuration
//!
//! Loaded once from `bundle-size.config.json`, found by walking up from the
//! invocation root, and passed down explicitly.

use crate::error::{Error, Result};
use crate::validation::validate_concurrency;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "bundle-size.config.json";

/// Placeholder replaced with the prepared fixture path
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder replaced with the build output path
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// How the bundler executable is invoked for one fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            command: "esbuild".to_string(),
            args: [
                INPUT_PLACEHOLDER,
                "--bundle",
                "--minify",
                "--format=esm",
                "--log-level=warning",
                "--outfile={output}",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            env: BTreeMap::new(),
        }
    }
}

impl BundlerConfig {
    /// Arguments with the input and output placeholders filled in
    pub fn resolved_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

/// Hook turning the default bundler configuration into the final one
pub type ConfigTransform = Arc<dyn Fn(BundlerConfig) -> BundlerConfig + Send + Sync>;

/// Bundler section of the config file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundlerOverrides {
    /// Replaces the bundler executable
    pub command: Option<String>,
    /// Replaces the default arguments
    pub args: Option<Vec<String>>,
    /// Appended after the (default or replaced) arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub bundler: BundlerOverrides,
    /// Maximum number of concurrent builds
    pub concurrency: Option<usize>,
}

impl ProjectConfig {
    /// Find the config file in `start` or its closest ancestor
    pub fn find(start: &Path) -> Result<PathBuf> {
        Self::find_in(start, start.ancestors())
    }

    /// Find the config file in the first of `dirs` holding one
    fn find_in<'a>(start: &Path, dirs: impl IntoIterator<Item = &'a Path>) -> Result<PathBuf> {
        dirs.into_iter()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::ConfigurationNotFound {
                file_name: CONFIG_FILE_NAME,
                searched_from: start.display().to_string(),
            })
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Locate and load the config for an invocation root
    pub fn discover(start: &Path) -> Result<Self> {
        Self::load(&Self::find(start)?)
    }

    fn validate(&self) -> Result<()> {
        validate_concurrency(self.concurrency)?;

        if let Some(command) = &self.bundler.command {
            if command.trim().is_empty() {
                return Err(Error::Config("bundler.command cannot be empty".to_string()));
            }
        }
        if let Some(args) = &self.bundler.args {
            if !args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
                return Err(Error::Config(format!(
                    "bundler.args must reference the fixture with {}",
                    INPUT_PLACEHOLDER
                )));
            }
        }

        Ok(())
    }

    /// Number of builds allowed to run at once
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Transform hook applying this project's bundler overrides
    pub fn bundler_transform(&self) -> ConfigTransform {
        let overrides = self.bundler.clone();
        Arc::new(move |mut config: BundlerConfig| {
            if let Some(command) = &overrides.command {
                config.command = command.clone();
            }
            if let Some(args) = &overrides.args {
                config.args = args.clone();
            }
            config.args.extend(overrides.extra_args.iter().cloned());
            config
                .env
                .extend(overrides.env.iter().map(|(k, v)| (k.clone(), v.clone())));
            config
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        let nested = dir.path().join("packages").join("button");
        fs::create_dir_all(&nested).unwrap();

        let found = ProjectConfig::find(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));
    }

    /// Ancestors of `start` that stay inside `root`
    fn within<'a>(root: &'a Path, start: &'a Path) -> impl Iterator<Item = &'a Path> {
        start.ancestors().take_while(move |dir| dir.starts_with(root))
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("packages").join("button");
        fs::create_dir_all(&nested).unwrap();

        let err = ProjectConfig::find_in(&nested, within(dir.path(), &nested)).unwrap_err();
        assert!(matches!(err, Error::ConfigurationNotFound { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
        assert!(err.to_string().contains("button"));
    }

    #[test]
    fn test_find_stops_at_the_last_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        let nested = dir.path().join("packages").join("button");
        fs::create_dir_all(&nested).unwrap();

        let found = ProjectConfig::find_in(&nested, within(dir.path(), &nested)).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE_NAME));

        let packages = dir.path().join("packages");
        let err = ProjectConfig::find_in(&nested, within(&packages, &nested)).unwrap_err();
        assert!(matches!(err, Error::ConfigurationNotFound { .. }));
    }

    #[test]
    fn test_empty_config_keeps_defaults() {
        let config: ProjectConfig = serde_json::from_str("{}").unwrap();
        let transform = config.bundler_transform();

        assert_eq!(transform(BundlerConfig::default()), BundlerConfig::default());
    }

    #[test]
    fn test_transform_applies_overrides() {
        let config: ProjectConfig = serde_json::from_str(
            r#"{
                "bundler": {
                    "command": "node_modules/.bin/esbuild",
                    "extraArgs": ["--target=es2019"],
                    "env": { "NODE_ENV": "production" }
                },
                "concurrency": 2
            }"#,
        )
        .unwrap();

        let bundler = config.bundler_transform()(BundlerConfig::default());
        assert_eq!(bundler.command, "node_modules/.bin/esbuild");
        assert_eq!(bundler.args.last().map(String::as_str), Some("--target=es2019"));
        assert_eq!(bundler.args.len(), BundlerConfig::default().args.len() + 1);
        assert_eq!(bundler.env.get("NODE_ENV").map(String::as_str), Some("production"));
        assert_eq!(config.concurrency(), 2);
    }

    #[test]
    fn test_load_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        for content in [
            r#"{ "concurrency": 0 }"#,
            r#"{ "bundler": { "command": " " } }"#,
            r#"{ "bundler": { "args": ["--minify"] } }"#,
            r#"{ "webpack": {} }"#,
            "not json",
        ] {
            fs::write(&path, content).unwrap();
            assert!(ProjectConfig::load(&path).is_err(), "expected {:?} to be rejected", content);
        }
    }

    #[test]
    fn test_resolved_args() {
        let args = BundlerConfig::default().resolved_args(
            Path::new("/out/a.fixture.js"),
            Path::new("/out/a.fixture.output.js"),
        );
        assert_eq!(args[0], "/out/a.fixture.js");
        assert!(args.contains(&"--outfile=/out/a.fixture.output.js".to_string()));
    }
}
