//! Configuration Loader
//!
//! Environment-aware loading: a base file, an optional per-environment file
//! and `RUNTIME__SECTION__KEY` environment overrides, merged in that order by
//! the `config` crate and validated before use.

use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::RuntimeConfig;

/// Prefix of environment variables that override configuration values
pub const ENV_PREFIX: &str = "RUNTIME";
/// Separator between prefix, section and key in override variables
pub const ENV_SEPARATOR: &str = "__";
/// Variable naming the deployment environment
pub const ENVIRONMENT_VARIABLE: &str = "RUNTIME_ENV";
/// Base file name looked up in a configuration directory
pub const BASE_FILE_STEM: &str = "runtime";

const FILE_EXTENSIONS: [&str; 3] = ["toml", "yaml", "yml"];

/// Loads and validates [`RuntimeConfig`]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Current environment from `RUNTIME_ENV`, defaulting to `development`
    pub fn detect_environment() -> String {
        std::env::var(ENVIRONMENT_VARIABLE).unwrap_or_else(|_| "development".to_string())
    }

    /// Defaults overridden by process environment variables only
    pub fn load_from_env() -> ConfigResult<RuntimeConfig> {
        Self::build(Config::builder(), None)
    }

    /// Load one explicit file plus process environment overrides
    pub fn load_file(path: impl AsRef<Path>) -> ConfigResult<RuntimeConfig> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigurationError::config_file_not_found(vec![path.to_path_buf()]));
        }
        debug!(path = %path.display(), "Loading runtime configuration file");
        Self::build(Config::builder().add_source(File::from(path)), None)
    }

    /// Load `runtime.<ext>` and `runtime.<env>.<ext>` from `dir` for the
    /// detected environment
    pub fn load_from_directory(dir: impl AsRef<Path>) -> ConfigResult<RuntimeConfig> {
        Self::load_from_directory_with_env(dir, &Self::detect_environment(), None)
    }

    /// Directory load with an explicit environment and, for tests, an explicit
    /// override map used instead of the process environment
    pub fn load_from_directory_with_env(
        dir: impl AsRef<Path>,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<RuntimeConfig> {
        let dir = dir.as_ref();
        let base = Self::find_file(dir, BASE_FILE_STEM).ok_or_else(|| {
            ConfigurationError::config_file_not_found(
                FILE_EXTENSIONS
                    .iter()
                    .map(|ext| dir.join(format!("{BASE_FILE_STEM}.{ext}")))
                    .collect(),
            )
        })?;

        let mut builder = Config::builder().add_source(File::from(base.as_path()));
        let env_stem = format!("{BASE_FILE_STEM}.{environment}");
        if let Some(env_file) = Self::find_file(dir, &env_stem) {
            debug!(path = %env_file.display(), "Applying environment configuration overrides");
            builder = builder.add_source(File::from(env_file.as_path()));
        }

        let config = Self::build(builder, overrides)?;
        info!(
            environment = %environment,
            directory = %dir.display(),
            "✅ Runtime configuration loaded"
        );
        Ok(config)
    }

    fn find_file(dir: &Path, stem: &str) -> Option<PathBuf> {
        FILE_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{stem}.{ext}")))
            .find(|path| path.is_file())
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<RuntimeConfig> {
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(overrides.map(|map| map.into_iter().collect()));

        let config: RuntimeConfig = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "runtime.toml",
            "[poller]\ninterval_ms = 5000\n\n[splitter]\nmax_threads = 4\n",
        );
        write(dir.path(), "runtime.test.toml", "[poller]\ninterval_ms = 250\n");

        let config = ConfigLoader::load_from_directory_with_env(dir.path(), "test", Some(HashMap::new())).unwrap();
        assert_eq!(config.poller.interval(), Duration::from_millis(250));
        assert_eq!(config.splitter.max_threads, 4);
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    fn test_env_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "runtime.toml", "[retry]\nmax_retries = 2\n");

        let overrides = HashMap::from([
            ("RUNTIME__RETRY__MAX_RETRIES".to_string(), "-1".to_string()),
            ("RUNTIME__METRICS__ENABLED".to_string(), "false".to_string()),
        ]);
        let config = ConfigLoader::load_from_directory_with_env(dir.path(), "production", Some(overrides)).unwrap();
        assert_eq!(config.retry.max_retries, -1);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_missing_base_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load_from_directory_with_env(dir.path(), "test", Some(HashMap::new())).unwrap_err();
        assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "runtime.toml", "[splitter]\nmax_threads = 0\n");
        let err = ConfigLoader::load_file(dir.path().join("runtime.toml")).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
