use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const APP_DIR: &str = "rent";
const DEFAULT_INTERVAL_MINUTES: u64 = 15;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Where a configuration value came from, lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "environment",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    fn builtin(value: T) -> Self {
        Self {
            value,
            source: ConfigSource::Default,
        }
    }

    fn set(&mut self, value: T, source: ConfigSource) {
        *self = Self { value, source };
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncConfig {
    /// Backend base URL (e.g., "http://localhost:8080")
    pub server_url: Option<String>,
    /// Run a sync pass after writes and before reads
    pub auto_sync: bool,
    /// Periodic sync interval used by `rent daemon`
    pub interval_minutes: ConfigValue<u64>,
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            auto_sync: false,
            interval_minutes: ConfigValue::builtin(DEFAULT_INTERVAL_MINUTES),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SyncConfig {
    pub fn is_configured(&self) -> bool {
        self.server_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.value * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Resolved CLI configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub database_path: ConfigValue<PathBuf>,
    /// Config file that was read, if one existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    sync: Option<SyncFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SyncFile {
    server_url: Option<String>,
    auto_sync: bool,
    interval_minutes: Option<u64>,
    request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: ConfigValue::builtin(data_dir.join(APP_DIR).join("rent.db")),
            config_file: None,
            sync: SyncConfig::default(),
        }
    }
}

impl Config {
    /// Loads defaults, then the config file, then `RENT_*` environment overrides.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    fn load_with(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            config.apply_file(&path)?;
        }
        config.apply_env(env)?;

        if config.sync.interval_minutes.value == 0 {
            return Err(ConfigError::Invalid("sync.interval_minutes", "0".to_string()));
        }
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_owned(), e))?;
        let file: ConfigFile = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_owned(), e))?;
        self.config_file = Some(path.to_owned());

        if let Some(db_path) = file.database_path {
            // Relative to the config file's directory
            let resolved = match path.parent() {
                Some(dir) if db_path.is_relative() => dir.join(db_path),
                _ => db_path,
            };
            self.database_path.set(resolved, ConfigSource::File);
        }

        let Some(sync) = file.sync else {
            return Ok(());
        };
        self.sync.server_url = sync.server_url;
        self.sync.auto_sync = sync.auto_sync;
        if let Some(minutes) = sync.interval_minutes {
            self.sync.interval_minutes.set(minutes, ConfigSource::File);
        }
        if let Some(secs) = sync.request_timeout_secs {
            self.sync.request_timeout_secs = secs;
        }
        Ok(())
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(db_path) = env("RENT_DATABASE_PATH") {
            self.database_path
                .set(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Some(url) = env("RENT_SYNC_URL") {
            self.sync.server_url = Some(url);
        }
        if let Some(raw) = env("RENT_SYNC_INTERVAL") {
            let minutes = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("RENT_SYNC_INTERVAL", raw.clone()))?;
            self.sync
                .interval_minutes
                .set(minutes, ConfigSource::Environment);
        }
        Ok(())
    }

    /// `config.yaml` under the platform config directory.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.yaml")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("Invalid value for {0}: '{1}'")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::{tempdir, TempDir};

    fn write_config(contents: &str) -> (TempDir, PathBuf) {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, contents).unwrap();
        (temp_dir, path)
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = Config::load_with(Some(temp_dir.path().join("absent.yaml")), no_env).unwrap();

        assert!(config.database_path.value.ends_with("rent/rent.db"));
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert!(!config.sync.is_configured());
        assert_eq!(config.sync.interval(), Duration::from_secs(15 * 60));
        assert_eq!(config.sync.request_timeout(), Duration::from_secs(10));
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_file_sync_section() {
        let (_dir, path) = write_config(
            "database_path: /srv/rent.sqlite\n\
             sync:\n  server_url: http://localhost:8080\n  auto_sync: true\n  interval_minutes: 5\n",
        );

        let config = Config::load_with(Some(path.clone()), no_env).unwrap();
        assert_eq!(config.database_path.value, PathBuf::from("/srv/rent.sqlite"));
        assert_eq!(config.database_path.source, ConfigSource::File);
        assert!(config.sync.is_configured());
        assert!(config.sync.auto_sync);
        assert_eq!(config.sync.interval_minutes.value, 5);
        assert_eq!(config.sync.interval_minutes.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(path));
    }

    #[test]
    fn test_relative_database_path_resolves_against_config_dir() {
        let (dir, path) = write_config("database_path: data/rent.db\n");

        let config = Config::load_with(Some(path), no_env).unwrap();
        assert_eq!(config.database_path.value, dir.path().join("data/rent.db"));
    }

    #[test]
    fn test_env_overrides_file() {
        let (_dir, path) =
            write_config("sync:\n  server_url: http://file:8080\n  interval_minutes: 5\n");
        let env: HashMap<&str, &str> = [
            ("RENT_SYNC_URL", "http://env:9090"),
            ("RENT_SYNC_INTERVAL", " 30 "),
            ("RENT_DATABASE_PATH", "/tmp/env.db"),
        ]
        .into();

        let config =
            Config::load_with(Some(path), |key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.sync.server_url.as_deref(), Some("http://env:9090"));
        assert_eq!(config.sync.interval_minutes.value, 30);
        assert_eq!(config.sync.interval_minutes.source, ConfigSource::Environment);
        assert_eq!(config.database_path.source, ConfigSource::Environment);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let (_dir, path) = write_config("sync:\n  interval_minutes: 0\n");
        let err = Config::load_with(Some(path), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("sync.interval_minutes", _)));

        let temp_dir = tempdir().unwrap();
        let err = Config::load_with(Some(temp_dir.path().join("absent.yaml")), |key| {
            (key == "RENT_SYNC_INTERVAL").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("RENT_SYNC_INTERVAL", _)));
    }

    #[test]
    fn test_unparseable_file_names_path() {
        let (_dir, path) = write_config("sync: [unterminated\n");
        let err = Config::load_with(Some(path.clone()), no_env).unwrap_err();
        assert!(matches!(&err, ConfigError::Parse(p, _) if p == &path));
        assert_eq!(ConfigSource::Environment.to_string(), "environment");
    }
}
