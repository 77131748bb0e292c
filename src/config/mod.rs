//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then a TOML file, then
//! `SEMNOTE_*` environment variables. Logging and metrics sections are kept
//! raw here and resolved by [`crate::observability`].
//!
//! ```toml
//! db_path = "./notes.sqlite"
//! dimensions = 384
//!
//! [search]
//! threshold = 0.45
//! max_results = 5
//!
//! [http]
//! host = "127.0.0.1"
//! port = 5000
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//!
//! [metrics]
//! enabled = false
//! port = 9090
//! ```

use crate::embedding::DEFAULT_DIMENSIONS;
use crate::models::{DEFAULT_MAX_RESULTS, DEFAULT_THRESHOLD, SearchOptions};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default note database path.
pub const DEFAULT_DB_PATH: &str = "./notes.sqlite";

/// Default HTTP bind host.
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";

/// Default HTTP port.
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Main configuration for semnote.
#[derive(Debug, Clone, PartialEq)]
pub struct SemnoteConfig {
    /// Path to the `SQLite` note database.
    pub db_path: PathBuf,
    /// Embedding vector dimension.
    pub dimensions: usize,
    /// Default ranking parameters.
    pub search: SearchOptions,
    /// HTTP listener settings.
    pub http: HttpSettings,
    /// Raw logging settings.
    pub logging: LoggingSettings,
    /// Raw metrics settings.
    pub metrics: MetricsSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

impl HttpSettings {
    /// Returns the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Log level or `EnvFilter` directive.
    pub level: Option<String>,
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// Optional log file; logs go to stderr otherwise.
    pub file: Option<PathBuf>,
}

/// `[metrics]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus recorder is installed.
    pub enabled: Option<bool>,
    /// Port for the Prometheus HTTP listener.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Note database path.
    pub db_path: Option<String>,
    /// Embedding dimension.
    pub dimensions: Option<usize>,
    /// Search section.
    pub search: Option<ConfigFileSearch>,
    /// HTTP section.
    pub http: Option<ConfigFileHttp>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

/// `[search]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileSearch {
    /// Minimum similarity.
    pub threshold: Option<f32>,
    /// Result cap.
    pub max_results: Option<usize>,
}

/// `[http]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileHttp {
    /// Bind host.
    pub host: Option<String>,
    /// Bind port.
    pub port: Option<u16>,
}

impl Default for SemnoteConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            dimensions: DEFAULT_DIMENSIONS,
            search: SearchOptions::new()
                .with_threshold(DEFAULT_THRESHOLD)
                .with_max_results(DEFAULT_MAX_RESULTS),
            http: HttpSettings::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

impl SemnoteConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting values are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::operation("read_config_file", format!("{}: {e}", path.display())))?;
        Self::parse(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for [`ConfigFile`] or
    /// the resulting values are invalid.
    pub fn parse(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        let config = Self::from_config_file(file);
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/semnote/` on macOS)
    /// 2. XDG config dir (`~/.config/semnote/` for Unix compatibility)
    ///
    /// Returns default configuration if no usable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("semnote").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("semnote")
                .join("config.toml"),
        ];
        candidates
            .iter()
            .filter(|path| path.exists())
            .find_map(|path| Self::load_from_file(path).ok())
            .unwrap_or_default()
    }

    /// Applies `SEMNOTE_*` overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `SEMNOTE_*` overrides read through `lookup`.
    ///
    /// Values that do not parse are ignored.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = get("SEMNOTE_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        if let Some(threshold) = get("SEMNOTE_SEARCH_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.search.threshold = threshold;
        }
        if let Some(max_results) = get("SEMNOTE_MAX_RESULTS").and_then(|v| v.parse().ok()) {
            self.search.max_results = max_results;
        }
        if let Some(port) = get("SEMNOTE_HTTP_PORT").and_then(|v| v.parse().ok()) {
            self.http.port = port;
        }
        if let Some(level) = get("SEMNOTE_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(format) = get("SEMNOTE_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(file) = get("SEMNOTE_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        if let Some(enabled) = get("SEMNOTE_METRICS_ENABLED").map(|v| parse_bool(&v)) {
            self.metrics.enabled = Some(enabled);
        }
        if let Some(port) = get("SEMNOTE_METRICS_PORT").and_then(|v| v.parse().ok()) {
            self.metrics.port = Some(port);
        }
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the threshold is not finite or the
    /// dimension or result cap is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.search.threshold.is_finite() {
            return Err(Error::InvalidInput(format!(
                "search.threshold must be finite, got {}",
                self.search.threshold
            )));
        }
        if self.dimensions == 0 {
            return Err(Error::InvalidInput(
                "dimensions must be greater than zero".to_string(),
            ));
        }
        if self.search.max_results == 0 {
            return Err(Error::InvalidInput(
                "search.max_results must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default ranking parameters.
    #[must_use]
    pub const fn search_options(&self) -> SearchOptions {
        self.search
    }

    /// Converts a `ConfigFile` to `SemnoteConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(db_path) = file.db_path {
            config.db_path = PathBuf::from(db_path);
        }
        if let Some(dimensions) = file.dimensions {
            config.dimensions = dimensions;
        }
        if let Some(search) = file.search {
            if let Some(threshold) = search.threshold {
                config.search.threshold = threshold;
            }
            if let Some(max_results) = search.max_results {
                config.search.max_results = max_results;
            }
        }
        if let Some(http) = file.http {
            if let Some(host) = http.host {
                config.http.host = host;
            }
            if let Some(port) = http.port {
                config.http.port = port;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        config
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SemnoteConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./notes.sqlite"));
        assert_eq!(config.dimensions, 384);
        assert!((config.search.threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.http.bind_addr(), "127.0.0.1:5000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let config = SemnoteConfig::parse(
            r#"
            db_path = "/tmp/notes.db"
            dimensions = 16

            [search]
            threshold = 0.3
            max_results = 10

            [http]
            host = "0.0.0.0"
            port = 8080

            [logging]
            level = "debug"
            format = "json"

            [metrics]
            enabled = true
            port = 9191
            "#,
        )
        .expect("valid config");

        assert_eq!(config.db_path, PathBuf::from("/tmp/notes.db"));
        assert_eq!(config.dimensions, 16);
        assert!((config.search.threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.http.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.metrics.enabled, Some(true));
        assert_eq!(config.metrics.port, Some(9191));
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = SemnoteConfig::parse("[search]\nmax_results = 3\n").expect("valid config");
        assert_eq!(config.search.max_results, 3);
        assert!((config.search.threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.dimensions, 384);
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let err = SemnoteConfig::parse("dimensions = 0\n").expect_err("zero dimensions");
        assert!(err.is_invalid_input());
        let err = SemnoteConfig::parse("[search]\nmax_results = 0\n").expect_err("zero cap");
        assert!(err.is_invalid_input());
        let err = SemnoteConfig::parse("dimensions = \"many\"\n").expect_err("bad type");
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "db_path = \"./other.sqlite\"").expect("write");

        let config = SemnoteConfig::load_from_file(file.path()).expect("load");
        assert_eq!(config.db_path, PathBuf::from("./other.sqlite"));

        let missing = SemnoteConfig::load_from_file(Path::new("/nonexistent/semnote.toml"));
        assert!(matches!(missing, Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let config = SemnoteConfig::default().with_overrides(env(&[
            ("SEMNOTE_DB_PATH", "/data/notes.sqlite"),
            ("SEMNOTE_SEARCH_THRESHOLD", "0.6"),
            ("SEMNOTE_MAX_RESULTS", "7"),
            ("SEMNOTE_HTTP_PORT", "5050"),
            ("SEMNOTE_LOG_FORMAT", "json"),
            ("SEMNOTE_METRICS_ENABLED", "yes"),
        ]));

        assert_eq!(config.db_path, PathBuf::from("/data/notes.sqlite"));
        assert!((config.search.threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.search.max_results, 7);
        assert_eq!(config.http.port, 5050);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.metrics.enabled, Some(true));
    }

    #[test]
    fn test_unparseable_env_values_are_ignored() {
        let config = SemnoteConfig::default().with_overrides(env(&[
            ("SEMNOTE_SEARCH_THRESHOLD", "high"),
            ("SEMNOTE_HTTP_PORT", "99999"),
            ("SEMNOTE_DB_PATH", "   "),
        ]));
        assert_eq!(config, SemnoteConfig::default());
    }
}
