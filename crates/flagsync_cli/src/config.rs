//! Configuration for the flagsync daemon.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags (`--source-url`, `--store-uri`)
//! 2. Legacy environment variables (`MONGO_URI`, `FLAGID_DB`,
//!    `FLAGID_COLLECTION`, `FLAGID_URL`)
//! 3. Environment variables prefixed with `FLAGSYNC_`, with `__` between
//!    section and key (e.g. `FLAGSYNC_SCHEDULE__TICK_SECS`)
//! 4. A file passed with `--config`
//! 5. `./flagsync.toml`
//! 6. `~/.config/flagsync/config.toml` (or `$XDG_CONFIG_HOME/flagsync/config.toml`)
//! 7. Built-in defaults
//!
//! Example config file:
//! ```toml
//! [store]
//! uri = "mongodb://mongo:27017/"   # or sqlite://flagids.db?mode=rwc, postgres://...
//! database = "tulip"               # MongoDB only
//! collection = "flagids"           # MongoDB only
//! selection_timeout_ms = 200       # MongoDB only
//!
//! [source]
//! url = "http://10.10.0.1:8081/flagId"
//! timeout_secs = 10
//!
//! [schedule]
//! mode = "aligned"     # or "fixed"
//! tick_secs = 120      # aligned: round length
//! offset_secs = 5      # aligned: delay after each round boundary
//! interval_secs = 120  # fixed: pause between cycles
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config as Settings, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use flagsync::schedule::{DEFAULT_OFFSET_SECS, DEFAULT_TICK_SECS};
use flagsync::store::{DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_STORE_URI};
use flagsync::{Schedule, ScheduleError, StoreOptions};
use serde::Deserialize;

/// Values taken from the command line, applied on top of every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub source_url: Option<String>,
    pub store_uri: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub source: SourceConfig,
    pub schedule: ScheduleConfig,
}

/// Where records are written.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store URI. The scheme picks the backend.
    pub uri: String,
    /// MongoDB database name.
    pub database: String,
    /// MongoDB collection name.
    pub collection: String,
    /// MongoDB server selection timeout in milliseconds.
    pub selection_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_STORE_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            selection_timeout_ms: 200,
        }
    }
}

/// Where the catalog is fetched from.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: flagsync::fetch::DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// Run at a fixed offset after every tick boundary.
    #[default]
    Aligned,
    /// Sleep a fixed interval between cycles.
    Fixed,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub mode: ScheduleMode,
    pub tick_secs: u64,
    pub offset_secs: u64,
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::Aligned,
            tick_secs: DEFAULT_TICK_SECS,
            offset_secs: DEFAULT_OFFSET_SECS,
            interval_secs: DEFAULT_TICK_SECS,
        }
    }
}

/// Legacy environment variables and the keys they set.
const LEGACY_ENV: [(&str, &str); 4] = [
    ("MONGO_URI", "store.uri"),
    ("FLAGID_DB", "store.database"),
    ("FLAGID_COLLECTION", "store.collection"),
    ("FLAGID_URL", "source.url"),
];

impl Config {
    /// Load configuration from files, the process environment and `overrides`.
    ///
    /// # Errors
    /// Returns `ConfigError` for unreadable or malformed files, values of the
    /// wrong type and settings that fail validation.
    pub fn load(overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut builder = Settings::builder();

        if let Some(proj_dirs) = ProjectDirs::from("", "", "flagsync") {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let local_config = PathBuf::from("flagsync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./flagsync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        if let Some(path) = &overrides.config_file {
            tracing::debug!("Loading config from {:?}", path);
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }

        Self::layered(
            builder,
            Self::environment(),
            |name| std::env::var(name).ok(),
            overrides,
        )
    }

    /// `FLAGSYNC_` prefixed environment variables, e.g.
    /// `FLAGSYNC_STORE__URI -> store.uri`.
    fn environment() -> Environment {
        Environment::with_prefix("FLAGSYNC")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Stack environment, legacy variables and CLI overrides on top of
    /// `builder`, then deserialize and validate.
    fn layered<L>(
        builder: ConfigBuilder<DefaultState>,
        environment: Environment,
        lookup: L,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut builder = builder.add_source(environment);

        for (var, key) in LEGACY_ENV {
            let value = lookup(var).filter(|v| !v.is_empty());
            builder = builder.set_override_option(key, value)?;
        }

        let config: Config = builder
            .set_override_option("source.url", overrides.source_url.clone())?
            .set_override_option("store.uri", overrides.store_uri.clone())?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.source.url.trim().is_empty() {
            return Err(ConfigError::Message("source.url must not be empty".to_string()));
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "source.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.store.uri.trim().is_empty() {
            return Err(ConfigError::Message("store.uri must not be empty".to_string()));
        }
        self.schedule()
            .map_err(|e| ConfigError::Message(format!("invalid schedule: {e}")))?;
        Ok(())
    }

    /// The configured schedule policy.
    pub fn schedule(&self) -> Result<Schedule, ScheduleError> {
        let s = &self.schedule;
        match s.mode {
            ScheduleMode::Aligned => Schedule::clock_aligned(
                Duration::from_secs(s.tick_secs),
                Duration::from_secs(s.offset_secs),
            ),
            ScheduleMode::Fixed => Schedule::fixed_delay(Duration::from_secs(s.interval_secs)),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            uri: self.store.uri.clone(),
            database: self.store.database.clone(),
            collection: self.store.collection.clone(),
            selection_timeout: Duration::from_millis(self.store.selection_timeout_ms),
        }
    }
}

/// Path of a SQLite database file named by `uri`, if it is one.
pub fn sqlite_file_path(uri: &str) -> Option<&Path> {
    let path = uri.strip_prefix("sqlite://")?;
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Some(Path::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::environment().source(Some(map))
    }

    fn no_legacy(_: &str) -> Option<String> {
        None
    }

    fn load_toml(toml: &str) -> Result<Config, ConfigError> {
        Config::layered(
            Settings::builder().add_source(File::from_str(toml, FileFormat::Toml)),
            env(&[]),
            no_legacy,
            &Overrides::default(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.uri, "mongodb://localhost:27017/");
        assert_eq!(config.store.database, "tulip");
        assert_eq!(config.store.collection, "flagids");
        assert_eq!(config.store.selection_timeout_ms, 200);
        assert_eq!(config.source.url, "http://localhost:8081/flagId");
        assert_eq!(config.source.timeout_secs, 10);
        assert_eq!(config.schedule.mode, ScheduleMode::Aligned);
        assert_eq!(config.schedule.tick_secs, 120);
        assert_eq!(config.schedule.offset_secs, 5);
        assert_eq!(config.schedule.interval_secs, 120);
        assert_eq!(config.schedule().unwrap(), Schedule::default());
    }

    #[test]
    fn test_config_builder_with_defaults() {
        let config = load_toml("").unwrap();
        assert_eq!(config.store.uri, DEFAULT_STORE_URI);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder_with_toml_string() {
        let config = load_toml(
            r#"
            [store]
            uri = "sqlite:///tmp/flagids.db?mode=rwc"

            [source]
            url = "http://10.10.0.1:8081/flagId"
            timeout_secs = 3

            [schedule]
            mode = "fixed"
            interval_secs = 30
        "#,
        )
        .unwrap();

        assert_eq!(config.store.uri, "sqlite:///tmp/flagids.db?mode=rwc");
        assert_eq!(config.store.database, "tulip");
        assert_eq!(config.source.url, "http://10.10.0.1:8081/flagId");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
        assert_eq!(
            config.schedule().unwrap(),
            Schedule::fixed_delay(Duration::from_secs(30)).unwrap()
        );
    }

    #[test]
    fn test_prefixed_env_overrides_file() {
        let config = Config::layered(
            Settings::builder().add_source(File::from_str(
                "[schedule]\ntick_secs = 60\noffset_secs = 2\n[store]\ndatabase = \"from-file\"",
                FileFormat::Toml,
            )),
            env(&[
                ("FLAGSYNC_SCHEDULE__TICK_SECS", "180"),
                ("FLAGSYNC_STORE__COLLECTION", "ids"),
            ]),
            no_legacy,
            &Overrides::default(),
        )
        .unwrap();

        assert_eq!(config.schedule.tick_secs, 180);
        assert_eq!(config.schedule.offset_secs, 2);
        assert_eq!(config.store.database, "from-file");
        assert_eq!(config.store.collection, "ids");
    }

    #[test]
    fn test_legacy_env_overrides_prefixed_env() {
        let legacy: HashMap<&str, &str> = HashMap::from([
            ("MONGO_URI", "mongodb://mongo:27017/"),
            ("FLAGID_DB", "ctf"),
            ("FLAGID_COLLECTION", "ids"),
            ("FLAGID_URL", "http://game:8081/flagId"),
        ]);

        let config = Config::layered(
            Settings::builder(),
            env(&[("FLAGSYNC_STORE__URI", "sqlite://ignored.db")]),
            |name| legacy.get(name).map(|v| v.to_string()),
            &Overrides::default(),
        )
        .unwrap();

        assert_eq!(config.store.uri, "mongodb://mongo:27017/");
        assert_eq!(config.store.database, "ctf");
        assert_eq!(config.store.collection, "ids");
        assert_eq!(config.source.url, "http://game:8081/flagId");
    }

    #[test]
    fn test_empty_legacy_env_is_ignored() {
        let config = Config::layered(
            Settings::builder(),
            env(&[]),
            |name| (name == "FLAGID_URL").then(String::new),
            &Overrides::default(),
        )
        .unwrap();
        assert_eq!(config.source.url, "http://localhost:8081/flagId");
    }

    #[test]
    fn test_cli_flags_override_everything() {
        let overrides = Overrides {
            config_file: None,
            source_url: Some("http://cli:1/flagId".to_string()),
            store_uri: Some("sqlite::memory:".to_string()),
        };

        let config = Config::layered(
            Settings::builder(),
            env(&[("FLAGSYNC_SOURCE__URL", "http://env:1/flagId")]),
            |name| (name == "MONGO_URI").then(|| "mongodb://legacy/".to_string()),
            &overrides,
        )
        .unwrap();

        assert_eq!(config.source.url, "http://cli:1/flagId");
        assert_eq!(config.store.uri, "sqlite::memory:");
    }

    #[test]
    fn test_config_merging_order() {
        let settings = Settings::builder()
            .add_source(File::from_str(
                "[schedule]\ntick_secs = 60\noffset_secs = 5",
                FileFormat::Toml,
            ))
            .add_source(File::from_str("[schedule]\ntick_secs = 30", FileFormat::Toml));

        let config = Config::layered(settings, env(&[]), no_legacy, &Overrides::default()).unwrap();

        assert_eq!(config.schedule.tick_secs, 30);
        assert_eq!(config.schedule.offset_secs, 5);
    }

    #[test]
    fn test_config_invalid_toml() {
        let err = load_toml("[schedule\ntick_secs = 60").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_config_wrong_type_is_an_error() {
        assert!(load_toml("[schedule]\ntick_secs = \"soon\"").is_err());
        assert!(load_toml("[schedule]\nmode = \"sometimes\"").is_err());
    }

    #[test]
    fn test_invalid_schedule_is_rejected() {
        let err = load_toml("[schedule]\ntick_secs = 60\noffset_secs = 60").unwrap_err();
        assert!(err.to_string().contains("invalid schedule"), "got {err}");

        let err = load_toml("[schedule]\nmode = \"fixed\"\ninterval_secs = 0").unwrap_err();
        assert!(err.to_string().contains("invalid schedule"), "got {err}");
    }

    #[test]
    fn test_zero_fetch_timeout_is_rejected() {
        assert!(load_toml("[source]\ntimeout_secs = 0").is_err());
    }

    #[test]
    fn test_config_unknown_fields_ignored() {
        let config = load_toml("[schedule]\ntick_secs = 60\nunknown_field = \"x\"").unwrap();
        assert_eq!(config.schedule.tick_secs, 60);
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        let overrides = Overrides {
            config_file: Some(PathBuf::from("/nonexistent/flagsync-test.toml")),
            ..Overrides::default()
        };
        assert!(Config::load(&overrides).is_err());
    }

    #[test]
    fn test_store_options_carry_store_section() {
        let config = load_toml(
            "[store]\nuri = \"mongodb://mongo:27017/\"\ncollection = \"ids\"\nselection_timeout_ms = 750",
        )
        .unwrap();
        let options = config.store_options();

        assert_eq!(options.uri, "mongodb://mongo:27017/");
        assert_eq!(options.database, "tulip");
        assert_eq!(options.collection, "ids");
        assert_eq!(options.selection_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite:///var/lib/flagsync/flagids.db?mode=rwc"),
            Some(Path::new("/var/lib/flagsync/flagids.db"))
        );
        assert_eq!(
            sqlite_file_path("sqlite://flagids.db"),
            Some(Path::new("flagids.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("mongodb://mongo:27017/"), None);
    }
}
