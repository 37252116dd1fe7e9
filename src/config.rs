//! Layered runtime settings.
//!
//! Settings are merged with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file: `--config PATH`, else `config.toml` in the platform
//!    config directory (`~/.config/finddups/` on Linux) when it exists
//! 3. `FINDDUPS_*` environment variables (`FINDDUPS_WORKERS`,
//!    `FINDDUPS_MIN_SIZE`, `FINDDUPS_FOLLOW_SYMLINKS`,
//!    `FINDDUPS_READ_RETRIES`, `FINDDUPS_QUEUE_CAPACITY`)
//! 4. Command-line flags
//!
//! A layer that fails to parse is skipped with a warning; configuration
//! problems never abort a scan.
//!
//! ```toml
//! workers = 8
//! min_size = "1MiB"
//! follow_symlinks = false
//! read_retries = 2
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::cli::{parse_size, Cli};
use crate::duplicates::FinderConfig;

/// Prefix of the environment variables read as settings.
pub const ENV_PREFIX: &str = "FINDDUPS_";

/// A size given either as a number of bytes or a human-readable string.
///
/// Deserialization never fails: a value of the wrong shape (a negative or
/// fractional number, a list) becomes [`SizeValue::Invalid`], so a bad
/// `min_size` cannot take the rest of its layer down with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SizeValue {
    /// Plain byte count
    Bytes(u64),
    /// Human-readable size such as `"10MB"`
    Text(String),
    /// Anything else, kept for the warning
    Invalid(String),
}

struct SizeValueVisitor;

impl<'de> Visitor<'de> for SizeValueVisitor {
    type Value = SizeValue;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a byte count or a size string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<SizeValue, E> {
        Ok(SizeValue::Bytes(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<SizeValue, E> {
        Ok(u64::try_from(v).map_or_else(|_| SizeValue::Invalid(v.to_string()), SizeValue::Bytes))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<SizeValue, E> {
        Ok(SizeValue::Invalid(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<SizeValue, E> {
        Ok(SizeValue::Invalid(v.to_string()))
    }

    fn visit_char<E: de::Error>(self, v: char) -> Result<SizeValue, E> {
        Ok(SizeValue::Text(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<SizeValue, E> {
        Ok(SizeValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<SizeValue, E> {
        Ok(SizeValue::Text(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<SizeValue, E> {
        Ok(SizeValue::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<SizeValue, E> {
        Ok(SizeValue::default())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<SizeValue, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<SizeValue, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(SizeValue::Invalid("a list".to_string()))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SizeValue, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(SizeValue::Invalid("a table".to_string()))
    }
}

impl<'de> Deserialize<'de> for SizeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SizeValueVisitor)
    }
}

impl Default for SizeValue {
    fn default() -> Self {
        Self::Bytes(0)
    }
}

impl SizeValue {
    /// Resolve to a byte count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSize`] if a text value does not parse
    /// or the value was not a size at all.
    pub fn to_bytes(&self) -> Result<u64, ConfigError> {
        match self {
            Self::Bytes(n) => Ok(*n),
            Self::Text(s) => parse_size(s).map_err(|reason| ConfigError::InvalidSize {
                value: s.clone(),
                reason,
            }),
            Self::Invalid(s) => Err(ConfigError::InvalidSize {
                value: s.clone(),
                reason: "expected a non-negative byte count or a size string".to_string(),
            }),
        }
    }
}

/// Configuration errors.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The minimum size could not be parsed.
    #[error("Invalid size '{value}': {reason}")]
    InvalidSize {
        /// The rejected input
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// A settings layer could not be read or deserialized.
    #[error("Invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Hashing workers; 0 selects the number of CPUs.
    pub workers: usize,
    /// Exclusive lower bound on file size.
    pub min_size: SizeValue,
    /// Follow symbolic links during the walk.
    pub follow_symlinks: bool,
    /// Extra attempts for transient read errors.
    pub read_retries: u32,
    /// Queue capacity; unset means the worker count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workers: 0,
            min_size: SizeValue::default(),
            follow_symlinks: false,
            read_retries: 0,
            queue_capacity: None,
        }
    }
}

/// Values given on the command line; unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    workers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    follow_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    read_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    queue_capacity: Option<usize>,
}

impl From<&Cli> for CliOverrides {
    fn from(cli: &Cli) -> Self {
        Self {
            workers: cli.workers,
            min_size: cli.min_size.clone(),
            follow_symlinks: cli.follow_symlinks.then_some(true),
            read_retries: cli.read_retries,
            queue_capacity: cli.queue_capacity,
        }
    }
}

/// `config.toml` in the platform config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "finddups").map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Settings {
    /// The full layer stack. `file` is read only if it exists.
    #[must_use]
    pub fn figment(file: Option<&Path>, overrides: &CliOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    /// Merge every layer, skipping those that fail to parse.
    ///
    /// `explicit` is a file named on the command line; without one, the
    /// default location is used when present.
    #[must_use]
    pub fn load(explicit: Option<&Path>, overrides: &CliOverrides) -> Self {
        let file = match explicit {
            Some(path) => {
                if !path.exists() {
                    log::warn!("Config file {} not found, ignoring", path.display());
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|p| p.exists()),
        };

        if let Some(ref path) = file {
            log::debug!("Reading configuration from {}", path.display());
        }

        match Self::try_load(file.as_deref(), overrides) {
            Ok(settings) => return settings,
            Err(e) if file.is_some() => {
                log::warn!("{}; ignoring the configuration file", e);
            }
            Err(e) => log::warn!("{}", e),
        }

        if file.is_some() {
            match Self::try_load(None, overrides) {
                Ok(settings) => return settings,
                Err(e) => log::warn!("{}", e),
            }
        }

        log::warn!("Ignoring {}* environment variables", ENV_PREFIX);
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Serialized::defaults(overrides))
            .extract()
            .unwrap_or_default()
    }

    /// Merge every layer, failing on the first that does not parse.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if any layer is malformed.
    pub fn try_load(file: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        Self::figment(file, overrides)
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// The size threshold in bytes; an unparseable value counts as 0.
    #[must_use]
    pub fn min_size_bytes(&self) -> u64 {
        self.min_size.to_bytes().unwrap_or_else(|e| {
            log::warn!("{}; using no minimum size", e);
            0
        })
    }

    /// Finder configuration for these settings.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        let mut config = FinderConfig::default()
            .with_workers(self.workers)
            .with_min_size(self.min_size_bytes())
            .with_follow_symlinks(self.follow_symlinks)
            .with_read_retries(self.read_retries);
        if let Some(capacity) = self.queue_capacity {
            config = config.with_queue_capacity(capacity);
        }
        config
    }
}
