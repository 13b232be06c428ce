//! Engine configuration loaded from an optional TOML file.
//!
//! ```toml
//! [store]
//! db_path = ".vibestack/store.db"
//! cas_dir = ".vibestack/cas"
//!
//! [deploy]
//! pending_timeout_secs = 300
//! worker_prefix = "uv"
//! workers_subdomain = "vibestack"
//! output_dir = ".vibestack/deployments"
//!
//! [logging]
//! profile = "development"
//! ```
//!
//! Every field has a default, so a partial file (or no file) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vibestack_core::errors::{ExError, ExErrorKind, Result};
use vibestack_core::logging_facility::Profile;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub deploy: DeployConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Root directory of the content-addressed blob store
    pub cas_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".vibestack/store.db"),
            cas_dir: PathBuf::from(".vibestack/cas"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// A deployment still pending after this long is treated as failed
    pub pending_timeout_secs: u64,
    /// Prefix of the publish target name
    pub worker_prefix: String,
    pub workers_subdomain: String,
    /// Where `DirectoryPublisher` writes worker scripts
    pub output_dir: PathBuf,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            pending_timeout_secs: 300,
            worker_prefix: "uv".to_string(),
            workers_subdomain: "vibestack".to_string(),
            output_dir: PathBuf::from(".vibestack/deployments"),
        }
    }
}

impl DeployConfig {
    pub fn pending_timeout_ms(&self) -> i64 {
        i64::try_from(self.pending_timeout_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `development`, `production` or `test`
    pub profile: String,
    /// Explicit `tracing_subscriber::EnvFilter` directive
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            profile: "development".to_string(),
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Parsed logging profile
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an unknown profile name.
    pub fn profile(&self) -> Result<Profile> {
        self.profile.parse::<Profile>().map_err(|msg| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("load_config")
                .with_message(msg)
        })
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the text is not valid TOML for this schema
    /// or names an unknown logging profile.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text).map_err(|e| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("load_config")
                .with_message(format!("malformed configuration: {}", e))
        })?;
        config.logging.profile()?;
        Ok(config)
    }

    /// Load configuration from `path`
    ///
    /// `None`, or a path that does not exist, yields the defaults.
    ///
    /// # Errors
    ///
    /// - `Io` if the file exists but cannot be read
    /// - `InvalidInput` if its content is malformed
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_entity_id(path.display().to_string())
                .with_message(e.to_string())
        })?;
        Self::from_toml_str(&text).map_err(|e| e.with_entity_id(path.display().to_string()))
    }
}
