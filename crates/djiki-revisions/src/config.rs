//! Wiki configuration loaded from TOML
//!
//! Every section and key is optional; missing values take their defaults
//! and out-of-range values are clamped by [`WikiConfig::validate`].

use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use djiki_diff::DiffConfig;
use djiki_domain::PermissionPolicy;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};

/// Default format for timestamps in revision descriptions
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Upper bound on commit retries
pub const MAX_COMMIT_RETRIES: u32 = 100;

/// Coordinator behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Extra attempts after an append loses the race for the head
    pub max_commit_retries: u32,
    /// Whether anonymous actors may change content at all
    pub allow_anonymous_edits: bool,
    /// strftime format for timestamps in generated descriptions
    pub timestamp_format: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: 3,
            allow_anonymous_edits: true,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiConfig {
    /// Diff engine tuning
    pub diff: DiffConfig,
    /// Coordinator behaviour
    pub coordinator: CoordinatorConfig,
    /// Anonymous access policy
    pub permissions: PermissionPolicy,
}

impl WikiConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: WikiConfig = toml::from_str(content)?;
        Ok(config.validate())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded wiki config");
        Ok(config)
    }

    /// Clamp values into their working ranges
    pub fn validate(mut self) -> Self {
        self.diff = self.diff.validated();
        self.coordinator.max_commit_retries =
            self.coordinator.max_commit_retries.min(MAX_COMMIT_RETRIES);
        if !is_valid_format(&self.coordinator.timestamp_format) {
            warn!(
                format = %self.coordinator.timestamp_format,
                "Invalid timestamp format, using default"
            );
            self.coordinator.timestamp_format = DEFAULT_TIMESTAMP_FORMAT.to_string();
        }
        self
    }
}

fn is_valid_format(format: &str) -> bool {
    !format.is_empty() && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}
