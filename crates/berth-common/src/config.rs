//! Global configuration model for the Berth volume layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BACKOFF_BASE_MS, BACKOFF_CAP_MS, DEFAULT_DRIVER_NAME, DEFAULT_ROOT, LEGACY_VFS_DIR,
    LOCAL_VOLUMES_DIR, PLUGIN_TIMEOUT_MS,
};
use crate::error::{BerthError, Result};

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BerthConfig {
    /// Base directory for daemon state and local volumes.
    pub root: PathBuf,
    /// Driver used when a request names none.
    pub default_driver: String,
    /// Retry behaviour of plugin calls.
    pub plugin_retry: RetryPolicy,
}

impl Default for BerthConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            default_driver: DEFAULT_DRIVER_NAME.to_owned(),
            plugin_retry: RetryPolicy::default(),
        }
    }
}

impl BerthConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the loaded values are inconsistent.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(BerthError::io(path, e)),
        };
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for unusable values.
    ///
    /// # Errors
    ///
    /// Returns `BerthError::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.default_driver.is_empty() {
            return Err(BerthError::Config {
                message: "default_driver must not be empty".into(),
            });
        }
        self.plugin_retry.validate()
    }

    /// Directory under which pre-mount-point volumes were stored.
    #[must_use]
    pub fn legacy_vfs_root(&self) -> PathBuf {
        self.root.join(LEGACY_VFS_DIR)
    }

    /// Directory under which the local driver keeps its volumes.
    #[must_use]
    pub fn local_volumes_root(&self) -> PathBuf {
        self.root.join(LOCAL_VOLUMES_DIR)
    }
}

/// Exponential backoff parameters for plugin connection retries.
///
/// The delay starts at `base_ms`, doubles after every failed attempt and
/// never exceeds `cap_ms`. Retrying stops once the next delay would push
/// the total elapsed time past `timeout_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// First backoff delay in milliseconds.
    pub base_ms: u64,
    /// Ceiling for a single delay in milliseconds.
    pub cap_ms: u64,
    /// Total elapsed-time budget in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_ms: BACKOFF_BASE_MS,
            cap_ms: BACKOFF_CAP_MS,
            timeout_ms: PLUGIN_TIMEOUT_MS,
        }
    }
}

impl RetryPolicy {
    /// First backoff delay.
    #[must_use]
    pub const fn base(&self) -> Duration {
        Duration::from_millis(self.base_ms)
    }

    /// Ceiling for a single delay.
    #[must_use]
    pub const fn cap(&self) -> Duration {
        Duration::from_millis(self.cap_ms)
    }

    /// Total elapsed-time budget.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Checks that the policy can make progress.
    ///
    /// # Errors
    ///
    /// Returns `BerthError::Config` if the base delay is zero or larger
    /// than the cap.
    pub fn validate(&self) -> Result<()> {
        if self.base_ms == 0 {
            return Err(BerthError::Config {
                message: "plugin_retry.base_ms must be positive".into(),
            });
        }
        if self.base_ms > self.cap_ms {
            return Err(BerthError::Config {
                message: format!(
                    "plugin_retry.base_ms ({}) exceeds cap_ms ({})",
                    self.base_ms, self.cap_ms
                ),
            });
        }
        Ok(())
    }
}
