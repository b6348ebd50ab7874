//! Licensing configuration, read from an optional `license.toml`.

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// What startup does when no usable license is found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupPolicy {
    #[default]
    /// Keep running unactivated, or with the expired license retained.
    FailOpen,
    /// Abort initialization.
    FailClosed,
}

/// Settings consumed by [`crate::LicenseManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// Master switch; when false `initialize` does nothing.
    pub enabled: bool,
    /// File holding the raw activation code.
    pub storage_path: PathBuf,
    /// PEM-encoded RSA public key trusted for activation codes.
    pub public_key: Option<String>,
    /// Load and evaluate the stored code during `initialize`.
    pub validate_on_startup: bool,
    /// Behaviour when no usable license is found at startup.
    pub startup_policy: StartupPolicy,
    /// Emit "expiring soon" when this many days or fewer remain.
    pub expiry_warning_days: i64,
    /// Interval between periodic status checks, in seconds.
    pub check_interval_secs: u64,
}

fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".license")
        .join("license.dat")
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_path: default_storage_path(),
            public_key: None,
            validate_on_startup: false,
            startup_policy: StartupPolicy::FailOpen,
            expiry_warning_days: 30,
            check_interval_secs: 60 * 60,
        }
    }
}

impl LicenseConfig {
    /// Loads configuration from a TOML file. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the file exists but cannot be read
    /// or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> LicenseResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No license config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| LicenseError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&contents)
            .map_err(|e| LicenseError::Config(format!("{}: {e}", path.display())))
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] on malformed TOML or unknown values.
    pub fn from_toml(contents: &str) -> LicenseResult<Self> {
        toml::from_str(contents).map_err(|e| LicenseError::Config(e.to_string()))
    }

    /// The periodic check interval.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Sets the storage path.
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }
}
