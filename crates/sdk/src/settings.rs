// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime settings.
//!
//! Settings are stored in `<state_dir>/config.toml`. Every key is optional;
//! a missing file yields the defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ob_core::remote_config::DEFAULT_TTL_SECS;
use ob_core::BackoffPolicy;
use serde::{Deserialize, Serialize};

use crate::env;
use crate::error::{Error, Result};

/// SDK version reported to the server.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Settings loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Key sent as `X-Outbound-Key`. May be empty for offline use.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Platform name used in the client header and the config endpoint.
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub delivery: DeliverySettings,
    #[serde(default)]
    pub reachability: ReachabilitySettings,
    #[serde(default)]
    pub remote_config: RemoteConfigSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverySettings {
    /// Retries per call after its first send before it is dropped.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachabilitySettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfigSettings {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_base_url() -> String {
    "https://api.outbound.io".to_string()
}

fn default_platform() -> String {
    "rust".to_string()
}

fn default_max_retry_attempts() -> u32 {
    30
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    300_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            api_key: String::new(),
            base_url: default_base_url(),
            platform: default_platform(),
            delivery: DeliverySettings::default(),
            reachability: ReachabilitySettings::default(),
            remote_config: RemoteConfigSettings::default(),
        }
    }
}

impl Default for DeliverySettings {
    fn default() -> Self {
        DeliverySettings {
            max_retry_attempts: default_max_retry_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for ReachabilitySettings {
    fn default() -> Self {
        ReachabilitySettings { poll_interval_ms: default_poll_interval_ms() }
    }
}

impl Default for RemoteConfigSettings {
    fn default() -> Self {
        RemoteConfigSettings { ttl_secs: default_ttl_secs() }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| Error::Settings(format!("failed to parse settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads `config.toml` from `state_dir`, using defaults when it is absent,
    /// then applies environment overrides.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(ob_core::store::SETTINGS_FILE);
        let settings = match fs::read_to_string(&path) {
            Ok(content) => Settings::parse(&content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Settings::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(settings.with_api_key_override(env::api_key()))
    }

    /// Writes the settings to `config.toml` in `state_dir`.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Settings(format!("failed to serialize settings: {e}")))?;
        fs::write(state_dir.join(ob_core::store::SETTINGS_FILE), content)?;
        Ok(())
    }

    /// Replaces the API key when an override is given.
    pub fn with_api_key_override(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key {
            self.api_key = key;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Settings("base_url must not be empty".into()));
        }
        if self.platform.trim().is_empty() {
            return Err(Error::Settings("platform must not be empty".into()));
        }
        if self.delivery.max_retry_attempts == 0 {
            return Err(Error::Settings("delivery.max_retry_attempts must be at least 1".into()));
        }
        if self.delivery.backoff_base_ms > self.delivery.backoff_max_ms {
            return Err(Error::Settings(
                "delivery.backoff_base_ms must not exceed delivery.backoff_max_ms".into(),
            ));
        }
        Ok(())
    }

    /// Value of the `X-Outbound-Client` header.
    pub fn client_header(&self) -> String {
        format!("{}/{}", self.platform, SDK_VERSION)
    }

    /// Path of the remote config endpoint, relative to `base_url`.
    pub fn config_path(&self) -> String {
        format!("i/config/sdk/{}/{}", self.platform, SDK_VERSION)
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_millis(self.delivery.backoff_base_ms),
            max: Duration::from_millis(self.delivery.backoff_max_ms),
            max_attempts: self.delivery.max_retry_attempts,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.reachability.poll_interval_ms)
    }

    pub fn remote_config_ttl(&self) -> Duration {
        Duration::from_secs(self.remote_config.ttl_secs)
    }
}

/// Resolves the state directory.
///
/// Precedence: explicit path, `OUTBOUND_STATE_DIR`, `$XDG_STATE_HOME/outbound`,
/// `~/.local/state/outbound`.
pub fn state_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    resolve_state_dir(explicit.or_else(env::state_dir), env::xdg_state_home(), dirs::home_dir())
}

fn resolve_state_dir(
    explicit: Option<PathBuf>,
    xdg_state_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    if let Some(xdg) = xdg_state_home {
        return Ok(xdg.join("outbound"));
    }
    home.map(|home| home.join(".local").join("state").join("outbound")).ok_or_else(|| {
        Error::Settings("cannot determine a state directory\n  hint: pass --state-dir".into())
    })
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
