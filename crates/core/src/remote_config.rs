// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server-driven SDK policy.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default lifetime of a fetched snapshot, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Immutable copy of the last successfully fetched policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfigSnapshot {
    #[serde(default)]
    pub prompt_for_permission: bool,
    #[serde(default)]
    pub prompt_at_install: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_at_event: Option<String>,
    /// Copy shown before the system permission dialog.
    #[serde(default)]
    pub pre_prompt_copy: Map<String, Value>,
    /// Suppresses every outbound call when set.
    #[serde(default)]
    pub remote_kill: bool,
    pub fetched_at: DateTime<Utc>,
}

impl RemoteConfigSnapshot {
    /// Builds a snapshot from the server document.
    pub fn from_server(response: SdkConfigResponse, fetched_at: DateTime<Utc>) -> Self {
        let account = response.account.unwrap_or_default();
        let prompt = account.prompt.unwrap_or(false);
        let prompt_at_event = account.prompt_event.filter(|event| !event.is_empty());
        RemoteConfigSnapshot {
            prompt_for_permission: prompt,
            prompt_at_install: prompt && prompt_at_event.is_none(),
            prompt_at_event,
            pre_prompt_copy: account.pre_prompt.unwrap_or_default(),
            remote_kill: !response.enabled.unwrap_or(true),
            fetched_at,
        }
    }

    /// Returns true once the snapshot is at least `ttl` old.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) >= ttl
    }

    /// Looks up one string of the pre-prompt copy, e.g. `title`.
    pub fn pre_prompt_text(&self, key: &str) -> Option<&str> {
        self.pre_prompt_copy.get(key).and_then(Value::as_str)
    }
}

/// Body of `GET /i/config/sdk/<platform>/<version>`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SdkConfigResponse {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub account: Option<AccountConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub prompt: Option<bool>,
    #[serde(default)]
    pub prompt_event: Option<String>,
    #[serde(default)]
    pub pre_prompt: Option<Map<String, Value>>,
}

#[cfg(test)]
#[path = "remote_config_tests.rs"]
mod tests;
