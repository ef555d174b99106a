// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! TTL cache of server-driven SDK policy.
//!
//! A fresh snapshot is served without network access. A stale or missing one
//! triggers a fetch; when the fetch fails the previous snapshot is returned
//! unchanged and its `fetched_at` is kept, so the next call tries again.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ob_core::{ClockSource, RemoteConfigSnapshot, SdkConfigResponse, StateDir};
use tracing::{debug, info, warn};

use crate::transport::Transport;

struct Inner {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn ClockSource>,
    store: Option<Arc<StateDir>>,
    path: String,
    ttl: chrono::Duration,
    cached: Mutex<Option<RemoteConfigSnapshot>>,
    /// Serializes fetches so at most one is in flight.
    fetch_lock: tokio::sync::Mutex<()>,
}

/// Cached remote configuration. Clones share the same cache.
#[derive(Clone)]
pub struct RemoteConfig {
    inner: Arc<Inner>,
}

impl RemoteConfig {
    /// Creates a cache for the config document at `path`, seeded from the
    /// persisted snapshot in `store`.
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<dyn ClockSource>,
        store: Option<Arc<StateDir>>,
        path: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let cached = store.as_ref().and_then(|store| store.load_remote_config());
        RemoteConfig {
            inner: Arc::new(Inner {
                transport,
                clock,
                store,
                path: path.into(),
                ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
                cached: Mutex::new(cached),
                fetch_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Returns the current snapshot without touching the network.
    pub fn cached(&self) -> Option<RemoteConfigSnapshot> {
        self.inner.cached.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns true when the cached snapshot asks to suppress all calls.
    pub fn is_killed(&self) -> bool {
        self.cached().is_some_and(|snapshot| snapshot.remote_kill)
    }

    /// Returns a fresh snapshot, fetching if the cached one is stale.
    ///
    /// `None` only when nothing was ever fetched and this fetch failed.
    pub async fn get(&self) -> Option<RemoteConfigSnapshot> {
        let _guard = self.inner.fetch_lock.lock().await;
        if let Some(snapshot) = self.fresh() {
            debug!("remote config is fresh");
            return Some(snapshot);
        }
        self.fetch().await
    }

    /// Fetches regardless of the TTL.
    pub async fn refresh(&self) -> Option<RemoteConfigSnapshot> {
        let _guard = self.inner.fetch_lock.lock().await;
        self.fetch().await
    }

    fn fresh(&self) -> Option<RemoteConfigSnapshot> {
        let now = self.inner.clock.now();
        self.cached().filter(|snapshot| !snapshot.is_stale(now, self.inner.ttl))
    }

    async fn fetch(&self) -> Option<RemoteConfigSnapshot> {
        let fetched = match self.inner.transport.fetch(&self.inner.path).await {
            Ok(response) if response.is_success() => response
                .json::<SdkConfigResponse>()
                .map_err(|e| format!("invalid config document: {e}")),
            Ok(response) => Err(format!("server returned {}", response.status)),
            Err(e) => Err(e.to_string()),
        };
        match fetched {
            Ok(document) => {
                let snapshot = RemoteConfigSnapshot::from_server(document, self.inner.clock.now());
                info!(remote_kill = snapshot.remote_kill, "remote config updated");
                if let Some(store) = &self.inner.store {
                    if let Err(e) = store.save_remote_config(&snapshot) {
                        warn!(error = %e, "cannot persist remote config");
                    }
                }
                *self.inner.cached.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(snapshot.clone());
                Some(snapshot)
            }
            Err(error) => {
                warn!(path = %self.inner.path, error = %error, "remote config fetch failed");
                self.cached()
            }
        }
    }
}

#[cfg(test)]
#[path = "remote_config_tests.rs"]
mod tests;
