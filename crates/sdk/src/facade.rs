// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Host-facing entry point.
//!
//! [`Outbound`] wires one [`Dispatcher`], one [`RemoteConfig`] and one
//! [`ReachabilityMonitor`] to a state directory. Create it once per process
//! with [`Outbound::builder`] and pass it by reference.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ob_core::call::paths;
use ob_core::{ClockSource, QueueState, RemoteConfigSnapshot, StateDir, SystemClock};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatcher::{DeliveryReport, Dispatcher, DispatcherOptions};
use crate::error::Result;
use crate::reachability::{NetworkProbe, NetworkStatus, ReachabilityMonitor, RouteTableProbe};
use crate::remote_config::RemoteConfig;
use crate::settings::Settings;
use crate::transport::{HttpTransport, Transport};

/// Builder for [`Outbound`]. Every collaborator can be replaced for tests.
pub struct OutboundBuilder {
    settings: Settings,
    state_dir: PathBuf,
    transport: Option<Arc<dyn Transport>>,
    probe: Option<Arc<dyn NetworkProbe>>,
    clock: Option<Arc<dyn ClockSource>>,
    max_retry_attempts: Option<u32>,
    reports: Option<mpsc::UnboundedSender<DeliveryReport>>,
    forced_status: Option<NetworkStatus>,
}

impl OutboundBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn probe(mut self, probe: Arc<dyn NetworkProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides `delivery.max_retry_attempts`.
    pub fn max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = Some(attempts);
        self
    }

    /// Receives one report per call leaving the queue.
    pub fn reports(mut self, reports: mpsc::UnboundedSender<DeliveryReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Pins the reachability status instead of observing the network.
    pub fn force_status(mut self, status: NetworkStatus) -> Self {
        self.forced_status = Some(status);
        self
    }

    /// Opens the state directory and assembles the runtime.
    ///
    /// Fails when the directory is owned by another process or the HTTP
    /// client cannot be created.
    pub fn build(self) -> Result<Outbound> {
        let store = Arc::new(StateDir::open(&self.state_dir)?);
        let settings = self.settings;
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&settings)?),
        };
        let probe = self.probe.unwrap_or_else(|| Arc::new(RouteTableProbe::default()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let reachability = ReachabilityMonitor::new(probe, settings.poll_interval());
        if let Some(status) = self.forced_status {
            reachability.force_status(Some(status));
        }

        let mut backoff = settings.backoff_policy();
        if let Some(attempts) = self.max_retry_attempts {
            backoff.max_attempts = attempts.max(1);
        }
        let remote_config = RemoteConfig::new(
            Arc::clone(&transport),
            Arc::clone(&clock),
            Some(Arc::clone(&store)),
            settings.config_path(),
            settings.remote_config_ttl(),
        );
        let killed = remote_config.clone();
        let dispatcher = Dispatcher::new(
            transport,
            reachability.clone(),
            DispatcherOptions {
                backoff,
                request_timeout: settings.request_timeout(),
                store: Some(Arc::clone(&store)),
                clock: Arc::clone(&clock),
                reports: self.reports,
                suspended: Some(Arc::new(move || killed.is_killed())),
            },
        );

        Ok(Outbound { settings, store, clock, reachability, dispatcher, remote_config })
    }
}

/// Summary of the runtime state, as shown by `outbound status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub state_dir: PathBuf,
    pub pending: usize,
    pub user_id: Option<String>,
    pub temporary_user_id: Option<String>,
    pub has_push_token: bool,
    pub reachability: NetworkStatus,
    pub persistent: bool,
    pub remote_kill: bool,
}

/// The SDK runtime.
pub struct Outbound {
    settings: Settings,
    store: Arc<StateDir>,
    clock: Arc<dyn ClockSource>,
    reachability: ReachabilityMonitor,
    dispatcher: Dispatcher,
    remote_config: RemoteConfig,
}

impl Outbound {
    pub fn builder(settings: Settings, state_dir: impl Into<PathBuf>) -> OutboundBuilder {
        OutboundBuilder {
            settings,
            state_dir: state_dir.into(),
            transport: None,
            probe: None,
            clock: None,
            max_retry_attempts: None,
            reports: None,
            forced_status: None,
        }
    }

    /// Starts reachability observation and the delivery worker, and
    /// refreshes the remote config in the background when online.
    ///
    /// Queued calls wait for that refresh to finish, successfully or not,
    /// and are not sent while the config holds a remote kill.
    pub fn start(&self) -> Result<()> {
        if !self.reachability.start() {
            debug!("sending opportunistically without reachability updates");
        }
        let hold = self.dispatcher.hold();
        self.dispatcher.start()?;
        if self.reachability.should_attempt() {
            let remote_config = self.remote_config.clone();
            tokio::spawn(async move {
                let config = remote_config.get().await;
                debug!(killed = config.is_some_and(|c| c.remote_kill), "initial config settled");
                drop(hold);
            });
        }
        Ok(())
    }

    /// Stops the worker and reachability polling. Queued calls stay on disk.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        self.reachability.stop();
    }

    fn accepts(&self, call: &str) -> bool {
        if self.remote_config.is_killed() {
            debug!(call, "remote kill active, call ignored");
            return false;
        }
        true
    }

    /// Identifies the current user and sends their attributes.
    ///
    /// Anonymous calls queued so far are attributed to `user_id`.
    pub fn identify(&self, user_id: &str, attributes: Map<String, Value>) {
        if !self.accepts(paths::IDENTIFY) {
            return;
        }
        if user_id.is_empty() {
            warn!("identify without a user id ignored");
            return;
        }
        self.dispatcher.set_user_id(user_id);
        self.dispatcher.enqueue(paths::IDENTIFY, attributes);
    }

    /// Identifies the user and the group they belong to.
    pub fn identify_group(
        &self,
        group_id: &str,
        user_id: &str,
        group_attributes: Option<Map<String, Value>>,
        user_attributes: Map<String, Value>,
    ) {
        if !self.accepts(paths::IDENTIFY) {
            return;
        }
        if group_id.is_empty() || user_id.is_empty() {
            warn!("identify_group without a group id or user id ignored");
            return;
        }
        let mut payload = user_attributes;
        payload.insert("group_id".into(), Value::String(group_id.to_string()));
        if let Some(group_attributes) = group_attributes {
            payload.insert("group_attributes".into(), Value::Object(group_attributes));
        }
        self.dispatcher.set_user_id(user_id);
        self.dispatcher.enqueue(paths::IDENTIFY, payload);
    }

    /// Continues the current user under `new_user_id`.
    pub fn alias(&self, new_user_id: &str) {
        if !self.accepts(paths::IDENTIFY) {
            return;
        }
        if new_user_id.is_empty() {
            warn!("alias without a user id ignored");
            return;
        }
        self.dispatcher.alias(new_user_id);
    }

    /// Records a named event.
    pub fn track(&self, event: &str, properties: Option<Map<String, Value>>) {
        if !self.accepts(paths::TRACK) {
            return;
        }
        if event.is_empty() {
            warn!("track without an event name ignored");
            return;
        }
        let mut payload = Map::new();
        payload.insert("event".into(), Value::String(event.to_string()));
        if let Some(properties) = properties {
            payload.insert("properties".into(), Value::Object(properties));
        }
        payload.insert("timestamp".into(), Value::from(self.clock.now().timestamp()));
        self.dispatcher.enqueue(paths::TRACK, payload);
    }

    pub fn register_push_token(&self, token: &str) {
        if !self.accepts(paths::APNS_REGISTER) {
            return;
        }
        if token.is_empty() {
            warn!("empty push token ignored");
            return;
        }
        self.dispatcher.register_push_token(token);
    }

    /// Registers a raw device token, hex-encoded.
    pub fn register_device_token(&self, token: &[u8]) {
        self.register_push_token(&hex::encode(token));
    }

    pub fn disable_push_token(&self) {
        if !self.accepts(paths::APNS_DISABLE) {
            return;
        }
        if !self.dispatcher.disable_push_token() {
            debug!("no push token to disable");
        }
    }

    /// Signs the user out and stops push notifications to them.
    pub fn logout(&self) {
        if !self.accepts(paths::APNS_DISABLE) {
            return;
        }
        self.dispatcher.logout();
    }

    /// Returns the remote config, fetching it when stale and online.
    pub async fn config(&self) -> Option<RemoteConfigSnapshot> {
        if self.reachability.should_attempt() {
            let config = self.remote_config.get().await;
            self.dispatcher.kick();
            config
        } else {
            self.remote_config.cached()
        }
    }

    /// Fetches the remote config even when the cached one is fresh.
    pub async fn refresh_config(&self) -> Option<RemoteConfigSnapshot> {
        if self.reachability.should_attempt() {
            let config = self.remote_config.refresh().await;
            self.dispatcher.kick();
            config
        } else {
            self.remote_config.cached()
        }
    }

    pub fn cached_config(&self) -> Option<RemoteConfigSnapshot> {
        self.remote_config.cached()
    }

    /// Waits until every queued call left the queue. Returns false on
    /// timeout.
    pub async fn flush(&self, timeout: Duration) -> bool {
        self.dispatcher.flush(timeout).await
    }

    pub fn status(&self) -> Status {
        let snapshot = self.dispatcher.snapshot();
        Status {
            state_dir: self.store.path().to_path_buf(),
            pending: snapshot.len(),
            user_id: snapshot.user_id,
            temporary_user_id: snapshot.temporary_user_id,
            has_push_token: snapshot.push_token.is_some(),
            reachability: self.reachability.current_status(),
            persistent: self.dispatcher.is_persistent(),
            remote_kill: self.remote_config.is_killed(),
        }
    }

    pub fn snapshot(&self) -> QueueState {
        self.dispatcher.snapshot()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn reachability(&self) -> &ReachabilityMonitor {
        &self.reachability
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state_dir(&self) -> &Path {
        self.store.path()
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
