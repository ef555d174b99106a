// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Network reachability monitoring.
//!
//! A [`ReachabilityMonitor`] polls a [`NetworkProbe`] in a background task,
//! keeps the latest flags and broadcasts a [`ReachabilityChange`] whenever
//! the combined [`NetworkStatus`] or the permission to send changes.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Whether and how the network can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Unreachable,
    #[serde(rename = "wifi")]
    ReachableViaWiFi,
    #[serde(rename = "cellular")]
    ReachableViaCellular,
}

impl NetworkStatus {
    pub fn is_reachable(self) -> bool {
        !matches!(self, NetworkStatus::Unreachable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NetworkStatus::Unreachable => "unreachable",
            NetworkStatus::ReachableViaWiFi => "wifi",
            NetworkStatus::ReachableViaCellular => "cellular",
        }
    }
}

impl std::fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw observation of the current route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReachabilityFlags {
    /// A route to the outside exists.
    pub reachable: bool,
    /// The interface exists but must be brought up first.
    pub connection_required: bool,
    /// The route goes through a cellular interface.
    pub cellular: bool,
}

impl ReachabilityFlags {
    pub fn network_status(&self) -> NetworkStatus {
        if !self.reachable || self.connection_required {
            NetworkStatus::Unreachable
        } else if self.cellular {
            NetworkStatus::ReachableViaCellular
        } else {
            NetworkStatus::ReachableViaWiFi
        }
    }
}

/// Source of reachability observations.
pub trait NetworkProbe: Send + Sync {
    /// Observes the current route. An error means observation itself is
    /// impossible, not that the network is down.
    fn probe(&self) -> io::Result<ReachabilityFlags>;
}

/// Probe backed by the Linux routing table.
///
/// The default route is read from `/proc/net/route`; its interface is
/// classified from `/sys/class/net/<iface>`.
#[derive(Debug, Clone)]
pub struct RouteTableProbe {
    route_table: PathBuf,
    sys_class_net: PathBuf,
}

impl Default for RouteTableProbe {
    fn default() -> Self {
        RouteTableProbe::with_paths("/proc/net/route", "/sys/class/net")
    }
}

impl RouteTableProbe {
    pub fn with_paths(route_table: impl Into<PathBuf>, sys_class_net: impl Into<PathBuf>) -> Self {
        RouteTableProbe { route_table: route_table.into(), sys_class_net: sys_class_net.into() }
    }

    fn classify(&self, iface: &str) -> ReachabilityFlags {
        let dir = self.sys_class_net.join(iface);
        let operstate = fs::read_to_string(dir.join("operstate")).unwrap_or_default();
        let operstate = operstate.trim();
        ReachabilityFlags {
            reachable: operstate != "down",
            connection_required: matches!(operstate, "dormant" | "lowerlayerdown"),
            cellular: is_cellular(iface) && !dir.join("wireless").exists(),
        }
    }
}

fn is_cellular(iface: &str) -> bool {
    ["ww", "rmnet", "ppp"].iter().any(|prefix| iface.starts_with(prefix))
}

/// Returns the interface of the default route with the lowest metric.
fn default_route_interface(table: &str) -> Option<String> {
    const RTF_UP: u32 = 0x1;
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let (iface, dest, flags, metric) = (cols.first()?, cols.get(1)?, cols.get(3)?, cols.get(6)?);
            let flags = u32::from_str_radix(flags, 16).ok()?;
            let metric: u32 = metric.parse().ok()?;
            (*dest == "00000000" && flags & RTF_UP != 0).then(|| (metric, iface.to_string()))
        })
        .min_by_key(|(metric, _)| *metric)
        .map(|(_, iface)| iface)
}

impl NetworkProbe for RouteTableProbe {
    fn probe(&self) -> io::Result<ReachabilityFlags> {
        let table = fs::read_to_string(&self.route_table)?;
        Ok(match default_route_interface(&table) {
            Some(iface) => self.classify(&iface),
            None => ReachabilityFlags::default(),
        })
    }
}

/// Transition broadcast to subscribers when the status or the send
/// permission changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReachabilityChange {
    pub old: NetworkStatus,
    pub new: NetworkStatus,
    /// [`ReachabilityMonitor::should_attempt`] before the change.
    pub could_send: bool,
    /// [`ReachabilityMonitor::should_attempt`] after the change.
    pub can_send: bool,
}

impl ReachabilityChange {
    /// Returns true when the network just became usable.
    pub fn regained(&self) -> bool {
        (!self.old.is_reachable() && self.new.is_reachable()) || (!self.could_send && self.can_send)
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    flags: ReachabilityFlags,
    forced: Option<NetworkStatus>,
    observing: bool,
    cancel: Option<CancellationToken>,
}

impl MonitorState {
    fn status(&self) -> NetworkStatus {
        self.forced.unwrap_or_else(|| self.flags.network_status())
    }

    fn should_attempt(&self) -> bool {
        match self.forced {
            Some(status) => status.is_reachable(),
            None if !self.observing => true,
            None => self.status().is_reachable(),
        }
    }
}

struct Inner {
    probe: Arc<dyn NetworkProbe>,
    poll_interval: Duration,
    state: Mutex<MonitorState>,
    changes: broadcast::Sender<ReachabilityChange>,
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `update` and broadcasts if the status or the send permission
    /// changed.
    fn update(&self, update: impl FnOnce(&mut MonitorState)) {
        let change = {
            let mut state = self.lock();
            let (old, could_send) = (state.status(), state.should_attempt());
            update(&mut state);
            let (new, can_send) = (state.status(), state.should_attempt());
            (old != new || could_send != can_send)
                .then_some(ReachabilityChange { old, new, could_send, can_send })
        };
        if let Some(change) = change {
            info!(
                old = %change.old,
                new = %change.new,
                can_send = change.can_send,
                "reachability changed"
            );
            // No receivers is fine.
            let _ = self.changes.send(change);
        }
    }
}

/// Polls the network and notifies subscribers of status changes.
///
/// Cloning yields another handle to the same monitor.
#[derive(Clone)]
pub struct ReachabilityMonitor {
    inner: Arc<Inner>,
}

impl ReachabilityMonitor {
    pub fn new(probe: Arc<dyn NetworkProbe>, poll_interval: Duration) -> Self {
        let (changes, _) = broadcast::channel(16);
        ReachabilityMonitor {
            inner: Arc::new(Inner {
                probe,
                poll_interval,
                state: Mutex::new(MonitorState::default()),
                changes,
            }),
        }
    }

    /// Begins observing. Returns false when the probe cannot observe the
    /// network or no runtime is available; callers then assume the network
    /// is reachable.
    pub fn start(&self) -> bool {
        if self.inner.lock().observing {
            return true;
        }
        let flags = match self.inner.probe.probe() {
            Ok(flags) => flags,
            Err(e) => {
                warn!(error = %e, "cannot observe reachability, assuming reachable");
                return false;
            }
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no runtime for reachability polling, assuming reachable");
            return false;
        };

        let cancel = CancellationToken::new();
        self.inner.update(|state| {
            state.flags = flags;
            state.observing = true;
            state.cancel = Some(cancel.clone());
        });

        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
            poll(inner, cancel).await;
        });
        debug!(interval = ?self.inner.poll_interval, "reachability polling started");
        true
    }

    /// Stops observing.
    pub fn stop(&self) {
        self.inner.update(|state| {
            if let Some(cancel) = state.cancel.take() {
                cancel.cancel();
            }
            state.observing = false;
        });
    }

    pub fn is_observing(&self) -> bool {
        self.inner.lock().observing
    }

    /// Current combined status. Before a successful [`start`](Self::start)
    /// this is `Unreachable` unless a status is forced.
    pub fn current_status(&self) -> NetworkStatus {
        self.inner.lock().status()
    }

    /// Returns true when an interface exists but is not connected yet.
    pub fn connection_required(&self) -> bool {
        let state = self.inner.lock();
        state.forced.is_none() && state.flags.connection_required
    }

    /// Returns true when sends should be attempted now.
    ///
    /// Without working observation every attempt is made opportunistically.
    pub fn should_attempt(&self) -> bool {
        self.inner.lock().should_attempt()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReachabilityChange> {
        self.inner.changes.subscribe()
    }

    /// Pins the status (`Some`) or returns to observed status (`None`).
    pub fn force_status(&self, status: Option<NetworkStatus>) {
        self.inner.update(|state| state.forced = status);
    }
}

async fn poll(inner: Arc<Inner>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(inner.poll_interval) => {}
        }
        let flags = match inner.probe.probe() {
            Ok(flags) => flags,
            Err(e) => {
                debug!(error = %e, "reachability probe failed");
                ReachabilityFlags::default()
            }
        };
        inner.update(|state| state.flags = flags);
    }
}

#[cfg(test)]
#[path = "reachability_tests.rs"]
mod tests;
