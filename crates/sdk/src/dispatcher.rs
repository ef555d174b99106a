// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Serialized delivery of queued calls.
//!
//! The [`Dispatcher`] owns the [`QueueState`]. Every mutation happens under
//! one lock and is persisted before the lock is released. A single worker
//! task sends the head of the queue, one record at a time, and reacts to
//! three wake-ups: a kick after a mutation, a reachability change and the
//! retry timer of the head record. Nothing is sent while a
//! [`DispatchHold`] is alive or the suspension check of
//! [`DispatcherOptions`] says so.
//!
//! ```text
//! enqueue ──► QueueState ──► persist
//!                 │
//!                 ▼
//!  worker: head ──► Transport ──► Delivered / Dropped ──► pop, report
//!                        │
//!                        └──► Transient ──► backoff, arm timer
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ob_core::call::validate_path;
use ob_core::{
    BackoffPolicy, ClockSource, IdentityTransition, QueueState, RetryDecision, StateDir,
    SystemClock,
};
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::reachability::{ReachabilityChange, ReachabilityMonitor};
use crate::transport::{classify, Outcome, Transport, TransportError};

/// Why a record left the queue without being delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The server answered with a non-retryable status.
    Rejected { status: u16 },
    /// Every allowed attempt failed transiently.
    RetriesExhausted { attempts: u32, last_error: String },
    /// The call was refused before it was queued.
    Invalid { error: String },
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::Rejected { status } => write!(f, "rejected with status {status}"),
            DropReason::RetriesExhausted { attempts, last_error } => {
                write!(f, "gave up after {attempts} attempts: {last_error}")
            }
            DropReason::Invalid { error } => write!(f, "invalid call: {error}"),
        }
    }
}

/// Final state of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Dropped(DropReason),
    /// The dispatcher stopped first. The record stays persisted.
    Abandoned,
}

/// Sent on the report channel once per record leaving the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub record_id: String,
    pub path: String,
    pub outcome: DeliveryOutcome,
}

/// Resolves once with the outcome of a call queued with
/// [`Dispatcher::enqueue_with_completion`].
#[derive(Debug)]
pub struct Delivery {
    record_id: String,
    rx: oneshot::Receiver<DeliveryOutcome>,
}

impl Delivery {
    /// Id of the queued record, empty when the call was refused.
    pub fn record_id(&self) -> &str {
        &self.record_id
    }
}

impl Future for Delivery {
    type Output = DeliveryOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| result.unwrap_or(DeliveryOutcome::Abandoned))
    }
}

/// Dispatcher configuration and collaborators.
pub struct DispatcherOptions {
    pub backoff: BackoffPolicy,
    /// Upper bound of one transport attempt.
    pub request_timeout: Duration,
    /// Where the queue is persisted. `None` keeps it in memory.
    pub store: Option<Arc<StateDir>>,
    pub clock: Arc<dyn ClockSource>,
    pub reports: Option<mpsc::UnboundedSender<DeliveryReport>>,
    /// Checked before every send. Returning true keeps the queue waiting
    /// until the next wake-up.
    pub suspended: Option<Arc<dyn Fn() -> bool + Send + Sync>>,
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        DispatcherOptions {
            backoff: BackoffPolicy::default(),
            request_timeout: Duration::from_secs(30),
            store: None,
            clock: Arc::new(SystemClock),
            reports: None,
            suspended: None,
        }
    }
}

struct Shared {
    state: Mutex<QueueState>,
    store: Option<Arc<StateDir>>,
    persistence_degraded: AtomicBool,
    transport: Arc<dyn Transport>,
    reachability: ReachabilityMonitor,
    clock: Arc<dyn ClockSource>,
    backoff: BackoffPolicy,
    request_timeout: Duration,
    kick: Notify,
    pending: watch::Sender<usize>,
    completions: Mutex<HashMap<String, oneshot::Sender<DeliveryOutcome>>>,
    reports: Option<mpsc::UnboundedSender<DeliveryReport>>,
    suspended: Option<Arc<dyn Fn() -> bool + Send + Sync>>,
    holds: AtomicUsize,
    cancel: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    /// Applies `f` to the queue and persists the result under the same lock.
    fn mutate<R>(&self, f: impl FnOnce(&mut QueueState) -> R) -> R {
        let mut state = lock(&self.state);
        let result = f(&mut state);
        self.persist(&state);
        self.pending.send_replace(state.len());
        result
    }

    fn persist(&self, state: &QueueState) {
        let Some(store) = &self.store else {
            return;
        };
        if self.persistence_degraded.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = store.save_queue(state) {
            warn!(error = %e, "cannot persist queue, continuing in memory only");
            self.persistence_degraded.store(true, Ordering::Release);
        }
    }

    /// Removes a terminal record and notifies its observers.
    fn finish(&self, record_id: &str, path: &str, outcome: DeliveryOutcome) {
        self.mutate(|state| state.pop_head_if(record_id));
        match &outcome {
            DeliveryOutcome::Dropped(reason) => {
                warn!(record_id = %record_id, path = %path, reason = %reason, "call dropped");
            }
            _ => info!(record_id = %record_id, path = %path, "call delivered"),
        }
        if let Some(tx) = lock(&self.completions).remove(record_id) {
            let _ = tx.send(outcome.clone());
        }
        if let Some(reports) = &self.reports {
            let _ = reports.send(DeliveryReport {
                record_id: record_id.to_string(),
                path: path.to_string(),
                outcome,
            });
        }
    }

    fn is_paused(&self) -> bool {
        self.holds.load(Ordering::Acquire) > 0 || self.suspended.as_ref().is_some_and(|f| f())
    }

    fn clear_head_backoff(&self) {
        self.mutate(|state| {
            if let Some(head) = state.head_mut() {
                if head.next_attempt_at.take().is_some() {
                    debug!(record_id = %head.id, "connectivity regained, retrying now");
                }
            }
        });
    }
}

/// Keeps the dispatcher from sending until dropped.
///
/// Created with [`Dispatcher::hold`]. Holds nest; the queue is woken when
/// the last one is released.
#[must_use = "the dispatcher resumes as soon as the hold is dropped"]
pub struct DispatchHold {
    shared: Arc<Shared>,
}

impl Drop for DispatchHold {
    fn drop(&mut self) {
        if self.shared.holds.fetch_sub(1, Ordering::AcqRel) == 1 {
            debug!("dispatch hold released");
            self.shared.kick.notify_one();
        }
    }
}

enum PassEnd {
    /// Queue empty, network unusable or sending paused; wait for a wake-up.
    Idle,
    /// The head may not be sent before this time.
    RetryAt(DateTime<Utc>),
    Cancelled,
}

/// Sends due records in FIFO order until one must wait.
async fn dispatch_pass(shared: &Shared) -> PassEnd {
    loop {
        if shared.cancel.is_cancelled() {
            return PassEnd::Cancelled;
        }
        if !shared.reachability.should_attempt() || shared.is_paused() {
            return PassEnd::Idle;
        }

        let now = shared.clock.now();
        let (id, path, payload, attempt) = {
            let state = lock(&shared.state);
            let Some(head) = state.head() else {
                return PassEnd::Idle;
            };
            if let Some(at) = head.next_attempt_at.filter(|at| *at > now) {
                return PassEnd::RetryAt(at);
            }
            (head.id.clone(), head.path.clone(), head.payload(), head.attempt_count + 1)
        };

        debug!(record_id = %id, path = %path, attempt, "sending call");
        let send = shared.transport.send(&path, &payload, &id);
        let result = tokio::select! {
            _ = shared.cancel.cancelled() => return PassEnd::Cancelled,
            result = tokio::time::timeout(shared.request_timeout, send) => {
                result.unwrap_or(Err(TransportError::Timeout))
            }
        };

        match classify(&result) {
            Outcome::Delivered => shared.finish(&id, &path, DeliveryOutcome::Delivered),
            Outcome::Permanent { status } => {
                shared.finish(&id, &path, DeliveryOutcome::Dropped(DropReason::Rejected { status }))
            }
            Outcome::Transient { error } => {
                let now = shared.clock.now();
                let decision = shared.mutate(|state| {
                    state
                        .head_mut()
                        .filter(|head| head.id == id)
                        .map(|head| head.record_failure(now, &shared.backoff))
                });
                match decision {
                    Some(RetryDecision::RetryAt(at)) => {
                        debug!(record_id = %id, error = %error, retry_at = %at, "attempt failed");
                        return PassEnd::RetryAt(at);
                    }
                    Some(RetryDecision::Exhausted { attempts }) => shared.finish(
                        &id,
                        &path,
                        DeliveryOutcome::Dropped(DropReason::RetriesExhausted {
                            attempts,
                            last_error: error,
                        }),
                    ),
                    None => {}
                }
            }
        }
    }
}

async fn run(shared: Arc<Shared>, mut changes: broadcast::Receiver<ReachabilityChange>) {
    debug!("dispatcher started");
    loop {
        let delay = match dispatch_pass(&shared).await {
            PassEnd::Cancelled => break,
            PassEnd::Idle => None,
            PassEnd::RetryAt(at) => {
                Some((at - shared.clock.now()).to_std().unwrap_or(Duration::ZERO))
            }
        };

        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = shared.kick.notified() => {}
            change = changes.recv() => match change {
                Ok(change) if change.regained() => shared.clear_head_backoff(),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "missed reachability changes");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::time::sleep(delay.unwrap_or_default()), if delay.is_some() => {}
        }
    }
    debug!("dispatcher stopped");
}

/// Owner of the call queue.
///
/// One dispatcher per state directory and process. Dropping it stops the
/// worker; queued records stay persisted.
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Creates a dispatcher, loading the persisted queue from the store.
    pub fn new(
        transport: Arc<dyn Transport>,
        reachability: ReachabilityMonitor,
        options: DispatcherOptions,
    ) -> Self {
        let state = options.store.as_ref().map(|store| store.load_queue()).unwrap_or_default();
        if !state.is_empty() {
            info!(pending = state.len(), "restored queued calls");
        }
        let (pending, _) = watch::channel(state.len());
        Dispatcher {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                store: options.store,
                persistence_degraded: AtomicBool::new(false),
                transport,
                reachability,
                clock: options.clock,
                backoff: options.backoff,
                request_timeout: options.request_timeout,
                kick: Notify::new(),
                pending,
                completions: Mutex::new(HashMap::new()),
                reports: options.reports,
                suspended: options.suspended,
                holds: AtomicUsize::new(0),
                cancel: CancellationToken::new(),
                worker: Mutex::new(None),
            }),
        }
    }

    /// Spawns the worker task. Calling it again is a no-op.
    ///
    /// A dispatcher that was shut down does not start again.
    pub fn start(&self) -> Result<()> {
        let mut worker = lock(&self.shared.worker);
        if worker.is_some() {
            return Ok(());
        }
        if self.shared.cancel.is_cancelled() {
            warn!("dispatcher was shut down and cannot be restarted");
            return Ok(());
        }
        let handle = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let changes = self.shared.reachability.subscribe();
        *worker = Some(handle.spawn(run(Arc::clone(&self.shared), changes)));
        Ok(())
    }

    /// Stops the worker. An attempt in flight is abandoned and its record
    /// kept; pending [`Delivery`] futures resolve to `Abandoned`.
    pub async fn shutdown(&self) {
        self.shared.cancel.cancel();
        let worker = lock(&self.shared.worker).take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
        lock(&self.shared.completions).clear();
    }

    /// Wakes the worker to re-check the queue.
    pub(crate) fn kick(&self) {
        self.shared.kick.notify_one();
    }

    /// Pauses sending until the returned hold is dropped. Calls keep
    /// queueing meanwhile.
    pub fn hold(&self) -> DispatchHold {
        self.shared.holds.fetch_add(1, Ordering::AcqRel);
        DispatchHold { shared: Arc::clone(&self.shared) }
    }

    /// Queues a call attributed to the current identity.
    pub fn enqueue(&self, path: &str, parameters: Map<String, Value>) {
        if let Err(e) = validate_path(path) {
            warn!(error = %e, "call ignored");
            return;
        }
        let now = self.shared.clock.now();
        let id = self.shared.mutate(|state| state.enqueue(path, parameters, now));
        debug!(record_id = %id, path = %path, "call queued");
        self.kick();
    }

    /// Queues a call and returns a future resolving with its outcome.
    pub fn enqueue_with_completion(&self, path: &str, parameters: Map<String, Value>) -> Delivery {
        let (tx, rx) = oneshot::channel();
        if let Err(e) = validate_path(path) {
            let _ = tx.send(DeliveryOutcome::Dropped(DropReason::Invalid { error: e.to_string() }));
            return Delivery { record_id: String::new(), rx };
        }
        let now = self.shared.clock.now();
        let record_id = self.shared.mutate(|state| {
            let id = state.enqueue(path, parameters, now);
            lock(&self.shared.completions).insert(id.clone(), tx);
            id
        });
        debug!(record_id = %record_id, path = %path, "call queued");
        self.kick();
        Delivery { record_id, rx }
    }

    /// Resolves the current identity to `user_id`.
    pub fn set_user_id(&self, user_id: &str) -> IdentityTransition {
        let now = self.shared.clock.now();
        let transition = self.shared.mutate(|state| state.set_user_id(user_id, now));
        self.after_transition(&transition, user_id);
        transition
    }

    /// Moves the current user to `new_user_id`.
    pub fn alias(&self, new_user_id: &str) -> IdentityTransition {
        let now = self.shared.clock.now();
        let transition = self.shared.mutate(|state| state.alias(new_user_id, now));
        self.after_transition(&transition, new_user_id);
        transition
    }

    fn after_transition(&self, transition: &IdentityTransition, user_id: &str) {
        match transition {
            IdentityTransition::Unchanged => return,
            IdentityTransition::Adopted => info!(user_id = %user_id, "user id adopted"),
            IdentityTransition::Linked { temporary_user_id, rewritten } => info!(
                user_id = %user_id,
                temporary_user_id = %temporary_user_id,
                rewritten,
                "anonymous calls linked to user"
            ),
            IdentityTransition::Switched { previous_user_id } => info!(
                user_id = %user_id,
                previous_user_id = %previous_user_id,
                "switched user"
            ),
            IdentityTransition::Aliased { previous_user_id, rewritten } => info!(
                user_id = %user_id,
                previous_user_id = %previous_user_id,
                rewritten,
                "user aliased"
            ),
        }
        self.kick();
    }

    /// Signs the current user out. Returns the cleared user id.
    pub fn logout(&self) -> Option<String> {
        let now = self.shared.clock.now();
        let previous = self.shared.mutate(|state| state.logout(now));
        if let Some(user_id) = &previous {
            info!(user_id = %user_id, "logged out");
        }
        self.kick();
        previous
    }

    pub fn register_push_token(&self, token: &str) {
        let now = self.shared.clock.now();
        self.shared.mutate(|state| state.register_push_token(token, now));
        debug!("push token registered");
        self.kick();
    }

    /// Returns false when no push token is known.
    pub fn disable_push_token(&self) -> bool {
        let now = self.shared.clock.now();
        let disabled = self.shared.mutate(|state| state.disable_push_token(now));
        if disabled {
            self.kick();
        }
        disabled
    }

    pub fn user_id(&self) -> Option<String> {
        lock(&self.shared.state).user_id.clone()
    }

    /// Copy of the current queue state.
    pub fn snapshot(&self) -> QueueState {
        lock(&self.shared.state).clone()
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.shared.state).len()
    }

    /// Returns false once persistence failed and the queue lives in memory.
    pub fn is_persistent(&self) -> bool {
        self.shared.store.is_some() && !self.shared.persistence_degraded.load(Ordering::Acquire)
    }

    /// Waits until the queue is empty. Returns false on timeout.
    pub async fn flush(&self, timeout: Duration) -> bool {
        let mut pending = self.shared.pending.subscribe();
        self.kick();
        let drained =
            matches!(tokio::time::timeout(timeout, pending.wait_for(|n| *n == 0)).await, Ok(Ok(_)));
        drained
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
