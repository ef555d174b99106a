// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles: a scripted transport, a settable probe and a clock
//! that follows tokio's (pausable) time.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use ob_core::ClockSource;
use serde_json::Value;
use tokio::sync::Notify;

use crate::reachability::{NetworkProbe, ReachabilityFlags};
use crate::transport::{Response, Transport, TransportError, TransportResult};

/// Scripted reply of the mock transport.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    Fail(TransportError),
    /// Never completes.
    Hang,
}

/// One request observed by the mock transport.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub path: String,
    pub payload: Value,
    pub dedup_id: String,
    pub at: tokio::time::Instant,
}

impl SentRequest {
    pub fn user_id(&self) -> Option<&str> {
        self.payload.get("user_id").and_then(Value::as_str)
    }
}

/// Mock transport for testing without a server.
///
/// Replies are consumed in order; once the script is empty every send gets
/// the fallback reply.
pub struct MockTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: Mutex<Reply>,
    sent: Mutex<Vec<SentRequest>>,
    sent_notify: Notify,
    fetch_replies: Mutex<VecDeque<TransportResult<Response>>>,
    fetches: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(Reply::Status(200)),
            sent: Mutex::new(Vec::new()),
            sent_notify: Notify::new(),
            fetch_replies: Mutex::new(VecDeque::new()),
            fetches: Mutex::new(Vec::new()),
        }
    }

    /// Replies with `status` to every send.
    pub fn always(status: u16) -> Self {
        let transport = Self::new();
        transport.set_fallback(Reply::Status(status));
        transport
    }

    pub fn push_reply(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn set_fallback(&self, reply: Reply) {
        *self.fallback.lock().unwrap() = reply;
    }

    pub fn push_fetch(&self, reply: TransportResult<Response>) {
        self.fetch_replies.lock().unwrap().push_back(reply);
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_paths(&self) -> Vec<String> {
        self.sent().into_iter().map(|r| r.path).collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetched_paths(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    /// Waits until at least `count` sends were observed.
    pub async fn wait_for_sends(&self, count: usize) {
        loop {
            let notified = self.sent_notify.notified();
            if self.sent.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        path: &str,
        payload: &Value,
        dedup_id: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Response>> + Send + '_>> {
        self.sent.lock().unwrap().push(SentRequest {
            path: path.to_string(),
            payload: payload.clone(),
            dedup_id: dedup_id.to_string(),
            at: tokio::time::Instant::now(),
        });
        self.sent_notify.notify_waiters();
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.lock().unwrap().clone());
        Box::pin(async move {
            match reply {
                Reply::Status(status) => Ok(Response::new(status, "")),
                Reply::Fail(e) => Err(e),
                Reply::Hang => std::future::pending().await,
            }
        })
    }

    fn fetch(
        &self,
        path: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Response>> + Send + '_>> {
        self.fetches.lock().unwrap().push(path.to_string());
        let reply = self
            .fetch_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".into())));
        Box::pin(async move { reply })
    }
}

/// Probe whose observation is set by the test. `None` means the probe
/// cannot observe anything.
pub struct FakeProbe {
    flags: Mutex<Option<ReachabilityFlags>>,
}

impl FakeProbe {
    pub fn new(flags: Option<ReachabilityFlags>) -> Self {
        FakeProbe { flags: Mutex::new(flags) }
    }

    pub fn online() -> Self {
        Self::new(Some(wifi()))
    }

    pub fn offline() -> Self {
        Self::new(Some(ReachabilityFlags::default()))
    }

    pub fn set(&self, flags: ReachabilityFlags) {
        *self.flags.lock().unwrap() = Some(flags);
    }
}

impl NetworkProbe for FakeProbe {
    fn probe(&self) -> io::Result<ReachabilityFlags> {
        self.flags.lock().unwrap().ok_or_else(|| io::Error::other("probe unavailable"))
    }
}

pub fn wifi() -> ReachabilityFlags {
    ReachabilityFlags { reachable: true, connection_required: false, cellular: false }
}

pub fn cellular() -> ReachabilityFlags {
    ReachabilityFlags { reachable: true, connection_required: false, cellular: true }
}

/// Wall clock that advances with `tokio::time`, so paused-time tests see
/// consistent chrono timestamps.
pub struct TokioClock {
    origin: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        TokioClock {
            origin: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            start: tokio::time::Instant::now(),
        }
    }
}

impl ClockSource for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.origin + chrono::Duration::from_std(self.start.elapsed()).unwrap()
    }
}

/// Clock moved explicitly by the test.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock { now: Mutex::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()) }
    }

    pub fn advance(&self, by: std::time::Duration) {
        *self.now.lock().unwrap() += chrono::Duration::from_std(by).unwrap();
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
