// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending API calls.
//!
//! A [`CallRecord`] is the persisted unit of work of the delivery queue: one
//! endpoint path, its JSON parameters, the identity the call is attributed to
//! and the retry bookkeeping of failed attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::backoff::{BackoffPolicy, RetryDecision};
use crate::error::{Error, Result};

/// Endpoint paths understood by the remote service.
pub mod paths {
    /// Create or update a user, or link a previous id to a user.
    pub const IDENTIFY: &str = "identify";
    /// Record a named event.
    pub const TRACK: &str = "track";
    /// Register a push token for a user.
    pub const APNS_REGISTER: &str = "apns/register";
    /// Stop sending push notifications to a token.
    pub const APNS_DISABLE: &str = "apns/disable";
}

/// Payload key carrying the attributed user id.
pub const USER_ID_KEY: &str = "user_id";

/// Who a call is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// An authenticated user id supplied by the host application.
    User(String),
    /// The device-local anonymous id used until a user id is known.
    Temporary(String),
}

impl Identity {
    /// Returns the id sent to the server.
    pub fn as_str(&self) -> &str {
        match self {
            Identity::User(id) | Identity::Temporary(id) => id,
        }
    }

    /// Returns true for an authenticated user id.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Identity::User(_))
    }
}

/// One pending API invocation.
///
/// Exactly one of the resolved and temporary user ids is set on every record
/// the queue stores; [`CallRecord::set_identity`] keeps it that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Unique id, also used as the request dedup GUID.
    #[serde(default = "new_call_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolved_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temporary_user_id: Option<String>,
    /// Logical endpoint name, e.g. `track`.
    pub path: String,
    /// Request payload without the user id.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Number of failed delivery attempts so far.
    #[serde(default)]
    pub attempt_count: u32,
    /// Earliest time of the next attempt. `None` means due now.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
}

/// Generates a fresh record id.
pub fn new_call_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Validates an endpoint path before it is queued.
pub fn validate_path(path: &str) -> Result<()> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidCall("path must not be empty".into()));
    }
    if trimmed.len() != path.len() || path.chars().any(char::is_whitespace) {
        return Err(Error::InvalidCall(format!("path '{path}' must not contain whitespace")));
    }
    Ok(())
}

impl CallRecord {
    /// Creates a record attributed to `identity`.
    pub fn new(
        path: impl Into<String>,
        parameters: Map<String, Value>,
        identity: Identity,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut record = CallRecord {
            id: new_call_id(),
            resolved_user_id: None,
            temporary_user_id: None,
            path: path.into(),
            parameters,
            created_at,
            attempt_count: 0,
            next_attempt_at: None,
        };
        record.set_identity(identity);
        record
    }

    /// Returns the identity this record is attributed to.
    ///
    /// `None` only for records decoded from a damaged snapshot.
    pub fn identity(&self) -> Option<Identity> {
        match (&self.resolved_user_id, &self.temporary_user_id) {
            (Some(id), _) if !id.is_empty() => Some(Identity::User(id.clone())),
            (_, Some(id)) if !id.is_empty() => Some(Identity::Temporary(id.clone())),
            _ => None,
        }
    }

    pub fn resolved_user_id(&self) -> Option<&str> {
        self.resolved_user_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn temporary_user_id(&self) -> Option<&str> {
        self.temporary_user_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns the id sent as `user_id`.
    pub fn user_id(&self) -> Option<&str> {
        self.resolved_user_id().or_else(|| self.temporary_user_id())
    }

    /// Re-attributes the record, clearing the other kind of id.
    pub fn set_identity(&mut self, identity: Identity) {
        match identity {
            Identity::User(id) => {
                self.resolved_user_id = Some(id);
                self.temporary_user_id = None;
            }
            Identity::Temporary(id) => {
                self.resolved_user_id = None;
                self.temporary_user_id = Some(id);
            }
        }
    }

    /// Returns true when the record may be attempted at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.is_none_or(|at| at <= now)
    }

    /// Builds the JSON body sent to the server.
    ///
    /// The user id is read at send time so a later identity rewrite is
    /// always honoured.
    pub fn payload(&self) -> Value {
        let mut body = self.parameters.clone();
        if let Some(user_id) = self.user_id() {
            body.insert(USER_ID_KEY.to_string(), Value::String(user_id.to_string()));
        }
        Value::Object(body)
    }

    /// Records a transient failure and decides whether to try again.
    pub fn record_failure(&mut self, now: DateTime<Utc>, policy: &BackoffPolicy) -> RetryDecision {
        self.attempt_count = self.attempt_count.saturating_add(1);
        let decision = policy.decide(self.attempt_count, now);
        self.next_attempt_at = match decision {
            RetryDecision::RetryAt(at) => Some(at),
            RetryDecision::Exhausted { .. } => None,
        };
        decision
    }
}

#[cfg(test)]
#[path = "call_tests.rs"]
mod tests;
