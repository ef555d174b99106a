// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queue state and identity reconciliation.
//!
//! [`QueueState`] is the persisted snapshot owned by the dispatcher: the FIFO
//! of pending calls plus the identity the next call will be attributed to.
//! All identity rules live here as plain state transitions so they can be
//! applied and persisted atomically by the owner.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::call::{paths, CallRecord, Identity};

/// Payload key linking a new user id to the id it replaces.
pub const PREVIOUS_ID_KEY: &str = "previous_id";
/// Payload key carrying a push token.
pub const TOKEN_KEY: &str = "token";

/// Process-wide queue snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    /// Pending calls in send order.
    #[serde(default)]
    pub pending_calls: VecDeque<CallRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Anonymous id, generated on first use and kept until logout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
}

/// Result of adopting a user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityTransition {
    /// The id was already current (or empty); nothing changed.
    Unchanged,
    /// First identity on a fresh install or after logout.
    Adopted,
    /// Anonymous calls were re-attributed and an `identify` link queued.
    Linked { temporary_user_id: String, rewritten: usize },
    /// A different user was signed in; their push token was disabled.
    Switched { previous_user_id: String },
    /// The current user continues under a new id.
    Aliased { previous_user_id: String, rewritten: usize },
}

impl QueueState {
    /// Returns the number of pending calls.
    pub fn len(&self) -> usize {
        self.pending_calls.len()
    }

    /// Returns true when nothing is waiting to be sent.
    pub fn is_empty(&self) -> bool {
        self.pending_calls.is_empty()
    }

    /// Returns the record that must be sent next.
    pub fn head(&self) -> Option<&CallRecord> {
        self.pending_calls.front()
    }

    pub fn head_mut(&mut self) -> Option<&mut CallRecord> {
        self.pending_calls.front_mut()
    }

    /// Removes the head if it is still the record with `id`.
    pub fn pop_head_if(&mut self, id: &str) -> Option<CallRecord> {
        if self.head().is_some_and(|head| head.id == id) {
            self.pending_calls.pop_front()
        } else {
            None
        }
    }

    /// Returns the identity new calls are attributed to, if any exists yet.
    pub fn current_identity(&self) -> Option<Identity> {
        if let Some(user_id) = self.user_id.as_ref().filter(|id| !id.is_empty()) {
            return Some(Identity::User(user_id.clone()));
        }
        self.temporary_user_id
            .as_ref()
            .filter(|id| !id.is_empty())
            .map(|id| Identity::Temporary(id.clone()))
    }

    /// Returns the identity for a new call, generating a temporary id on
    /// first use.
    pub fn identity_for_new_call(&mut self) -> Identity {
        if let Some(identity) = self.current_identity() {
            return identity;
        }
        let temporary = uuid::Uuid::new_v4().to_string();
        self.temporary_user_id = Some(temporary.clone());
        Identity::Temporary(temporary)
    }

    /// Appends a call stamped with the current identity and returns its id.
    pub fn enqueue(&mut self, path: &str, parameters: Map<String, Value>, now: DateTime<Utc>) -> String {
        let identity = self.identity_for_new_call();
        let record = CallRecord::new(path, parameters, identity, now);
        let id = record.id.clone();
        self.pending_calls.push_back(record);
        id
    }

    fn enqueue_for(
        &mut self,
        path: &str,
        parameters: Map<String, Value>,
        identity: Identity,
        now: DateTime<Utc>,
    ) {
        self.pending_calls.push_back(CallRecord::new(path, parameters, identity, now));
    }

    /// Re-attributes every queued record carrying `from` to `to`.
    pub fn rewrite_identity(&mut self, from: &Identity, to: &Identity) -> usize {
        let mut rewritten = 0;
        for record in &mut self.pending_calls {
            if record.identity().as_ref() == Some(from) {
                record.set_identity(to.clone());
                rewritten += 1;
            }
        }
        rewritten
    }

    /// Drops records that carry no identity. Returns how many were removed.
    ///
    /// Only a damaged snapshot can contain such records.
    pub fn discard_unattributed(&mut self) -> usize {
        let before = self.pending_calls.len();
        self.pending_calls.retain(|record| record.identity().is_some());
        before - self.pending_calls.len()
    }

    /// Resolves the anonymous session (or the previous user) to `user_id`.
    pub fn set_user_id(&mut self, user_id: &str, now: DateTime<Utc>) -> IdentityTransition {
        if user_id.is_empty() || self.user_id.as_deref() == Some(user_id) {
            return IdentityTransition::Unchanged;
        }
        let new_identity = Identity::User(user_id.to_string());

        match self.user_id.clone().filter(|id| !id.is_empty()) {
            Some(previous_user_id) => {
                if let Some(token) = self.push_token.clone() {
                    self.enqueue_for(
                        paths::APNS_DISABLE,
                        token_params(&token),
                        Identity::User(previous_user_id.clone()),
                        now,
                    );
                }
                self.user_id = Some(user_id.to_string());
                self.register_current_token(now);
                IdentityTransition::Switched { previous_user_id }
            }
            None => match self.temporary_user_id.clone().filter(|id| !id.is_empty()) {
                Some(temporary_user_id) => {
                    let rewritten = self.rewrite_identity(
                        &Identity::Temporary(temporary_user_id.clone()),
                        &new_identity,
                    );
                    self.user_id = Some(user_id.to_string());
                    self.enqueue_for(
                        paths::IDENTIFY,
                        previous_id_params(&temporary_user_id),
                        new_identity,
                        now,
                    );
                    IdentityTransition::Linked { temporary_user_id, rewritten }
                }
                None => {
                    self.user_id = Some(user_id.to_string());
                    self.register_current_token(now);
                    IdentityTransition::Adopted
                }
            },
        }
    }

    /// Moves the current user to a new id without signing anyone out.
    ///
    /// Without a current user this behaves like [`QueueState::set_user_id`].
    pub fn alias(&mut self, new_user_id: &str, now: DateTime<Utc>) -> IdentityTransition {
        let previous_user_id = match self.user_id.clone().filter(|id| !id.is_empty()) {
            Some(previous) if previous == new_user_id => return IdentityTransition::Unchanged,
            Some(previous) => previous,
            None => return self.set_user_id(new_user_id, now),
        };
        if new_user_id.is_empty() {
            return IdentityTransition::Unchanged;
        }
        let new_identity = Identity::User(new_user_id.to_string());
        let rewritten =
            self.rewrite_identity(&Identity::User(previous_user_id.clone()), &new_identity);
        self.user_id = Some(new_user_id.to_string());
        self.enqueue_for(paths::IDENTIFY, previous_id_params(&previous_user_id), new_identity, now);
        IdentityTransition::Aliased { previous_user_id, rewritten }
    }

    /// Signs the current user out. Returns the user id that was cleared.
    ///
    /// The push token stops targeting the user; the next anonymous call
    /// starts a fresh temporary id.
    pub fn logout(&mut self, now: DateTime<Utc>) -> Option<String> {
        let previous = self.user_id.take().filter(|id| !id.is_empty());
        if let (Some(user_id), Some(token)) = (&previous, self.push_token.clone()) {
            self.enqueue_for(
                paths::APNS_DISABLE,
                token_params(&token),
                Identity::User(user_id.clone()),
                now,
            );
        }
        self.temporary_user_id = None;
        previous
    }

    /// Remembers `token` and registers it for the current identity.
    pub fn register_push_token(&mut self, token: &str, now: DateTime<Utc>) {
        self.push_token = Some(token.to_string());
        let identity = self.identity_for_new_call();
        self.enqueue_for(paths::APNS_REGISTER, token_params(token), identity, now);
    }

    /// Disables the known push token for the current identity.
    ///
    /// Returns false when no token is known.
    pub fn disable_push_token(&mut self, now: DateTime<Utc>) -> bool {
        let Some(token) = self.push_token.clone() else {
            return false;
        };
        let identity = self.identity_for_new_call();
        self.enqueue_for(paths::APNS_DISABLE, token_params(&token), identity, now);
        true
    }

    fn register_current_token(&mut self, now: DateTime<Utc>) {
        if let (Some(token), Some(identity)) = (self.push_token.clone(), self.current_identity()) {
            self.enqueue_for(paths::APNS_REGISTER, token_params(&token), identity, now);
        }
    }
}

fn token_params(token: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
    params
}

fn previous_id_params(previous_id: &str) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert(PREVIOUS_ID_KEY.to_string(), Value::String(previous_id.to_string()));
    params
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
