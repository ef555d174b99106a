// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use super::*;
use crate::commands::testing::TestContext;
use ob_core::paths;
use yare::parameterized;

#[test]
fn parse_object_accepts_objects() {
    let map = parse_object("--props", Some(r#"{"a":1}"#)).unwrap().unwrap();
    assert_eq!(map["a"], 1);
    assert!(parse_object("--props", None).unwrap().is_none());
}

#[parameterized(
    array = { "[1,2]", "expected an object, got an array" },
    string = { r#""hi""#, "expected an object, got a string" },
    null = { "null", "expected an object, got null" },
    truncated = { r#"{"a":"#, "EOF while parsing" },
)]
fn parse_object_rejects(raw: &str, reason: &str) {
    match parse_object("--attrs", Some(raw)) {
        Err(Error::InvalidJson { flag, reason: actual }) => {
            assert_eq!(flag, "--attrs");
            assert!(actual.contains(reason), "{actual}");
        }
        other => panic!("expected InvalidJson, got {other:?}"),
    }
}

#[test]
fn track_queues_event_with_properties() {
    let ctx = TestContext::new();
    track(&ctx.outbound, "opened", Some(r#"{"screen":"home"}"#)).unwrap();

    let snapshot = ctx.outbound.snapshot();
    let call = snapshot.head().unwrap();
    assert_eq!(call.path, paths::TRACK);
    assert_eq!(call.parameters["properties"]["screen"], "home");
}

#[test]
fn invalid_props_queue_nothing() {
    let ctx = TestContext::new();
    assert!(track(&ctx.outbound, "opened", Some("nope")).is_err());
    assert_eq!(ctx.outbound.status().pending, 0);
}

#[test]
fn group_passes_both_attribute_sets() {
    let ctx = TestContext::new();
    group(&ctx.outbound, "g1", "u1", Some(r#"{"plan":"pro"}"#), Some(r#"{"name":"Ada"}"#))
        .unwrap();

    let snapshot = ctx.outbound.snapshot();
    let call = snapshot.pending_calls.back().unwrap();
    assert_eq!(call.parameters["group_attributes"]["plan"], "pro");
    assert_eq!(call.parameters["name"], "Ada");
}

#[parameterized(
    odd_length = { "abc" },
    not_hex = { "zz" },
    empty = { "" },
)]
fn register_token_rejects(token: &str) {
    let ctx = TestContext::new();
    assert!(matches!(register_token(&ctx.outbound, token), Err(Error::InvalidToken(_))));
    assert!(!ctx.outbound.status().has_push_token);
}

#[test]
fn register_token_stores_lowercase_hex() {
    let ctx = TestContext::new();
    register_token(&ctx.outbound, "DEADBEEF").unwrap();
    assert_eq!(ctx.outbound.snapshot().push_token.as_deref(), Some("deadbeef"));
}

#[test]
fn disable_without_token_queues_nothing() {
    let ctx = TestContext::new();
    disable_token(&ctx.outbound).unwrap();
    assert_eq!(ctx.outbound.status().pending, 0);
}

#[test]
fn logout_clears_user() {
    let ctx = TestContext::new();
    identify(&ctx.outbound, "u1", None).unwrap();
    logout(&ctx.outbound).unwrap();
    assert_eq!(ctx.outbound.status().user_id, None);
}
