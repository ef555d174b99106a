// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Commands that queue calls.

use outbound::Outbound;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Parses an optional `--flag` value that must be a JSON object.
pub(crate) fn parse_object(
    flag: &'static str,
    raw: Option<&str>,
) -> Result<Option<Map<String, Value>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(other) => Err(Error::InvalidJson {
            flag,
            reason: format!("expected an object, got {}", kind(&other)),
        }),
        Err(e) => Err(Error::InvalidJson { flag, reason: e.to_string() }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn report_queued(outbound: &Outbound, what: &str) {
    println!("queued {} ({} pending)", what, outbound.status().pending);
}

pub fn track(outbound: &Outbound, event: &str, props: Option<&str>) -> Result<()> {
    let props = parse_object("--props", props)?;
    outbound.track(event, props);
    report_queued(outbound, "track");
    Ok(())
}

pub fn identify(outbound: &Outbound, user_id: &str, attrs: Option<&str>) -> Result<()> {
    let attrs = parse_object("--attrs", attrs)?.unwrap_or_default();
    outbound.identify(user_id, attrs);
    report_queued(outbound, "identify");
    Ok(())
}

pub fn alias(outbound: &Outbound, new_user_id: &str) -> Result<()> {
    outbound.alias(new_user_id);
    report_queued(outbound, "alias");
    Ok(())
}

pub fn group(
    outbound: &Outbound,
    group_id: &str,
    user_id: &str,
    group_attrs: Option<&str>,
    attrs: Option<&str>,
) -> Result<()> {
    let group_attrs = parse_object("--group-attrs", group_attrs)?;
    let attrs = parse_object("--attrs", attrs)?.unwrap_or_default();
    outbound.identify_group(group_id, user_id, group_attrs, attrs);
    report_queued(outbound, "group identify");
    Ok(())
}

pub fn register_token(outbound: &Outbound, token: &str) -> Result<()> {
    let bytes = hex::decode(token).map_err(|e| Error::InvalidToken(e.to_string()))?;
    if bytes.is_empty() {
        return Err(Error::InvalidToken("empty token".into()));
    }
    outbound.register_device_token(&bytes);
    report_queued(outbound, "token registration");
    Ok(())
}

pub fn disable_token(outbound: &Outbound) -> Result<()> {
    if !outbound.status().has_push_token {
        println!("no push token registered");
        return Ok(());
    }
    outbound.disable_push_token();
    report_queued(outbound, "token disable");
    Ok(())
}

pub fn logout(outbound: &Outbound) -> Result<()> {
    outbound.logout();
    println!("logged out ({} pending)", outbound.status().pending);
    Ok(())
}

#[cfg(test)]
#[path = "calls_tests.rs"]
mod tests;
