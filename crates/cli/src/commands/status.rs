// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Write;

use outbound::facade::Status;
use outbound::Outbound;

use crate::error::Result;

pub fn run(outbound: &Outbound, json: bool) -> Result<()> {
    // One probe so the report shows the observed network, not the default.
    outbound.reachability().start();
    let status = outbound.status();
    outbound.reachability().stop();
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", format_status(&status));
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub(crate) fn format_status(status: &Status) -> String {
    let none = "(none)";
    let mut out = String::new();
    let _ = writeln!(out, "State dir: {}", status.state_dir.display());
    let _ = writeln!(out, "Pending calls: {}", status.pending);
    let _ = writeln!(out, "User id: {}", status.user_id.as_deref().unwrap_or(none));
    let _ = writeln!(
        out,
        "Temporary user id: {}",
        status.temporary_user_id.as_deref().unwrap_or(none)
    );
    let _ = writeln!(out, "Push token: {}", yes_no(status.has_push_token));
    let _ = writeln!(out, "Reachability: {}", status.reachability);
    let _ = writeln!(out, "Persistence: {}", if status.persistent { "disk" } else { "memory" });
    let _ = writeln!(out, "Remote kill: {}", yes_no(status.remote_kill));
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
