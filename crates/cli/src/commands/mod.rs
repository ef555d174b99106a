// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod calls;
mod config;
mod flush;
mod status;

use outbound::Outbound;

use crate::cli::Command;
use crate::error::Result;

/// Runs one command against an open runtime.
pub async fn run(outbound: &Outbound, command: Command) -> Result<()> {
    match command {
        Command::Track { event, props } => calls::track(outbound, &event, props.as_deref()),
        Command::Identify { user_id, attrs } => {
            calls::identify(outbound, &user_id, attrs.as_deref())
        }
        Command::Alias { new_user_id } => calls::alias(outbound, &new_user_id),
        Command::Group { group_id, user_id, group_attrs, attrs } => calls::group(
            outbound,
            &group_id,
            &user_id,
            group_attrs.as_deref(),
            attrs.as_deref(),
        ),
        Command::RegisterToken { token } => calls::register_token(outbound, &token),
        Command::DisableToken => calls::disable_token(outbound),
        Command::Logout => calls::logout(outbound),
        Command::Status { json } => status::run(outbound, json),
        Command::Flush { timeout_secs } => flush::run(outbound, timeout_secs).await,
        Command::Config { refresh } => config::run(outbound, refresh).await,
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;
