// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! outbound-cli: operate an `outbound` state directory from a shell.
//!
//! Enqueueing commands persist the call and exit; `flush` starts the
//! delivery worker and waits for the queue to drain.

mod cli;
mod commands;
pub mod error;
mod logging;

pub use cli::{Cli, Command};
pub use error::{Error, Result};

use ob_core::store::LOG_FILE;
use outbound::{NetworkStatus, Outbound, Settings};

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let state_dir = outbound::settings::state_dir(cli.state_dir)?;
    std::fs::create_dir_all(&state_dir)?;
    logging::setup(&state_dir.join(LOG_FILE), cli.debug);

    tracing::debug!(state_dir = %state_dir.display(), offline = cli.offline, "cli started");

    let settings = Settings::load(&state_dir)?;
    let mut builder = Outbound::builder(settings, state_dir);
    if cli.offline {
        builder = builder.force_status(NetworkStatus::Unreachable);
    }

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        let outbound = builder.build()?;
        commands::run(&outbound, cli.command).await
    })
}
