// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "outbound")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Queue, inspect and deliver SDK calls from a state directory")]
#[command(after_help = "\
Examples:
  outbound track opened --props '{\"screen\":\"home\"}'
  outbound identify u1 --attrs '{\"email\":\"ada@example.com\"}'
  outbound status --json
  outbound flush --timeout-secs 10")]
pub struct Cli {
    /// State directory (default: $OUTBOUND_STATE_DIR, then $XDG_STATE_HOME/outbound)
    #[arg(long, global = true, value_name = "dir")]
    pub state_dir: Option<PathBuf>,

    /// Treat the network as unreachable: nothing is sent, config is not fetched
    #[arg(long, global = true)]
    pub offline: bool,

    /// Log at debug level unless OUTBOUND_LOG or RUST_LOG say otherwise
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Queue an event
    Track {
        event: String,
        /// Event properties as a JSON object
        #[arg(long, value_name = "json")]
        props: Option<String>,
    },

    /// Identify the current user
    Identify {
        user_id: String,
        /// User attributes as a JSON object
        #[arg(long, value_name = "json")]
        attrs: Option<String>,
    },

    /// Continue the current user under a new id
    Alias { new_user_id: String },

    /// Identify the user together with their group
    Group {
        group_id: String,
        user_id: String,
        /// Group attributes as a JSON object
        #[arg(long, value_name = "json")]
        group_attrs: Option<String>,
        /// User attributes as a JSON object
        #[arg(long, value_name = "json")]
        attrs: Option<String>,
    },

    /// Register a push token given as hex
    RegisterToken { token: String },

    /// Disable the registered push token
    DisableToken,

    /// Sign the current user out
    Logout,

    /// Show the queue and identity state
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Deliver queued calls
    Flush {
        #[arg(long, value_name = "N", default_value_t = 30)]
        timeout_secs: u64,
    },

    /// Show the remote config
    Config {
        /// Fetch even when the cached config is fresh
        #[arg(long)]
        refresh: bool,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
