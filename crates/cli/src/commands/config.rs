// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use outbound::Outbound;

use crate::error::Result;

/// Prints the remote config, fetching it first unless offline.
pub async fn run(outbound: &Outbound, refresh: bool) -> Result<()> {
    let snapshot =
        if refresh { outbound.refresh_config().await } else { outbound.config().await };
    tracing::debug!(refresh, found = snapshot.is_some(), "remote config read");
    match snapshot {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("no remote config available"),
    }
    Ok(())
}
