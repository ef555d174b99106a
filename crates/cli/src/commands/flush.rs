// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use outbound::Outbound;

use crate::error::{Error, Result};

/// Starts delivery and waits for the queue to drain.
pub async fn run(outbound: &Outbound, timeout_secs: u64) -> Result<()> {
    let pending = outbound.status().pending;
    tracing::info!(pending, timeout_secs, "flushing queued calls");
    outbound.start()?;
    let drained = outbound.flush(Duration::from_secs(timeout_secs)).await;
    outbound.shutdown().await;
    tracing::info!(drained, "flush finished");

    if !drained {
        return Err(Error::FlushTimeout { pending: outbound.status().pending, timeout_secs });
    }
    println!("queue drained");
    Ok(())
}
