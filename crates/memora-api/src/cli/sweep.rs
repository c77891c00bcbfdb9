//! `memora sweep`: delete expired snapshots.

use std::time::Duration;

use anyhow::{Result, bail};
use console::style;
use serde_json::json;
use tracing::info;

use memora_observe::genai_attrs::OP_SWEEP_SNAPSHOTS;

use crate::state::AppState;

async fn sweep_once(state: &AppState, json: bool) -> Result<u64> {
    let deleted = state.executor.snapshots().cleanup_expired_snapshots().await?;
    info!(operation = OP_SWEEP_SNAPSHOTS, deleted, "expired snapshots removed");

    if json {
        println!("{}", json!({ "deleted": deleted, "at": chrono::Utc::now() }));
    } else {
        println!(
            "  {} Removed {} expired snapshot{}",
            style("✓").green().bold(),
            style(deleted).bold(),
            if deleted == 1 { "" } else { "s" }
        );
    }
    Ok(deleted)
}

/// Sweep once, or every `every` seconds until Ctrl+C.
pub async fn sweep(state: &AppState, every: Option<u64>, json: bool) -> Result<()> {
    let Some(secs) = every else {
        sweep_once(state, json).await?;
        return Ok(());
    };
    if secs == 0 {
        bail!("--every must be at least 1 second");
    }

    if !json {
        println!(
            "  {} Sweeping every {}s. {}",
            style("⟳").bold(),
            secs,
            style("Press Ctrl+C to stop").dim()
        );
    }

    let mut interval = tokio::time::interval(Duration::from_secs(secs));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // A failed pass is logged; the next tick tries again.
                if let Err(e) = sweep_once(state, json).await {
                    tracing::warn!(error = %e, "snapshot sweep failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if !json {
                    println!("\n  Sweeper stopped.");
                }
                return Ok(());
            }
        }
    }
}
