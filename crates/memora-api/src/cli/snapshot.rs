//! `memora snapshot`: manage cached results.

use anyhow::Result;
use console::style;
use serde_json::json;
use uuid::Uuid;

use crate::state::AppState;

pub async fn invalidate_snapshot(state: &AppState, id: &Uuid, json: bool) -> Result<()> {
    let deleted = state.executor.snapshots().invalidate_snapshot(id).await?;

    if json {
        println!("{}", json!({ "id": id, "deleted": deleted }));
    } else if deleted {
        println!("  {} Snapshot {} deleted", style("✓").green().bold(), style(id).bold());
    } else {
        println!("  {} No snapshot with id {}", style("i").blue().bold(), style(id).bold());
    }
    Ok(())
}
