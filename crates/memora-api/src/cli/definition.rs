//! `memora definition`: list, locate and inspect agent definitions.

use anyhow::Result;
use console::style;
use serde_json::json;

use crate::state::AppState;

pub async fn list_definitions(state: &AppState, json: bool) -> Result<()> {
    let agents = state.definitions.list_agents().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&agents)?);
        return Ok(());
    }

    if agents.is_empty() {
        println!();
        println!(
            "  {} No agent definitions under {}",
            style("i").blue().bold(),
            style(state.definitions.root().display()).yellow()
        );
        println!();
        return Ok(());
    }

    println!();
    for agent in &agents {
        println!("  {}", style(agent).cyan());
    }
    println!();
    Ok(())
}

pub fn definition_path(state: &AppState, agent: &str, json: bool) -> Result<()> {
    let path = state.executor.registry().definition_path(agent);
    if json {
        println!("{}", json!({ "agent": agent, "path": path }));
    } else {
        println!("{}", path.display());
    }
    Ok(())
}

pub async fn show_definition(state: &AppState, agent: &str, json: bool) -> Result<()> {
    let bundle = state.executor.registry().load_definition(agent).await?;
    let definition = &bundle.definition;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "definition": definition,
                "path": state.executor.registry().definition_path(agent),
                "cacheMode": state.executor.registry().cache_mode().to_string(),
                "defaults": bundle.defaults,
                "outputSchema": bundle.output_schema,
                "hasInputSchema": bundle.input_schema.is_some(),
            }))?
        );
        return Ok(());
    }

    let ttl = definition
        .cache_ttl()
        .unwrap_or(state.config.default_ttl_seconds);

    println!();
    println!(
        "  {} {}",
        style(&definition.id).cyan().bold(),
        style(format!("v{}", definition.prompt_version())).dim()
    );
    if let Some(description) = &definition.description {
        println!("  {description}");
    }
    println!();
    println!("  {:<16} {}", style("system").dim(), definition.prompt.system_template);
    println!("  {:<16} {}", style("user").dim(), definition.prompt.user_template);
    println!("  {:<16} {}s", style("cache ttl").dim(), ttl);
    if let Some(fields) = definition.source_hash_fields() {
        println!("  {:<16} {}", style("hash fields").dim(), fields.join(", "));
    }
    if let Some(tools) = &definition.tools {
        println!("  {:<16} {}", style("tools").dim(), tools.mode);
    }
    println!(
        "  {:<16} {} default key(s)",
        style("defaults").dim(),
        bundle.defaults.len()
    );
    println!();
    Ok(())
}
