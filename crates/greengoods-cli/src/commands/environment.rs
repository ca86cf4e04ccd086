//! Environment table inspection

use greengoods_engine::EngineConfig;
use greengoods_mirror::EnvironmentEntry;
use serde_json::json;

use crate::OutputFormat;

pub fn list(config: &EngineConfig, output: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render_list(config, output)?);
    Ok(())
}

pub fn show(config: &EngineConfig, id: &str, output: OutputFormat) -> anyhow::Result<()> {
    println!("{}", render_entry(config, id, output)?);
    Ok(())
}

fn render_list(config: &EngineConfig, output: OutputFormat) -> anyhow::Result<String> {
    match output {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&config.environments)?),
        OutputFormat::Text => {
            if config.environments.is_empty() {
                return Ok("No environments configured; mirroring is unavailable everywhere.".into());
            }
            let lines: Vec<String> = config
                .environments
                .environments()
                .map(|(name, entry)| {
                    let marker = if name == config.environment { "*" } else { " " };
                    format!(
                        "{} {:<16} {:<12} {}",
                        marker,
                        name,
                        entry.chain_id.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                        if entry.mirroring_available { "mirroring" } else { "no mirroring" }
                    )
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

fn render_entry(config: &EngineConfig, id: &str, output: OutputFormat) -> anyhow::Result<String> {
    let entry = config.environments.lookup(id);
    match output {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "environment": id,
            "configured": entry.is_some(),
            "mirroring_available": config.environments.mirroring_available(id),
            "entry": entry,
        }))?),
        OutputFormat::Text => Ok(match entry {
            None => format!("{}: not configured (mirroring unavailable)", id),
            Some(entry) => describe(id, entry),
        }),
    }
}

fn describe(id: &str, entry: &EnvironmentEntry) -> String {
    let mut out = format!("Environment: {}\n", id);
    if let Some(chain_id) = entry.chain_id {
        out.push_str(&format!("  Chain id: {}\n", chain_id));
    }
    out.push_str(&format!("  Mirroring: {}\n", entry.mirroring_available));
    if entry.mirroring_available {
        out.push_str(&format!("  Registry: {}\n", entry.registry_address));
        out.push_str(&format!("  Admin resolver: {}\n", entry.admin_resolver_address));
        out.push_str(&format!("  Project schema: {}\n", entry.project_schema_id));
        out.push_str(&format!("  Update schema: {}", entry.update_schema_id));
    }
    out.trim_end().to_string()
}
