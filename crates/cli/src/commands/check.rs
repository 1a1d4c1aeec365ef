use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use procflow_engine::ConfigValidator;

use crate::{load_config, OutputFormat};

pub(crate) fn cmd_check(config_path: Option<&Path>, output: OutputFormat) -> anyhow::Result<()> {
    // Step 1: Load and check the process definitions
    let (path, config) = load_config(config_path)?;
    let registry = config.into_registry().context("invalid process config")?;

    // Step 2: Compile every payload schema
    let validator =
        ConfigValidator::new(Arc::new(registry)).context("invalid payload schema")?;
    let registry = validator.registry();

    // Step 3: Format output
    match output {
        OutputFormat::Json => {
            let process_types: Vec<serde_json::Value> = registry
                .process_types()
                .filter_map(|name| registry.process(name))
                .map(|p| {
                    serde_json::json!({
                        "name": p.name,
                        "statuses": p.statuses.iter().map(|s| &s.name).collect::<Vec<_>>(),
                        "initial": p.initial_statuses().iter().map(|s| &s.name).collect::<Vec<_>>(),
                        "schemas": p.statuses.iter().filter(|s| s.schema.is_some()).count(),
                    })
                })
                .collect();
            let report = serde_json::json!({
                "valid": true,
                "config": path.display().to_string(),
                "process_types": process_types,
                "schemas": validator.schema_count(),
            });
            let json = serde_json::to_string_pretty(&report)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("Config: {}", path.display());
            println!("Process types: {}", registry.len());
            for p in registry.process_types().filter_map(|name| registry.process(name)) {
                let initial: Vec<&str> = p
                    .initial_statuses()
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect();
                println!(
                    "  {}: {} statuses, start: {}",
                    p.name,
                    p.statuses.len(),
                    if initial.is_empty() {
                        "-".to_string()
                    } else {
                        initial.join(", ")
                    }
                );
            }
            println!("Schemas compiled: {}", validator.schema_count());
        }
    }
    Ok(())
}
