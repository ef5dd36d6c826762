use crate::output::print_json;
use actionflow_core::config::{Config, ConfigWarning, WarnLevel};
use actionflow_core::registry::Registry;
use anyhow::Context;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let registry = Registry::load(root, &config).context("failed to load action files")?;

    let mut warnings: Vec<ConfigWarning> = config.validate();
    warnings.extend(registry.validate());

    if json {
        print_json(&serde_json::json!({
            "actions": registry.len(),
            "warnings": warnings,
        }))?;
    } else if warnings.is_empty() {
        println!("{} action(s) valid. No warnings.", registry.len());
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("validation found errors");
    }
    Ok(())
}
