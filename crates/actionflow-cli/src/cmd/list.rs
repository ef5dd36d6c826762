use crate::output::{print_json, print_table};
use actionflow_core::{
    action::Action, config::Config, registry::Registry, resolver, ActionError,
};
use anyhow::Context;
use serde_json::json;
use std::path::Path;

fn load(root: &Path) -> anyhow::Result<Registry> {
    let config = Config::load(root).context("failed to load config")?;
    Registry::load(root, &config).context("failed to load action files")
}

/// One-line description of what an action does.
fn summary(action: &Action) -> String {
    match action {
        Action::View(view) => view
            .views
            .iter()
            .map(|v| format!("{}:{}", v.view_type, v.name))
            .collect::<Vec<_>>()
            .join(", "),
        Action::Method(call) => format!("{}:{}", call.controller, call.method),
        Action::Record(record) => format!(
            "{} field(s){}",
            record.fields.len(),
            record
                .model
                .as_deref()
                .map(|m| format!(" on {m}"))
                .unwrap_or_default()
        ),
        Action::Attrs(attrs) => format!("{} attribute(s)", attrs.attributes.len()),
        Action::Validate(validate) => format!("{} check(s)", validate.checks.len()),
        Action::Group(group) => group
            .actions
            .iter()
            .map(|item| item.name.trim())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

pub fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let registry = load(root)?;

    if json {
        let items: Vec<_> = registry
            .iter()
            .map(|(name, action)| json!({ "name": name, "type": action.kind() }))
            .collect();
        return print_json(&items);
    }

    if registry.is_empty() {
        println!("No actions registered.");
        return Ok(());
    }

    let rows = registry
        .iter()
        .map(|(name, action)| vec![name.to_string(), action.kind().to_string(), summary(action)])
        .collect();
    print_table(&["NAME", "TYPE", "SUMMARY"], rows);
    Ok(())
}

/// Print an action definition. Inline shorthand is shown as the action it
/// expands to.
pub fn show(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let registry = load(root)?;
    let action = resolver::resolve(&registry, name)
        .ok_or_else(|| ActionError::ActionNotFound(name.to_string()))?;

    if json {
        print_json(&json!({ "name": name, "action": &*action }))
    } else {
        print!("{}", serde_yaml::to_string(&*action)?);
        Ok(())
    }
}
