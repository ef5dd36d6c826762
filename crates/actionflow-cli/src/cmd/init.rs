use actionflow_core::{config::Config, io, paths};
use anyhow::Context;
use std::path::Path;

const SAMPLE_ACTIONS: &str = r#"# Named actions. Reference them from groups or run them directly:
#   actionflow run on-confirm --set amount=120
actions:
  set-defaults:
    type: record
    model: Invoice
    fields:
      - name: status
        expr: "'draft'"
      - name: confirmed_on
        expr: __date__
        if: "confirmed_on == null"

  check-amount:
    type: validate
    checks:
      - level: error
        message: Amount must be positive
        if: "amount <= 0"

  open-invoices:
    type: view
    title: Invoices
    model: Invoice
    views:
      - type: grid
        name: invoice-grid
      - type: form
        name: invoice-form

  on-confirm:
    type: group
    actions:
      - set-defaults
      - check-amount
      - save
      - "form:invoice-form"
"#;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    println!("Initializing actionflow in: {}", root.display());

    let config_path = paths::config_path(root);
    if config_path.exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        Config::new(&project_name)
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    }

    let actions_path = paths::action_file_path(root, paths::DEFAULT_ACTIONS_FILE);
    let created = io::write_if_missing(&actions_path, SAMPLE_ACTIONS.as_bytes())
        .with_context(|| format!("failed to write {}", actions_path.display()))?;
    let label = format!("{}/{}", paths::ACTIONFLOW_DIR, paths::DEFAULT_ACTIONS_FILE);
    if created {
        println!("  created: {label}");
    } else {
        println!("  exists:  {label}");
    }

    Ok(())
}
