use crate::action::Action;
use crate::config::{Config, ConfigWarning};
use crate::error::{ActionError, Result};
use crate::expr;
use crate::paths;
use crate::resolver::{self, SAVE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Named actions, loaded once at startup from the YAML files listed in the
/// config:
///
/// ```yaml
/// actions:
///   check-amount:
///     type: validate
///     checks:
///       - level: error
///         message: Amount must be positive
///         if: amount <= 0
///   on-confirm:
///     type: group
///     actions: [check-amount, save, "form:invoice-form"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    actions: BTreeMap<String, Action>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }

    /// Load and merge every registry file named by `config`.
    pub fn load(root: &Path, config: &Config) -> Result<Self> {
        let mut registry = Registry::new();
        for file in &config.action_files {
            let path = paths::action_file_path(root, file);
            if !path.exists() {
                return Err(ActionError::MissingActionFile(path.display().to_string()));
            }
            let data = std::fs::read_to_string(&path)?;
            let part = Registry::from_yaml(&data)?;
            debug!(file = %path.display(), actions = part.len(), "loaded action file");
            registry.merge(part)?;
        }
        Ok(registry)
    }

    /// Add all actions of `other`. A name defined on both sides is an error.
    pub fn merge(&mut self, other: Registry) -> Result<()> {
        for (name, action) in other.actions {
            if self.actions.contains_key(&name) {
                return Err(ActionError::DuplicateAction(name));
            }
            self.actions.insert(name, action);
        }
        Ok(())
    }

    pub fn insert(&mut self, name: impl Into<String>, action: Action) -> Option<Action> {
        self.actions.insert(name.into(), action)
    }

    pub fn get(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Action)> {
        self.actions.iter().map(|(name, action)| (name.as_str(), action))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for (name, action) in &self.actions {
            match action {
                Action::Method(call) => {
                    if call.controller.trim().is_empty() || call.method.trim().is_empty() {
                        warnings.push(ConfigWarning::error(format!(
                            "method action '{name}' needs both a controller and a method"
                        )));
                    }
                }
                Action::View(view) => {
                    if view.views.is_empty() {
                        warnings.push(ConfigWarning::warning(format!(
                            "view action '{name}' has no views"
                        )));
                    }
                }
                Action::Record(record) => {
                    for field in &record.fields {
                        check_expr(&mut warnings, name, &field.expr);
                        check_condition(&mut warnings, name, field.condition.as_deref());
                    }
                }
                Action::Attrs(attrs) => {
                    for attr in &attrs.attributes {
                        check_expr(&mut warnings, name, &attr.expr);
                        check_condition(&mut warnings, name, attr.condition.as_deref());
                    }
                }
                Action::Validate(validate) => {
                    if validate.checks.is_empty() {
                        warnings.push(ConfigWarning::warning(format!(
                            "validate action '{name}' has no checks"
                        )));
                    }
                    for check in &validate.checks {
                        check_condition(&mut warnings, name, check.condition.as_deref());
                    }
                }
                Action::Group(group) => {
                    for item in &group.actions {
                        check_condition(&mut warnings, name, item.condition.as_deref());
                        self.check_reference(&mut warnings, name, item.name.trim());
                    }
                }
            }
        }

        for name in self.actions.keys() {
            if let Some(cycle) = self.cycle_from(name) {
                // Report each cycle once, from its smallest member.
                if cycle.iter().min() == Some(name) {
                    warnings.push(ConfigWarning::error(format!(
                        "group '{name}' includes itself via {}",
                        cycle.join(" -> ")
                    )));
                }
            }
        }

        warnings
    }

    fn check_reference(&self, warnings: &mut Vec<ConfigWarning>, group: &str, item: &str) {
        if item.is_empty() {
            warnings.push(ConfigWarning::warning(format!(
                "group '{group}' has an empty action name"
            )));
            return;
        }
        if item == SAVE {
            return;
        }
        match resolver::inline(item) {
            Some(Action::Method(call))
                if call.controller.trim().is_empty() || call.method.trim().is_empty() =>
            {
                warnings.push(ConfigWarning::warning(format!(
                    "group '{group}' has incomplete method reference '{item}'"
                )));
            }
            Some(_) => {}
            None if self.contains(item) => {}
            None => warnings.push(ConfigWarning::warning(format!(
                "group '{group}' references unknown action '{item}'"
            ))),
        }
    }

    /// Path of group names leading from `start` back to itself, if any.
    fn cycle_from(&self, start: &str) -> Option<Vec<String>> {
        let mut path = vec![start.to_string()];
        let mut visited = HashSet::new();
        self.walk(start, start, &mut path, &mut visited)
            .then_some(path)
    }

    fn walk(
        &self,
        start: &str,
        current: &str,
        path: &mut Vec<String>,
        visited: &mut HashSet<String>,
    ) -> bool {
        let Some(Action::Group(group)) = self.actions.get(current) else {
            return false;
        };
        for item in &group.actions {
            let next = item.name.trim();
            if next == start {
                path.push(next.to_string());
                return true;
            }
            if !visited.insert(next.to_string()) {
                continue;
            }
            path.push(next.to_string());
            if self.walk(start, next, path, visited) {
                return true;
            }
            path.pop();
        }
        false
    }
}

fn check_expr(warnings: &mut Vec<ConfigWarning>, owner: &str, source: &str) {
    if let Err(e) = expr::parse(source) {
        warnings.push(ConfigWarning::error(format!("action '{owner}': {e}")));
    }
}

fn check_condition(warnings: &mut Vec<ConfigWarning>, owner: &str, condition: Option<&str>) {
    if let Some(source) = condition.filter(|c| !c.trim().is_empty()) {
        check_expr(warnings, owner, source);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarnLevel;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
actions:
  check-amount:
    type: validate
    checks:
      - level: error
        message: Amount must be positive
        if: "amount <= 0"
  set-defaults:
    type: record
    model: Invoice
    fields:
      - name: status
        expr: "'draft'"
  open-invoices:
    type: view
    title: Invoices
    model: Invoice
    views:
      - type: grid
        name: invoice-grid
      - type: form
        name: invoice-form
  compute:
    type: method
    controller: invoice
    method: compute
  on-confirm:
    type: group
    actions:
      - set-defaults
      - check-amount
      - name: save
        if: "status == 'draft'"
      - "form:invoice-form"
"#;

    #[test]
    fn parses_all_kinds() {
        let registry = Registry::from_yaml(SAMPLE).unwrap();
        assert_eq!(registry.len(), 5);
        let kinds: Vec<_> = registry.iter().map(|(n, a)| (n, a.kind())).collect();
        assert_eq!(
            kinds,
            vec![
                ("check-amount", "validate"),
                ("compute", "method"),
                ("on-confirm", "group"),
                ("open-invoices", "view"),
                ("set-defaults", "record"),
            ]
        );
    }

    #[test]
    fn sample_is_valid() {
        let registry = Registry::from_yaml(SAMPLE).unwrap();
        let warnings = registry.validate();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn unknown_view_type_rejected() {
        let yaml = "actions:\n  v:\n    type: view\n    views:\n      - type: kanban\n        name: x\n";
        assert!(Registry::from_yaml(yaml).is_err());
    }

    #[test]
    fn merge_rejects_duplicates() {
        let mut a = Registry::from_yaml(SAMPLE).unwrap();
        let b = Registry::from_yaml("actions:\n  compute:\n    type: method\n    controller: x\n    method: y\n").unwrap();
        let err = a.merge(b).unwrap_err();
        assert!(matches!(err, ActionError::DuplicateAction(name) if name == "compute"));
    }

    #[test]
    fn load_merges_configured_files() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join(".actionflow");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::write(base.join("actions.yaml"), SAMPLE).unwrap();
        std::fs::write(
            base.join("extra.yaml"),
            "actions:\n  extra:\n    type: group\n    actions: [compute]\n",
        )
        .unwrap();

        let mut config = Config::new("p");
        config.action_files.push("extra.yaml".into());
        let registry = Registry::load(dir.path(), &config).unwrap();
        assert_eq!(registry.len(), 6);
        assert!(registry.contains("extra"));
    }

    #[test]
    fn load_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = Registry::load(dir.path(), &Config::new("p")).unwrap_err();
        assert!(matches!(err, ActionError::MissingActionFile(_)));
    }

    #[test]
    fn validate_flags_unknown_references_and_bad_expressions() {
        let yaml = r#"
actions:
  g:
    type: group
    actions:
      - missing
      - ""
      - ":compute"
      - name: save
        if: "status =="
"#;
        let warnings = Registry::from_yaml(yaml).unwrap().validate();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("unknown action 'missing'")));
        assert!(warnings.iter().any(|w| w.message.contains("empty action name")));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("incomplete method reference")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("invalid expression")));
    }

    #[test]
    fn validate_detects_cycles_once() {
        let yaml = r#"
actions:
  a:
    type: group
    actions: [b]
  b:
    type: group
    actions: [c]
  c:
    type: group
    actions: [a]
  solo:
    type: group
    actions: [solo]
"#;
        let warnings = Registry::from_yaml(yaml).unwrap().validate();
        let cycles: Vec<_> = warnings
            .iter()
            .filter(|w| w.message.contains("includes itself"))
            .collect();
        assert_eq!(cycles.len(), 2);
        assert!(cycles
            .iter()
            .any(|w| w.message.contains("a -> b -> c -> a")));
        assert!(cycles.iter().any(|w| w.message.contains("solo -> solo")));
    }

    #[test]
    fn validate_empty_method_parts() {
        let yaml = "actions:\n  m:\n    type: method\n    controller: ''\n    method: run\n";
        let warnings = Registry::from_yaml(yaml).unwrap().validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("'m'")));
    }
}
