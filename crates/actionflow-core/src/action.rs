use crate::error::Result;
use crate::evaluation::{Evaluation, Outcome};
use crate::group::ActionGroup;
use crate::handler::ActionHandler;
use crate::types::{MessageLevel, ViewType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// An executable action, either registered by name or built from inline
/// shorthand (`form:invoice-form`, `com.shop.InvoiceController:compute`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    View(ViewAction),
    Method(MethodAction),
    Record(RecordAction),
    Attrs(AttrsAction),
    Validate(ValidateAction),
    Group(ActionGroup),
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::View(_) => "view",
            Action::Method(_) => "method",
            Action::Record(_) => "record",
            Action::Attrs(_) => "attrs",
            Action::Validate(_) => "validate",
            Action::Group(_) => "group",
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Action::Group(_))
    }

    pub fn is_validate(&self) -> bool {
        matches!(self, Action::Validate(_))
    }

    pub fn invoke(&self, handler: &mut ActionHandler<'_>) -> Result<Outcome> {
        match self {
            Action::View(view) => Ok(view.invoke()),
            Action::Method(call) => Ok(call.invoke(handler)),
            Action::Record(record) => record.invoke(handler),
            Action::Attrs(attrs) => attrs.invoke(handler),
            Action::Validate(validate) => validate.invoke(handler),
            Action::Group(group) => Ok(match group.evaluate(handler)? {
                Evaluation::Steps { steps, .. } => Outcome::Sequence(steps),
                Evaluation::Failed(res) => Outcome::Response(res),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDescriptor {
    #[serde(rename = "type")]
    pub view_type: ViewType,
    pub name: String,
}

/// Opens one or more views on the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub views: Vec<ViewDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl ViewAction {
    pub fn single(view_type: ViewType, name: impl Into<String>) -> Self {
        Self {
            views: vec![ViewDescriptor {
                view_type,
                name: name.into(),
            }],
            ..Self::default()
        }
    }

    fn invoke(&self) -> Outcome {
        let mut view = Map::new();
        if let Some(title) = &self.title {
            view.insert("title".into(), json!(title));
        }
        if let Some(model) = &self.model {
            view.insert("model".into(), json!(model));
        }
        if let Some(first) = self.views.first() {
            view.insert("viewType".into(), json!(first.view_type));
        }
        view.insert("views".into(), json!(self.views));
        if let Some(domain) = &self.domain {
            view.insert("domain".into(), json!(domain));
        }
        if !self.context.is_empty() {
            view.insert("context".into(), Value::Object(self.context.clone()));
        }
        Outcome::Value(json!({ "view": view }))
    }
}

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// Calls `method` on a registered controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodAction {
    pub controller: String,
    pub method: String,
}

impl MethodAction {
    pub fn new(controller: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            method: method.into(),
        }
    }

    fn invoke(&self, handler: &ActionHandler<'_>) -> Outcome {
        handler.call(&self.controller, &self.method)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExpr {
    pub name: String,
    pub expr: String,
    #[serde(default, alias = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Computes field values; the result is merged into the context by the
/// evaluator through its `values` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldExpr>,
}

impl RecordAction {
    fn invoke(&self, handler: &ActionHandler<'_>) -> Result<Outcome> {
        let mut values = Map::new();
        for field in &self.fields {
            if handler.check(field.condition.as_deref())? {
                values.insert(field.name.clone(), handler.eval(&field.expr)?);
            }
        }
        if values.is_empty() {
            return Ok(Outcome::Null);
        }
        Ok(Outcome::Value(json!({ "values": values })))
    }
}

// ---------------------------------------------------------------------------
// Attrs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrExpr {
    /// Target field, or several separated by commas.
    #[serde(alias = "for")]
    pub field: String,
    /// Attribute name (`readonly`, `hidden`, `required`, `title`, ...).
    pub attr: String,
    pub expr: String,
    #[serde(default, alias = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Changes UI attributes of form fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrsAction {
    #[serde(default)]
    pub attributes: Vec<AttrExpr>,
}

impl AttrsAction {
    fn invoke(&self, handler: &ActionHandler<'_>) -> Result<Outcome> {
        let mut attrs: Map<String, Value> = Map::new();
        for attr in &self.attributes {
            if !handler.check(attr.condition.as_deref())? {
                continue;
            }
            let value = handler.eval(&attr.expr)?;
            for field in attr.field.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                let entry = attrs
                    .entry(field.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(map) = entry {
                    map.insert(attr.attr.clone(), value.clone());
                }
            }
        }
        if attrs.is_empty() {
            return Ok(Outcome::Null);
        }
        Ok(Outcome::Value(json!({ "attrs": attrs })))
    }
}

// ---------------------------------------------------------------------------
// Validate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateCheck {
    pub level: MessageLevel,
    pub message: String,
    #[serde(default, alias = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Action the client runs once the message is acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Reports the first check whose condition holds. Produces nothing when all
/// checks pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidateAction {
    #[serde(default)]
    pub checks: Vec<ValidateCheck>,
}

impl ValidateAction {
    fn invoke(&self, handler: &ActionHandler<'_>) -> Result<Outcome> {
        for check in &self.checks {
            if !handler.check(check.condition.as_deref())? {
                continue;
            }
            let mut result = Map::new();
            result.insert(check.level.as_str().into(), json!(check.message));
            if let Some(action) = &check.action {
                result.insert("action".into(), json!(action));
            }
            return Ok(Outcome::Value(Value::Object(result)));
        }
        Ok(Outcome::Null)
    }
}
