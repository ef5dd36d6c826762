//! Action groups and the sequential evaluator that runs them.
//!
//! A run walks an immutable list of [`ActionItem`]s by index. At entry `i`
//! the pending list is always `items[i + 1..]`, so a pause never reports the
//! entry that caused it.
//!
//! ```text
//! Running ──save──────────────▶ PausedSave
//!    │────reload == true──────▶ PausedReload
//!    │────validate (not last)─▶ PausedValidate
//!    │────failure envelope────▶ Failed
//!    └────end of list─────────▶ Done
//! ```

use crate::error::Result;
use crate::evaluation::{Evaluation, Outcome, StepResult};
use crate::handler::ActionHandler;
use crate::model;
use crate::resolver::SAVE;
use crate::types::RunState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

// ---------------------------------------------------------------------------
// ActionItem
// ---------------------------------------------------------------------------

/// Reference to an action inside a group, with an optional condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ItemRepr")]
pub struct ActionItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Items may be written as a bare name or as a map.
#[derive(Deserialize)]
#[serde(untagged)]
enum ItemRepr {
    Name(String),
    Full {
        name: String,
        #[serde(default, alias = "if")]
        condition: Option<String>,
    },
}

impl From<ItemRepr> for ActionItem {
    fn from(repr: ItemRepr) -> Self {
        match repr {
            ItemRepr::Name(name) => ActionItem::new(name),
            ItemRepr::Full { name, condition } => ActionItem { name, condition },
        }
    }
}

impl ActionItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: None,
        }
    }

    pub fn when(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: Some(condition.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionGroup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionGroup {
    #[serde(default)]
    pub actions: Vec<ActionItem>,
}

impl ActionGroup {
    pub fn new(actions: Vec<ActionItem>) -> Self {
        Self { actions }
    }

    /// Build a group from a comma-separated list of names, as sent by the
    /// client for a fresh request or to resume a pending one.
    pub fn parse(names: &str) -> Self {
        let actions = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ActionItem::new)
            .collect();
        Self { actions }
    }

    pub fn evaluate(&self, handler: &mut ActionHandler<'_>) -> Result<Evaluation> {
        handler.evaluate(&self.actions)
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

fn pending_names(remaining: &[ActionItem]) -> String {
    remaining
        .iter()
        .map(|item| item.name.trim())
        .collect::<Vec<_>>()
        .join(",")
}

fn paused(state: RunState, steps: Vec<StepResult>, pending: Option<String>) -> Result<Evaluation> {
    Ok(Evaluation::paused(state, steps, pending))
}

/// Merge a non-null `values` payload of `value` into the context.
fn merge_values(handler: &mut ActionHandler<'_>, value: &Value) {
    let Some(values) = value.get("values").filter(|v| !v.is_null()) else {
        return;
    };
    let map = if model::is_model(values) {
        model::to_map(values)
    } else {
        values.as_object().cloned()
    };
    if let Some(map) = map {
        handler.update_context(map);
    }
}

fn is_reload(value: &Value) -> bool {
    value.get("reload") == Some(&Value::Bool(true))
}

pub(crate) fn run(items: &[ActionItem], handler: &mut ActionHandler<'_>) -> Result<Evaluation> {
    let mut steps = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let name = item.name.trim();
        let remaining = &items[index + 1..];

        if name == SAVE {
            if !handler.test(item)? {
                debug!(condition = ?item.condition, "action 'save' doesn't meet the condition");
                return paused(RunState::PausedSave, steps, None);
            }
            let pending = pending_names(remaining);
            debug!(%pending, "wait for 'save'");
            steps.push(StepResult::save(pending.clone()));
            return paused(RunState::PausedSave, steps, Some(pending));
        }

        debug!(action = name, "action");

        let Some(action) = handler.resolve(name) else {
            error!(action = name, "action doesn't exist");
            continue;
        };

        if !handler.test(item)? {
            debug!(action = name, condition = ?item.condition, "action doesn't meet the condition");
            continue;
        }

        let value = match action.invoke(handler)? {
            Outcome::Null | Outcome::Value(Value::Null) => continue,
            Outcome::Value(value) => value,
            Outcome::Response(res) if !res.is_success() => {
                debug!(action = name, status = res.status, "action failed");
                return Ok(Evaluation::Failed(res));
            }
            Outcome::Response(res) => match res.into_first_item() {
                None | Some(Value::Null) => continue,
                Some(value) => value,
            },
            Outcome::Sequence(results) if action.is_group() => {
                steps.extend(results);
                debug!(action = name, "action complete");
                continue;
            }
            Outcome::Sequence(results) => {
                Value::Array(results.iter().map(StepResult::to_value).collect())
            }
        };

        merge_values(handler, &value);

        if is_reload(&value) {
            let pending = pending_names(remaining);
            debug!(%pending, "wait for 'reload'");
            steps.push(StepResult::with_pending(value, pending.clone()));
            return paused(RunState::PausedReload, steps, Some(pending));
        }

        debug!(action = name, "action complete");

        if action.is_validate() && !remaining.is_empty() {
            let pending = pending_names(remaining);
            debug!(action = name, %pending, "wait for validation");
            steps.push(StepResult::with_pending(value, pending.clone()));
            return paused(RunState::PausedValidate, steps, Some(pending));
        }

        steps.push(StepResult::new(value));
    }

    Ok(Evaluation::done(steps))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, FieldExpr, MethodAction, RecordAction, ValidateAction, ValidateCheck};
    use crate::context::Context;
    use crate::controller::{ActionResponse, Controllers};
    use crate::error::ActionError;
    use crate::expr::ExprEvaluator;
    use crate::model::Model;
    use crate::registry::Registry;
    use crate::response::Response;
    use crate::types::MessageLevel;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Registry with a handful of method-backed actions; every call is
    /// recorded in the returned log.
    struct Fixture {
        registry: Registry,
        controllers: Controllers,
        calls: Rc<RefCell<Vec<String>>>,
    }

    #[derive(Serialize)]
    struct Partner {
        id: u64,
        name: String,
    }

    impl Model for Partner {
        const NAME: &'static str = "Partner";
    }

    fn method(name: &str) -> Action {
        Action::Method(MethodAction::new("test", name))
    }

    fn fixture() -> Fixture {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&calls);

        let mut controllers = Controllers::new();
        controllers.register("test", move |method: &str, ctx: &Context| -> Result<Outcome> {
            log.borrow_mut().push(method.to_string());
            Ok(match method {
                "a" => json!({"values": {"x": 1}}).into(),
                "b" => json!({"b": true}).into(),
                "c" => json!({"c": ctx.get("x").cloned()}).into(),
                "null" => Outcome::Null,
                "reload" => ActionResponse::new().reload().into_outcome(),
                "fail" => Response::failure("boom").into(),
                "partner" => ActionResponse::new()
                    .values_of(&Partner {
                        id: 3,
                        name: "ACME".into(),
                    })?
                    .into_outcome(),
                "empty-ok" => Response::success(vec![]).into(),
                "list" => json!([1, 2]).into(),
                other => {
                    return Err(ActionError::MethodNotFound {
                        controller: "test".into(),
                        method: other.into(),
                    })
                }
            })
        });

        let mut registry = Registry::new();
        for name in ["a", "b", "c", "null", "reload", "fail", "partner", "empty-ok", "list"] {
            registry.insert(name, method(name));
        }
        registry.insert(
            "check",
            Action::Validate(ValidateAction {
                checks: vec![ValidateCheck {
                    level: MessageLevel::Alert,
                    message: "sure?".into(),
                    condition: None,
                    action: None,
                }],
            }),
        );
        registry.insert(
            "set-y",
            Action::Record(RecordAction {
                model: None,
                fields: vec![FieldExpr {
                    name: "y".into(),
                    expr: "2".into(),
                    condition: None,
                }],
            }),
        );
        registry.insert(
            "inner",
            Action::Group(ActionGroup::new(vec![ActionItem::new("b"), ActionItem::new("set-y")])),
        );
        registry.insert(
            "inner-fail",
            Action::Group(ActionGroup::new(vec![ActionItem::new("b"), ActionItem::new("fail")])),
        );

        Fixture {
            registry,
            controllers,
            calls,
        }
    }

    impl Fixture {
        fn run(&self, items: Vec<ActionItem>, context: &mut Context) -> Evaluation {
            let mut handler =
                ActionHandler::new(&self.registry, &self.controllers, &ExprEvaluator, context);
            ActionGroup::new(items).evaluate(&mut handler).unwrap()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    fn values(eval: &Evaluation) -> Vec<Value> {
        eval.steps().iter().map(StepResult::to_value).collect()
    }

    fn items(names: &[&str]) -> Vec<ActionItem> {
        names.iter().map(|n| ActionItem::new(*n)).collect()
    }

    #[test]
    fn empty_list_yields_empty_result() {
        let f = fixture();
        let eval = f.run(vec![], &mut Context::new());
        assert_eq!(eval, Evaluation::done(vec![]));
    }

    #[test]
    fn worked_example_save_pauses_and_updates_context() {
        let f = fixture();
        let mut ctx = Context::new();
        let eval = f.run(
            vec![
                ActionItem::when("a", "true"),
                ActionItem::new("save"),
                ActionItem::new("b"),
            ],
            &mut ctx,
        );
        assert_eq!(eval.state(), Some(RunState::PausedSave));
        assert_eq!(eval.pending(), Some("b"));
        assert_eq!(
            values(&eval),
            vec![json!({"values": {"x": 1}}), json!({"save": true, "pending": "b"})]
        );
        assert_eq!(ctx.get("x"), Some(&json!(1)));
        assert_eq!(f.calls(), vec!["a"]);
    }

    #[test]
    fn save_with_false_condition_halts_silently() {
        let f = fixture();
        let eval = f.run(
            vec![
                ActionItem::new("b"),
                ActionItem::when("save", "false"),
                ActionItem::new("c"),
            ],
            &mut Context::new(),
        );
        assert_eq!(eval.state(), Some(RunState::PausedSave));
        assert_eq!(values(&eval), vec![json!({"b": true})]);
        assert_eq!(f.calls(), vec!["b"]);
    }

    #[test]
    fn false_save_reports_no_pending_from_nested_pause() {
        let mut f = fixture();
        f.registry.insert(
            "inner-check",
            Action::Group(ActionGroup::new(items(&["check", "form:z"]))),
        );
        let eval = f.run(
            vec![
                ActionItem::new("inner-check"),
                ActionItem::when("save", "false"),
                ActionItem::new("form:q"),
            ],
            &mut Context::new(),
        );
        assert_eq!(eval.state(), Some(RunState::PausedSave));
        assert_eq!(eval.pending(), None);
        assert_eq!(
            values(&eval),
            vec![json!({"alert": "sure?", "pending": "form:z"})]
        );
    }

    #[test]
    fn save_wins_over_registered_action_named_save() {
        let mut f = fixture();
        f.registry.insert("save", method("b"));
        let eval = f.run(items(&["save", "c"]), &mut Context::new());
        assert_eq!(values(&eval), vec![json!({"save": true, "pending": "c"})]);
        assert!(f.calls().is_empty());
    }

    #[test]
    fn length_matches_applicable_non_null_entries() {
        let f = fixture();
        let eval = f.run(
            vec![
                ActionItem::new("b"),
                ActionItem::when("c", "false"),
                ActionItem::new("null"),
                ActionItem::new("empty-ok"),
                ActionItem::new("a"),
                ActionItem::when("b", "x == 1"),
            ],
            &mut Context::new(),
        );
        assert_eq!(eval.state(), Some(RunState::Done));
        assert_eq!(eval.steps().len(), 3);
    }

    #[test]
    fn unknown_action_is_skipped() {
        let f = fixture();
        let eval = f.run(items(&["missing", "b", "  "]), &mut Context::new());
        assert_eq!(eval.state(), Some(RunState::Done));
        assert_eq!(values(&eval), vec![json!({"b": true})]);
    }

    #[test]
    fn context_updates_are_visible_to_later_actions() {
        let f = fixture();
        let mut ctx = Context::from_json(json!({"keep": "me"})).unwrap();
        let eval = f.run(items(&["a", "c"]), &mut ctx);
        assert_eq!(values(&eval)[1], json!({"c": 1}));
        assert_eq!(ctx.get("keep"), Some(&json!("me")));
    }

    #[test]
    fn reload_halts_with_untouched_trailing_entries() {
        let f = fixture();
        let eval = f.run(items(&["b", "reload", "a", "c"]), &mut Context::new());
        assert_eq!(eval.state(), Some(RunState::PausedReload));
        assert_eq!(
            values(&eval),
            vec![json!({"b": true}), json!({"reload": true, "pending": "a,c"})]
        );
        assert_eq!(eval.pending(), Some("a,c"));
        assert_eq!(f.calls(), vec!["b", "reload"]);
    }

    #[test]
    fn validate_not_last_attaches_pending_to_its_own_result() {
        let f = fixture();
        let eval = f.run(items(&["b", "check", "a"]), &mut Context::new());
        assert_eq!(eval.state(), Some(RunState::PausedValidate));
        assert_eq!(
            values(&eval),
            vec![json!({"b": true}), json!({"alert": "sure?", "pending": "a"})]
        );
        assert!(!f.calls().contains(&"a".to_string()));
    }

    #[test]
    fn validate_last_does_not_pause() {
        let f = fixture();
        let eval = f.run(items(&["b", "check"]), &mut Context::new());
        assert_eq!(eval.state(), Some(RunState::Done));
        assert_eq!(values(&eval)[1], json!({"alert": "sure?"}));
    }

    #[test]
    fn failure_envelope_replaces_partial_results() {
        let f = fixture();
        let eval = f.run(items(&["a", "b", "fail", "c"]), &mut Context::new());
        assert_eq!(eval, Evaluation::Failed(Response::failure("boom")));
        assert_eq!(f.calls(), vec!["a", "b", "fail"]);
    }

    #[test]
    fn controller_error_becomes_failure_envelope() {
        let f = fixture();
        let eval = f.run(items(&["test:nope", "b"]), &mut Context::new());
        let Evaluation::Failed(res) = eval else {
            panic!("expected failure");
        };
        assert_eq!(res.status, Response::STATUS_FAILURE);
        assert!(res.message().unwrap().contains("method not found: test:nope"));
    }

    #[test]
    fn nested_group_results_are_flattened() {
        let f = fixture();
        let mut ctx = Context::new();
        let eval = f.run(items(&["a", "inner", "c"]), &mut ctx);
        assert_eq!(
            values(&eval),
            vec![
                json!({"values": {"x": 1}}),
                json!({"b": true}),
                json!({"values": {"y": 2}}),
                json!({"c": 1}),
            ]
        );
        assert_eq!(ctx.get("y"), Some(&json!(2)));
    }

    #[test]
    fn nested_group_failure_propagates() {
        let f = fixture();
        let eval = f.run(items(&["a", "inner-fail", "c"]), &mut Context::new());
        assert!(eval.is_failed());
        assert!(!f.calls().contains(&"c".to_string()));
    }

    #[test]
    fn non_group_sequence_is_appended_whole() {
        let f = fixture();
        let eval = f.run(items(&["list"]), &mut Context::new());
        assert_eq!(values(&eval), vec![json!([1, 2])]);
    }

    #[test]
    fn model_values_are_converted_before_merge() {
        let f = fixture();
        let mut ctx = Context::new();
        f.run(items(&["partner"]), &mut ctx);
        assert_eq!(ctx.get("id"), Some(&json!(3)));
        assert_eq!(ctx.get("name"), Some(&json!("ACME")));
        assert_eq!(ctx.get(model::MODEL_KEY), None);
    }

    #[test]
    fn inline_view_shorthand() {
        let f = fixture();
        let eval = f.run(items(&["form:invoice-form"]), &mut Context::new());
        assert_eq!(
            values(&eval),
            vec![json!({"view": {
                "viewType": "form",
                "views": [{"type": "form", "name": "invoice-form"}]
            }})]
        );
    }

    #[test]
    fn condition_errors_propagate() {
        let f = fixture();
        let mut ctx = Context::new();
        let mut handler = ActionHandler::new(&f.registry, &f.controllers, &ExprEvaluator, &mut ctx);
        let group = ActionGroup::new(vec![ActionItem::when("b", "x >")]);
        let err = group.evaluate(&mut handler).unwrap_err();
        assert!(matches!(err, ActionError::Expression { .. }));
    }

    #[test]
    fn parse_splits_and_trims() {
        let group = ActionGroup::parse(" a, form:x ,,b ");
        assert_eq!(group.actions, items(&["a", "form:x", "b"]));
    }

    #[test]
    fn items_accept_bare_names_in_yaml() {
        let yaml = "actions:\n  - a\n  - name: b\n    if: x > 1\n";
        let group: ActionGroup = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(group.actions, vec![ActionItem::new("a"), ActionItem::when("b", "x > 1")]);
    }
}
