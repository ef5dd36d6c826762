use crate::action::Action;
use crate::config::{default_max_depth, Config};
use crate::context::Context;
use crate::controller::Controllers;
use crate::error::{ActionError, Result};
use crate::evaluation::{Evaluation, Outcome};
use crate::expr::Evaluator;
use crate::group::{self, ActionGroup, ActionItem};
use crate::registry::Registry;
use crate::resolver::{self, SAVE};
use crate::response::Response;
use serde_json::{Map, Value};
use std::borrow::Cow;
use tracing::{debug, error};

// ---------------------------------------------------------------------------
// ActionHandler
// ---------------------------------------------------------------------------

/// Everything one run needs: the collaborators it reads from and the
/// caller's context it writes to.
pub struct ActionHandler<'a> {
    registry: &'a Registry,
    controllers: &'a Controllers,
    evaluator: &'a dyn Evaluator,
    context: &'a mut Context,
    max_depth: u32,
    depth: u32,
}

impl<'a> ActionHandler<'a> {
    pub fn new(
        registry: &'a Registry,
        controllers: &'a Controllers,
        evaluator: &'a dyn Evaluator,
        context: &'a mut Context,
    ) -> Self {
        Self {
            registry,
            controllers,
            evaluator,
            context,
            max_depth: default_max_depth(),
            depth: 0,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Apply the limits from the project config.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_max_depth(config.limits.max_depth)
    }

    pub fn context(&self) -> &Context {
        &*self.context
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn resolve(&self, name: &str) -> Option<Cow<'a, Action>> {
        resolver::resolve(self.registry, name)
    }

    /// Condition gate: no (or a blank) condition always passes.
    pub fn check(&self, condition: Option<&str>) -> Result<bool> {
        match condition.map(str::trim) {
            None | Some("") => Ok(true),
            Some(expr) => self.evaluator.test(expr, &*self.context),
        }
    }

    pub fn test(&self, item: &ActionItem) -> Result<bool> {
        self.check(item.condition.as_deref())
    }

    pub fn eval(&self, expr: &str) -> Result<Value> {
        self.evaluator.eval(expr, &*self.context)
    }

    pub(crate) fn update_context(&mut self, values: Map<String, Value>) {
        debug!(keys = values.len(), "update context");
        self.context.update(values);
    }

    /// Call `controller:method`. Missing controllers and controller errors
    /// come back as failure envelopes.
    pub fn call(&self, controller: &str, method: &str) -> Outcome {
        let Some(target) = self.controllers.get(controller) else {
            error!(controller, method, "controller not found");
            return Response::failure(ActionError::ControllerNotFound(controller.into()).to_string())
                .into();
        };
        match target.call(method, &*self.context) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(controller, method, error = %e, "method call failed");
                Response::failure(e.to_string()).into()
            }
        }
    }

    /// Evaluate an action list. Nested groups come back through here, so
    /// the depth limit covers recursion as well.
    pub fn evaluate(&mut self, items: &[ActionItem]) -> Result<Evaluation> {
        if self.depth >= self.max_depth {
            return Err(ActionError::DepthExceeded(self.max_depth));
        }
        self.depth += 1;
        let result = group::run(items, self);
        self.depth -= 1;
        result
    }

    /// Evaluate a comma-separated list of action names.
    ///
    /// A single registered group runs as the top-level list, so a pause
    /// inside it is the pause of this run.
    pub fn execute(&mut self, names: &str) -> Result<Evaluation> {
        debug!(actions = names, "execute");
        let group = ActionGroup::parse(names);
        let registry = self.registry;
        if let [item] = group.actions.as_slice() {
            let name = item.name.trim();
            if name != SAVE {
                if let Some(Action::Group(registered)) = registry.get(name) {
                    return registered.evaluate(self);
                }
            }
        }
        group.evaluate(self)
    }
}
