use crate::context::Context;
use crate::error::Result;
use crate::evaluation::Outcome;
use crate::model::Model;
use crate::response::Response;
use serde_json::{Map, Value};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Target of `controller:method` references.
///
/// An `Err` is reported to the client as a failure envelope and aborts the
/// run.
pub trait Controller {
    fn call(&self, method: &str, ctx: &Context) -> Result<Outcome>;
}

impl<F> Controller for F
where
    F: Fn(&str, &Context) -> Result<Outcome>,
{
    fn call(&self, method: &str, ctx: &Context) -> Result<Outcome> {
        self(method, ctx)
    }
}

// ---------------------------------------------------------------------------
// Controllers
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Controllers {
    controllers: HashMap<String, Box<dyn Controller>>,
}

impl Controllers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, controller: impl Controller + 'static) {
        self.controllers.insert(name.into(), Box::new(controller));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Controller> {
        self.controllers.get(name).map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.controllers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for Controllers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controllers")
            .field("names", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ActionResponse
// ---------------------------------------------------------------------------

/// Builder for the single-item success envelope a controller method
/// usually returns.
#[derive(Debug, Clone, Default)]
pub struct ActionResponse {
    data: Map<String, Value>,
}

impl ActionResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values merged into the context by the evaluator.
    pub fn values(mut self, values: Map<String, Value>) -> Self {
        self.data.insert("values".into(), Value::Object(values));
        self
    }

    /// Use a domain entity as the `values` payload.
    pub fn values_of<M: Model>(mut self, model: &M) -> Result<Self> {
        self.data.insert("values".into(), model.to_record()?);
        Ok(self)
    }

    /// Set a single entry of the `values` payload.
    pub fn value(mut self, key: impl Into<String>, value: Value) -> Self {
        let entry = self
            .data
            .entry("values")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.into(), value);
        }
        self
    }

    /// Ask the client to reload the record before running pending actions.
    pub fn reload(mut self) -> Self {
        self.data.insert("reload".into(), Value::Bool(true));
        self
    }

    pub fn flash(self, message: impl Into<String>) -> Self {
        self.set("flash", Value::String(message.into()))
    }

    pub fn error(self, message: impl Into<String>) -> Self {
        self.set("error", Value::String(message.into()))
    }

    pub fn alert(self, message: impl Into<String>) -> Self {
        self.set("alert", Value::String(message.into()))
    }

    pub fn info(self, message: impl Into<String>) -> Self {
        self.set("info", Value::String(message.into()))
    }

    pub fn notify(self, message: impl Into<String>) -> Self {
        self.set("notify", Value::String(message.into()))
    }

    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn into_response(self) -> Response {
        Response::success(vec![Value::Object(self.data)])
    }

    pub fn into_outcome(self) -> Outcome {
        Outcome::Response(self.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closures_are_controllers() {
        let mut controllers = Controllers::new();
        controllers.register("echo", |method: &str, ctx: &Context| -> Result<Outcome> {
            Ok(json!({"method": method, "size": ctx.len()}).into())
        });
        assert!(controllers.contains("echo"));
        let out = controllers
            .get("echo")
            .unwrap()
            .call("hello", &Context::new())
            .unwrap();
        assert_eq!(out, Outcome::Value(json!({"method": "hello", "size": 0})));
        assert!(controllers.get("other").is_none());
    }

    #[test]
    fn response_builder_single_item() {
        let res = ActionResponse::new()
            .value("status", json!("draft"))
            .value("amount", json!(0))
            .flash("Saved")
            .reload()
            .into_response();
        assert!(res.is_success());
        assert_eq!(
            res.data,
            vec![json!({
                "values": {"status": "draft", "amount": 0},
                "flash": "Saved",
                "reload": true
            })]
        );
    }

    #[test]
    fn names_sorted() {
        let mut controllers = Controllers::new();
        let noop = |_: &str, _: &Context| -> Result<Outcome> { Ok(Outcome::Null) };
        controllers.register("b", noop);
        controllers.register("a", noop);
        assert_eq!(controllers.names(), vec!["a", "b"]);
    }
}
