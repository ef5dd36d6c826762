use crate::response::Response;
use crate::types::RunState;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// Key under which the remaining action names are reported on a pause.
pub const PENDING_KEY: &str = "pending";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What invoking a single action hands back to the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Null,
    Value(Value),
    Response(Response),
    /// Results of a nested group, spliced into the parent run.
    Sequence(Vec<StepResult>),
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Outcome::Null,
            other => Outcome::Value(other),
        }
    }
}

impl From<Response> for Outcome {
    fn from(res: Response) -> Self {
        Outcome::Response(res)
    }
}

// ---------------------------------------------------------------------------
// StepResult
// ---------------------------------------------------------------------------

/// One entry of a run's result list.
///
/// `pending` is fixed when the record is built; it is folded into the value
/// only at serialization time.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    value: Value,
    pending: Option<String>,
}

impl StepResult {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            pending: None,
        }
    }

    pub fn with_pending(value: Value, pending: impl Into<String>) -> Self {
        Self {
            value,
            pending: Some(pending.into()),
        }
    }

    /// The marker emitted when a run stops on `save`.
    pub fn save(pending: impl Into<String>) -> Self {
        Self::with_pending(json!({ "save": true }), pending)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// JSON form sent to the client. A map gets `pending` inserted; any
    /// other value carrying one is wrapped as `{"value", "pending"}`.
    pub fn to_value(&self) -> Value {
        match (&self.value, &self.pending) {
            (value, None) => value.clone(),
            (Value::Object(map), Some(pending)) => {
                let mut map = map.clone();
                map.insert(PENDING_KEY.to_string(), Value::String(pending.clone()));
                Value::Object(map)
            }
            (value, Some(pending)) => json!({ "value": value, "pending": pending }),
        }
    }
}

impl Serialize for StepResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Result of evaluating an action list: the ordered step results and where
/// the run stopped, or the failure envelope that aborted it.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Steps {
        state: RunState,
        steps: Vec<StepResult>,
        /// Names to resume with. Only a run that paused with a marker or a
        /// validation message has one.
        pending: Option<String>,
    },
    Failed(Response),
}

impl Evaluation {
    pub fn done(steps: Vec<StepResult>) -> Self {
        Evaluation::Steps {
            state: RunState::Done,
            steps,
            pending: None,
        }
    }

    /// A run that stopped early. `pending` is `None` when nothing was
    /// emitted to resume from.
    pub fn paused(state: RunState, steps: Vec<StepResult>, pending: Option<String>) -> Self {
        Evaluation::Steps {
            state,
            steps,
            pending,
        }
    }

    pub fn state(&self) -> Option<RunState> {
        match self {
            Evaluation::Steps { state, .. } => Some(*state),
            Evaluation::Failed(_) => None,
        }
    }

    pub fn steps(&self) -> &[StepResult] {
        match self {
            Evaluation::Steps { steps, .. } => steps,
            Evaluation::Failed(_) => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Evaluation::Failed(_))
    }

    /// Pending action names of the pause that ended this run, if any.
    pub fn pending(&self) -> Option<&str> {
        match self {
            Evaluation::Steps { pending, .. } => pending.as_deref(),
            Evaluation::Failed(_) => None,
        }
    }

    /// Compose the single response envelope returned to the client.
    pub fn into_response(self) -> Response {
        match self {
            Evaluation::Steps { steps, .. } => {
                Response::success(steps.iter().map(StepResult::to_value).collect())
            }
            Evaluation::Failed(res) => res,
        }
    }
}
