use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("not initialized: run 'actionflow init'")]
    NotInitialized,

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("action defined more than once: {0}")]
    DuplicateAction(String),

    #[error("action file not found: {0}")]
    MissingActionFile(String),

    #[error("controller not found: {0}")]
    ControllerNotFound(String),

    #[error("method not found: {controller}:{method}")]
    MethodNotFound { controller: String, method: String },

    #[error("invalid view type '{0}': expected one of grid, form, tree, portal, calendar, chart, html")]
    InvalidViewType(String),

    #[error("invalid expression '{expr}': {reason}")]
    Expression { expr: String, reason: String },

    #[error("action groups nested deeper than {0} levels")]
    DepthExceeded(u32),

    #[error("context must be a JSON object, got {0}")]
    InvalidContext(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ActionError {
    pub(crate) fn expression(expr: &str, reason: impl Into<String>) -> Self {
        ActionError::Expression {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ActionError>;
