use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// RPC-style response envelope: a status code plus payload items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub errors: Map<String, Value>,
}

impl Response {
    pub const STATUS_SUCCESS: i32 = 0;
    pub const STATUS_FAILURE: i32 = -1;
    pub const STATUS_VALIDATION_ERROR: i32 = -4;

    pub fn success(data: Vec<Value>) -> Self {
        Self {
            status: Self::STATUS_SUCCESS,
            data,
            errors: Map::new(),
        }
    }

    /// Failure envelope whose single item carries `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Self::STATUS_FAILURE,
            data: vec![json!({ "message": message.into() })],
            errors: Map::new(),
        }
    }

    /// Validation failure with per-field messages.
    pub fn validation_error(errors: Map<String, Value>) -> Self {
        Self {
            status: Self::STATUS_VALIDATION_ERROR,
            data: Vec::new(),
            errors,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Self::STATUS_SUCCESS
    }

    pub fn item(&self, index: usize) -> Option<&Value> {
        self.data.get(index)
    }

    /// Consume the envelope and keep its first item.
    pub fn into_first_item(self) -> Option<Value> {
        self.data.into_iter().next()
    }

    /// Human-readable message of a failure envelope, if it carries one.
    pub fn message(&self) -> Option<&str> {
        self.item(0)
            .and_then(|item| item.get("message"))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_message() {
        let res = Response::failure("boom");
        assert!(!res.is_success());
        assert_eq!(res.status, Response::STATUS_FAILURE);
        assert_eq!(res.message(), Some("boom"));
    }

    #[test]
    fn success_first_item() {
        let res = Response::success(vec![json!({"a": 1}), json!({"b": 2})]);
        assert!(res.is_success());
        assert_eq!(res.into_first_item(), Some(json!({"a": 1})));
        assert_eq!(Response::success(vec![]).into_first_item(), None);
    }

    #[test]
    fn empty_fields_not_serialized() {
        let json = serde_json::to_string(&Response::success(vec![])).unwrap();
        assert_eq!(json, r#"{"status":0}"#);
    }

    #[test]
    fn validation_error_json() {
        let mut errors = Map::new();
        errors.insert("amount".into(), json!("must be positive"));
        let json = serde_json::to_value(Response::validation_error(errors)).unwrap();
        assert_eq!(json["status"], json!(-4));
        assert_eq!(json["errors"]["amount"], json!("must be positive"));
        assert!(json.get("data").is_none());
    }
}
