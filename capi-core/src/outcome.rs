//! Result of one forward attempt

use serde_json::Value;

use crate::error::ForwardError;

/// Outcome of forwarding one event
///
/// Only consumed by logging; the caller's response has already been sent.
#[derive(Debug)]
pub enum ForwardResult {
    /// Provider answered 2xx
    Delivered { data: Value },
    /// Validation, configuration, network or provider failure
    Failed { error: ForwardError },
}

impl ForwardResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ForwardResult::Delivered { .. })
    }

    /// Provider response body on success
    pub fn data(&self) -> Option<&Value> {
        match self {
            ForwardResult::Delivered { data } => Some(data),
            ForwardResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ForwardError> {
        match self {
            ForwardResult::Delivered { .. } => None,
            ForwardResult::Failed { error } => Some(error),
        }
    }

    /// `{success, data}` or `{success, error: {message, code, status, responseData}}`
    pub fn to_json(&self) -> Value {
        match self {
            ForwardResult::Delivered { data } => serde_json::json!({
                "success": true,
                "data": data,
            }),
            ForwardResult::Failed { error } => serde_json::json!({
                "success": false,
                "error": error.to_failure(),
            }),
        }
    }
}

impl From<Result<Value, ForwardError>> for ForwardResult {
    fn from(result: Result<Value, ForwardError>) -> Self {
        match result {
            Ok(data) => ForwardResult::Delivered { data },
            Err(error) => ForwardResult::Failed { error },
        }
    }
}
