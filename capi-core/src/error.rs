//! Error types for the relay
//!
//! Two families of errors exist and they never mix:
//!
//! - [`RelayError`] covers the inbound request pipeline. These are the only
//!   errors a caller ever sees, rendered as `{"success": false, "error": ...}`.
//! - [`ForwardError`] covers the outbound Conversions API call. By the time
//!   one is produced the caller already holds a `202`, so these are logged
//!   and nothing else.
//!
//! # Example
//!
//! ```rust
//! use capi_core::error::{ErrorCategory, RelayError};
//!
//! let err = RelayError::MissingRequiredFields {
//!     missing: vec!["eventId".to_string()],
//! };
//! assert_eq!(err.category(), ErrorCategory::Validation);
//! assert_eq!(err.http_status_code(), 400);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Message returned to callers that omit a required field
pub const MISSING_FIELDS_MESSAGE: &str =
    "Missing required fields: eventName, eventId, and eventSourceUrl are required.";

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Input validation failed (400)
    Validation,
    /// Route does not exist (404)
    NotFound,
    /// Relay is missing provider configuration
    Configuration,
    /// Internal fault (500)
    Internal,
    /// Provider or network failure
    External,
}

/// Errors surfaced to the HTTP caller
#[derive(Error, Debug)]
pub enum RelayError {
    /// One or more of eventName, eventId, eventSourceUrl is absent or empty
    #[error("Missing required fields: eventName, eventId, and eventSourceUrl are required.")]
    MissingRequiredFields { missing: Vec<String> },

    /// Request body could not be parsed into an event
    #[error("{reason}")]
    MalformedBody { reason: String },

    /// Body could not be read at all, e.g. it exceeded the size limit
    #[error("{reason}")]
    UnreadableBody { status: u16, reason: String },

    /// No route matched the request
    #[error("Not Found")]
    NotFound { requested_url: String },

    /// Unexpected fault in the request pipeline
    #[error("Internal Server Error")]
    Internal { reason: String },
}

impl RelayError {
    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::MissingRequiredFields { .. }
            | RelayError::MalformedBody { .. }
            | RelayError::UnreadableBody { .. } => ErrorCategory::Validation,
            RelayError::NotFound { .. } => ErrorCategory::NotFound,
            RelayError::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the stable error code for logging
    pub fn error_code(&self) -> &'static str {
        match self {
            RelayError::MissingRequiredFields { .. } => "MISSING_REQUIRED_FIELDS",
            RelayError::MalformedBody { .. } => "MALFORMED_BODY",
            RelayError::UnreadableBody { .. } => "UNREADABLE_BODY",
            RelayError::NotFound { .. } => "NOT_FOUND",
            RelayError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            RelayError::MissingRequiredFields { .. } | RelayError::MalformedBody { .. } => 400,
            RelayError::UnreadableBody { status, .. } => *status,
            RelayError::NotFound { .. } => 404,
            RelayError::Internal { .. } => 500,
        }
    }

    /// Converts this error to the body returned to the caller
    ///
    /// ```json
    /// { "success": false, "error": "Not Found", "requestedUrl": "/nope" }
    /// ```
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            error: self.to_string(),
            requested_url: match self {
                RelayError::NotFound { requested_url } => Some(requested_url.clone()),
                _ => None,
            },
        }
    }
}

/// JSON body for every non-2xx answer the relay gives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Human-readable message
    pub error: String,
    /// Path that failed to route, 404 only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_url: Option<String>,
}

/// Errors produced while forwarding an event to the Conversions API
#[derive(Error, Debug)]
pub enum ForwardError {
    /// Event lacks a field the provider requires
    #[error("Missing required event details for CAPI.")]
    Validation { missing: Vec<String> },

    /// Pixel id, access token or API version is not configured
    #[error("Conversions API is not configured: missing {}", .missing.join(", "))]
    NotConfigured { missing: Vec<String> },

    /// Request never produced an HTTP response
    #[error("{message}")]
    Transport { message: String, code: &'static str },

    /// Provider answered with a non-2xx status
    #[error("Request failed with status code {status}")]
    Provider {
        status: u16,
        response_data: Option<Value>,
    },

    /// Payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ForwardError {
    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            ForwardError::Validation { .. } => ErrorCategory::Validation,
            ForwardError::NotConfigured { .. } => ErrorCategory::Configuration,
            ForwardError::Transport { .. } | ForwardError::Provider { .. } => {
                ErrorCategory::External
            }
            ForwardError::Serialization(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the stable error code
    ///
    /// Provider failures use `ERR_BAD_REQUEST` for 4xx and
    /// `ERR_BAD_RESPONSE` for 5xx.
    pub fn code(&self) -> &'static str {
        match self {
            ForwardError::Validation { .. } => "VALIDATION_ERROR",
            ForwardError::NotConfigured { .. } => "NOT_CONFIGURED",
            ForwardError::Transport { code, .. } => *code,
            ForwardError::Provider { status, .. } if *status < 500 => "ERR_BAD_REQUEST",
            ForwardError::Provider { .. } => "ERR_BAD_RESPONSE",
            ForwardError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// HTTP status returned by the provider, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ForwardError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body returned by the provider alongside a failure status
    pub fn response_data(&self) -> Option<&Value> {
        match self {
            ForwardError::Provider { response_data, .. } => response_data.as_ref(),
            _ => None,
        }
    }

    /// Names of the absent fields or settings behind a validation or
    /// configuration failure
    pub fn missing(&self) -> Option<&[String]> {
        match self {
            ForwardError::Validation { missing } | ForwardError::NotConfigured { missing } => {
                Some(missing)
            }
            _ => None,
        }
    }

    /// Structured failure record used for logging
    pub fn to_failure(&self) -> ForwardFailure {
        ForwardFailure {
            message: self.to_string(),
            code: self.code().to_string(),
            status: self.status(),
            response_data: self.response_data().cloned(),
            missing: self.missing().map(<[String]>::to_vec),
        }
    }
}

/// `{message, code, status, responseData}` shape of a failed forward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardFailure {
    pub message: String,
    pub code: String,
    pub status: Option<u16>,
    pub response_data: Option<Value>,
    /// Absent fields or settings, validation and configuration failures only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_is_stable() {
        let err = RelayError::MissingRequiredFields {
            missing: vec!["eventId".to_string()],
        };
        assert_eq!(err.to_string(), MISSING_FIELDS_MESSAGE);
        assert_eq!(err.error_code(), "MISSING_REQUIRED_FIELDS");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            RelayError::MalformedBody {
                reason: "bad json".to_string()
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            RelayError::NotFound {
                requested_url: "/x".to_string()
            }
            .http_status_code(),
            404
        );
        assert_eq!(
            RelayError::Internal {
                reason: "boom".to_string()
            }
            .http_status_code(),
            500
        );
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            RelayError::NotFound {
                requested_url: "/x".to_string()
            }
            .category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            ForwardError::Provider {
                status: 400,
                response_data: None
            }
            .category(),
            ErrorCategory::External
        );
        assert_eq!(
            ForwardError::NotConfigured {
                missing: vec!["FB_PIXEL_ID".to_string()]
            }
            .category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_not_found_response_carries_requested_url() {
        let err = RelayError::NotFound {
            requested_url: "/api/v2/nope".to_string(),
        };
        let json = serde_json::to_value(err.to_error_response()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Not Found");
        assert_eq!(json["requestedUrl"], "/api/v2/nope");
    }

    #[test]
    fn test_internal_response_hides_reason() {
        let err = RelayError::Internal {
            reason: "thread panicked at src/lib.rs".to_string(),
        };
        let json = serde_json::to_value(err.to_error_response()).unwrap();
        assert_eq!(json["error"], "Internal Server Error");
        assert!(json.get("requestedUrl").is_none());
    }

    #[test]
    fn test_provider_failure_shape() {
        let err = ForwardError::Provider {
            status: 400,
            response_data: Some(serde_json::json!({"error": {"message": "Invalid parameter"}})),
        };
        let failure = err.to_failure();
        assert_eq!(failure.message, "Request failed with status code 400");
        assert_eq!(failure.code, "ERR_BAD_REQUEST");
        assert_eq!(failure.status, Some(400));

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["responseData"]["error"]["message"], "Invalid parameter");
    }

    #[test]
    fn test_provider_5xx_code() {
        let err = ForwardError::Provider {
            status: 503,
            response_data: None,
        };
        assert_eq!(err.code(), "ERR_BAD_RESPONSE");
    }

    #[test]
    fn test_transport_failure_has_no_status() {
        let err = ForwardError::Transport {
            message: "error sending request".to_string(),
            code: "ECONNREFUSED",
        };
        let failure = err.to_failure();
        assert_eq!(failure.code, "ECONNREFUSED");
        assert_eq!(failure.status, None);
        assert_eq!(failure.response_data, None);
        assert_eq!(failure.missing, None);
    }

    #[test]
    fn test_validation_failure_names_missing_fields() {
        let err = ForwardError::Validation {
            missing: vec!["eventSourceUrl".to_string(), "userData".to_string()],
        };
        assert_eq!(
            err.missing(),
            Some(&["eventSourceUrl".to_string(), "userData".to_string()][..])
        );

        let json = serde_json::to_value(err.to_failure()).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["missing"], serde_json::json!(["eventSourceUrl", "userData"]));
    }

    #[test]
    fn test_unreadable_body_keeps_status() {
        let err = RelayError::UnreadableBody {
            status: 413,
            reason: "Failed to buffer the request body: length limit exceeded".to_string(),
        };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(
            err.to_error_response().error,
            "Failed to buffer the request body: length limit exceeded"
        );
    }
}
