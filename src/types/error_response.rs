use serde::{Deserialize, Serialize};

/// The `{"error": {...}}` envelope used by OpenAI-compatible services, both
/// as an HTTP error body and as an in-stream error event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// The error details.
    pub error: ErrorObject,
}

/// Details of a service-side error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorObject {
    /// Human-readable error message.
    #[serde(default)]
    pub message: Option<String>,

    /// Error category, e.g. `invalid_request_error`.
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,

    /// Parameter that caused the error.
    #[serde(default)]
    pub param: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_envelope() {
        let body = r#"{"error": {"message": "bad model", "type": "invalid_request_error", "param": "model"}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message.as_deref(), Some("bad model"));
        assert_eq!(
            parsed.error.error_type.as_deref(),
            Some("invalid_request_error")
        );
        assert_eq!(parsed.error.param.as_deref(), Some("model"));
    }
}
