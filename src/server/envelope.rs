//! Uniform response envelope for every tool

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ProviderError, ValidationError};

/// Machine-readable failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidParams,
    ProviderUnavailable,
    ProviderFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// `{"success": true, "data": ...}` or `{"success": false, "error": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn invalid(err: &ValidationError) -> Self {
        Self::fail(ErrorCode::InvalidParams, err.to_string())
    }

    pub fn unavailable(err: &ProviderError) -> Self {
        Self::fail(ErrorCode::ProviderUnavailable, err.to_string())
    }

    pub fn failed(err: &anyhow::Error) -> Self {
        Self::fail(ErrorCode::ProviderFailed, format!("{err:#}"))
    }

    fn to_content(&self) -> Content {
        let text = serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| format!(r#"{{"success":false,"error":{{"message":"{e}"}}}}"#));
        Content::text(text)
    }

    /// Wrap as a tool result, flagged as an error when unsuccessful
    pub fn into_result(self) -> CallToolResult {
        self.into_result_with(Vec::new())
    }

    /// Like [`into_result`](Self::into_result) with extra content after the envelope
    pub fn into_result_with(self, extra: Vec<Content>) -> CallToolResult {
        let mut content = vec![self.to_content()];
        content.extend(extra);
        if self.success {
            CallToolResult::success(content)
        } else {
            CallToolResult::error(content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let value = serde_json::to_value(Envelope::ok(json!({ "x": 1 }))).unwrap();
        assert_eq!(value, json!({ "success": true, "data": { "x": 1 } }));
    }

    #[test]
    fn test_failure_shape() {
        let err = ValidationError::new("x", "too big");
        let value = serde_json::to_value(Envelope::invalid(&err)).unwrap();
        assert_eq!(
            value,
            json!({
                "success": false,
                "error": { "code": "invalid_params", "message": "x: too big" }
            })
        );
    }

    #[test]
    fn test_result_error_flag() {
        let result = Envelope::fail(ErrorCode::ProviderFailed, "boom").into_result();
        assert_eq!(result.is_error, Some(true));

        let result = Envelope::ok(json!(null)).into_result();
        assert_eq!(result.is_error, Some(false));
    }
}
