//! Outbound response messages.

use serde::{Deserialize, Serialize};

use super::request::RequestMessage;
use crate::status::ResponseStatusCode;
use crate::types::Value;

/// Status portion of a response: the code plus an optional human-readable
/// diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStatus {
    /// Status code of the response.
    pub code: ResponseStatusCode,
    /// Operator-readable diagnostic, present on error responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A structured response to a client request.
///
/// Either handed to the transport's encoder directly or serialized into a
/// frame by an operation processor. Always echoes the originating request
/// id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    /// Identifier of the request this response answers.
    pub request_id: String,
    /// Status of the response.
    pub status: ResponseStatus,
    /// Result batch, absent on error and no-content responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<Value>>,
}

impl ResponseMessage {
    /// Start building a response to the given request.
    #[must_use]
    pub fn build(msg: &RequestMessage) -> ResponseMessageBuilder {
        Self::build_for(&msg.request_id)
    }

    /// Start building a response carrying the given request id.
    #[must_use]
    pub fn build_for(request_id: impl Into<String>) -> ResponseMessageBuilder {
        ResponseMessageBuilder {
            request_id: request_id.into(),
            code: ResponseStatusCode::Success,
            message: None,
            result: None,
        }
    }
}

/// Builder for [`ResponseMessage`].
///
/// The code defaults to [`ResponseStatusCode::Success`]; callers set it
/// explicitly for every other kind of response.
#[derive(Debug)]
pub struct ResponseMessageBuilder {
    request_id: String,
    code: ResponseStatusCode,
    message: Option<String>,
    result: Option<Vec<Value>>,
}

impl ResponseMessageBuilder {
    /// Set the status code.
    #[must_use]
    pub const fn code(mut self, code: ResponseStatusCode) -> Self {
        self.code = code;
        self
    }

    /// Set the human-readable status message.
    #[must_use]
    pub fn status_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the result batch.
    #[must_use]
    pub fn result(mut self, result: Vec<Value>) -> Self {
        self.result = Some(result);
        self
    }

    /// Build the response.
    #[must_use]
    pub fn create(self) -> ResponseMessage {
        ResponseMessage {
            request_id: self.request_id,
            status: ResponseStatus { code: self.code, message: self.message },
            result: self.result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_success() {
        let msg = RequestMessage::new("r-9", "eval");
        let response = ResponseMessage::build(&msg).create();
        assert_eq!(response.request_id, "r-9");
        assert_eq!(response.status.code, ResponseStatusCode::Success);
        assert_eq!(response.status.message, None);
        assert_eq!(response.result, None);
    }

    #[test]
    fn test_builder_sets_all_fields() {
        let response = ResponseMessage::build_for("r-1")
            .code(ResponseStatusCode::PartialContent)
            .status_message("more to come")
            .result(vec![Value::Int(1), Value::Int(2)])
            .create();

        assert_eq!(response.status.code, ResponseStatusCode::PartialContent);
        assert_eq!(response.status.message.as_deref(), Some("more to come"));
        assert_eq!(response.result, Some(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_serde_omits_absent_fields() {
        let response = ResponseMessage::build_for("r-1")
            .code(ResponseStatusCode::NoContent)
            .create();
        let json = serde_json::to_string(&response).expect("serialize");
        assert!(!json.contains("result"));
        assert!(!json.contains("message"));
        assert!(json.contains("\"requestId\":\"r-1\""));

        let back: ResponseMessage = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, response);
    }
}
