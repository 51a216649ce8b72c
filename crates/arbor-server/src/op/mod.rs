//! Operation dispatch.
//!
//! An operation processor owns a registry mapping op-code strings to
//! handlers. The registry is seeded with the `eval` handler; embedding
//! servers extend the op-code surface by registering additional handlers.

mod eval;

use std::collections::HashMap;
use std::sync::Arc;

use arbor_core::{RequestMessage, ResponseMessage, ResponseStatusCode};
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::context::Context;

pub use eval::{EvalOpProcessor, StreamError};

/// A bound operation, ready for the channel pipeline to invoke.
pub type OpHandler =
    Arc<dyn Fn(Arc<Context>) -> BoxFuture<'static, Result<(), OpError>> + Send + Sync>;

/// A pluggable pre-check run against `eval` requests before the handler is
/// selected.
pub type EvalPreCheck = Arc<dyn Fn(&RequestMessage) -> Result<(), OpError> + Send + Sync>;

/// A request was rejected before (or instead of) evaluation.
///
/// Carries the ready-to-send error response; the processor never writes to
/// the channel during dispatch, it surfaces this for the pipeline to
/// convert into a response.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct OpError {
    /// Human-readable diagnostic.
    pub message: String,
    /// The response to send, carrying the originating request id.
    pub response: ResponseMessage,
}

impl OpError {
    /// The request could not be parsed or its op code is unrecognized.
    #[must_use]
    pub fn malformed_request(msg: &RequestMessage, message: impl Into<String>) -> Self {
        Self::with_code(msg, ResponseStatusCode::MalformedRequest, message)
    }

    /// The request's arguments are invalid.
    #[must_use]
    pub fn invalid_arguments(msg: &RequestMessage, message: impl Into<String>) -> Self {
        Self::with_code(msg, ResponseStatusCode::InvalidRequestArguments, message)
    }

    fn with_code(
        msg: &RequestMessage,
        code: ResponseStatusCode,
        message: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let response =
            ResponseMessage::build(msg).code(code).status_message(message.clone()).create();
        Self { message, response }
    }
}

/// Registry of op-code handlers.
#[derive(Default)]
pub struct OpRegistry {
    handlers: HashMap<String, OpHandler>,
}

impl OpRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an op code, replacing any existing one.
    pub fn register(&mut self, op: impl Into<String>, handler: OpHandler) {
        self.handlers.insert(op.into(), handler);
    }

    /// Look up the handler for an op code.
    #[must_use]
    pub fn get(&self, op: &str) -> Option<&OpHandler> {
        self.handlers.get(op)
    }

    /// Whether an op code has a registered handler.
    #[must_use]
    pub fn contains(&self, op: &str) -> bool {
        self.handlers.contains_key(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_error_carries_request_id_and_code() {
        let msg = RequestMessage::new("r-7", "bogus");
        let err = OpError::malformed_request(&msg, "no such op");

        assert_eq!(err.message, "no such op");
        assert_eq!(err.response.request_id, "r-7");
        assert_eq!(err.response.status.code, ResponseStatusCode::MalformedRequest);
        assert_eq!(err.response.status.message.as_deref(), Some("no such op"));

        let err = OpError::invalid_arguments(&msg, "bad args");
        assert_eq!(err.response.status.code, ResponseStatusCode::InvalidRequestArguments);
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = OpRegistry::new();
        assert!(!registry.contains("noop"));

        let handler: OpHandler = Arc::new(|_ctx| Box::pin(async { Ok(()) }));
        registry.register("noop", handler);

        assert!(registry.contains("noop"));
        assert!(registry.get("noop").is_some());
        assert!(registry.get("other").is_none());
    }
}
